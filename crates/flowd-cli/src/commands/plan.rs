use flowd_core::{bind, build_plan, load_config};
use flowd_policy::{resolve_profile, PolicyBundle};

use crate::args::PlanArgs;
use crate::exit_codes::{EXIT_ARGS_ERROR, EXIT_SUCCESS};
use crate::helpers::flags_to_bag;

pub fn run(args: PlanArgs) -> anyhow::Result<i32> {
    let job_dir = args.scripts_root.join(&args.job_id);
    let config = match load_config(&job_dir) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("E_ARGS: {err}");
            return Ok(EXIT_ARGS_ERROR);
        }
    };

    let bag = flags_to_bag(&args.flags, &config.argspec);
    let binding = match bind(&bag, &config.argspec) {
        Ok(binding) => binding,
        Err(err) => {
            eprintln!("E_ARGS: {err}");
            return Ok(EXIT_ARGS_ERROR);
        }
    };

    let profile = resolve_profile(None);
    let policy = PolicyBundle::load_from_env().unwrap_or_else(|_| PolicyBundle::empty());
    let plan = build_plan(&args.job_id, &config, &config.argspec, &binding, &profile, &policy);
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(EXIT_SUCCESS)
}
