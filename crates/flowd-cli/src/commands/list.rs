use flowd_core::discover;

use crate::args::DiscoverArgs;
use crate::exit_codes::EXIT_SUCCESS;

pub fn run(args: DiscoverArgs) -> anyhow::Result<i32> {
    let result = discover(&args.scripts_root);
    for job in &result.jobs {
        println!("{}", job.id);
    }
    for warning in &result.warnings {
        eprintln!("{warning}");
    }
    Ok(EXIT_SUCCESS)
}
