use std::sync::Arc;

use flowd_core::{
    bind, build_plan, create_run_dir, create_secure_file, load_config, run_scripts, write_secure_file,
    CompositeSink, ExecConfig, NdjsonEmitter, RawOutputSink, TextEmitter,
};
use flowd_policy::{resolve_profile, PolicyBundle};
use tokio_util::sync::CancellationToken;

use crate::args::{OutputFormat, RunArgs};
use crate::exit_codes::{EXIT_ARGS_ERROR, EXIT_RUN_FAILURE, EXIT_SUCCESS};
use crate::helpers::flags_to_bag;

pub async fn run(args: RunArgs) -> anyhow::Result<i32> {
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

    let data_dir = args
        .data_dir
        .clone()
        .unwrap_or_else(|| flowd_common::paths::resolve_data_dir(None));
    let run_id = format!(
        "run-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    );
    let run_dir = data_dir.join("runs").join(&run_id);
    create_run_dir(&run_dir)?;

    let profile = resolve_profile(None);
    let policy = PolicyBundle::load_from_env().unwrap_or_else(|_| PolicyBundle::empty());
    let plan = build_plan(&args.job_id, &config, &config.argspec, &binding, &profile, &policy);
    write_secure_file(&run_dir.join("plan.json"), serde_json::to_string_pretty(&plan)?.as_bytes())?;

    let console: Box<dyn flowd_core::Sink> = match args.format {
        OutputFormat::Text => Box::new(TextEmitter::new(std::io::stdout())),
        OutputFormat::Ndjson => Box::new(NdjsonEmitter::new(std::io::stdout())),
    };
    let log_file = create_secure_file(&run_dir.join("events.ndjson"))?;
    let log_sink: Box<dyn flowd_core::Sink> = Box::new(NdjsonEmitter::new(log_file));
    let stdout_file = create_secure_file(&run_dir.join("stdout"))?;
    let stderr_file = create_secure_file(&run_dir.join("stderr"))?;
    let raw_sink: Box<dyn flowd_core::Sink> = Box::new(RawOutputSink::new(stdout_file, stderr_file));
    let sink: Arc<dyn flowd_core::Sink> = Arc::new(CompositeSink::new(vec![console, log_sink, raw_sink]));

    let exec = ExecConfig {
        run_id,
        data_dir,
        run_dir,
        binding,
        sink,
        strict: args.strict,
    };

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    let outcome = run_scripts(cancel.clone(), &job_dir, &config, exec).await;
    if cancel.is_cancelled() {
        return Ok(EXIT_SUCCESS);
    }

    match outcome {
        Ok(results) => {
            if results.iter().any(|r| r.status == "failed") {
                Ok(EXIT_RUN_FAILURE)
            } else {
                Ok(EXIT_SUCCESS)
            }
        }
        Err(err) => {
            eprintln!("{}", err.message);
            Ok(EXIT_RUN_FAILURE)
        }
    }
}
