use std::io::{BufRead, BufReader};

use anyhow::Context;
use flowd_core::{render_text, RunEvent};

use crate::args::{EventsArgs, OutputFormat};
use crate::exit_codes::{EXIT_ARGS_ERROR, EXIT_SUCCESS};

pub fn run(args: EventsArgs) -> anyhow::Result<i32> {
    let data_dir = args
        .data_dir
        .unwrap_or_else(|| flowd_common::paths::resolve_data_dir(None));
    let log_path = data_dir.join("runs").join(&args.run_id).join("events.ndjson");

    let file = match std::fs::File::open(&log_path) {
        Ok(file) => file,
        Err(_) => {
            eprintln!("E_ARGS: no event log for run {} at {}", args.run_id, log_path.display());
            return Ok(EXIT_ARGS_ERROR);
        }
    };

    for line in BufReader::new(file).lines() {
        let line = line.with_context(|| format!("reading {}", log_path.display()))?;
        if line.is_empty() {
            continue;
        }
        match args.format {
            OutputFormat::Ndjson => println!("{line}"),
            OutputFormat::Text => {
                let event: RunEvent = serde_json::from_str(&line)
                    .with_context(|| format!("parsing event in {}", log_path.display()))?;
                println!("{}", render_text(&event));
            }
        }
    }
    Ok(EXIT_SUCCESS)
}
