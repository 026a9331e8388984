use flowd_core::discover;

use crate::args::DiscoverArgs;
use crate::exit_codes::EXIT_SUCCESS;

pub fn run(args: DiscoverArgs) -> anyhow::Result<i32> {
    let result = discover(&args.scripts_root);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(EXIT_SUCCESS)
}
