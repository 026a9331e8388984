use crate::args::{Cli, Command};

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Run(args) => super::run::run(args).await,
        Command::Plan(args) => super::plan::run(args),
        Command::List(args) => super::list::run(args),
        Command::Discover(args) => super::discover::run(args),
        Command::Events(args) => super::events::run(args),
    }
}
