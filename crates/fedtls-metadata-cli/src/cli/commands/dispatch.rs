use super::super::args::{Cli, Command};

/// Run the selected subcommand and return its process exit code.
pub async fn dispatch(cli: Cli) -> i32 {
    match cli.cmd {
        Command::Fetch(args) => super::fetch::cmd_fetch(args).await,
        Command::Lookup(args) => super::lookup::cmd_lookup(args),
    }
}
