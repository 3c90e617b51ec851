//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod config_cmd;
pub mod login;
pub mod logout;
pub mod probe;
pub mod resolve;
pub mod status;
pub mod tasks;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a command that talks to the broker or the appliance.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => login::handle(args, global).await,
        Command::Logout => logout::handle(global).await,
        Command::Resolve => resolve::handle(global).await,
        Command::Probe => probe::handle(global).await,
        Command::Tasks(args) => tasks::handle(args, global).await,
        // Handled before dispatch
        Command::Status | Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
