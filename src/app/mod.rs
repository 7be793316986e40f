mod workflow;

pub use workflow::{IssuanceWorkflow, IssueOutcome};

use crate::cert::error::IssueError;
use crate::config::IssuerConfig;
use crate::ui::Prompter;
use crate::utils::logging::Logger;
use std::io;

/// Runs the workflow against the process's stdin and stdout.
pub fn run_interactive(
    config: IssuerConfig,
    mut logger: Box<dyn Logger>,
) -> Result<IssueOutcome, IssueError> {
    let prompter = Prompter::new(io::stdin().lock(), io::stdout());
    let mut workflow = IssuanceWorkflow::new(&config, prompter, logger.as_mut());
    workflow.run()
}
