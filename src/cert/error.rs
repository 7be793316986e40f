// src/cert/error.rs
use std::{fmt, io, path::PathBuf};
use thiserror::Error;

use super::openssl::OpenSSLError;

/// The tool-backed steps of an issuance, named in failure reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueStep {
    Preflight,
    GenerateCaKey,
    SelfSignCa,
    GenerateKey,
    GenerateCsr,
    Sign,
    Verify,
}

impl fmt::Display for IssueStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IssueStep::Preflight => "tool check",
            IssueStep::GenerateCaKey => "CA key generation",
            IssueStep::SelfSignCa => "CA self-signing",
            IssueStep::GenerateKey => "private key generation",
            IssueStep::GenerateCsr => "CSR generation",
            IssueStep::Sign => "certificate signing",
            IssueStep::Verify => "certificate verification",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("file not found or not readable: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("refusing to replace existing file: {}", .0.display())]
    ExistingFile(PathBuf),

    #[error("{step} failed: {source}")]
    ToolInvocation {
        step: IssueStep,
        #[source]
        source: OpenSSLError,
    },

    #[error("input closed before the workflow finished")]
    InputClosed,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl IssueError {
    pub fn tool(step: IssueStep, source: OpenSSLError) -> Self {
        IssueError::ToolInvocation { step, source }
    }

    /// Errors the collector recovers from by asking again.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, IssueError::MissingFile(_))
    }
}
