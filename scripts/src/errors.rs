//! Definitions of errors that can occur during the execution of the deploy scripts

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// Errors that can occur during the execution of the deploy scripts
#[derive(Debug)]
pub enum ScriptError {
    /// A required configuration value is missing or malformed
    Configuration(String),
    /// Error reading the deployments file
    ReadDeployments(String),
    /// Error writing the deployments file
    WriteDeployments(String),
    /// The requested name has no entry in the deployments file
    MissingEntry(String),
    /// Error parsing a compilation artifact
    ArtifactParsing(String),
    /// Error initializing the RPC client
    ClientInitialization(String),
    /// Error deploying a contract: rejection, revert, or confirmation timeout
    ContractDeployment(String),
    /// A named deployment step failed
    StepFailed {
        /// The identifier of the step that failed
        step: String,
        /// The error the step failed with
        source: Box<ScriptError>,
    },
}

impl ScriptError {
    /// Wrap this error with the identifier of the step that produced it
    pub fn in_step(self, step: &str) -> Self {
        ScriptError::StepFailed {
            step: step.to_string(),
            source: Box::new(self),
        }
    }
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::Configuration(s) => write!(f, "invalid configuration: {}", s),
            ScriptError::ReadDeployments(s) => write!(f, "error reading deployments: {}", s),
            ScriptError::WriteDeployments(s) => write!(f, "error writing deployments: {}", s),
            ScriptError::MissingEntry(s) => write!(f, "no deployment recorded for `{}`", s),
            ScriptError::ArtifactParsing(s) => write!(f, "error parsing artifact: {}", s),
            ScriptError::ClientInitialization(s) => write!(f, "error initializing client: {}", s),
            ScriptError::ContractDeployment(s) => write!(f, "error deploying contract: {}", s),
            ScriptError::StepFailed { step, source } => {
                write!(f, "step `{}` failed: {}", step, source)
            }
        }
    }
}

impl Error for ScriptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ScriptError::StepFailed { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
