//! What a proposer hands to the validator.

use serde::{Deserialize, Serialize};

/// A candidate (case, role) assignment, as produced by a generation backend.
///
/// Fields are kept exactly as generated. Nothing here has been checked;
/// that is the validator's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub case: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
}

impl Proposal {
    pub fn new(case: impl Into<String>, role: impl Into<String>) -> Self {
        Proposal {
            case: case.into(),
            role: role.into(),
            function: None,
            justification: None,
        }
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    pub fn with_justification(mut self, justification: impl Into<String>) -> Self {
        self.justification = Some(justification.into());
        self
    }

    /// A proposal salvaged from output that could not be read at all.
    /// The raw text is kept so the rejection can be inspected later.
    pub fn unparsed(raw: impl Into<String>) -> Self {
        Proposal {
            case: String::new(),
            role: String::new(),
            function: None,
            justification: Some(raw.into()),
        }
    }

    /// `CODE/ROLE`, or `CODE/ROLE/FUNCTION` when a function was proposed.
    pub fn label(&self) -> String {
        match &self.function {
            Some(f) => format!("{}/{}/{}", self.case, self.role, f),
            None => format!("{}/{}", self.case, self.role),
        }
    }
}
