//! Test set loader for `casegate experiment`.
//!
//! The file is a JSON array of items:
//!
//! ```json
//! { "input": "feeling fear", "expected_case": "AFF",
//!   "expected_role": "EXPERIENCER", "expected_function": "STA",
//!   "explanation": "unwilled emotion", "hints": { "voluntary": false } }
//! ```

use std::path::Path;

use casegate_core::{Function, InputDescription, SemanticRole, SituationHints};
use serde::{Deserialize, Serialize};

/// One labelled item: a description and the assignment it should get.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentCase {
    pub input: String,
    pub expected_case: String,
    pub expected_role: SemanticRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_function: Option<Function>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, skip_serializing_if = "SituationHints::is_empty")]
    pub hints: SituationHints,
}

impl ExperimentCase {
    pub fn description(&self) -> InputDescription {
        InputDescription::new(self.input.clone()).with_hints(self.hints.clone())
    }
}

/// Load a test set. Blank inputs are rejected; an empty array is allowed.
pub fn load_cases(path: &Path) -> Result<Vec<ExperimentCase>, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read test set '{}': {}", path.display(), e))?;
    parse_cases(&text).map_err(|e| format!("invalid test set '{}': {}", path.display(), e))
}

fn parse_cases(text: &str) -> Result<Vec<ExperimentCase>, String> {
    let cases: Vec<ExperimentCase> = serde_json::from_str(text).map_err(|e| e.to_string())?;
    if let Some(i) = cases.iter().position(|c| c.input.trim().is_empty()) {
        return Err(format!("item {} has a blank input", i));
    }
    Ok(cases)
}
