//! Serializable summary of one session.

use casegate_core::InputDescription;
use serde::Serialize;

use crate::coordinator::{Attempt, Outcome, Session};
use crate::proposer::GenerationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportOutcome {
    Accepted,
    Exhausted,
    Error,
}

/// What a session did and how it ended, in a form fit for JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub input: InputDescription,
    pub candidates: Vec<String>,
    pub attempts: Vec<Attempt>,
    pub outcome: ReportOutcome,
    pub final_case: Option<String>,
    pub final_role: Option<String>,
    /// Grammar references for the accepted assignment; empty otherwise.
    pub citations: Vec<String>,
    pub error: Option<String>,
    /// Digest of the rule data the session was validated against.
    pub rules_digest: String,
}

impl SessionReport {
    pub fn from_session(session: &Session, rules_digest: String) -> Self {
        let (outcome, accepted) = match &session.outcome {
            Outcome::Accepted(p) => (ReportOutcome::Accepted, Some(p)),
            Outcome::Exhausted => (ReportOutcome::Exhausted, None),
        };
        SessionReport {
            input: session.input.clone(),
            candidates: session.candidates.clone(),
            attempts: session.attempts.clone(),
            outcome,
            final_case: accepted.map(|p| p.case.clone()),
            final_role: accepted.map(|p| p.role.clone()),
            citations: match accepted {
                Some(_) => session
                    .attempts
                    .last()
                    .map(|a| a.result.citations().to_vec())
                    .unwrap_or_default(),
                None => Vec::new(),
            },
            error: None,
            rules_digest,
        }
    }

    pub fn from_error(
        input: InputDescription,
        candidates: Vec<String>,
        attempts: Vec<Attempt>,
        error: &GenerationError,
        rules_digest: String,
    ) -> Self {
        SessionReport {
            input,
            candidates,
            attempts,
            outcome: ReportOutcome::Error,
            final_case: None,
            final_role: None,
            citations: Vec::new(),
            error: Some(error.to_string()),
            rules_digest,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.outcome == ReportOutcome::Accepted
    }

    /// The last proposal made, accepted or not.
    pub fn last_proposal(&self) -> Option<&crate::proposal::Proposal> {
        self.attempts.last().map(|a| &a.proposal)
    }
}
