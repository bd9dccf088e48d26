//! The generate, validate, retry loop.
//!
//! One `run` is one session: retrieve candidates once, then alternate
//! proposing and validating until a proposal is accepted or the attempt
//! budget is spent. A rejection's explanation becomes the next proposal's
//! feedback. Candidates are not re-retrieved between attempts.

use std::sync::Arc;

use casegate_core::{GrammaticalCase, InputDescription, RuleStore};
use serde::{Deserialize, Serialize};

use crate::proposal::Proposal;
use crate::proposer::{GenerationError, Proposer};
use crate::report::SessionReport;
use crate::retriever::Retriever;
use crate::validator::{ValidationResult, Validator};

/// Session limits. Loaded from the `[coordinator]` config section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoordinatorConfig {
    /// Proposals per session, the first one included.
    pub max_attempts: usize,
    /// Cases retrieved as candidates.
    pub top_k: usize,
    /// When off, every case in the store is a candidate.
    pub use_retrieval: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig {
            max_attempts: 3,
            top_k: 3,
            use_retrieval: true,
        }
    }
}

impl CoordinatorConfig {
    /// `max_attempts`, with anything below one treated as one.
    pub fn attempt_limit(&self) -> usize {
        self.max_attempts.max(1)
    }
}

/// One propose/validate round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attempt {
    pub proposal: Proposal,
    pub result: ValidationResult,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Accepted(Proposal),
    Exhausted,
}

/// The record of one session.
#[derive(Debug, Clone)]
pub struct Session {
    pub input: InputDescription,
    /// Candidate codes handed to the proposer, in rank order.
    pub candidates: Vec<String>,
    /// Every attempt in order. Never longer than the attempt limit.
    pub attempts: Vec<Attempt>,
    pub outcome: Outcome,
}

impl Session {
    pub fn accepted(&self) -> Option<&Proposal> {
        match &self.outcome {
            Outcome::Accepted(p) => Some(p),
            Outcome::Exhausted => None,
        }
    }

    /// Attempts after the first.
    pub fn retries(&self) -> usize {
        self.attempts.len().saturating_sub(1)
    }
}

enum State {
    Retrieving,
    Proposing { feedback: Option<String> },
    Validating(Proposal),
    Retry { explanation: String },
    Accepted(Proposal),
    Exhausted,
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            State::Retrieving => "retrieving",
            State::Proposing { .. } => "proposing",
            State::Validating(_) => "validating",
            State::Retry { .. } => "retry",
            State::Accepted(_) => "accepted",
            State::Exhausted => "exhausted",
        }
    }
}

pub struct Coordinator {
    store: Arc<RuleStore>,
    retriever: Retriever,
    proposer: Arc<dyn Proposer>,
    validator: Validator,
    config: CoordinatorConfig,
}

impl Coordinator {
    pub fn new(
        store: Arc<RuleStore>,
        retriever: Retriever,
        proposer: Arc<dyn Proposer>,
        config: CoordinatorConfig,
    ) -> Self {
        Coordinator {
            validator: Validator::new(Arc::clone(&store)),
            store,
            retriever,
            proposer,
            config,
        }
    }

    /// A coordinator retrieving through a `LexicalIndex` over the store.
    pub fn with_lexical_retrieval(
        store: Arc<RuleStore>,
        proposer: Arc<dyn Proposer>,
        config: CoordinatorConfig,
    ) -> Self {
        let retriever = Retriever::lexical(Arc::clone(&store));
        Coordinator::new(store, retriever, proposer, config)
    }

    /// Run one session. Fails only when the proposer cannot produce a
    /// proposal at all.
    pub async fn run(&self, input: &InputDescription) -> Result<Session, GenerationError> {
        let mut candidates = Vec::new();
        let mut attempts = Vec::new();
        let outcome = self.drive(input, &mut candidates, &mut attempts).await?;
        Ok(Session {
            input: input.clone(),
            candidates,
            attempts,
            outcome,
        })
    }

    /// Run one session and summarize it. Never fails: a generation error
    /// becomes an ERROR report holding the attempts made before it.
    pub async fn run_report(&self, input: &InputDescription) -> SessionReport {
        let mut candidates = Vec::new();
        let mut attempts = Vec::new();
        let digest = self.store.digest().to_string();
        match self.drive(input, &mut candidates, &mut attempts).await {
            Ok(outcome) => SessionReport::from_session(
                &Session {
                    input: input.clone(),
                    candidates,
                    attempts,
                    outcome,
                },
                digest,
            ),
            Err(e) => SessionReport::from_error(input.clone(), candidates, attempts, &e, digest),
        }
    }

    async fn drive(
        &self,
        input: &InputDescription,
        candidate_codes: &mut Vec<String>,
        attempts: &mut Vec<Attempt>,
    ) -> Result<Outcome, GenerationError> {
        let limit = self.config.attempt_limit();
        let mut candidates: Vec<&GrammaticalCase> = Vec::new();
        let mut state = State::Retrieving;

        loop {
            tracing::debug!(state = state.name(), attempt = attempts.len(), "session step");
            state = match state {
                State::Retrieving => {
                    candidates = if self.config.use_retrieval {
                        self.retriever.retrieve(&input.text, self.config.top_k)
                    } else {
                        self.store.all_cases().iter().collect()
                    };
                    candidate_codes.extend(candidates.iter().map(|c| c.code.clone()));
                    State::Proposing { feedback: None }
                }
                State::Proposing { feedback } => {
                    let proposal = self
                        .proposer
                        .propose(input, &candidates, feedback.as_deref())
                        .await
                        .map_err(|e| {
                            tracing::warn!(error = %e, input = %input.text, "proposer failed");
                            e
                        })?;
                    State::Validating(proposal)
                }
                State::Validating(proposal) => {
                    let result = self.validator.validate(&proposal, &input.hints);
                    let next = match &result {
                        ValidationResult::Accepted { .. } => State::Accepted(proposal.clone()),
                        ValidationResult::Rejected { reason, explanation } => {
                            tracing::debug!(
                                proposal = %proposal.label(),
                                %reason,
                                "proposal rejected"
                            );
                            if attempts.len() + 1 >= limit {
                                State::Exhausted
                            } else {
                                State::Retry {
                                    explanation: explanation.clone(),
                                }
                            }
                        }
                    };
                    attempts.push(Attempt { proposal, result });
                    next
                }
                State::Retry { explanation } => State::Proposing {
                    feedback: Some(explanation),
                },
                State::Accepted(proposal) => {
                    tracing::info!(
                        input = %input.text,
                        proposal = %proposal.label(),
                        attempts = attempts.len(),
                        "session accepted"
                    );
                    return Ok(Outcome::Accepted(proposal));
                }
                State::Exhausted => {
                    tracing::info!(
                        input = %input.text,
                        attempts = attempts.len(),
                        "session exhausted"
                    );
                    return Ok(Outcome::Exhausted);
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.top_k, 3);
        assert!(config.use_retrieval);
    }

    #[test]
    fn zero_attempts_means_one() {
        let config = CoordinatorConfig {
            max_attempts: 0,
            ..CoordinatorConfig::default()
        };
        assert_eq!(config.attempt_limit(), 1);
    }

    #[test]
    fn config_fields_default_individually() {
        let config: CoordinatorConfig = serde_json::from_str(r#"{"top_k": 5}"#).unwrap();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.max_attempts, 3);
    }
}
