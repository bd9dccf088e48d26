//! casegate assignment loop -- accepts a situation description,
//! produces a validated (case, role) assignment or a final rejection.
//!
//! Retrieval narrows the rule table, a proposer guesses, the validator
//! judges, and the coordinator retries with the validator's explanation
//! until it runs out of attempts. Only the validator decides correctness.

pub mod coordinator;
pub mod proposal;
pub mod proposer;
pub mod report;
pub mod retriever;
pub mod validator;

pub use coordinator::{Attempt, Coordinator, CoordinatorConfig, Outcome, Session};
pub use proposal::Proposal;
pub use proposer::{GenerationError, Proposer};
pub use report::{ReportOutcome, SessionReport};
pub use retriever::{LexicalIndex, RankedCase, RetrievalError, Retriever, SimilarityIndex};
pub use validator::{RejectionReason, ValidationResult, Validator};
