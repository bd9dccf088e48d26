//! Proposer trait and reference implementations.
//!
//! A proposer turns a situation description and a set of candidate cases
//! into a `Proposal`. It may be as clever or as careless as it likes:
//! nothing it produces is trusted until the validator has looked at it.

mod basic;
mod llm;

pub use basic::{FirstCandidateProposer, ScriptedProposer};
pub use llm::{LlmClient, LlmProposer, Message};

#[cfg(feature = "interactive")]
pub use basic::RandomProposer;

#[cfg(feature = "llm")]
pub use llm::{AnthropicClient, OpenAiCompatibleClient};

use async_trait::async_trait;
use casegate_core::{GrammaticalCase, InputDescription};

use crate::proposal::Proposal;

/// The generation backend could not produce a proposal at all.
///
/// Fatal for the session. A response that arrives but makes no sense is
/// not an error; it becomes a proposal that the validator rejects.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation backend unreachable: {0}")]
    Transport(String),
    #[error("generation backend timed out: {0}")]
    Timeout(String),
    #[error("generation backend returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("generation backend not configured: {0}")]
    Unconfigured(String),
}

#[async_trait]
pub trait Proposer: Send + Sync {
    /// `prior_feedback` is the explanation of the most recent rejection in
    /// this session, if any. Proposers keep no memory between calls.
    async fn propose(
        &self,
        input: &InputDescription,
        candidates: &[&GrammaticalCase],
        prior_feedback: Option<&str>,
    ) -> Result<Proposal, GenerationError>;
}

/// Strip markdown code fences from model output.
pub(crate) fn strip_code_fences(s: &str) -> &str {
    let trimmed = s.trim();

    if let Some(stripped) = trimmed.strip_prefix("```json") {
        if let Some(inner) = stripped.strip_suffix("```") {
            return inner.trim();
        }
    }
    if let Some(stripped) = trimmed.strip_prefix("```") {
        if let Some(inner) = stripped.strip_suffix("```") {
            return inner.trim();
        }
    }

    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_json_fence() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn strip_bare_fence() {
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
    }

    #[test]
    fn unfenced_text_is_only_trimmed() {
        assert_eq!(strip_code_fences("  {\"case\": \"AFF\"}\n"), "{\"case\": \"AFF\"}");
    }
}
