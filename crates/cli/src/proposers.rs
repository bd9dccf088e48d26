//! `--proposer` parsing and construction.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use casegate_eval::proposer::{
    AnthropicClient, FirstCandidateProposer, LlmClient, LlmProposer, OpenAiCompatibleClient,
    RandomProposer, ScriptedProposer,
};
use casegate_eval::{Proposal, Proposer};

use crate::config::{LlmConfig, LlmProvider};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ProposerChoice {
    Llm,
    FirstCandidate,
    Random,
    /// Replay proposals from a JSON array file.
    Script(PathBuf),
}

impl FromStr for ProposerChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "llm" => Ok(ProposerChoice::Llm),
            "first-candidate" => Ok(ProposerChoice::FirstCandidate),
            "random" => Ok(ProposerChoice::Random),
            other => match other.strip_prefix("script:") {
                Some(path) if !path.is_empty() => Ok(ProposerChoice::Script(PathBuf::from(path))),
                _ => Err(format!(
                    "unknown proposer '{}' (expected llm, first-candidate, random or script:<file>)",
                    other
                )),
            },
        }
    }
}

pub(crate) fn build_proposer(
    choice: &ProposerChoice,
    llm: &LlmConfig,
    model_override: Option<&str>,
) -> Result<Arc<dyn Proposer>, String> {
    match choice {
        ProposerChoice::FirstCandidate => Ok(Arc::new(FirstCandidateProposer)),
        ProposerChoice::Random => Ok(Arc::new(RandomProposer)),
        ProposerChoice::Script(path) => Ok(Arc::new(ScriptedProposer::new(read_script(path)?))),
        ProposerChoice::Llm => {
            let client = llm_client(llm)?;
            let model = model_override.map(str::to_string).unwrap_or_else(|| llm.model());
            tracing::info!(provider = ?llm.provider, %model, "using llm proposer");
            Ok(Arc::new(LlmProposer::new(client, model)))
        }
    }
}

fn llm_client(llm: &LlmConfig) -> Result<Box<dyn LlmClient>, String> {
    match llm.provider {
        LlmProvider::Anthropic => {
            let var = llm
                .api_key_env
                .as_deref()
                .unwrap_or(AnthropicClient::DEFAULT_KEY_ENV);
            let mut client = AnthropicClient::from_env(var).map_err(|e| e.to_string())?;
            if let Some(url) = &llm.base_url {
                client.base_url = url.clone();
            }
            Ok(Box::new(client))
        }
        LlmProvider::OpenaiCompatible => {
            let var = llm
                .api_key_env
                .as_deref()
                .unwrap_or(OpenAiCompatibleClient::DEFAULT_KEY_ENV);
            let mut client = OpenAiCompatibleClient::from_env(var).map_err(|e| e.to_string())?;
            if let Some(url) = &llm.base_url {
                client.base_url = url.clone();
            }
            Ok(Box::new(client))
        }
    }
}

fn read_script(path: &Path) -> Result<Vec<Proposal>, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read script '{}': {}", path.display(), e))?;
    serde_json::from_str(&content)
        .map_err(|e| format!("could not parse script '{}': {}", path.display(), e))
}
