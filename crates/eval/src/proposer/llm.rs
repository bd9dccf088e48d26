//! LLM-backed proposer: LlmProposer, LlmClient trait, HTTP clients.

use async_trait::async_trait;
use casegate_core::{join_labels, Function, GrammaticalCase, InputDescription, SemanticRole};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::proposal::Proposal;
use crate::proposer::{strip_code_fences, GenerationError, Proposer};

/// A message in an LLM conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Trait for calling an LLM to get a text completion.
///
/// Implementations handle the specifics of the API (Anthropic, OpenAI-style
/// chat completions, ...). The proposer handles prompts and parsing.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, messages: Vec<Message>, model: &str) -> Result<String, GenerationError>;
}

/// Asks an LLM for a case assignment.
///
/// One request per call: the candidate table and any rejection feedback go
/// into a fresh conversation, and whatever comes back is parsed as leniently
/// as possible. Retrying is the coordinator's business.
pub struct LlmProposer {
    pub client: Box<dyn LlmClient>,
    /// System prompt override. If empty, the default system prompt is used.
    pub system_prompt: String,
    pub model: String,
}

impl LlmProposer {
    pub fn new(client: Box<dyn LlmClient>, model: String) -> Self {
        Self {
            client,
            system_prompt: String::new(),
            model,
        }
    }

    fn default_system_prompt() -> String {
        r#"You are a grammar expert for a constructed language with a strict case system.

Given a description of a situation, choose the single grammatical CASE that
marks the participant described, the SEMANTIC ROLE that participant plays,
and, if you know it, the FUNCTION of the stem (STA, DYN or MNF).

You must respond with a JSON object in exactly this format:

{
  "case": "<three-letter case code>",
  "role": "<SEMANTIC_ROLE>",
  "function": "<STA|DYN|MNF>",
  "justification": "<one sentence>"
}

Rules:
- Prefer the candidate cases you are given; they were selected as relevant.
- The role must be one the chosen case permits.
- Case codes and role names are written exactly as listed.
- If a previous proposal was rejected, the rejection reason is authoritative.
- Respond only with valid JSON. Do not include markdown fences or other text."#
            .to_string()
    }

    fn build_user_message(
        input: &InputDescription,
        candidates: &[&GrammaticalCase],
        prior_feedback: Option<&str>,
    ) -> String {
        let mut msg = format!("Situation: \"{}\"\n", input.text.trim());

        let hints = &input.hints;
        if !hints.is_empty() {
            msg.push_str("\nKnown about the situation:\n");
            if let Some(voluntary) = hints.voluntary {
                msg.push_str(&format!(
                    "- voluntary: {}\n",
                    if voluntary { "yes" } else { "no" }
                ));
            }
            if let Some(role) = hints.expected_role {
                msg.push_str(&format!("- the participant's role: {}\n", role));
            }
            if !hints.companion_cases.is_empty() {
                msg.push_str(&format!(
                    "- cases already used elsewhere: {}\n",
                    join_labels(hints.companion_cases.iter().map(String::as_str))
                ));
            }
        }

        msg.push_str("\nCandidate cases:\n");
        if candidates.is_empty() {
            msg.push_str("(none retrieved)\n");
        }
        for case in candidates {
            msg.push_str(&format!(
                "- {} ({}): roles {}",
                case.code,
                case.name,
                case.roles_label()
            ));
            if !case.allowed_functions.is_empty() {
                msg.push_str(&format!(
                    "; functions {}",
                    join_labels(case.allowed_functions.iter().map(Function::as_str))
                ));
            }
            msg.push('\n');
            if !case.description.trim().is_empty() {
                msg.push_str(&format!("  {}\n", case.description.trim()));
            }
            for why_not in &case.why_not_alternatives {
                msg.push_str(&format!(
                    "  Not {}: {}\n",
                    why_not.other_case, why_not.distinction
                ));
            }
            for mistake in &case.common_mistakes {
                msg.push_str(&format!("  Common mistake: {}\n", mistake));
            }
            if let Some(citation) = &case.citation {
                msg.push_str(&format!("  Citation: {}\n", citation));
            }
        }

        if let Some(feedback) = prior_feedback {
            msg.push_str("\nYour previous proposal was rejected.\n");
            msg.push_str(&format!("REJECTION REASON: {}\n", feedback));
        }

        msg.push_str(&format!(
            "\nValid roles: {}\n",
            join_labels(SemanticRole::ALL.iter().map(SemanticRole::as_str))
        ));
        msg
    }

    /// Read a proposal out of model output. Never fails: output that cannot
    /// be read becomes a proposal the validator will reject, carrying the
    /// raw text as its justification.
    fn parse_response(response: &str) -> Proposal {
        let body = strip_code_fences(response);
        let value = serde_json::from_str::<Value>(body)
            .ok()
            .or_else(|| embedded_object(body));
        let Some(obj) = value.as_ref().and_then(Value::as_object) else {
            return Proposal::unparsed(response);
        };

        let field = |name: &str| {
            obj.get(name)
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let case = field("case").unwrap_or_default();
        let justification = field("justification")
            .or_else(|| field("reasoning"))
            .or_else(|| case.is_empty().then(|| response.to_string()));

        Proposal {
            case,
            role: field("role").unwrap_or_default(),
            function: field("function"),
            justification,
        }
    }
}

/// The outermost `{...}` span of `text`, if it parses as JSON.
fn embedded_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

#[async_trait]
impl Proposer for LlmProposer {
    async fn propose(
        &self,
        input: &InputDescription,
        candidates: &[&GrammaticalCase],
        prior_feedback: Option<&str>,
    ) -> Result<Proposal, GenerationError> {
        let system_prompt = if self.system_prompt.is_empty() {
            Self::default_system_prompt()
        } else {
            self.system_prompt.clone()
        };
        let messages = vec![
            Message::system(system_prompt),
            Message::user(Self::build_user_message(input, candidates, prior_feedback)),
        ];

        let response = self.client.complete(messages, &self.model).await?;
        tracing::debug!(model = %self.model, %response, "llm proposal received");
        Ok(Self::parse_response(&response))
    }
}

// -- HTTP clients (feature-gated) --

#[cfg(feature = "llm")]
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);

/// POST a JSON body and read a JSON response, on a blocking thread.
#[cfg(feature = "llm")]
async fn post_json(
    url: String,
    headers: Vec<(&'static str, String)>,
    body: Value,
) -> Result<Value, GenerationError> {
    tokio::task::spawn_blocking(move || {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .http_status_as_error(false)
            .build();
        let agent = ureq::Agent::new_with_config(config);

        let mut request = agent.post(&url).header("content-type", "application/json");
        for (name, value) in &headers {
            request = request.header(*name, value);
        }

        let response = request.send_json(body).map_err(|e| match e {
            ureq::Error::Timeout(which) => GenerationError::Timeout(format!("{}: {:?}", url, which)),
            other => GenerationError::Transport(other.to_string()),
        })?;

        let status = response.status().as_u16();
        let mut body = response.into_body();
        if status >= 400 {
            let message = body.read_to_string().unwrap_or_default();
            return Err(GenerationError::Api { status, message });
        }
        body.read_json::<Value>().map_err(|e| GenerationError::Api {
            status,
            message: format!("unreadable response body: {}", e),
        })
    })
    .await
    .map_err(|e| GenerationError::Transport(format!("task join error: {}", e)))?
}

#[cfg(feature = "llm")]
fn api_key_from_env(var: &str) -> Result<String, GenerationError> {
    std::env::var(var)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            GenerationError::Unconfigured(format!("{} environment variable not set", var))
        })
}

#[cfg(feature = "llm")]
/// Client for the Anthropic Messages API.
pub struct AnthropicClient {
    pub api_key: String,
    /// Base URL (default: https://api.anthropic.com).
    pub base_url: String,
    pub max_tokens: u32,
}

#[cfg(feature = "llm")]
impl AnthropicClient {
    pub const DEFAULT_KEY_ENV: &'static str = "ANTHROPIC_API_KEY";

    pub fn from_env(var: &str) -> Result<Self, GenerationError> {
        Ok(Self::new(api_key_from_env(var)?))
    }

    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 256,
        }
    }
}

#[cfg(feature = "llm")]
#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, messages: Vec<Message>, model: &str) -> Result<String, GenerationError> {
        // The Messages API takes the system prompt as a separate field.
        let system: Option<String> = messages
            .iter()
            .find(|m| m.role == "system")
            .map(|m| m.content.clone());
        let turns: Vec<Value> = messages
            .iter()
            .filter(|m| m.role != "system")
            .map(|m| serde_json::json!({ "role": m.role, "content": m.content }))
            .collect();

        let mut body = serde_json::json!({
            "model": model,
            "max_tokens": self.max_tokens,
            "messages": turns,
        });
        if let Some(sys) = system {
            body["system"] = Value::String(sys);
        }

        let json = post_json(
            format!("{}/v1/messages", self.base_url.trim_end_matches('/')),
            vec![
                ("x-api-key", self.api_key.clone()),
                ("anthropic-version", "2023-06-01".to_string()),
            ],
            body,
        )
        .await?;

        json["content"]
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|c| c["text"].as_str())
            .map(str::to_string)
            .ok_or_else(|| GenerationError::Api {
                status: 200,
                message: "no text content in Anthropic response".to_string(),
            })
    }
}

#[cfg(feature = "llm")]
/// Client for OpenAI-style `/chat/completions` endpoints (Groq, OpenAI,
/// local servers).
pub struct OpenAiCompatibleClient {
    pub api_key: String,
    /// Base URL including the version prefix (default: Groq's `/openai/v1`).
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[cfg(feature = "llm")]
impl OpenAiCompatibleClient {
    pub const DEFAULT_KEY_ENV: &'static str = "GROQ_API_KEY";

    pub fn from_env(var: &str) -> Result<Self, GenerationError> {
        Ok(Self::new(api_key_from_env(var)?))
    }

    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: "https://api.groq.com/openai/v1".to_string(),
            max_tokens: 200,
            temperature: 0.3,
        }
    }
}

#[cfg(feature = "llm")]
#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn complete(&self, messages: Vec<Message>, model: &str) -> Result<String, GenerationError> {
        let body = serde_json::json!({
            "model": model,
            "messages": messages,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });

        let json = post_json(
            format!("{}/chat/completions", self.base_url.trim_end_matches('/')),
            vec![("authorization", format!("Bearer {}", self.api_key))],
            body,
        )
        .await?;

        json["choices"]
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|c| c["message"]["content"].as_str())
            .map(str::to_string)
            .ok_or_else(|| GenerationError::Api {
                status: 200,
                message: "no message content in chat completion".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casegate_core::{SituationHints, WhyNot};
    use std::sync::{Arc, Mutex};

    fn affective() -> GrammaticalCase {
        GrammaticalCase {
            code: "AFF".to_string(),
            name: "Affective".to_string(),
            permitted_roles: vec![SemanticRole::Experiencer],
            description: "Unwilled experience.".to_string(),
            why_not_alternatives: vec![WhyNot {
                other_case: "ABS".to_string(),
                distinction: "fear is felt, not inflicted".to_string(),
            }],
            common_mistakes: vec!["using ABS for emotions".to_string()],
            embedding_text: String::new(),
            allowed_functions: vec![Function::Sta],
            citation: Some("Grammar §7.1 (Affective)".to_string()),
        }
    }

    /// Mock LLM client that pops responses from a queue.
    struct MockLlmClient {
        responses: Mutex<Vec<Result<String, GenerationError>>>,
        captured: Arc<Mutex<Vec<Vec<Message>>>>,
    }

    impl MockLlmClient {
        fn new(responses: Vec<Result<String, GenerationError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                captured: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn complete(
            &self,
            messages: Vec<Message>,
            _model: &str,
        ) -> Result<String, GenerationError> {
            self.captured.lock().unwrap().push(messages);
            let mut queue = self.responses.lock().unwrap();
            if queue.is_empty() {
                return Err(GenerationError::Transport("mock queue exhausted".to_string()));
            }
            queue.remove(0)
        }
    }

    #[tokio::test]
    async fn parses_plain_json() {
        let response = r#"{"case": "AFF", "role": "EXPERIENCER", "function": "STA", "justification": "unwilled emotion"}"#;
        let proposer = LlmProposer::new(
            Box::new(MockLlmClient::new(vec![Ok(response.to_string())])),
            "test-model".to_string(),
        );
        let input = InputDescription::new("feeling fear");
        let aff = affective();

        let proposal = proposer.propose(&input, &[&aff], None).await.unwrap();
        assert_eq!(
            proposal,
            Proposal::new("AFF", "EXPERIENCER")
                .with_function("STA")
                .with_justification("unwilled emotion")
        );
    }

    #[test]
    fn parses_fenced_and_wrapped_json() {
        let fenced = "```json\n{\"case\": \"ABS\", \"role\": \"PATIENT\"}\n```";
        assert_eq!(LlmProposer::parse_response(fenced).label(), "ABS/PATIENT");

        let wrapped = "Sure! Here you go: {\"case\": \"ERG\", \"role\": \"AGENT\", \"reasoning\": \"deliberate\"} Hope that helps.";
        let p = LlmProposer::parse_response(wrapped);
        assert_eq!(p.label(), "ERG/AGENT");
        assert_eq!(p.justification.as_deref(), Some("deliberate"));
    }

    #[test]
    fn garbage_becomes_empty_proposal() {
        let p = LlmProposer::parse_response("I think it is probably affective.");
        assert!(p.case.is_empty());
        assert!(p.role.is_empty());
        assert_eq!(
            p.justification.as_deref(),
            Some("I think it is probably affective.")
        );
    }

    #[tokio::test]
    async fn backend_error_is_propagated() {
        let proposer = LlmProposer::new(
            Box::new(MockLlmClient::new(vec![Err(GenerationError::Api {
                status: 529,
                message: "overloaded".to_string(),
            })])),
            "test-model".to_string(),
        );
        let input = InputDescription::new("feeling fear");
        let err = proposer.propose(&input, &[], None).await.unwrap_err();
        assert!(matches!(err, GenerationError::Api { status: 529, .. }));
    }

    #[tokio::test]
    async fn prompt_carries_candidates_hints_and_feedback() {
        let client = MockLlmClient::new(vec![Ok("{}".to_string())]);
        let captured = Arc::clone(&client.captured);
        let proposer = LlmProposer::new(Box::new(client), "test-model".to_string());
        let input = InputDescription::new("feeling fear").with_hints(SituationHints {
            voluntary: Some(false),
            ..SituationHints::default()
        });
        let aff = affective();

        proposer
            .propose(&input, &[&aff], Some("ABS does not permit EXPERIENCER"))
            .await
            .unwrap();

        let calls = captured.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][0].role, "system");
        let user = &calls[0][1].content;
        assert!(user.contains("Situation: \"feeling fear\""));
        assert!(user.contains("- voluntary: no"));
        assert!(user.contains("- AFF (Affective): roles EXPERIENCER; functions STA"));
        assert!(user.contains("Not ABS: fear is felt, not inflicted"));
        assert!(user.contains("Common mistake: using ABS for emotions"));
        assert!(user.contains("Citation: Grammar §7.1 (Affective)"));
        assert!(user.contains("REJECTION REASON: ABS does not permit EXPERIENCER"));
    }

    #[tokio::test]
    async fn first_call_has_no_rejection_section() {
        let client = MockLlmClient::new(vec![Ok("{}".to_string())]);
        let captured = Arc::clone(&client.captured);
        let proposer = LlmProposer::new(Box::new(client), "test-model".to_string());
        let input = InputDescription::new("sneezing");

        proposer.propose(&input, &[], None).await.unwrap();

        let calls = captured.lock().unwrap();
        assert!(!calls[0][1].content.contains("REJECTION REASON"));
        assert!(calls[0][1].content.contains("(none retrieved)"));
    }

    #[cfg(feature = "llm")]
    #[tokio::test]
    #[ignore] // Requires ANTHROPIC_API_KEY environment variable
    async fn anthropic_integration() {
        let client = AnthropicClient::from_env(AnthropicClient::DEFAULT_KEY_ENV)
            .expect("ANTHROPIC_API_KEY required");
        let proposer = LlmProposer::new(Box::new(client), "claude-sonnet-4-20250514".to_string());
        let aff = affective();
        let input = InputDescription::new("feeling fear");
        let proposal = proposer.propose(&input, &[&aff], None).await.unwrap();
        assert!(!proposal.case.is_empty() || proposal.justification.is_some());
    }
}
