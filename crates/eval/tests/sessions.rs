//! Coordinator sessions end to end, with scripted and mock proposers.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use casegate_core::{GrammaticalCase, InputDescription, RuleStore, SemanticRole, SituationHints};
use casegate_eval::proposer::{FirstCandidateProposer, ScriptedProposer};
use casegate_eval::{
    Coordinator, CoordinatorConfig, GenerationError, Outcome, Proposal, Proposer,
    RejectionReason, ReportOutcome,
};

fn store() -> Arc<RuleStore> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data/grammar.json");
    Arc::new(
        RuleStore::from_path(&path)
            .unwrap_or_else(|e| panic!("Failed to load {}: {}", path.display(), e)),
    )
}

fn coordinator(proposer: Arc<dyn Proposer>, config: CoordinatorConfig) -> Coordinator {
    Coordinator::with_lexical_retrieval(store(), proposer, config)
}

fn fear() -> InputDescription {
    InputDescription::new("feeling fear").with_hints(SituationHints {
        voluntary: Some(false),
        expected_role: Some(SemanticRole::Experiencer),
        ..SituationHints::default()
    })
}

/// Records the candidate codes it is shown, then fails or answers.
struct RecordingProposer {
    seen: Mutex<Vec<Vec<String>>>,
    answers: Mutex<Vec<Result<Proposal, GenerationError>>>,
}

impl RecordingProposer {
    fn new(answers: Vec<Result<Proposal, GenerationError>>) -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
            answers: Mutex::new(answers),
        }
    }
}

#[async_trait]
impl Proposer for RecordingProposer {
    async fn propose(
        &self,
        _input: &InputDescription,
        candidates: &[&GrammaticalCase],
        _prior_feedback: Option<&str>,
    ) -> Result<Proposal, GenerationError> {
        self.seen
            .lock()
            .unwrap()
            .push(candidates.iter().map(|c| c.code.clone()).collect());
        let mut answers = self.answers.lock().unwrap();
        if answers.is_empty() {
            return Err(GenerationError::Transport("no more answers".to_string()));
        }
        answers.remove(0)
    }
}

#[tokio::test]
async fn fear_is_corrected_on_second_attempt() {
    let scripted = Arc::new(ScriptedProposer::new(vec![
        Proposal::new("ABS", "PATIENT"),
        Proposal::new("AFF", "EXPERIENCER"),
    ]));
    let c = coordinator(scripted.clone(), CoordinatorConfig::default());

    let session = c.run(&fear()).await.unwrap();

    assert_eq!(session.attempts.len(), 2);
    assert_eq!(session.retries(), 1);
    assert_eq!(
        session.attempts[0].result.reason(),
        Some(&RejectionReason::RoleMismatch)
    );
    assert!(session.attempts[1].result.is_accepted());
    assert_eq!(
        session.outcome,
        Outcome::Accepted(Proposal::new("AFF", "EXPERIENCER"))
    );

    // The rejection, with the AFF/ABS distinction, was fed back.
    let distinction = store()
        .get_case("AFF")
        .and_then(|case| case.why_not("ABS").map(str::to_string))
        .unwrap();
    let feedback = scripted.feedback_log();
    assert_eq!(feedback.len(), 2);
    assert_eq!(feedback[0], None);
    let second = feedback[1].as_deref().unwrap();
    assert_eq!(Some(second), session.attempts[0].result.explanation());
    assert!(second.contains(&distinction));
}

#[tokio::test]
async fn three_rejections_exhaust_the_session() {
    let scripted = Arc::new(ScriptedProposer::new(vec![
        Proposal::new("ABS", "PATIENT"),
        Proposal::new("ERG", "AGENT"),
        Proposal::new("XYZ", "EXPERIENCER"),
        Proposal::new("AFF", "EXPERIENCER"),
    ]));
    let c = coordinator(scripted.clone(), CoordinatorConfig::default());

    let session = c.run(&fear()).await.unwrap();

    assert_eq!(session.outcome, Outcome::Exhausted);
    let cases: Vec<&str> = session
        .attempts
        .iter()
        .map(|a| a.proposal.case.as_str())
        .collect();
    assert_eq!(cases, vec!["ABS", "ERG", "XYZ"]);
    assert!(session.attempts.iter().all(|a| !a.result.is_accepted()));
    // The fourth proposal was never requested.
    assert_eq!(scripted.remaining(), 1);
}

#[tokio::test]
async fn sessions_never_exceed_max_attempts() {
    for max_attempts in 0..5 {
        let config = CoordinatorConfig {
            max_attempts,
            ..CoordinatorConfig::default()
        };
        let proposals = vec![Proposal::new("QQQ", "AGENT"); 10];
        let c = coordinator(Arc::new(ScriptedProposer::new(proposals)), config);
        let session = c.run(&InputDescription::new("anything")).await.unwrap();
        assert_eq!(session.attempts.len(), max_attempts.max(1));
        assert_eq!(session.outcome, Outcome::Exhausted);
    }
}

#[tokio::test]
async fn generation_error_fails_the_session_without_retry() {
    let proposer = Arc::new(RecordingProposer::new(vec![
        Ok(Proposal::new("ABS", "PATIENT")),
        Err(GenerationError::Timeout("60s".to_string())),
        Ok(Proposal::new("AFF", "EXPERIENCER")),
    ]));
    let c = coordinator(proposer.clone(), CoordinatorConfig::default());

    let err = c.run(&fear()).await.unwrap_err();
    assert!(matches!(err, GenerationError::Timeout(_)));
    assert_eq!(proposer.seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn report_records_partial_attempts_on_error() {
    let proposer = Arc::new(RecordingProposer::new(vec![
        Ok(Proposal::new("ABS", "PATIENT")),
        Err(GenerationError::Api {
            status: 503,
            message: "unavailable".to_string(),
        }),
    ]));
    let c = coordinator(proposer, CoordinatorConfig::default());

    let report = c.run_report(&fear()).await;
    assert_eq!(report.outcome, ReportOutcome::Error);
    assert_eq!(report.attempts.len(), 1);
    assert_eq!(
        report.error.as_deref(),
        Some("generation backend returned 503: unavailable")
    );
    assert_eq!(report.rules_digest, store().digest());
}

#[tokio::test]
async fn report_for_accepted_session() {
    let scripted = Arc::new(ScriptedProposer::new(vec![Proposal::new("AFF", "EXPERIENCER")]));
    let c = coordinator(scripted, CoordinatorConfig::default());
    let report = c.run_report(&fear()).await;
    assert!(report.is_accepted());
    assert_eq!(report.final_case.as_deref(), Some("AFF"));
    assert_eq!(report.final_role.as_deref(), Some("EXPERIENCER"));
}

#[tokio::test]
async fn candidates_are_retrieved_once_per_session() {
    let proposer = Arc::new(RecordingProposer::new(vec![
        Ok(Proposal::new("ABS", "PATIENT")),
        Ok(Proposal::new("ABS", "PATIENT")),
        Ok(Proposal::new("AFF", "EXPERIENCER")),
    ]));
    let c = coordinator(proposer.clone(), CoordinatorConfig::default());

    let session = c.run(&fear()).await.unwrap();
    assert_eq!(session.attempts.len(), 3);

    let seen = proposer.seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert!(seen.iter().all(|s| *s == session.candidates));
    assert_eq!(session.candidates.len(), 3);
    assert_eq!(session.candidates[0], "AFF");
}

#[tokio::test]
async fn without_retrieval_every_case_is_a_candidate() {
    let proposer = Arc::new(RecordingProposer::new(vec![Ok(Proposal::new(
        "AFF",
        "EXPERIENCER",
    ))]));
    let config = CoordinatorConfig {
        use_retrieval: false,
        ..CoordinatorConfig::default()
    };
    let c = coordinator(proposer, config);
    let session = c.run(&fear()).await.unwrap();
    assert_eq!(session.candidates.len(), store().len());
}

#[tokio::test]
async fn first_candidate_baseline_accepts_top_retrieval_hit() {
    let c = coordinator(Arc::new(FirstCandidateProposer), CoordinatorConfig::default());
    let session = c
        .run(&InputDescription::new("the topic of discussion"))
        .await
        .unwrap();
    assert_eq!(
        session.accepted(),
        Some(&Proposal::new("THM", "CONTENT"))
    );
}
