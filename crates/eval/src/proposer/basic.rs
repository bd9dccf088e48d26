//! Basic proposers: FirstCandidateProposer, ScriptedProposer, RandomProposer.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use casegate_core::{GrammaticalCase, InputDescription};
#[cfg(feature = "interactive")]
use rand::seq::SliceRandom;

use crate::proposal::Proposal;
use crate::proposer::{GenerationError, Proposer};

/// Proposes the first candidate with its first permitted role.
///
/// Deterministic. Ignores feedback, so a rejected first guess is repeated
/// until the session runs out of attempts.
pub struct FirstCandidateProposer;

#[async_trait]
impl Proposer for FirstCandidateProposer {
    async fn propose(
        &self,
        _input: &InputDescription,
        candidates: &[&GrammaticalCase],
        _prior_feedback: Option<&str>,
    ) -> Result<Proposal, GenerationError> {
        Ok(match candidates.first() {
            Some(case) => {
                let role = case.permitted_roles.first().map(|r| r.as_str());
                Proposal::new(case.code.clone(), role.unwrap_or_default())
            }
            None => Proposal::unparsed("no candidate cases"),
        })
    }
}

/// Replays a fixed queue of proposals, one per call.
///
/// Records the feedback it was given on each call so callers can check
/// what the coordinator passed along.
pub struct ScriptedProposer {
    queue: Mutex<VecDeque<Proposal>>,
    feedback: Mutex<Vec<Option<String>>>,
}

impl ScriptedProposer {
    pub fn new(proposals: Vec<Proposal>) -> Self {
        ScriptedProposer {
            queue: Mutex::new(proposals.into()),
            feedback: Mutex::new(Vec::new()),
        }
    }

    /// Feedback received on each call so far, in call order.
    pub fn feedback_log(&self) -> Vec<Option<String>> {
        match self.feedback.lock() {
            Ok(log) => log.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn remaining(&self) -> usize {
        match self.queue.lock() {
            Ok(queue) => queue.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

#[async_trait]
impl Proposer for ScriptedProposer {
    async fn propose(
        &self,
        _input: &InputDescription,
        _candidates: &[&GrammaticalCase],
        prior_feedback: Option<&str>,
    ) -> Result<Proposal, GenerationError> {
        self.feedback
            .lock()
            .map_err(|_| GenerationError::Transport("scripted proposer lock poisoned".to_string()))?
            .push(prior_feedback.map(str::to_string));
        self.queue
            .lock()
            .map_err(|_| GenerationError::Transport("scripted proposer lock poisoned".to_string()))?
            .pop_front()
            .ok_or_else(|| {
                GenerationError::Unconfigured("scripted proposer has no proposals left".to_string())
            })
    }
}

/// Picks a random candidate and a random role it permits.
///
/// Shows that correctness never depends on proposer quality: whatever it
/// proposes, only validated assignments are ever accepted.
#[cfg(feature = "interactive")]
pub struct RandomProposer;

#[cfg(feature = "interactive")]
#[async_trait]
impl Proposer for RandomProposer {
    async fn propose(
        &self,
        _input: &InputDescription,
        candidates: &[&GrammaticalCase],
        _prior_feedback: Option<&str>,
    ) -> Result<Proposal, GenerationError> {
        let mut rng = rand::thread_rng();
        let Some(case) = candidates.choose(&mut rng) else {
            return Ok(Proposal::unparsed("no candidate cases"));
        };
        let role = case
            .permitted_roles
            .choose(&mut rng)
            .map(|r| r.as_str())
            .unwrap_or_default();
        Ok(Proposal::new(case.code.clone(), role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casegate_core::SemanticRole;

    fn case(code: &str, roles: Vec<SemanticRole>) -> GrammaticalCase {
        GrammaticalCase {
            code: code.to_string(),
            name: code.to_string(),
            permitted_roles: roles,
            description: String::new(),
            why_not_alternatives: vec![],
            common_mistakes: vec![],
            embedding_text: String::new(),
            allowed_functions: vec![],
            citation: None,
        }
    }

    #[tokio::test]
    async fn first_candidate_takes_first_role() {
        let ind = case("IND", vec![SemanticRole::Agent, SemanticRole::Patient]);
        let abs = case("ABS", vec![SemanticRole::Patient]);
        let input = InputDescription::new("anything");
        let proposal = FirstCandidateProposer
            .propose(&input, &[&ind, &abs], None)
            .await
            .unwrap();
        assert_eq!(proposal, Proposal::new("IND", "AGENT"));
    }

    #[tokio::test]
    async fn first_candidate_with_nothing_to_choose_from() {
        let input = InputDescription::new("anything");
        let proposal = FirstCandidateProposer.propose(&input, &[], None).await.unwrap();
        assert!(proposal.case.is_empty());
    }

    #[tokio::test]
    async fn scripted_replays_in_order_then_errors() {
        let scripted = ScriptedProposer::new(vec![
            Proposal::new("ABS", "PATIENT"),
            Proposal::new("AFF", "EXPERIENCER"),
        ]);
        let input = InputDescription::new("feeling fear");

        let first = scripted.propose(&input, &[], None).await.unwrap();
        let second = scripted.propose(&input, &[], Some("try again")).await.unwrap();
        assert_eq!(first.case, "ABS");
        assert_eq!(second.case, "AFF");
        assert!(matches!(
            scripted.propose(&input, &[], None).await,
            Err(GenerationError::Unconfigured(_))
        ));
        assert_eq!(
            scripted.feedback_log(),
            vec![None, Some("try again".to_string()), None]
        );
    }

    #[cfg(feature = "interactive")]
    #[tokio::test]
    async fn random_stays_within_candidates() {
        let aff = case("AFF", vec![SemanticRole::Experiencer]);
        let dat = case("DAT", vec![SemanticRole::Recipient, SemanticRole::Goal]);
        let input = InputDescription::new("anything");
        for _ in 0..20 {
            let p = RandomProposer.propose(&input, &[&aff, &dat], None).await.unwrap();
            match p.case.as_str() {
                "AFF" => assert_eq!(p.role, "EXPERIENCER"),
                "DAT" => assert!(p.role == "RECIPIENT" || p.role == "GOAL"),
                other => panic!("unexpected case {}", other),
            }
        }
    }
}
