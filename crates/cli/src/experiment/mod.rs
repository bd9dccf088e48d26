//! Retrieval experiment harness.
//!
//! Runs every item of a labelled test set through two coordinators that
//! share one proposer: one narrows candidates by retrieval, the other
//! offers the whole rule table. Each arm is scored against the expected
//! assignment so the effect of retrieval can be read off the summary.

pub mod fixtures;
pub mod report;

use std::sync::Arc;

use casegate_core::{Function, RuleStore, SemanticRole};
use casegate_eval::{Coordinator, CoordinatorConfig, Proposer, SessionReport};
use serde::Serialize;

use fixtures::ExperimentCase;

/// How one session scored against its item. Only an accepted assignment
/// can be correct.
#[derive(Debug, Clone, Serialize)]
pub struct ArmResult {
    pub valid: bool,
    pub correct_case: bool,
    pub correct_role: bool,
    /// True when the item names no expected function.
    pub correct_function: bool,
    pub fully_correct: bool,
    pub session: SessionReport,
}

impl ArmResult {
    pub fn score(item: &ExperimentCase, session: SessionReport) -> Self {
        let valid = session.is_accepted();
        let correct_case = valid
            && session.final_case.as_deref().map(str::trim) == Some(item.expected_case.as_str());
        let correct_role = valid
            && session
                .final_role
                .as_deref()
                .and_then(|r| r.parse::<SemanticRole>().ok())
                == Some(item.expected_role);
        let correct_function = match item.expected_function {
            None => true,
            Some(expected) => {
                valid
                    && session
                        .last_proposal()
                        .and_then(|p| p.function.as_deref())
                        .and_then(|f| f.parse::<Function>().ok())
                        == Some(expected)
            }
        };
        ArmResult {
            valid,
            correct_case,
            correct_role,
            correct_function,
            fully_correct: correct_case && correct_role && correct_function,
            session,
        }
    }

    /// `CODE/ROLE` as accepted, or the outcome when nothing was.
    pub fn label(&self) -> String {
        match (&self.session.final_case, &self.session.final_role) {
            (Some(c), Some(r)) => format!("{}/{}", c, r),
            _ => format!("{:?}", self.session.outcome).to_uppercase(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemResult {
    pub item: ExperimentCase,
    pub with_retrieval: ArmResult,
    pub without_retrieval: ArmResult,
}

/// Counts over one arm of the experiment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArmTally {
    pub total: usize,
    pub valid: usize,
    pub correct_case: usize,
    pub correct_role: usize,
    pub correct_function: usize,
    pub fully_correct: usize,
    pub errors: usize,
    /// Proposals made across every session.
    pub attempts: usize,
}

impl ArmTally {
    pub fn add(&mut self, arm: &ArmResult) {
        self.total += 1;
        self.valid += usize::from(arm.valid);
        self.correct_case += usize::from(arm.correct_case);
        self.correct_role += usize::from(arm.correct_role);
        self.correct_function += usize::from(arm.correct_function);
        self.fully_correct += usize::from(arm.fully_correct);
        self.errors += usize::from(arm.session.error.is_some());
        self.attempts += arm.session.attempts.len();
    }
}

/// Percentage of `count` over `total`; zero for an empty set.
pub fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * count as f64 / total as f64
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExperimentRun {
    pub with_retrieval: ArmTally,
    pub without_retrieval: ArmTally,
    pub items: Vec<ItemResult>,
    pub rules_digest: String,
}

impl ExperimentRun {
    /// Fully correct items gained by retrieval (negative when it hurt).
    pub fn improvement(&self) -> i64 {
        self.with_retrieval.fully_correct as i64 - self.without_retrieval.fully_correct as i64
    }

    /// `improvement` relative to the baseline, in percent. `None` when the
    /// baseline got nothing right.
    pub fn relative_improvement(&self) -> Option<f64> {
        match self.without_retrieval.fully_correct {
            0 => None,
            base => Some(100.0 * self.improvement() as f64 / base as f64),
        }
    }
}

/// Run every item through both arms, in order.
///
/// Progress lines go to stderr unless `quiet`.
pub async fn run_experiment(
    store: Arc<RuleStore>,
    proposer: Arc<dyn Proposer>,
    config: CoordinatorConfig,
    items: &[ExperimentCase],
    quiet: bool,
) -> ExperimentRun {
    let with = Coordinator::with_lexical_retrieval(
        Arc::clone(&store),
        Arc::clone(&proposer),
        CoordinatorConfig {
            use_retrieval: true,
            ..config.clone()
        },
    );
    let without = Coordinator::with_lexical_retrieval(
        Arc::clone(&store),
        proposer,
        CoordinatorConfig {
            use_retrieval: false,
            ..config
        },
    );

    let mut run = ExperimentRun {
        with_retrieval: ArmTally::default(),
        without_retrieval: ArmTally::default(),
        items: Vec::with_capacity(items.len()),
        rules_digest: store.digest().to_string(),
    };

    let total = items.len();
    for (i, item) in items.iter().enumerate() {
        let input = item.description();
        let without_arm = ArmResult::score(item, without.run_report(&input).await);
        let with_arm = ArmResult::score(item, with.run_report(&input).await);

        if !quiet {
            eprintln!(
                "# [{}/{}] {} -- expected {}/{}; without: {}; with: {} ({} attempts)",
                i + 1,
                total,
                item.input,
                item.expected_case,
                item.expected_role,
                without_arm.label(),
                with_arm.label(),
                with_arm.session.attempts.len()
            );
        }
        tracing::info!(
            item = %item.input,
            with = with_arm.fully_correct,
            without = without_arm.fully_correct,
            "experiment item scored"
        );

        run.without_retrieval.add(&without_arm);
        run.with_retrieval.add(&with_arm);
        run.items.push(ItemResult {
            item: item.clone(),
            with_retrieval: with_arm,
            without_retrieval: without_arm,
        });
    }
    run
}
