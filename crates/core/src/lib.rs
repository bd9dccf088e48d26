//! casegate-core: the grammatical case rule store.
//!
//! Holds the canonical set of cases, each case's permitted semantic roles,
//! the co-occurrence constraints between cases, and the explanations used
//! to correct a wrong proposal. Everything here is loaded once, checked for
//! consistency, and read-only afterwards.

pub mod error;
pub mod store;
pub mod types;

mod consistency;
mod load;

pub use error::DataError;
pub use store::{RuleStore, RuleStoreStats};
pub use types::{
    join_labels, CoOccurrenceRule, Function, GrammaticalCase, InputDescription, RuleKind,
    SemanticRole, SituationHints, UnknownLabel, WhyNot,
};
