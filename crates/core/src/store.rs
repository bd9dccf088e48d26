//! The process-wide, read-only rule table.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::consistency;
use crate::error::DataError;
use crate::load;
use crate::types::{CoOccurrenceRule, GrammaticalCase, SemanticRole};

/// Cases and co-occurrence rules, validated once at load.
///
/// There are no mutation methods: a store is built, wrapped in an `Arc`
/// and handed to every component that needs it.
#[derive(Debug, Clone)]
pub struct RuleStore {
    cases: Vec<GrammaticalCase>,
    by_code: HashMap<String, usize>,
    rules: Vec<CoOccurrenceRule>,
    digest: String,
}

/// Summary counts over a loaded store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleStoreStats {
    pub total_cases: usize,
    pub total_rules: usize,
    /// Cases that restrict the functions they combine with.
    pub strict_cases: usize,
    pub permissive_cases: usize,
    pub semantic_roles_covered: usize,
    pub rules_by_kind: BTreeMap<String, usize>,
}

impl RuleStore {
    /// Build a store from a parsed rule data document.
    pub fn load(doc: &serde_json::Value) -> Result<RuleStore, DataError> {
        let data = load::parse_document(doc)?;
        consistency::check(&data.cases, &data.rules)?;

        let by_code = data
            .cases
            .iter()
            .enumerate()
            .map(|(i, c)| (c.code.clone(), i))
            .collect();

        let store = RuleStore {
            cases: data.cases,
            by_code,
            rules: data.rules,
            digest: compute_digest(doc),
        };
        tracing::debug!(
            cases = store.cases.len(),
            rules = store.rules.len(),
            digest = %store.digest,
            "rule store loaded"
        );
        Ok(store)
    }

    pub fn from_json_str(text: &str) -> Result<RuleStore, DataError> {
        let doc: serde_json::Value = serde_json::from_str(text)?;
        RuleStore::load(&doc)
    }

    pub fn from_path(path: &Path) -> Result<RuleStore, DataError> {
        let text = std::fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.display().to_string(),
            source,
        })?;
        RuleStore::from_json_str(&text)
    }

    pub fn get_case(&self, code: &str) -> Option<&GrammaticalCase> {
        self.by_code.get(code).map(|&i| &self.cases[i])
    }

    pub fn contains(&self, code: &str) -> bool {
        self.by_code.contains_key(code)
    }

    /// Position of a case in load order. Used to break ranking ties.
    pub fn position(&self, code: &str) -> Option<usize> {
        self.by_code.get(code).copied()
    }

    /// All cases in load order.
    pub fn all_cases(&self) -> &[GrammaticalCase] {
        &self.cases
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.cases.iter().map(|c| c.code.as_str())
    }

    pub fn rules(&self) -> &[CoOccurrenceRule] {
        &self.rules
    }

    /// Every rule that lists `code`, in load order.
    pub fn rules_for(&self, code: &str) -> Vec<&CoOccurrenceRule> {
        self.rules.iter().filter(|r| r.touches(code)).collect()
    }

    /// Cases whose permitted roles include `role`, in load order.
    pub fn cases_permitting(&self, role: SemanticRole) -> Vec<&GrammaticalCase> {
        self.cases.iter().filter(|c| c.permits(role)).collect()
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// SHA-256 over the compact JSON of the source document.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn stats(&self) -> RuleStoreStats {
        let strict_cases = self.cases.iter().filter(|c| c.is_strict()).count();
        let roles: BTreeSet<SemanticRole> = self
            .cases
            .iter()
            .flat_map(|c| c.permitted_roles.iter().copied())
            .collect();
        let mut rules_by_kind = BTreeMap::new();
        for rule in &self.rules {
            *rules_by_kind.entry(rule.kind.to_string()).or_insert(0) += 1;
        }

        RuleStoreStats {
            total_cases: self.cases.len(),
            total_rules: self.rules.len(),
            strict_cases,
            permissive_cases: self.cases.len() - strict_cases,
            semantic_roles_covered: roles.len(),
            rules_by_kind,
        }
    }
}

fn compute_digest(doc: &serde_json::Value) -> String {
    // serde_json maps are BTreeMap-backed without `preserve_order`, so the
    // compact form is canonical with respect to key order.
    let canonical = doc.to_string();
    format!("{:x}", Sha256::digest(canonical.as_bytes()))
}
