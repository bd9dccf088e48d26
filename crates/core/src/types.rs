//! Rule-store data model: cases, semantic roles, functions and
//! co-occurrence rules, plus the caller-supplied input description.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ──────────────────────────────────────────────
// Labels
// ──────────────────────────────────────────────

/// A label (role or function name) that is not part of the fixed enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{label}'")]
pub struct UnknownLabel {
    pub kind: &'static str,
    pub label: String,
}

/// The functional relationship of a participant to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SemanticRole {
    Agent,
    Patient,
    Experiencer,
    Stimulus,
    Instrument,
    Content,
    Recipient,
    Goal,
    Purpose,
    Enabler,
    Activation,
    Attribute,
    Possessor,
    Owner,
    Producer,
    Location,
    Orientation,
    Source,
    Part,
    Correlation,
    Dependent,
    Contingency,
}

impl SemanticRole {
    pub const ALL: [SemanticRole; 22] = [
        SemanticRole::Agent,
        SemanticRole::Patient,
        SemanticRole::Experiencer,
        SemanticRole::Stimulus,
        SemanticRole::Instrument,
        SemanticRole::Content,
        SemanticRole::Recipient,
        SemanticRole::Goal,
        SemanticRole::Purpose,
        SemanticRole::Enabler,
        SemanticRole::Activation,
        SemanticRole::Attribute,
        SemanticRole::Possessor,
        SemanticRole::Owner,
        SemanticRole::Producer,
        SemanticRole::Location,
        SemanticRole::Orientation,
        SemanticRole::Source,
        SemanticRole::Part,
        SemanticRole::Correlation,
        SemanticRole::Dependent,
        SemanticRole::Contingency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticRole::Agent => "AGENT",
            SemanticRole::Patient => "PATIENT",
            SemanticRole::Experiencer => "EXPERIENCER",
            SemanticRole::Stimulus => "STIMULUS",
            SemanticRole::Instrument => "INSTRUMENT",
            SemanticRole::Content => "CONTENT",
            SemanticRole::Recipient => "RECIPIENT",
            SemanticRole::Goal => "GOAL",
            SemanticRole::Purpose => "PURPOSE",
            SemanticRole::Enabler => "ENABLER",
            SemanticRole::Activation => "ACTIVATION",
            SemanticRole::Attribute => "ATTRIBUTE",
            SemanticRole::Possessor => "POSSESSOR",
            SemanticRole::Owner => "OWNER",
            SemanticRole::Producer => "PRODUCER",
            SemanticRole::Location => "LOCATION",
            SemanticRole::Orientation => "ORIENTATION",
            SemanticRole::Source => "SOURCE",
            SemanticRole::Part => "PART",
            SemanticRole::Correlation => "CORRELATION",
            SemanticRole::Dependent => "DEPENDENT",
            SemanticRole::Contingency => "CONTINGENCY",
        }
    }
}

impl fmt::Display for SemanticRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SemanticRole {
    type Err = UnknownLabel;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        SemanticRole::ALL
            .iter()
            .copied()
            .find(|r| r.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownLabel {
                kind: "semantic role",
                label: s.to_string(),
            })
    }
}

/// Static, dynamic or manifestive character of the stem a case attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Function {
    Sta,
    Dyn,
    Mnf,
}

impl Function {
    pub const ALL: [Function; 3] = [Function::Sta, Function::Dyn, Function::Mnf];

    pub fn as_str(&self) -> &'static str {
        match self {
            Function::Sta => "STA",
            Function::Dyn => "DYN",
            Function::Mnf => "MNF",
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Function {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Function::ALL
            .iter()
            .copied()
            .find(|func| func.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownLabel {
                kind: "function",
                label: s.to_string(),
            })
    }
}

// ──────────────────────────────────────────────
// Cases
// ──────────────────────────────────────────────

/// Why a confusable case is not the right choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhyNot {
    pub other_case: String,
    pub distinction: String,
}

/// One grammatical case as held by the rule store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammaticalCase {
    pub code: String,
    pub name: String,
    /// Never empty. Kept in load order without duplicates.
    pub permitted_roles: Vec<SemanticRole>,
    pub description: String,
    pub why_not_alternatives: Vec<WhyNot>,
    pub common_mistakes: Vec<String>,
    /// Text the retriever indexes. Only the retriever reads it.
    pub embedding_text: String,
    /// Empty means the case places no restriction on function.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_functions: Vec<Function>,
    /// Where the grammar states this case, e.g. "Grammar §7.1 (Affective)".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
}

impl GrammaticalCase {
    pub fn permits(&self, role: SemanticRole) -> bool {
        self.permitted_roles.contains(&role)
    }

    pub fn allows_function(&self, function: Function) -> bool {
        self.allowed_functions.is_empty() || self.allowed_functions.contains(&function)
    }

    /// Whether the case narrows the set of functions it combines with.
    pub fn is_strict(&self) -> bool {
        !self.allowed_functions.is_empty() && self.allowed_functions.len() < Function::ALL.len()
    }

    /// The distinction recorded against `other_case`, if any.
    pub fn why_not(&self, other_case: &str) -> Option<&str> {
        self.why_not_alternatives
            .iter()
            .find(|w| w.other_case == other_case)
            .map(|w| w.distinction.as_str())
    }

    pub fn roles_label(&self) -> String {
        join_labels(self.permitted_roles.iter().map(SemanticRole::as_str))
    }

    /// Grammar references backing an assignment of this case: the recorded
    /// citation, if any, then a summary line naming the case and its roles.
    pub fn citations(&self) -> Vec<String> {
        let mut citations: Vec<String> = self.citation.iter().cloned().collect();
        citations.push(format!(
            "{} {} ({}): {}",
            self.code,
            self.name,
            self.roles_label(),
            self.description
        ));
        citations
    }
}

/// Join labels with ", " for explanations and prompts.
pub fn join_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> String {
    labels.into_iter().collect::<Vec<_>>().join(", ")
}

// ──────────────────────────────────────────────
// Co-occurrence rules
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleKind {
    /// The subject case cannot appear alongside the other listed cases.
    Exclude,
    /// The subject case needs every other listed case present.
    Require,
    /// Under the rule's condition the subject case only takes `roles`.
    RoleConditioned,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Exclude => "EXCLUDE",
            RuleKind::Require => "REQUIRE",
            RuleKind::RoleConditioned => "ROLE_CONDITIONED",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A constraint over a small set of cases.
///
/// Symmetric rules treat every listed case as a subject. Directional rules
/// only constrain `cases[0]`; the remaining cases are the objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoOccurrenceRule {
    pub id: String,
    pub cases: Vec<String>,
    pub kind: RuleKind,
    pub detail: String,
    #[serde(default)]
    pub directional: bool,
    /// ROLE_CONDITIONED only: roles the subject may take while the rule applies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<SemanticRole>,
    /// ROLE_CONDITIONED only: voluntariness the situation must have for the rule to apply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voluntary: Option<bool>,
}

impl CoOccurrenceRule {
    pub fn touches(&self, code: &str) -> bool {
        self.cases.iter().any(|c| c == code)
    }

    pub fn subjects(&self) -> &[String] {
        if self.directional {
            &self.cases[..self.cases.len().min(1)]
        } else {
            &self.cases
        }
    }

    pub fn is_subject(&self, code: &str) -> bool {
        self.subjects().iter().any(|c| c == code)
    }

    /// The listed cases other than `subject`.
    pub fn others<'a>(&'a self, subject: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.cases
            .iter()
            .map(String::as_str)
            .filter(move |c| *c != subject)
    }
}

// ──────────────────────────────────────────────
// Input
// ──────────────────────────────────────────────

/// Optional structured context the caller knows about the situation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SituationHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voluntary: Option<bool>,
    /// The role the described participant plays, when the caller knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_role: Option<SemanticRole>,
    /// Cases already fixed elsewhere in the situation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub companion_cases: Vec<String>,
}

impl SituationHints {
    pub fn is_empty(&self) -> bool {
        self.voluntary.is_none() && self.expected_role.is_none() && self.companion_cases.is_empty()
    }

    pub fn has_companion(&self, code: &str) -> bool {
        self.companion_cases.iter().any(|c| c == code)
    }
}

/// An unstructured statement of a situation, e.g. "feeling fear".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDescription {
    pub text: String,
    #[serde(default, skip_serializing_if = "SituationHints::is_empty")]
    pub hints: SituationHints,
}

impl InputDescription {
    pub fn new(text: impl Into<String>) -> Self {
        InputDescription {
            text: text.into(),
            hints: SituationHints::default(),
        }
    }

    pub fn with_hints(mut self, hints: SituationHints) -> Self {
        self.hints = hints;
        self
    }
}
