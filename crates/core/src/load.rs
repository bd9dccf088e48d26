//! Deserialization from rule data JSON into cases and rules.
//!
//! The document shape is `{ "cases": [...], "rules": [...] }`. Records are
//! walked by hand rather than derived so that every failure names the
//! record it came from. Cross-record checks live in `consistency`.

use serde_json::Value;

use crate::error::DataError;
use crate::types::{
    CoOccurrenceRule, Function, GrammaticalCase, RuleKind, SemanticRole, WhyNot,
};

/// Cases and rules in document order, not yet cross-checked.
pub(crate) struct RawRuleData {
    pub cases: Vec<GrammaticalCase>,
    pub rules: Vec<CoOccurrenceRule>,
}

pub(crate) fn parse_document(doc: &Value) -> Result<RawRuleData, DataError> {
    let cases_arr = doc
        .get("cases")
        .and_then(|c| c.as_array())
        .ok_or_else(|| DataError::MissingSection {
            section: "cases".to_string(),
        })?;

    let cases = cases_arr
        .iter()
        .enumerate()
        .map(|(i, obj)| parse_case(i, obj))
        .collect::<Result<Vec<_>, _>>()?;

    let rules = match doc.get("rules") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(arr)) => arr
            .iter()
            .enumerate()
            .map(|(i, obj)| parse_rule(i, obj))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(DataError::invalid("document", "rules", "must be an array")),
    };

    Ok(RawRuleData { cases, rules })
}

// ── Cases ───────────────────────────────────────────────────────────

fn parse_case(index: usize, obj: &Value) -> Result<GrammaticalCase, DataError> {
    let positional = format!("cases[{}]", index);
    if !obj.is_object() {
        return Err(DataError::invalid(&positional, "record", "must be an object"));
    }

    let code = required_str(obj, &positional, "code")?;
    let record = format!("case '{}'", code);

    let name = required_str(obj, &record, "name")?;
    let description = required_text(obj, &record, "description")?;

    let permitted_roles = dedup(role_list(obj, &record, "permitted_roles")?.ok_or_else(|| {
        DataError::missing(&record, "permitted_roles")
    })?);
    if permitted_roles.is_empty() {
        return Err(DataError::EmptyRoles { code });
    }

    let why_not_alternatives = match obj.get("why_not_alternatives") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(entries)) => entries
            .iter()
            .enumerate()
            .map(|(j, entry)| -> Result<WhyNot, DataError> {
                let entry_record = format!("{} why_not_alternatives[{}]", record, j);
                Ok(WhyNot {
                    other_case: required_str(entry, &entry_record, "other_case")?,
                    distinction: required_str(entry, &entry_record, "distinction")?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => {
            return Err(DataError::invalid(
                &record,
                "why_not_alternatives",
                "must be an array of {other_case, distinction}",
            ))
        }
    };

    let common_mistakes = str_list(obj, &record, "common_mistakes")?.unwrap_or_default();

    let allowed_functions = match obj.get("allowed_functions") {
        None | Some(Value::Null) => Vec::new(),
        Some(_) => dedup(
            str_list(obj, &record, "allowed_functions")?
                .unwrap_or_default()
                .iter()
                .map(|f| {
                    f.parse::<Function>()
                        .map_err(|e| DataError::invalid(&record, "allowed_functions", e.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?,
        ),
    };

    let embedding_text = match optional_str(obj, &record, "embedding_text")? {
        Some(text) if !text.trim().is_empty() => text,
        _ => derived_embedding_text(&code, &name, &permitted_roles, &description),
    };

    let citation = optional_str(obj, &record, "citation")?.filter(|c| !c.trim().is_empty());

    Ok(GrammaticalCase {
        code,
        name,
        permitted_roles,
        description,
        why_not_alternatives,
        common_mistakes,
        embedding_text,
        allowed_functions,
        citation,
    })
}

/// Retrieval text for records that do not supply one.
fn derived_embedding_text(
    code: &str,
    name: &str,
    roles: &[SemanticRole],
    description: &str,
) -> String {
    let roles: Vec<&str> = roles.iter().map(SemanticRole::as_str).collect();
    format!("{} {} {} {}", name, code, roles.join(" "), description)
        .trim()
        .to_string()
}

// ── Rules ───────────────────────────────────────────────────────────

fn parse_rule(index: usize, obj: &Value) -> Result<CoOccurrenceRule, DataError> {
    let positional = format!("rules[{}]", index);
    if !obj.is_object() {
        return Err(DataError::invalid(&positional, "record", "must be an object"));
    }

    let id = optional_str(obj, &positional, "id")?
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| format!("rule-{}", index));
    let record = format!("rule '{}'", id);

    let cases = str_list(obj, &record, "cases")?.ok_or_else(|| DataError::missing(&record, "cases"))?;

    let kind_str = required_str(obj, &record, "kind")?;
    let kind = match kind_str.to_ascii_uppercase().as_str() {
        "EXCLUDE" => RuleKind::Exclude,
        "REQUIRE" => RuleKind::Require,
        "ROLE_CONDITIONED" => RuleKind::RoleConditioned,
        other => {
            return Err(DataError::invalid(
                &record,
                "kind",
                format!(
                    "must be EXCLUDE, REQUIRE or ROLE_CONDITIONED; got '{}'",
                    other
                ),
            ))
        }
    };

    let detail = required_str(obj, &record, "detail")?;
    let directional = optional_bool(obj, &record, "directional")?.unwrap_or(false);
    let roles = dedup(role_list(obj, &record, "roles")?.unwrap_or_default());
    let voluntary = optional_bool(obj, &record, "voluntary")?;

    Ok(CoOccurrenceRule {
        id,
        cases,
        kind,
        detail,
        directional,
        roles,
        voluntary,
    })
}

// ── Field helpers ───────────────────────────────────────────────────

/// A string field that must be present and non-blank.
fn required_str(obj: &Value, record: &str, field: &str) -> Result<String, DataError> {
    let text = required_text(obj, record, field)?;
    if text.trim().is_empty() {
        return Err(DataError::invalid(record, field, "must not be empty"));
    }
    Ok(text)
}

/// A string field that must be present but may be empty.
fn required_text(obj: &Value, record: &str, field: &str) -> Result<String, DataError> {
    optional_str(obj, record, field)?.ok_or_else(|| DataError::missing(record, field))
}

fn optional_str(obj: &Value, record: &str, field: &str) -> Result<Option<String>, DataError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(DataError::invalid(record, field, "must be a string")),
    }
}

fn optional_bool(obj: &Value, record: &str, field: &str) -> Result<Option<bool>, DataError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(DataError::invalid(record, field, "must be a boolean")),
    }
}

fn str_list(obj: &Value, record: &str, field: &str) -> Result<Option<Vec<String>>, DataError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| DataError::invalid(record, field, "must contain only strings"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(_) => Err(DataError::invalid(record, field, "must be an array of strings")),
    }
}

fn role_list(
    obj: &Value,
    record: &str,
    field: &str,
) -> Result<Option<Vec<SemanticRole>>, DataError> {
    let Some(labels) = str_list(obj, record, field)? else {
        return Ok(None);
    };
    labels
        .iter()
        .map(|label| {
            label
                .parse::<SemanticRole>()
                .map_err(|e| DataError::invalid(record, field, e.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn dedup<T: PartialEq>(items: Vec<T>) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}
