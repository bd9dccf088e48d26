/// Malformed or inconsistent rule data. Raised while loading, never afterwards.
///
/// `record` names the offending record the way a maintainer would look it
/// up in the data file: `case 'AFF'`, `cases[3]`, `rule 'aff-volition'`.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("cannot read rule data '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("rule data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The document lacks a top-level section (`cases`).
    #[error("rule data missing required section: '{section}'")]
    MissingSection { section: String },

    #[error("{record}: missing required field '{field}'")]
    MissingField { record: String, field: String },

    #[error("{record}: field '{field}' {message}")]
    InvalidField {
        record: String,
        field: String,
        message: String,
    },

    #[error("case '{code}' has no permitted roles")]
    EmptyRoles { code: String },

    #[error("case '{code}' is defined more than once")]
    DuplicateCase { code: String },

    #[error("rule id '{id}' is used more than once")]
    DuplicateRule { id: String },

    #[error("{record}: references undefined case '{case}'")]
    UndefinedCase { record: String, case: String },

    #[error("rule '{rule}': {message}")]
    InvalidRule { rule: String, message: String },

    /// A case is both required and excluded with respect to the same other case.
    #[error(
        "inconsistent rules: '{case}' both requires and excludes '{other}' (rule '{require_rule}' vs rule '{exclude_rule}')"
    )]
    Inconsistent {
        case: String,
        other: String,
        require_rule: String,
        exclude_rule: String,
    },
}

impl DataError {
    pub(crate) fn missing(record: &str, field: &str) -> Self {
        DataError::MissingField {
            record: record.to_string(),
            field: field.to_string(),
        }
    }

    pub(crate) fn invalid(record: &str, field: &str, message: impl Into<String>) -> Self {
        DataError::InvalidField {
            record: record.to_string(),
            field: field.to_string(),
            message: message.into(),
        }
    }
}
