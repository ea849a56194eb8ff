use thiserror::Error;

/// Structured error type for the compiler. Every fallible operation in the
/// crate returns this, so callers can match on the category instead of
/// parsing messages.
#[derive(Debug, Error)]
pub enum ChoreoError {
    /// A value violated a construction-time invariant.
    #[error("invalid {what}: {message}")]
    Validation { what: &'static str, message: String },

    /// An identifier did not resolve. `valid` lists the accepted keys when known.
    #[error("unknown {kind} '{key}'{}", valid_suffix(.valid))]
    NotFound {
        kind: &'static str,
        key: String,
        valid: Vec<String>,
    },

    /// Registration of an id that is already present.
    #[error("{kind} '{id}' is already registered")]
    Collision { kind: &'static str, id: String },

    /// A resolvable input that cannot be compiled.
    #[error("cannot compile template '{template_id}'{}: {message}", context_suffix(.section, .step))]
    Compilation {
        template_id: String,
        section: Option<String>,
        step: Option<String>,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ChoreoError>;

impl ChoreoError {
    pub fn validation(what: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            what,
            message: message.into(),
        }
    }

    pub fn not_found(kind: &'static str, key: impl Into<String>, valid: Vec<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
            valid,
        }
    }

    pub fn compilation(template_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Compilation {
            template_id: template_id.into(),
            section: None,
            step: None,
            message: message.into(),
        }
    }

    /// Attach section/step context to a compilation error. Other variants pass through.
    pub fn in_context(self, section: Option<&str>, step: Option<&str>) -> Self {
        match self {
            Self::Compilation {
                template_id,
                section: old_section,
                step: old_step,
                message,
            } => Self::Compilation {
                template_id,
                section: old_section.or_else(|| section.map(str::to_string)),
                step: old_step.or_else(|| step.map(str::to_string)),
                message,
            },
            other => other,
        }
    }
}

fn valid_suffix(valid: &[String]) -> String {
    if valid.is_empty() {
        String::new()
    } else {
        format!(" (expected one of: {})", valid.join(", "))
    }
}

fn context_suffix(section: &Option<String>, step: &Option<String>) -> String {
    match (section, step) {
        (Some(s), Some(st)) => format!(" (section '{s}', step '{st}')"),
        (Some(s), None) => format!(" (section '{s}')"),
        (None, Some(st)) => format!(" (step '{st}')"),
        (None, None) => String::new(),
    }
}

/// Allow converting errors to String for the CLI's plain-text output.
impl From<ChoreoError> for String {
    fn from(e: ChoreoError) -> String {
        e.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn not_found_lists_valid_keys() {
        let e = ChoreoError::not_found("curve", "wobble", vec!["sine".into(), "linear".into()]);
        assert_eq!(
            e.to_string(),
            "unknown curve 'wobble' (expected one of: sine, linear)"
        );
    }

    #[test]
    fn compilation_context_is_rendered() {
        let e = ChoreoError::compilation("fan_sweep", "loop step 'x' missing")
            .in_context(Some("chorus_1"), Some("x"));
        assert_eq!(
            e.to_string(),
            "cannot compile template 'fan_sweep' (section 'chorus_1', step 'x'): loop step 'x' missing"
        );
    }
}
