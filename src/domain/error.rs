//! Domain error types.

/// Top-level error type for coopledger.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    #[error("network error: {reason}")]
    Network { reason: String },

    #[error("HTTP {status}: {detail}")]
    Http { status: u16, detail: String },

    #[error("response parse error: {reason}")]
    Parse { reason: String },

    #[error("missing required context: {}", missing.join(", "))]
    ConfigurationGap { missing: Vec<String> },

    #[error("a save is already in progress")]
    SaveInProgress,

    #[error("a load is still in progress")]
    LoadInProgress,

    #[error("operation cancelled")]
    Cancelled,

    #[error("price persistence rejected for all {attempted} items")]
    PricesRejected { attempted: usize },

    #[error("unknown line item: {0}")]
    UnknownItem(String),

    #[error("unknown period: {0}")]
    UnknownPeriod(String),

    #[error("line item {0} is read-only")]
    ReadOnlyItem(String),

    #[error("grid is read-only for role {role}")]
    ReadOnly { role: String },

    #[error("duplicate line item id: {0}")]
    DuplicateItem(String),

    #[error("invalid fiscal start month {0} (expected 1-12)")]
    InvalidStartMonth(u32),

    #[error("cell ({row}, {col}) is outside the {rows}x{cols} grid")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("CSV error: {reason}")]
    Csv { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl GridError {
    /// True when the server answered and refused the request, which is the
    /// trigger for trying the next endpoint shape.
    pub fn is_rejection(&self) -> bool {
        matches!(self, GridError::Http { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            GridError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<&GridError> for std::process::ExitCode {
    fn from(err: &GridError) -> Self {
        let code: u8 = match err {
            GridError::Io(_) | GridError::Csv { .. } => 1,
            GridError::ConfigParse { .. }
            | GridError::ConfigMissing { .. }
            | GridError::ConfigInvalid { .. }
            | GridError::ConfigurationGap { .. }
            | GridError::InvalidStartMonth(_)
            | GridError::DuplicateItem(_) => 2,
            GridError::Network { .. } | GridError::Http { .. } | GridError::Parse { .. } => 3,
            GridError::UnknownItem(_)
            | GridError::UnknownPeriod(_)
            | GridError::ReadOnlyItem(_)
            | GridError::ReadOnly { .. }
            | GridError::OutOfBounds { .. } => 4,
            GridError::SaveInProgress
            | GridError::LoadInProgress
            | GridError::Cancelled
            | GridError::PricesRejected { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_gap_lists_missing_keys() {
        let err = GridError::ConfigurationGap {
            missing: vec!["branch".into(), "default unit".into()],
        };
        assert_eq!(
            err.to_string(),
            "missing required context: branch, default unit"
        );
    }

    #[test]
    fn only_http_errors_are_rejections() {
        let http = GridError::Http {
            status: 404,
            detail: "Not Found".into(),
        };
        assert!(http.is_rejection());
        assert_eq!(http.status(), Some(404));

        let net = GridError::Network {
            reason: "dns".into(),
        };
        assert!(!net.is_rejection());
        assert_eq!(net.status(), None);
        assert!(!GridError::Cancelled.is_rejection());
    }
}
