use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
    #[error("unknown access level: {0}")]
    UnknownLevel(String),
    #[error("unknown system role: {0}")]
    UnknownSystemRole(String),
    #[error("unknown visibility scope: {0}")]
    UnknownScope(String),
    #[error("invalid capability key in {dimension}: {key:?}")]
    InvalidKey { dimension: &'static str, key: String },
}

pub type AuthzResult<T> = Result<T, AuthzError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_variants() {
        let errors = vec![
            AuthzError::UnknownLevel("owner".to_string()),
            AuthzError::UnknownSystemRole("root".to_string()),
            AuthzError::UnknownScope("mobile".to_string()),
            AuthzError::InvalidKey {
                dimension: "pages",
                key: " ".to_string(),
            },
        ];

        for error in errors {
            let rendered = error.to_string();
            assert!(!rendered.is_empty());
        }
    }
}
