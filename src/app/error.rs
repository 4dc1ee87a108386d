use thiserror::Error;

/// Transport-level failure talking to the catalog endpoint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// The server answered with a non-success status code.
    #[error("server responded with HTTP {0}")]
    Status(u16),
    /// The request never produced a response.
    #[error("{0}")]
    Transport(String),
}

// Errors are cloned to every caller joined on the same in-flight reload, so
// sources are flattened to messages instead of carried with #[from].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreprintError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Network error: {0}")]
    Network(NetworkError),

    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Paper not found: {0}")]
    PaperNotFound(String),

    #[error("Reload of {0} was abandoned before it finished")]
    Abandoned(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl PreprintError {
    /// Only network failures are worth retrying; everything else is
    /// deterministic for the same input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PreprintError::Network(_))
    }
}

impl From<reqwest::Error> for PreprintError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => PreprintError::Network(NetworkError::Status(status.as_u16())),
            None => PreprintError::Network(NetworkError::Transport(err.to_string())),
        }
    }
}

impl From<rusqlite::Error> for PreprintError {
    fn from(err: rusqlite::Error) -> Self {
        PreprintError::Store(err.to_string())
    }
}

impl From<rusqlite_migration::Error> for PreprintError {
    fn from(err: rusqlite_migration::Error) -> Self {
        PreprintError::Store(format!("migration failed: {}", err))
    }
}

impl From<url::ParseError> for PreprintError {
    fn from(err: url::ParseError) -> Self {
        PreprintError::InvalidQuery(err.to_string())
    }
}

impl From<std::io::Error> for PreprintError {
    fn from(err: std::io::Error) -> Self {
        PreprintError::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PreprintError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_network_errors_are_retryable() {
        assert!(PreprintError::Network(NetworkError::Status(503)).is_retryable());
        assert!(PreprintError::Network(NetworkError::Transport("reset".into())).is_retryable());
        assert!(!PreprintError::InvalidQuery("empty".into()).is_retryable());
        assert!(!PreprintError::FeedParse("bad xml".into()).is_retryable());
        assert!(!PreprintError::Store("locked".into()).is_retryable());
    }

    #[test]
    fn test_messages_are_human_readable() {
        assert_eq!(
            NetworkError::Transport("connection reset".into()).to_string(),
            "connection reset"
        );


        let err = PreprintError::Network(NetworkError::Status(503));
        assert_eq!(err.to_string(), "Network error: server responded with HTTP 503");

        let err = PreprintError::InvalidQuery("search text is empty".into());
        assert_eq!(err.to_string(), "Invalid query: search text is empty");
    }

    #[test]
    fn test_url_errors_map_to_invalid_query() {
        let err: PreprintError = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(err, PreprintError::InvalidQuery(_)));
    }
}
