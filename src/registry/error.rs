use thiserror::Error;

/// Reasons the external configuration could not be used. Always recoverable:
/// the registry keeps serving its previous (or built-in) snapshot.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("malformed config from {origin}: {source}")]
    Parse {
        origin: String,
        source: serde_yaml::Error,
    },

    #[error("config request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("config from {0} defines no usable predicates")]
    Empty(String),
}
