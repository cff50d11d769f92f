use thiserror::Error;

/// Errors raised while loading or validating the configuration.
///
/// All of these are fatal: the process must not serve traffic with a
/// broken or incomplete configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config.toml or config.default.toml not found")]
    FileNotFound,

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    /// Required secret absent from both the config file and the environment.
    #[error("missing required credential: set the {0} environment variable")]
    MissingCredential(&'static str),

    #[error("chat.trigger must be a single ASCII letter, got {0:?}")]
    InvalidTrigger(String),

    #[error("invalid PORT value {0:?}")]
    InvalidPort(String),
}

/// Failure modes of the external track lookup.
///
/// An error-shaped response body (`{"errors": [...]}`) is not represented
/// here; the lookup client maps it to an empty result, per the API's
/// not-found convention.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("lookup request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("lookup returned HTTP {0}")]
    Status(u16),

    #[error("unexpected lookup response: {0}")]
    Decode(#[from] serde_json::Error),
}
