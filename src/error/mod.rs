use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// Malformed URL or request parameters
    InvalidRequest(String),
    UnsupportedUrl(String),
    IdentifierNotFound(String),
    /// Network-layer failure (connect, timeout, status, unreadable body)
    Transport(String),
    /// Response did not have the expected shape
    Decode(String),
    /// The platform answered with a non-zero status code
    Api { code: i64, message: String },
    NoStreamAvailable(String),
    Io(std::io::Error),
    /// External merge tool missing or failed
    MergeUnavailable(String),
    NotAuthenticated,
    NoCookiesFound,
    LoginExpired,
    LoginFailed(String),
    InvalidPageSelection(String),
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            Self::UnsupportedUrl(url) => write!(f, "Unsupported URL: {}", url),
            Self::IdentifierNotFound(what) => write!(f, "Could not find {} in URL", what),
            Self::Transport(msg) => write!(f, "Transport error: {}", msg),
            Self::Decode(msg) => write!(f, "Unexpected response: {}", msg),
            Self::Api { code, message } => write!(f, "API error {}: {}", code, message),
            Self::NoStreamAvailable(msg) => write!(f, "No stream available: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::MergeUnavailable(msg) => write!(f, "Merge unavailable: {}", msg),
            Self::NotAuthenticated => write!(
                f,
                "Not logged in. Please login first using: bili-dl login"
            ),
            Self::NoCookiesFound => write!(f, "No valid cookies found in file"),
            Self::LoginExpired => write!(f, "QR code expired, please run login again"),
            Self::LoginFailed(msg) => write!(f, "Login failed: {}", msg),
            Self::InvalidPageSelection(msg) => write!(f, "Invalid pages parameter: {}", msg),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
