use std::fmt;

/// Failure taxonomy shared by every push component.
///
/// None of these are fatal: callers log them and fall back (absent avatar,
/// stub payload, empty index, "Message failed to send.").
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PushError {
    #[error("missing configuration: {0}")]
    ConfigMissing(&'static str),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("server rejected request: {0}")]
    ServerRejection(Rejection),
    #[error("unexpected http status {0}")]
    UnexpectedStatus(u16),
    #[error("malformed payload: {0}")]
    PayloadMalformed(String),
    #[error("notification index unreadable: {0}")]
    IndexCorrupt(String),
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("image failure: {0}")]
    Image(String),
}

impl PushError {
    /// Whether a stub acknowledgement should be attempted again after this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PushError::Transport(_) | PushError::UnexpectedStatus(_)
        )
    }
}

/// Statuses the server answers with when a request must not be repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Found,
    BadRequest,
    Unauthorized,
    Forbidden,
    InternalServerError,
    NotImplemented,
}

impl Rejection {
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            302 => Some(Rejection::Found),
            400 => Some(Rejection::BadRequest),
            401 => Some(Rejection::Unauthorized),
            403 => Some(Rejection::Forbidden),
            500 => Some(Rejection::InternalServerError),
            501 => Some(Rejection::NotImplemented),
            _ => None,
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            Rejection::Found => 302,
            Rejection::BadRequest => 400,
            Rejection::Unauthorized => 401,
            Rejection::Forbidden => 403,
            Rejection::InternalServerError => 500,
            Rejection::NotImplemented => 501,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::Found => "StatusFound",
            Rejection::BadRequest => "StatusBadRequest",
            Rejection::Unauthorized => "Unauthorized",
            Rejection::Forbidden => "Forbidden",
            Rejection::InternalServerError => "StatusInternalServerError",
            Rejection::NotImplemented => "StatusNotImplemented",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.reason(), self.status())
    }
}

impl From<reqwest::Error> for PushError {
    fn from(e: reqwest::Error) -> Self {
        PushError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for PushError {
    fn from(e: serde_json::Error) -> Self {
        PushError::PayloadMalformed(e.to_string())
    }
}

impl From<rusqlite::Error> for PushError {
    fn from(e: rusqlite::Error) -> Self {
        PushError::Storage(e.to_string())
    }
}

impl From<std::io::Error> for PushError {
    fn from(e: std::io::Error) -> Self {
        PushError::Storage(e.to_string())
    }
}

impl From<image::ImageError> for PushError {
    fn from(e: image::ImageError) -> Self {
        PushError::Image(e.to_string())
    }
}
