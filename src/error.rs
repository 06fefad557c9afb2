//! Unified request-failure model and HTTP mapping helpers.
//! Every terminal outcome of the dispatch pipeline (token rejection, denied
//! permission, hook cancellation, storage failure, unsupported method) is
//! expressed as a `RestError` before it becomes a response.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RestError {
    /// Bad or missing access token, denied permission, or hook cancellation.
    Unauthorized { message: String },
    /// No endpoint is attached under the requested collection name.
    NotFound { message: String },
    /// The storage backend reported a failure; the message is sent verbatim.
    Storage { message: String },
    /// The HTTP method has no handler at this scope.
    NotImplemented { message: String },
}

impl RestError {
    pub fn message(&self) -> &str {
        match self {
            RestError::Unauthorized { message }
            | RestError::NotFound { message }
            | RestError::Storage { message }
            | RestError::NotImplemented { message } => message.as_str(),
        }
    }

    pub fn unauthorized() -> Self { RestError::Unauthorized { message: "Unauthorized".into() } }
    pub fn not_found() -> Self { RestError::NotFound { message: "Not Found".into() } }
    pub fn storage<S: Into<String>>(msg: S) -> Self { RestError::Storage { message: msg.into() } }
    pub fn not_implemented() -> Self { RestError::NotImplemented { message: "Not Implemented".into() } }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            RestError::Unauthorized { .. } => 401,
            RestError::NotFound { .. } => 404,
            RestError::Storage { .. } => 500,
            RestError::NotImplemented { .. } => 501,
        }
    }
}

impl Display for RestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.http_status(), self.message())
    }
}

impl std::error::Error for RestError {}

impl From<crate::store::StoreError> for RestError {
    fn from(err: crate::store::StoreError) -> Self {
        RestError::storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(RestError::unauthorized().http_status(), 401);
        assert_eq!(RestError::not_found().http_status(), 404);
        assert_eq!(RestError::storage("disk on fire").http_status(), 500);
        assert_eq!(RestError::not_implemented().http_status(), 501);
    }

    #[test]
    fn canonical_messages() {
        assert_eq!(RestError::unauthorized().message(), "Unauthorized");
        assert_eq!(RestError::not_found().message(), "Not Found");
        assert_eq!(RestError::not_implemented().message(), "Not Implemented");
        assert_eq!(RestError::storage("boom").message(), "boom");
    }
}
