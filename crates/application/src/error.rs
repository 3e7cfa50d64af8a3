use domain::{DomainError, SessionId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("session {0} is not registered")]
    NotRegistered(SessionId),
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("malformed request: {0}")]
    Malformed(String),
}

impl ApplicationError {
    pub fn malformed(message: impl Into<String>) -> Self {
        ApplicationError::Malformed(message.into())
    }

    /// 推送给客户端的错误码
    pub fn code(&self) -> &'static str {
        match self {
            ApplicationError::Domain(DomainError::PermissionDenied { .. }) => {
                "AUTHORIZATION_FAILED"
            }
            ApplicationError::Domain(_) | ApplicationError::Malformed(_) => "MALFORMED_REQUEST",
            ApplicationError::NotRegistered(_) => "NOT_REGISTERED",
            ApplicationError::Authentication(_) => "AUTHENTICATION_FAILED",
        }
    }
}
