use domain::{RegistrationClaim, UserId};

use crate::error::ApplicationError;

/// 身份协作方：把注册凭据解析为可信的用户标识
pub trait IdentityVerifier: Send + Sync {
    fn resolve(&self, claim: &RegistrationClaim) -> Result<UserId, ApplicationError>;
}

/// 直接信任客户端声明的 user_id
#[derive(Debug, Default)]
pub struct TrustingVerifier;

impl IdentityVerifier for TrustingVerifier {
    fn resolve(&self, claim: &RegistrationClaim) -> Result<UserId, ApplicationError> {
        claim
            .user_id
            .clone()
            .ok_or_else(|| ApplicationError::malformed("register_session requires user_id"))
    }
}
