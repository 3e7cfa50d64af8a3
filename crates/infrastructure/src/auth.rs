//! JWT 身份校验
//!
//! 配置了密钥时，`register_session` 必须携带由同一密钥签发的令牌，
//! 用户标识取自令牌的 `sub`，客户端声明的 `user_id` 只能与之相同。

use application::{ApplicationError, IdentityVerifier};
use chrono::Utc;
use domain::{RegistrationClaim, UserId};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: i64,
}

#[derive(Clone)]
pub struct JwtIdentityVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtIdentityVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// 签发令牌，供运维脚本与测试使用
    pub fn issue(&self, user_id: &UserId, ttl: chrono::Duration) -> Result<String, ApplicationError> {
        let claims = JwtClaims {
            sub: user_id.to_string(),
            exp: (Utc::now() + ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|err| ApplicationError::Authentication(format!("token generation failed: {err}")))
    }

    pub fn verify(&self, token: &str) -> Result<UserId, ApplicationError> {
        let data = decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map_err(|err| ApplicationError::Authentication(format!("invalid token: {err}")))?;
        UserId::parse(&data.claims.sub)
            .map_err(|err| ApplicationError::Authentication(format!("invalid subject: {err}")))
    }
}

impl IdentityVerifier for JwtIdentityVerifier {
    fn resolve(&self, claim: &RegistrationClaim) -> Result<UserId, ApplicationError> {
        let token = claim
            .token
            .as_deref()
            .ok_or_else(|| ApplicationError::Authentication("missing token".into()))?;
        let user_id = self.verify(token)?;

        if let Some(declared) = &claim.user_id {
            if declared != &user_id {
                tracing::warn!(declared = %declared, subject = %user_id, "声明的用户与令牌不符");
                return Err(ApplicationError::Authentication(
                    "user_id does not match token subject".into(),
                ));
            }
        }
        Ok(user_id)
    }
}
