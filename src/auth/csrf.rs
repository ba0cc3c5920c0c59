use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::client::SessionToken;
use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Stateless CSRF tokens: HMAC-SHA256 of the backend session token under
/// a server secret. A token is valid for exactly as long as its session.
pub struct CsrfService {
    secret: Vec<u8>,
}

impl CsrfService {
    pub fn new(secret: &str) -> Self {
        Self { secret: secret.as_bytes().to_vec() }
    }

    /// Generate the CSRF token for a session
    pub fn generate_token(&self, session: &SessionToken) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AppError::Internal(format!("HMAC creation failed: {}", e)))?;
        mac.update(session.as_str().as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Validate a CSRF token for a session
    pub fn validate_token(&self, session: &SessionToken, token: &str) -> Result<bool> {
        let expected = self.generate_token(session)?;
        Ok(expected.as_bytes().ct_eq(token.trim().as_bytes()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_generation() {
        let csrf = CsrfService::new("secret");
        let token = csrf.generate_token(&SessionToken::new("abc")).unwrap();
        assert_eq!(token.len(), 64); // 32 bytes = 64 hex chars
        assert_eq!(token, csrf.generate_token(&SessionToken::new("abc")).unwrap());
    }

    #[test]
    fn test_token_bound_to_session_and_secret() {
        let csrf = CsrfService::new("secret");
        let session = SessionToken::new("abc");
        let token = csrf.generate_token(&session).unwrap();

        assert!(csrf.validate_token(&session, &token).unwrap());
        assert!(!csrf.validate_token(&SessionToken::new("other"), &token).unwrap());
        assert!(!CsrfService::new("rotated").validate_token(&session, &token).unwrap());
        assert!(!csrf.validate_token(&session, "").unwrap());
    }
}
