use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::db::UserAccount;

/// Claims carried by the short-lived access token. Stateless: nothing
/// here is persisted server-side.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub email: String,
    pub name: String,
    /// Role code, e.g. "ADMIN"
    pub profile: String,
    /// Role level (lower = more privileged)
    pub level: i32,
    pub company_id: Option<i32>,
    /// Issued at
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
}

#[derive(Clone)]
pub struct AccessTokenSigner {
    secret: String,
    ttl_minutes: i64,
}

impl AccessTokenSigner {
    #[must_use]
    pub const fn new(secret: String, ttl_minutes: i64) -> Self {
        Self {
            secret,
            ttl_minutes,
        }
    }

    pub fn sign(&self, user: &UserAccount) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            name: user.name.clone(),
            profile: user.profile_code.clone(),
            level: user.profile_level,
            company_id: user.company_id,
            iat: now.timestamp(),
            exp: (now + Duration::minutes(self.ttl_minutes)).timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;

        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )?;

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> UserAccount {
        UserAccount {
            id: 7,
            email: "maria@empresa.com".to_string(),
            name: "Maria".to_string(),
            active: true,
            profile_code: "CONSULTOR".to_string(),
            profile_level: 2,
            company_id: Some(3),
            company_name: Some("Empresa Exemplo".to_string()),
        }
    }

    #[test]
    fn test_sign_carries_identity_claims() {
        let signer = AccessTokenSigner::new("test-secret".to_string(), 15);
        let token = signer.sign(&account()).unwrap();

        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.email, "maria@empresa.com");
        assert_eq!(claims.profile, "CONSULTOR");
        assert_eq!(claims.level, 2);
        assert_eq!(claims.company_id, Some(3));
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let signer = AccessTokenSigner::new("test-secret".to_string(), 15);
        let other = AccessTokenSigner::new("another-secret".to_string(), 15);

        let token = signer.sign(&account()).unwrap();
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let signer = AccessTokenSigner::new("test-secret".to_string(), 15);
        assert!(signer.verify("not-a-jwt").is_err());
    }
}
