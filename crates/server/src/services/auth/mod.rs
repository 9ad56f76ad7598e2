//! Admin authentication.
//!
//! A single admin identity is configured at start-up. Logging in yields a
//! signed token that every moderation request must present; nothing about the
//! session is stored server-side.

mod error;
mod token;

pub use error::AuthError;
pub use token::{AdminClaims, IssuedToken, TOKEN_TTL_HOURS, TokenSigner};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use secrecy::{ExposeSecret, SecretString};

use crate::config::AdminConfig;

/// Login and token verification for the configured admin.
#[derive(Clone)]
pub struct AdminGateway {
    username: String,
    password_hash: SecretString,
    signer: TokenSigner,
}

impl std::fmt::Debug for AdminGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminGateway")
            .field("username", &self.username)
            .field("password_hash", &"[REDACTED]")
            .field("signer", &self.signer)
            .finish()
    }
}

impl AdminGateway {
    /// Create a gateway from admin configuration.
    #[must_use]
    pub fn new(config: &AdminConfig) -> Self {
        Self {
            username: config.username.clone(),
            password_hash: config.password_hash.clone(),
            signer: TokenSigner::new(&config.jwt_secret),
        }
    }

    /// Check credentials and issue a token.
    ///
    /// The password is verified even when the username is wrong so both
    /// failures take the same path.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` on any mismatch.
    /// Returns `AuthError::TokenIssue` if signing fails.
    pub fn login(&self, username: &str, password: &str) -> Result<IssuedToken, AuthError> {
        let username_ok = username == self.username;
        let password_ok = verify_password(password, self.password_hash.expose_secret()).is_ok();

        if !(username_ok && password_ok) {
            tracing::warn!("Admin login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let issued = self.signer.issue()?;
        tracing::info!(expires_at = %issued.expires_at, "Admin logged in");
        Ok(issued)
    }

    /// Validate a token's signature and expiry.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenExpired` or `AuthError::InvalidToken`.
    pub fn verify(&self, token: &str) -> Result<AdminClaims, AuthError> {
        self.signer.verify(token)
    }

    /// Gate for admin operations: a token must be present and valid.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingToken` when no token was supplied, otherwise
    /// the error from [`Self::verify`].
    pub fn guard(&self, token: Option<&str>) -> Result<AdminClaims, AuthError> {
        let token = token.ok_or(AuthError::MissingToken)?;
        self.verify(token)
    }

    /// The signer used for tokens, for issuing tokens at a fixed time.
    #[must_use]
    pub const fn signer(&self) -> &TokenSigner {
        &self.signer
    }
}

/// Hash a password using Argon2id, producing a PHC string.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

/// Verify a password against a PHC hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AuthError::PasswordHash(e.to_string()))?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, Utc};
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    use super::*;

    const SECRET: &str = "k3J9x!Qz7pW2mR8vT4nY6bL1cF5hG0sD";

    fn gateway() -> AdminGateway {
        AdminGateway::new(&AdminConfig {
            username: "root".to_string(),
            password_hash: SecretString::from(hash_password("orbit-pass").unwrap()),
            jwt_secret: SecretString::from(SECRET),
        })
    }

    #[test]
    fn test_login_issues_verifiable_token() {
        let gateway = gateway();
        let issued = gateway.login("root", "orbit-pass").unwrap();

        let claims = gateway.verify(&issued.token).unwrap();
        assert_eq!(claims.role, orbit_core::Role::Admin);
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_HOURS * 3600);
    }

    #[test]
    fn test_login_failures_are_indistinguishable() {
        let gateway = gateway();

        for (user, pass) in [
            ("root", "wrong"),
            ("admin", "orbit-pass"),
            ("admin", "wrong"),
            ("", ""),
        ] {
            let err = gateway.login(user, pass).unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
            assert_eq!(err.client_message(), "Invalid credentials");
        }
    }

    #[test]
    fn test_expired_token_rejected() {
        let gateway = gateway();
        let issued = gateway
            .signer()
            .issue_at(Utc::now() - Duration::hours(25))
            .unwrap();

        assert!(matches!(
            gateway.verify(&issued.token),
            Err(AuthError::TokenExpired)
        ));
        assert!(matches!(
            gateway.guard(Some(&issued.token)),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn test_token_just_under_a_day_old_still_valid() {
        let gateway = gateway();
        let issued = gateway
            .signer()
            .issue_at(Utc::now() - Duration::hours(23))
            .unwrap();
        assert!(gateway.verify(&issued.token).is_ok());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let gateway = gateway();
        let mut token = gateway.login("root", "orbit-pass").unwrap().token;
        token.push('x');

        assert!(matches!(
            gateway.verify(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let other = TokenSigner::new(&SecretString::from("a-completely-different-secret-value!"));
        let issued = other.issue().unwrap();

        assert!(matches!(
            gateway().verify(&issued.token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_non_admin_role_rejected() {
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        let token = encode(
            &Header::default(),
            &json!({ "role": "viewer", "iat": 0, "exp": exp }),
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            gateway().verify(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_guard_without_token() {
        let err = gateway().guard(None).unwrap_err();
        assert!(matches!(err, AuthError::MissingToken));
        assert!(err.is_client_error());
    }
}
