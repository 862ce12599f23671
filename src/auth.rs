use std::sync::Arc;

use bcrypt::{hash, verify};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::AuthError;
use crate::models::{Claims, Identity};
use crate::storage::IdentityDirectory;

/// Lifetime of an issued session token.
pub const SESSION_TTL_SECS: i64 = 24 * 60 * 60;

pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    hash(password, cost)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password, hash)
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// A signed token together with the claims it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionToken {
    pub token: String,
    pub claims: Claims,
}

impl SessionToken {
    pub fn expires_at(&self) -> i64 {
        self.claims.exp
    }
}

/// Verifies credentials and issues/validates stateless HS256 session tokens.
pub struct SessionAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    directory: Arc<dyn IdentityDirectory>,
    /// Verified against when the email is unknown, so both failure paths pay
    /// for one bcrypt comparison.
    decoy_hash: String,
}

impl SessionAuthority {
    pub fn new(
        secret: &[u8],
        directory: Arc<dyn IdentityDirectory>,
        bcrypt_cost: u32,
    ) -> Result<Self, bcrypt::BcryptError> {
        let decoy_hash = hash_password(&Uuid::new_v4().to_string(), bcrypt_cost)?;

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against an explicit clock in validate_at.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            directory,
            decoy_hash,
        })
    }

    pub fn authenticate(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<SessionToken, AuthError> {
        self.authenticate_at(email, password, now_secs())
    }

    pub fn authenticate_at(
        &self,
        email: Option<&str>,
        password: Option<&str>,
        now: i64,
    ) -> Result<SessionToken, AuthError> {
        let (email, password) = match (email, password) {
            (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
                (email, password)
            }
            _ => return Err(AuthError::MalformedRequest),
        };

        let identity = self.directory.find_identity_by_email(email).map_err(|e| {
            error!("identity lookup failed: {}", e);
            AuthError::Directory(e.to_string())
        })?;

        let Some(identity) = identity else {
            let _ = verify_password(password, &self.decoy_hash);
            warn!("login rejected");
            return Err(AuthError::InvalidCredentials);
        };

        match verify_password(password, &identity.password_hash) {
            Ok(true) => {}
            Ok(false) => {
                warn!("login rejected");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                error!(subject = %identity.subject_id, "stored password hash unreadable: {}", e);
                return Err(AuthError::InvalidCredentials);
            }
        }

        let session = self.issue(&identity, now)?;
        info!(subject = %identity.subject_id, tenant = identity.tenant_id, "session issued");
        Ok(session)
    }

    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        self.validate_at(token, now_secs())
    }

    /// Decode and check a token against `now` (unix seconds). No side effects.
    pub fn validate_at(&self, token: &str, now: i64) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|_| AuthError::InvalidSession)?;
        let claims = data.claims;
        if claims.iat > now || claims.exp <= claims.iat {
            return Err(AuthError::InvalidSession);
        }
        if now >= claims.exp {
            return Err(AuthError::ExpiredSession);
        }
        Ok(claims)
    }

    pub fn refresh(&self, token: &str) -> Result<SessionToken, AuthError> {
        self.refresh_at(token, now_secs())
    }

    /// Reissue a still-valid token with a fresh 24-hour window.
    pub fn refresh_at(&self, token: &str, now: i64) -> Result<SessionToken, AuthError> {
        let claims = self.validate_at(token, now)?;
        self.sign(Claims {
            iat: now,
            exp: now + SESSION_TTL_SECS,
            jti: Uuid::new_v4().to_string(),
            ..claims
        })
    }

    fn issue(&self, identity: &Identity, now: i64) -> Result<SessionToken, AuthError> {
        self.sign(Claims {
            sub: identity.subject_id.clone(),
            name: identity.display_name.clone(),
            tenant_id: identity.tenant_id,
            iat: now,
            exp: now + SESSION_TTL_SECS,
            jti: Uuid::new_v4().to_string(),
        })
    }

    fn sign(&self, claims: Claims) -> Result<SessionToken, AuthError> {
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))?;
        Ok(SessionToken { token, claims })
    }
}

/// Client-side session lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticated(SessionToken),
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    /// On failure the state is left unauthenticated.
    pub fn login(
        &mut self,
        authority: &SessionAuthority,
        email: &str,
        password: &str,
        now: i64,
    ) -> Result<Claims, AuthError> {
        *self = SessionState::Unauthenticated;
        let session = authority.authenticate_at(Some(email), Some(password), now)?;
        let claims = session.claims.clone();
        *self = SessionState::Authenticated(session);
        Ok(claims)
    }

    pub fn logout(&mut self) {
        *self = SessionState::Unauthenticated;
    }

    /// Current claims, dropping back to unauthenticated once the token no
    /// longer validates at `now`.
    pub fn claims_at(&mut self, authority: &SessionAuthority, now: i64) -> Option<Claims> {
        let SessionState::Authenticated(session) = self else {
            return None;
        };
        match authority.validate_at(&session.token, now) {
            Ok(claims) => Some(claims),
            Err(_) => {
                *self = SessionState::Unauthenticated;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    const COST: u32 = 4;
    const T0: i64 = 1_710_000_000;

    struct OneIdentity(Identity);

    impl IdentityDirectory for OneIdentity {
        fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
            Ok((self.0.email == email).then(|| self.0.clone()))
        }
    }

    fn admin(password_hash: String) -> Identity {
        Identity {
            subject_id: "1".to_string(),
            email: "admin@construcao.com".to_string(),
            password_hash,
            display_name: "Administrador".to_string(),
            tenant_id: 1,
        }
    }

    fn authority_with_secret(secret: &[u8]) -> SessionAuthority {
        let identity = admin(hash_password("admin123", COST).unwrap());
        SessionAuthority::new(secret, Arc::new(OneIdentity(identity)), COST).unwrap()
    }

    fn authority() -> SessionAuthority {
        authority_with_secret(b"test-secret")
    }

    #[test]
    fn correct_credentials_issue_a_day_long_token() {
        let auth = authority();
        let session = auth
            .authenticate_at(Some("admin@construcao.com"), Some("admin123"), T0)
            .unwrap();
        assert_eq!(session.claims.exp - session.claims.iat, 86_400);
        assert_eq!(session.expires_at(), T0 + 86_400);

        let claims = auth.validate_at(&session.token, T0).unwrap();
        assert_eq!(claims.sub, "1");
        assert_eq!(claims.tenant_id, 1);
        assert_eq!(claims.name, "Administrador");
    }

    #[test]
    fn unknown_email_and_wrong_password_are_indistinguishable() {
        let auth = authority();
        let unknown = auth
            .authenticate_at(Some("nobody@construcao.com"), Some("admin123"), T0)
            .unwrap_err();
        let wrong = auth
            .authenticate_at(Some("admin@construcao.com"), Some("admin124"), T0)
            .unwrap_err();
        assert_eq!(unknown, AuthError::InvalidCredentials);
        assert_eq!(unknown, wrong);
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[test]
    fn unreadable_stored_hash_is_rejected_like_a_wrong_password() {
        let identity = admin("not-bcrypt".to_string());
        let auth = SessionAuthority::new(b"test-secret", Arc::new(OneIdentity(identity)), COST).unwrap();
        assert_eq!(
            auth.authenticate_at(Some("admin@construcao.com"), Some("admin123"), T0)
                .unwrap_err(),
            AuthError::InvalidCredentials
        );
    }

    #[test]
    fn email_is_matched_exactly() {
        let auth = authority();
        assert_eq!(
            auth.authenticate_at(Some(" admin@construcao.com "), Some("admin123"), T0)
                .unwrap_err(),
            AuthError::InvalidCredentials
        );
    }

    #[test]
    fn missing_fields_are_malformed() {
        let auth = authority();
        assert_eq!(
            auth.authenticate_at(None, Some("admin123"), T0).unwrap_err(),
            AuthError::MalformedRequest
        );
        assert_eq!(
            auth.authenticate_at(Some("admin@construcao.com"), None, T0).unwrap_err(),
            AuthError::MalformedRequest
        );
        assert_eq!(
            auth.authenticate_at(Some("  "), Some(""), T0).unwrap_err(),
            AuthError::MalformedRequest
        );
    }

    #[test]
    fn token_expires_after_a_day() {
        let auth = authority();
        let session = auth
            .authenticate_at(Some("admin@construcao.com"), Some("admin123"), T0)
            .unwrap();
        assert!(auth.validate_at(&session.token, T0 + 86_399).is_ok());
        assert_eq!(
            auth.validate_at(&session.token, T0 + 86_401).unwrap_err(),
            AuthError::ExpiredSession
        );
    }

    #[test]
    fn tampered_or_foreign_tokens_are_invalid() {
        let auth = authority();
        let session = auth
            .authenticate_at(Some("admin@construcao.com"), Some("admin123"), T0)
            .unwrap();

        let (signed, signature) = session.token.rsplit_once('.').unwrap();
        let first = if signature.starts_with('A') { "B" } else { "A" };
        let tampered = format!("{}.{}{}", signed, first, &signature[1..]);
        assert_eq!(auth.validate_at(&tampered, T0).unwrap_err(), AuthError::InvalidSession);
        assert_eq!(auth.validate_at("not-a-token", T0).unwrap_err(), AuthError::InvalidSession);

        let other = authority_with_secret(b"another-secret");
        assert_eq!(
            other.validate_at(&session.token, T0).unwrap_err(),
            AuthError::InvalidSession
        );
    }

    #[test]
    fn token_from_the_future_is_invalid() {
        let auth = authority();
        let session = auth
            .authenticate_at(Some("admin@construcao.com"), Some("admin123"), T0)
            .unwrap();
        assert_eq!(
            auth.validate_at(&session.token, T0 - 10).unwrap_err(),
            AuthError::InvalidSession
        );
    }

    #[test]
    fn refresh_extends_the_window() {
        let auth = authority();
        let session = auth
            .authenticate_at(Some("admin@construcao.com"), Some("admin123"), T0)
            .unwrap();
        let later = T0 + 80_000;
        let refreshed = auth.refresh_at(&session.token, later).unwrap();
        assert_eq!(refreshed.claims.exp, later + SESSION_TTL_SECS);
        assert_eq!(refreshed.claims.sub, session.claims.sub);
        assert_ne!(refreshed.claims.jti, session.claims.jti);
        assert!(auth.validate_at(&refreshed.token, T0 + 90_000).is_ok());

        assert_eq!(
            auth.refresh_at(&session.token, T0 + 86_400).unwrap_err(),
            AuthError::ExpiredSession
        );
    }

    #[test]
    fn session_state_transitions() {
        let auth = authority();
        let mut state = SessionState::default();
        assert!(!state.is_authenticated());

        assert!(state.login(&auth, "admin@construcao.com", "wrong", T0).is_err());
        assert_eq!(state, SessionState::Unauthenticated);

        let tenant = state
            .login(&auth, "admin@construcao.com", "admin123", T0)
            .unwrap()
            .tenant_id;
        assert_eq!(tenant, 1);
        assert!(state.claims_at(&auth, T0 + 60).is_some());

        state.logout();
        assert!(state.claims_at(&auth, T0 + 60).is_none());

        state.login(&auth, "admin@construcao.com", "admin123", T0).unwrap();
        assert!(state.claims_at(&auth, T0 + 86_401).is_none());
        assert!(!state.is_authenticated());
    }
}
