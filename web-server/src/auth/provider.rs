// web-server/src/auth/provider.rs
use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use siwe_common::models::session::{SessionData, SessionInfo, SiweClaims};
use siwe_common::seal::{SealError, SessionSealer};
use siwe_common::siwe::{verify_siwe_message, VerificationOptions};
use siwe_common::{truncate_address, Config};

use super::error::AuthError;
use crate::utils::token::generate_nonce;

/// Cookie a handler should attach to its response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub max_age: Duration,
    pub secure: bool,
}

impl SessionCookie {
    /// A zero max-age cookie tells the browser to drop the session
    pub fn is_removal(&self) -> bool {
        self.max_age <= Duration::zero()
    }

    pub fn into_cookie(self) -> Cookie<'static> {
        let removal = self.is_removal();
        let mut cookie = Cookie::build(self.name, self.value)
            .path("/")
            .secure(self.secure)
            .http_only(true)
            .same_site(SameSite::Strict)
            .max_age(CookieDuration::seconds(self.max_age.num_seconds().max(0)))
            .finish();
        if removal {
            // Also sets an Expires date in the past for clients ignoring Max-Age
            cookie.make_removal();
        }
        cookie
    }
}

#[derive(Debug, Clone)]
pub struct IssuedNonce {
    pub nonce: String,
    pub cookie: SessionCookie,
}

#[derive(Debug, Clone)]
pub struct VerifiedSession {
    pub session: SessionInfo,
    pub cookie: SessionCookie,
}

/// Sign-in session handling as seen by the request handlers.
///
/// Implementations receive the raw value of the session cookie, if the
/// request carried one, and hand back the cookie to set.
pub trait SessionProvider: Send + Sync {
    fn cookie_name(&self) -> &str;

    /// Start a sign-in attempt, replacing whatever session the browser had
    fn issue_nonce(&self) -> Result<IssuedNonce, AuthError>;

    /// Check a signed message against the pending nonce and authenticate
    fn verify(
        &self,
        session_cookie: Option<&str>,
        message: &str,
        signature: &str,
    ) -> Result<VerifiedSession, AuthError>;

    /// Claims of the current session; anonymous when absent or unreadable
    fn get_session(&self, session_cookie: Option<&str>) -> SessionInfo;

    fn destroy_session(&self) -> SessionCookie;
}

/// [`SessionProvider`] keeping all state in a sealed cookie
#[derive(Debug, Clone)]
pub struct CookieSessionProvider {
    sealer: SessionSealer,
    cookie_name: String,
    secure: bool,
    session_ttl: Duration,
    nonce_ttl: Duration,
    expected_domain: Option<String>,
}

impl CookieSessionProvider {
    pub fn from_config(config: &Config) -> Result<Self, SealError> {
        let sealer = SessionSealer::new(&config.session.password)?;
        let session_ttl =
            Duration::try_seconds(config.session.ttl_seconds).ok_or(SealError::TtlOutOfRange)?;
        let nonce_ttl =
            Duration::try_seconds(config.session.nonce_ttl_seconds).ok_or(SealError::TtlOutOfRange)?;
        Ok(Self {
            sealer,
            cookie_name: config.session.cookie_name.clone(),
            secure: config.session.secure_cookies,
            session_ttl,
            nonce_ttl,
            expected_domain: config.siwe.domain.clone(),
        })
    }

    fn cookie(&self, value: String, max_age: Duration) -> SessionCookie {
        SessionCookie {
            name: self.cookie_name.clone(),
            value,
            max_age,
            secure: self.secure,
        }
    }

    fn load(&self, session_cookie: Option<&str>) -> Result<SessionData, AuthError> {
        let sealed = session_cookie
            .filter(|v| !v.is_empty())
            .ok_or(AuthError::NoSession)?;
        self.sealer
            .unseal(sealed)
            .map_err(AuthError::SessionUnsealFailure)
    }
}

impl SessionProvider for CookieSessionProvider {
    fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    fn issue_nonce(&self) -> Result<IssuedNonce, AuthError> {
        let nonce = generate_nonce();
        let sealed = self
            .sealer
            .seal(&SessionData::with_nonce(nonce.clone()), self.nonce_ttl)
            .map_err(AuthError::Seal)?;

        tracing::debug!("Issued new SIWE nonce");
        Ok(IssuedNonce {
            nonce,
            cookie: self.cookie(sealed, self.nonce_ttl),
        })
    }

    fn verify(
        &self,
        session_cookie: Option<&str>,
        message: &str,
        signature: &str,
    ) -> Result<VerifiedSession, AuthError> {
        if message.trim().is_empty() || signature.trim().is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let session = self.load(session_cookie)?;
        let options = VerificationOptions {
            domain: self.expected_domain.clone(),
            time: Utc::now(),
        };
        let verified = verify_siwe_message(message, signature, &options)?;

        if session.pending_nonce() != Some(verified.nonce.as_str()) {
            tracing::warn!(
                "Nonce mismatch for {} (session state: {:?})",
                truncate_address(&verified.address.to_checksum(None)),
                session.state()
            );
            return Err(AuthError::NonceMismatch);
        }

        let authenticated = SessionData::authenticated(SiweClaims::from(&verified));
        let sealed = self
            .sealer
            .seal(&authenticated, self.session_ttl)
            .map_err(AuthError::Seal)?;

        let session = SessionInfo::from(&authenticated);
        tracing::info!(
            "Authenticated {} on chain {}",
            truncate_address(session.address.as_deref().unwrap_or_default()),
            verified.chain_id
        );

        Ok(VerifiedSession {
            session,
            cookie: self.cookie(sealed, self.session_ttl),
        })
    }

    fn get_session(&self, session_cookie: Option<&str>) -> SessionInfo {
        match self.load(session_cookie) {
            Ok(data) => SessionInfo::from(&data),
            Err(AuthError::NoSession) => SessionInfo::anonymous(),
            Err(e) => {
                tracing::debug!("Treating unreadable session as anonymous: {}", e);
                SessionInfo::anonymous()
            }
        }
    }

    fn destroy_session(&self) -> SessionCookie {
        self.cookie(String::new(), Duration::zero())
    }
}
