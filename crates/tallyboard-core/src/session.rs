//! Dashboard session gate.
//!
//! A two-state machine: [`Session::Anonymous`] and
//! [`Session::Authenticated`], moved between by [`Session::login`] and
//! [`Session::logout`]. Any non-empty credentials are accepted; this is a
//! UI gate, not a security boundary.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("email and password are required")]
    MissingCredentials,

    #[error("not authenticated")]
    NotAuthenticated,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Opaque random session value handed to the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    /// 32 random bytes, hex encoded.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut buf = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut buf);
        Self(hex::encode(buf))
    }

    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// SHA-256 of the token; the only form kept server-side.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.0.as_bytes()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Anonymous,
    Authenticated {
        token: SessionToken,
        since: DateTime<Utc>,
    },
}

impl Session {
    /// Anonymous → Authenticated. Already-authenticated sessions are kept.
    pub fn login(self, credentials: &Credentials) -> Result<Session, SessionError> {
        if credentials.email.trim().is_empty() || credentials.password.is_empty() {
            return Err(SessionError::MissingCredentials);
        }
        match self {
            Session::Anonymous => Ok(Session::Authenticated {
                token: SessionToken::generate(),
                since: Utc::now(),
            }),
            authenticated @ Session::Authenticated { .. } => Ok(authenticated),
        }
    }

    /// Any state → Anonymous.
    pub fn logout(self) -> Session {
        Session::Anonymous
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated { .. })
    }

    /// The check run on every protected entry.
    pub fn require(&self) -> Result<&SessionToken, SessionError> {
        match self {
            Session::Authenticated { token, .. } => Ok(token),
            Session::Anonymous => Err(SessionError::NotAuthenticated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn login_then_logout_round_trips_states() {
        let session = Session::Anonymous
            .login(&creds("admin@talyabercy.com", "secret"))
            .expect("login");
        assert!(session.is_authenticated());
        assert_eq!(session.require().map(|t| t.as_str().len()), Ok(64));

        let session = session.logout();
        assert_eq!(session, Session::Anonymous);
        assert_eq!(session.require(), Err(SessionError::NotAuthenticated));
    }

    #[test]
    fn empty_credentials_are_rejected() {
        assert_eq!(
            Session::Anonymous.login(&creds("", "pw")),
            Err(SessionError::MissingCredentials)
        );
        assert_eq!(
            Session::Anonymous.login(&creds("a@b.c", "")),
            Err(SessionError::MissingCredentials)
        );
    }

    #[test]
    fn relogin_keeps_existing_token() {
        let first = Session::Anonymous.login(&creds("a@b.c", "x")).expect("login");
        let token = first.require().expect("token").clone();
        let second = first.login(&creds("a@b.c", "x")).expect("relogin");
        assert_eq!(second.require(), Ok(&token));
    }

    #[test]
    fn digest_is_stable_and_not_the_token() {
        let token = SessionToken::from_raw("abc");
        assert_eq!(token.digest(), token.digest());
        assert_ne!(token.digest(), "abc");
        assert_eq!(token.digest().len(), 64);
    }
}
