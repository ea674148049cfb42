use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use tallyboard_core::session::{Session, SessionToken};

/// Server-side record of authenticated sessions.
///
/// Keyed by the SHA-256 digest of the token; the raw token only ever lives
/// in the client's cookie. Entries are dropped on logout or when found
/// expired.
#[derive(Clone)]
pub struct SessionRegistry {
    issued: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(session_days: u32) -> Self {
        Self {
            issued: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::days(i64::from(session_days.max(1))),
        }
    }

    /// Remember an authenticated session. Anonymous sessions are ignored.
    ///
    /// Expired entries are pruned on every call, so tokens that are never
    /// presented again do not accumulate.
    pub async fn remember(&self, session: &Session) {
        let Session::Authenticated { token, since } = session else {
            return;
        };
        let now = Utc::now();
        let mut issued = self.issued.write().await;
        issued.insert(token.digest(), *since);
        issued.retain(|_, since| now - *since < self.ttl);
    }

    /// Rebuild the session state for a presented cookie value.
    pub async fn resolve(&self, raw_token: Option<&str>) -> Session {
        let Some(raw) = raw_token.filter(|t| !t.is_empty()) else {
            return Session::Anonymous;
        };
        let token = SessionToken::from_raw(raw);
        let digest = token.digest();

        let since = self.issued.read().await.get(&digest).copied();
        match since {
            Some(since) if Utc::now() - since < self.ttl => Session::Authenticated { token, since },
            Some(_) => {
                self.issued.write().await.remove(&digest);
                Session::Anonymous
            }
            None => Session::Anonymous,
        }
    }

    /// Forget a token. Unknown tokens are a no-op.
    pub async fn forget(&self, raw_token: &str) {
        let digest = SessionToken::from_raw(raw_token).digest();
        self.issued.write().await.remove(&digest);
    }

    pub async fn len(&self) -> usize {
        self.issued.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tallyboard_core::session::Credentials;

    fn creds() -> Credentials {
        Credentials {
            email: "admin@example.com".to_string(),
            password: "pw".to_string(),
        }
    }

    #[tokio::test]
    async fn remembered_session_resolves_until_forgotten() {
        let registry = SessionRegistry::new(7);
        let session = Session::Anonymous.login(&creds()).expect("login");
        registry.remember(&session).await;

        let raw = session.require().expect("token").as_str().to_string();
        assert!(registry.resolve(Some(&raw)).await.is_authenticated());

        registry.forget(&raw).await;
        assert!(!registry.resolve(Some(&raw)).await.is_authenticated());
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn expired_session_is_anonymous_and_evicted() {
        let registry = SessionRegistry::new(1);
        let token = SessionToken::from_raw("old");
        let session = Session::Authenticated {
            token,
            since: Utc::now() - Duration::days(2),
        };
        registry.remember(&session).await;
        assert_eq!(registry.resolve(Some("old")).await, Session::Anonymous);
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn abandoned_expired_sessions_are_pruned_on_login() {
        let registry = SessionRegistry::new(1);
        for raw in ["stale-1", "stale-2"] {
            registry.issued.write().await.insert(
                SessionToken::from_raw(raw).digest(),
                Utc::now() - Duration::days(3),
            );
        }
        assert_eq!(registry.len().await, 2);

        let fresh = Session::Anonymous.login(&creds()).expect("login");
        registry.remember(&fresh).await;
        assert_eq!(registry.len().await, 1);
        let raw = fresh.require().expect("token").as_str().to_string();
        assert!(registry.resolve(Some(&raw)).await.is_authenticated());
    }

    #[tokio::test]
    async fn missing_cookie_is_anonymous() {
        let registry = SessionRegistry::new(7);
        assert_eq!(registry.resolve(None).await, Session::Anonymous);
        assert_eq!(registry.resolve(Some("")).await, Session::Anonymous);
    }
}
