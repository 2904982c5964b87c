//! Registry of live sessions keyed by username

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use chatline_common::protocol::Presence;
use chatline_common::validators::{self, UsernameError, username_key};
use tokio::sync::RwLock;

use super::session::{NewSessionParams, Session};

/// Error returned when registering a session fails
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    /// A live session already holds this username
    AlreadyConnected,
    /// The username failed validation
    InvalidUsername(UsernameError),
}

impl fmt::Display for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterError::AlreadyConnected => write!(f, "user is already connected"),
            RegisterError::InvalidUsername(e) => write!(f, "invalid username: {}", e),
        }
    }
}

impl std::error::Error for RegisterError {}

/// The authoritative set of connected users
///
/// Keys are [`username_key`]s. Every operation takes the lock for its
/// whole duration, so observers never see a half-applied change, and no
/// operation awaits anything while holding it.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    next_id: Arc<AtomicU32>,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU32::new(1)),
        }
    }

    /// Register a session for `username`
    ///
    /// A stale entry (closed, or whose sink is gone) is replaced; a live one
    /// is left untouched and the call fails.
    pub async fn register(&self, params: NewSessionParams) -> Result<Session, RegisterError> {
        validators::validate_username(&params.username).map_err(RegisterError::InvalidUsername)?;

        let key = username_key(&params.username);
        let mut sessions = self.sessions.write().await;

        if sessions.get(&key).is_some_and(Session::is_alive) {
            return Err(RegisterError::AlreadyConnected);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let session = Session::new(id, params);
        sessions.insert(key, session.clone());
        Ok(session)
    }

    /// Remove whatever session holds `username`
    ///
    /// Removing an absent username is a no-op.
    pub async fn unregister(&self, username: &str) -> Option<Session> {
        self.sessions.write().await.remove(&username_key(username))
    }

    /// Remove `session` if it is still the registered one for its username
    ///
    /// Leaves a newer session under the same name alone.
    pub async fn remove_session(&self, session: &Session) -> bool {
        let key = username_key(&session.username);
        let mut sessions = self.sessions.write().await;
        if sessions.get(&key).is_some_and(|s| s.id == session.id) {
            sessions.remove(&key);
            true
        } else {
            false
        }
    }

    /// Look up a session by username (case-insensitive)
    pub async fn lookup(&self, username: &str) -> Option<Session> {
        self.sessions
            .read()
            .await
            .get(&username_key(username))
            .cloned()
    }

    /// Live sessions in registration order
    ///
    /// Sessions already marked closed are left out.
    pub async fn snapshot(&self) -> Vec<Session> {
        let mut live: Vec<Session> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.is_alive())
            .cloned()
            .collect();
        live.sort_by_key(|s| s.id);
        live
    }

    /// Set a user's presence, returning `false` if they are not registered
    pub async fn set_presence(&self, username: &str, presence: Presence) -> bool {
        match self
            .sessions
            .write()
            .await
            .get_mut(&username_key(username))
        {
            Some(session) => {
                session.presence = presence;
                true
            }
            None => false,
        }
    }

    /// Set `session`'s presence if it is still the registered one for its username
    ///
    /// A stale session left over from a replaced connection changes nothing.
    pub async fn set_presence_for(&self, session: &Session, presence: Presence) -> bool {
        let key = username_key(&session.username);
        match self.sessions.write().await.get_mut(&key) {
            Some(current) if current.id == session.id => {
                current.presence = presence;
                true
            }
            _ => false,
        }
    }

    /// Number of registered sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no sessions are registered
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drop every entry, returning what was removed
    pub async fn clear(&self) -> Vec<Session> {
        let mut sessions = self.sessions.write().await;
        let mut removed: Vec<Session> = sessions.drain().map(|(_, s)| s).collect();
        removed.sort_by_key(|s| s.id);
        removed
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use tokio::sync::mpsc;

    use super::*;

    fn params(username: &str) -> (NewSessionParams, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(8);
        (
            NewSessionParams {
                username: username.to_string(),
                address: "127.0.0.1:40000".parse().unwrap(),
                sink: tx,
            },
            rx,
        )
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let registry = SessionRegistry::new();
        let (p, _rx) = params("alice");
        let session = registry.register(p).await.unwrap();

        let found = registry.lookup("ALICE").await.unwrap();
        assert_eq!(found.id, session.id);
        assert_eq!(found.username, "alice");
        assert_eq!(found.presence, Presence::Available);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_live_session_rejected() {
        let registry = SessionRegistry::new();
        let (p1, _rx1) = params("alice");
        let first = registry.register(p1).await.unwrap();

        let (p2, _rx2) = params("Alice");
        assert_eq!(
            registry.register(p2).await.unwrap_err(),
            RegisterError::AlreadyConnected
        );
        assert_eq!(registry.lookup("alice").await.unwrap().id, first.id);
    }

    #[tokio::test]
    async fn test_stale_session_replaced() {
        let registry = SessionRegistry::new();
        let (p1, rx1) = params("alice");
        let first = registry.register(p1).await.unwrap();
        drop(rx1);

        let (p2, _rx2) = params("alice");
        let second = registry.register(p2).await.unwrap();
        assert_ne!(first.id, second.id);

        // The old handler's cleanup must not remove the new session
        assert!(!registry.remove_session(&first).await);
        assert_eq!(registry.lookup("alice").await.unwrap().id, second.id);
    }

    #[tokio::test]
    async fn test_invalid_username_rejected() {
        let registry = SessionRegistry::new();
        let (p, _rx) = params("");
        assert!(matches!(
            registry.register(p).await,
            Err(RegisterError::InvalidUsername(UsernameError::Empty))
        ));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_unregister_idempotent() {
        let registry = SessionRegistry::new();
        let (p, _rx) = params("bob");
        registry.register(p).await.unwrap();

        assert!(registry.unregister("BOB").await.is_some());
        assert!(registry.unregister("bob").await.is_none());
        assert!(registry.lookup("bob").await.is_none());
    }

    #[tokio::test]
    async fn test_snapshot_ordered_and_skips_closed() {
        let registry = SessionRegistry::new();
        let mut receivers = Vec::new();
        for name in ["carol", "alice", "bob"] {
            let (p, rx) = params(name);
            registry.register(p).await.unwrap();
            receivers.push(rx);
        }

        let names: Vec<String> = registry
            .snapshot()
            .await
            .into_iter()
            .map(|s| s.username)
            .collect();
        assert_eq!(names, vec!["carol", "alice", "bob"]);

        registry.lookup("alice").await.unwrap().mark_closed();
        let names: Vec<String> = registry
            .snapshot()
            .await
            .into_iter()
            .map(|s| s.username)
            .collect();
        assert_eq!(names, vec!["carol", "bob"]);
    }

    #[tokio::test]
    async fn test_set_presence() {
        let registry = SessionRegistry::new();
        let (p, _rx) = params("alice");
        let session = registry.register(p).await.unwrap();

        assert!(registry.set_presence_for(&session, Presence::Busy).await);
        assert_eq!(
            registry.lookup("alice").await.unwrap().presence,
            Presence::Busy
        );

        assert!(registry.set_presence("ALICE", Presence::Available).await);
        assert!(!registry.set_presence("nobody", Presence::Busy).await);

        registry.unregister("alice").await;
        assert!(!registry.set_presence_for(&session, Presence::Busy).await);
    }

    #[tokio::test]
    async fn test_set_presence_for_ignores_replaced_session() {
        let registry = SessionRegistry::new();
        let (p1, rx1) = params("alice");
        let first = registry.register(p1).await.unwrap();
        drop(rx1);

        let (p2, _rx2) = params("alice");
        let second = registry.register(p2).await.unwrap();

        assert!(!registry.set_presence_for(&first, Presence::Busy).await);
        assert_eq!(
            registry.lookup("alice").await.unwrap().presence,
            Presence::Available
        );

        assert!(registry.set_presence_for(&second, Presence::Busy).await);
        assert_eq!(
            registry.lookup("alice").await.unwrap().presence,
            Presence::Busy
        );
    }

    #[tokio::test]
    async fn test_keys_fold_unicode_case() {
        let registry = SessionRegistry::new();
        let (p1, _rx1) = params("émile");
        let first = registry.register(p1).await.unwrap();

        assert_eq!(registry.lookup("ÉMILE").await.unwrap().id, first.id);
        let (p2, _rx2) = params("Émile");
        assert_eq!(
            registry.register(p2).await.unwrap_err(),
            RegisterError::AlreadyConnected
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_distinct_registrations() {
        let registry = SessionRegistry::new();
        let mut handles = Vec::new();
        for i in 0..32 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let (p, rx) = params(&format!("user{}", i));
                let result = registry.register(p).await;
                (result, rx)
            }));
        }

        let mut succeeded = HashSet::new();
        let mut receivers = Vec::new();
        for handle in handles {
            let (result, rx) = handle.await.unwrap();
            succeeded.insert(result.unwrap().username);
            receivers.push(rx);
        }

        let snapshot: Vec<String> = registry
            .snapshot()
            .await
            .into_iter()
            .map(|s| s.username)
            .collect();
        let unique: HashSet<String> = snapshot.iter().cloned().collect();
        assert_eq!(snapshot.len(), 32);
        assert_eq!(unique, succeeded);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_same_username_single_winner() {
        let registry = SessionRegistry::new();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let (p, rx) = params("dave");
                (registry.register(p).await, rx)
            }));
        }

        let mut wins = 0;
        let mut conflicts = 0;
        let mut receivers = Vec::new();
        for handle in handles {
            let (result, rx) = handle.await.unwrap();
            match result {
                Ok(_) => wins += 1,
                Err(RegisterError::AlreadyConnected) => conflicts += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
            receivers.push(rx);
        }
        assert_eq!(wins, 1);
        assert_eq!(conflicts, 7);
        assert_eq!(registry.snapshot().await.len(), 1);
    }
}
