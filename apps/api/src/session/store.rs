use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::session::model::{SessionContext, SessionSnapshot, SnapshotHandle};

pub type SharedSession = Arc<Mutex<SessionContext>>;

/// Why a session could not be handed out for mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAccessError {
    NotFound,
    /// A run currently holds the session.
    Busy,
}

#[derive(Clone)]
struct SessionEntry {
    context: SharedSession,
    snapshot: SnapshotHandle,
}

impl SessionEntry {
    fn touch(&self) {
        self.snapshot.send_modify(|s| s.last_active = Instant::now());
    }

    fn idle_for(&self) -> Duration {
        self.snapshot.borrow().last_active.elapsed()
    }
}

/// In-memory registry of live sessions.
///
/// Each session has its own lock; holding it is what makes a run exclusive. Reads go
/// through the published snapshot and never wait on that lock.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self) -> SessionSnapshot {
        let id = Uuid::new_v4();
        let context = SessionContext::new(id);
        let entry = SessionEntry {
            snapshot: context.snapshot_handle(),
            context: Arc::new(Mutex::new(context)),
        };
        let snapshot = entry.snapshot.borrow().clone();
        self.sessions.write().await.insert(id, entry);
        info!("Session {id} created");
        snapshot
    }

    async fn entry(&self, id: Uuid) -> Result<SessionEntry, SessionAccessError> {
        let entry = self
            .sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(SessionAccessError::NotFound)?;
        entry.touch();
        Ok(entry)
    }

    /// Latest published view of a session. Answers even while a run holds it.
    pub async fn snapshot(&self, id: Uuid) -> Result<SessionSnapshot, SessionAccessError> {
        let entry = self.entry(id).await?;
        let snapshot = entry.snapshot.borrow().clone();
        Ok(snapshot)
    }

    /// Locks a session for exclusive use without waiting. A session mid-run is `Busy`.
    pub async fn acquire(&self, id: Uuid) -> Result<OwnedMutexGuard<SessionContext>, SessionAccessError> {
        self.entry(id)
            .await?
            .context
            .try_lock_owned()
            .map_err(|_| SessionAccessError::Busy)
    }

    /// Empties a session under the same id.
    pub async fn reset(&self, id: Uuid) -> Result<SessionSnapshot, SessionAccessError> {
        let mut guard = self.acquire(id).await?;
        guard.reset();
        info!("Session {id} reset");
        Ok(guard.snapshot())
    }

    /// Discards a session. Refused while a run holds it.
    pub async fn remove(&self, id: Uuid) -> Result<(), SessionAccessError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get(&id).ok_or(SessionAccessError::NotFound)?;
        if entry.context.try_lock().is_err() {
            return Err(SessionAccessError::Busy);
        }
        sessions.remove(&id);
        info!("Session {id} discarded");
        Ok(())
    }

    /// Discards every session untouched for at least `ttl`. Sessions held by a run stay.
    pub async fn expire_idle(&self, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let expired = entry.context.try_lock().is_ok() && entry.idle_for() >= ttl;
            if expired {
                info!("Session {id} expired after {}s idle", entry.idle_for().as_secs());
            }
            !expired
        });
        before - sessions.len()
    }

    /// Sweeps idle sessions forever. Spawned once at startup.
    pub async fn run_expiry(self, ttl: Duration, every: Duration) {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let expired = self.expire_idle(ttl).await;
            if expired > 0 {
                info!("Expired {expired} idle session(s)");
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::WorkflowState;

    #[tokio::test]
    async fn test_create_and_get() {
        let store = SessionStore::new();
        let created = store.create().await;
        let snapshot = store.snapshot(created.id).await.unwrap();
        assert_eq!(snapshot.id, created.id);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_second_acquire_is_busy_while_first_is_held() {
        let store = SessionStore::new();
        let id = store.create().await.id;

        let held = store.acquire(id).await.unwrap();
        assert_eq!(store.acquire(id).await.err(), Some(SessionAccessError::Busy));
        assert_eq!(store.reset(id).await.err(), Some(SessionAccessError::Busy));
        assert_eq!(store.remove(id).await, Err(SessionAccessError::Busy));
        drop(held);

        assert!(store.acquire(id).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let store = SessionStore::new();
        let id = Uuid::new_v4();
        assert_eq!(store.acquire(id).await.err(), Some(SessionAccessError::NotFound));
        assert_eq!(store.remove(id).await, Err(SessionAccessError::NotFound));
        assert_eq!(store.snapshot(id).await.err(), Some(SessionAccessError::NotFound));
    }

    #[tokio::test]
    async fn test_reset_replaces_context_under_same_id() {
        let store = SessionStore::new();
        let id = store.create().await.id;
        {
            let mut guard = store.acquire(id).await.unwrap();
            guard.track_cost("anthropic", 0.5).unwrap();
            guard.transition(WorkflowState::ExtractingContext).unwrap();
            guard.transition(WorkflowState::Failed("boom".into())).unwrap();
        }

        let snapshot = store.reset(id).await.unwrap();
        assert_eq!(snapshot.cost.total, 0.0);

        let guard = store.acquire(id).await.unwrap();
        assert_eq!(guard.id(), id);
        assert_eq!(guard.state(), &WorkflowState::Idle);
        assert_eq!(guard.ledger().snapshot().total, 0.0);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let store = SessionStore::new();
        let a = store.create().await.id;
        let b = store.create().await.id;

        let held_a = store.acquire(a).await.unwrap();
        let mut guard_b = store.acquire(b).await.unwrap();
        guard_b.track_cost("anthropic", 1.0).unwrap();

        drop(held_a);
        let guard_a = store.acquire(a).await.unwrap();
        assert_eq!(guard_a.ledger().snapshot().total, 0.0);
    }

    #[tokio::test]
    async fn test_remove_discards() {
        let store = SessionStore::new();
        let id = store.create().await.id;
        store.remove(id).await.unwrap();
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_snapshot_is_readable_while_held() {
        let store = SessionStore::new();
        let id = store.create().await.id;

        let mut held = store.acquire(id).await.unwrap();
        held.transition(WorkflowState::ExtractingContext).unwrap();
        held.transition(WorkflowState::Generating).unwrap();

        let snapshot = store.snapshot(id).await.unwrap();
        assert_eq!(snapshot.state, WorkflowState::Generating);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_expire() {
        let store = SessionStore::new();
        let ttl = Duration::from_secs(3600);
        let stale = store.create().await.id;
        let touched = store.create().await.id;
        let running = store.create().await.id;
        let held = store.acquire(running).await.unwrap();

        tokio::time::advance(Duration::from_secs(1800)).await;
        store.snapshot(touched).await.unwrap();
        tokio::time::advance(Duration::from_secs(1800)).await;

        assert_eq!(store.expire_idle(ttl).await, 1);
        assert_eq!(store.snapshot(stale).await.err(), Some(SessionAccessError::NotFound));
        assert!(store.snapshot(touched).await.is_ok());
        assert!(store.snapshot(running).await.is_ok());

        drop(held);
        tokio::time::advance(Duration::from_secs(3600)).await;
        assert_eq!(store.expire_idle(ttl).await, 2);
        assert_eq!(store.len().await, 0);
    }
}
