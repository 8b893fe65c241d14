use std::{collections::HashMap, sync::Arc};

use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{model::Template, selection::SelectionEngine};

/// One editing session: a loaded template and its selection.
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub created_at: OffsetDateTime,
    /// Last time a request touched the session; idle sessions expire from here.
    pub last_active: OffsetDateTime,
    pub engine: SelectionEngine,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session limit of {0} reached")]
    Full(usize),
}

/// In-memory sessions keyed by id. Each session is only touched under the write lock.
///
/// Sessions idle for longer than `idle_ttl` are swept whenever a new one is
/// created, so abandoned sessions never hold the store at its cap.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, Session>>>,
    max_sessions: usize,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(max_sessions: usize, idle_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            max_sessions,
            idle_ttl,
        }
    }

    pub async fn create(
        &self,
        template: Template,
    ) -> Result<(Uuid, OffsetDateTime), SessionError> {
        let now = OffsetDateTime::now_utc();
        let mut sessions = self.inner.write().await;
        self.sweep(&mut sessions, now);
        if sessions.len() >= self.max_sessions {
            warn!(max = self.max_sessions, "session store full");
            return Err(SessionError::Full(self.max_sessions));
        }

        let id = Uuid::new_v4();
        let categories = template.categories().len();
        let meals = template.meal_count();
        sessions.insert(
            id,
            Session {
                id,
                created_at: now,
                last_active: now,
                engine: SelectionEngine::new(template),
            },
        );
        info!(session_id = %id, categories, meals, "session created");
        Ok((id, now))
    }

    /// Run `f` against the session, or return `None` if it does not exist.
    pub async fn with_session<R>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut Session) -> R,
    ) -> Option<R> {
        let mut sessions = self.inner.write().await;
        let session = sessions.get_mut(&id)?;
        session.last_active = OffsetDateTime::now_utc();
        Some(f(session))
    }

    pub async fn read_session<R>(&self, id: Uuid, f: impl FnOnce(&Session) -> R) -> Option<R> {
        let sessions = self.inner.read().await;
        sessions.get(&id).map(f)
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.inner.write().await.remove(&id).is_some();
        debug!(session_id = %id, removed, "session discarded");
        removed
    }

    /// Drop every session idle since before `now - idle_ttl`. Returns how many went.
    pub async fn evict_idle(&self, now: OffsetDateTime) -> usize {
        let mut sessions = self.inner.write().await;
        self.sweep(&mut sessions, now)
    }

    /// Background sweep every `period`, for stores that see few creations.
    pub fn spawn_sweeper(&self, period: std::time::Duration) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                store.evict_idle(OffsetDateTime::now_utc()).await;
            }
        })
    }

    fn sweep(&self, sessions: &mut HashMap<Uuid, Session>, now: OffsetDateTime) -> usize {
        // A TTL reaching past the earliest representable time expires nothing.
        let Some(cutoff) = now.checked_sub(self.idle_ttl) else {
            return 0;
        };
        let before = sessions.len();
        sessions.retain(|_, s| s.last_active >= cutoff);
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, remaining = sessions.len(), "idle sessions expired");
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diet::model::{CategoryRecord, MealRecord};

    fn template() -> Template {
        Template::new(vec![CategoryRecord::new(
            "5",
            "Breakfast",
            vec![MealRecord::new("b1", "Oats")],
        )])
    }

    const HOUR: Duration = Duration::hours(1);

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = SessionStore::new(4, HOUR);
        let (a, _) = store.create(template()).await.unwrap();
        let (b, _) = store.create(template()).await.unwrap();

        let toggled = store
            .with_session(a, |s| s.engine.toggle_category("5"))
            .await
            .expect("session a exists");
        assert_eq!(toggled, Ok(true));

        let a_count = store.read_session(a, |s| s.engine.selected_count()).await;
        let b_count = store.read_session(b, |s| s.engine.selected_count()).await;
        assert_eq!(a_count, Some(1));
        assert_eq!(b_count, Some(0));
    }

    #[tokio::test]
    async fn store_respects_limit_and_removal() {
        let store = SessionStore::new(1, HOUR);
        let (id, _) = store.create(template()).await.unwrap();
        assert_eq!(store.create(template()).await, Err(SessionError::Full(1)));

        assert!(store.remove(id).await);
        assert!(!store.remove(id).await);
        assert!(store.with_session(id, |_| ()).await.is_none());
        assert!(store.create(template()).await.is_ok());
    }

    #[tokio::test]
    async fn abandoned_sessions_free_their_slot() {
        // Zero idle time: anything created before this instant is already stale.
        let store = SessionStore::new(2, Duration::ZERO);
        let (a, _) = store.create(template()).await.unwrap();
        let (b, _) = store.create(template()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let (c, _) = store.create(template()).await.expect("stale sessions are swept");
        assert!(store.read_session(a, |_| ()).await.is_none());
        assert!(store.read_session(b, |_| ()).await.is_none());
        assert!(store.read_session(c, |_| ()).await.is_some());
    }

    #[tokio::test]
    async fn active_sessions_outlive_idle_ones() {
        let store = SessionStore::new(4, HOUR);
        let (busy, created) = store.create(template()).await.unwrap();
        let (idle, _) = store.create(template()).await.unwrap();

        // Pretend the idle session was last used long ago.
        store
            .with_session(idle, |s| s.last_active = created - HOUR * 2)
            .await
            .unwrap();

        assert_eq!(store.evict_idle(OffsetDateTime::now_utc()).await, 1);
        assert!(store.read_session(busy, |_| ()).await.is_some());
        assert!(store.read_session(idle, |_| ()).await.is_none());
        assert_eq!(store.evict_idle(OffsetDateTime::now_utc()).await, 0);
    }
}
