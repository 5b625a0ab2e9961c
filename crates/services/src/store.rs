use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use storage::repository::BlobRepository;
use study_core::model::{Session, SessionPatch};
use study_core::reducer::{Action, reduce};
use tokio::sync::{Mutex as AsyncMutex, OnceCell};
use tracing::{debug, info, warn};

/// Key under which the persistent session snapshot is stored.
pub const SESSION_STORAGE_KEY: &str = "study-timer-session";

/// Shared owner of the current [`Session`].
///
/// Every change goes through [`SessionStore::dispatch`]. Persistent fields are
/// written back to durable storage after each change, but only once
/// [`SessionStore::hydrate`] has run, so a fresh default session never
/// overwrites a stored one.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    state: Mutex<Session>,
    blobs: Arc<dyn BlobRepository>,
    hydration: OnceCell<()>,
    hydrated: AtomicBool,
    last_written: AsyncMutex<Option<String>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(blobs: Arc<dyn BlobRepository>) -> Self {
        Self::with_session(blobs, Session::new())
    }

    #[must_use]
    pub fn with_session(blobs: Arc<dyn BlobRepository>, session: Session) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(session),
                blobs,
                hydration: OnceCell::new(),
                hydrated: AtomicBool::new(false),
                last_written: AsyncMutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.lock_state().clone()
    }

    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.lock_state().epoch()
    }

    #[must_use]
    pub fn is_hydrated(&self) -> bool {
        self.inner.hydrated.load(Ordering::Acquire)
    }

    /// Apply `action` and persist the result if durable fields changed.
    pub async fn dispatch(&self, action: Action) -> Session {
        let (next, persist) = {
            let mut state = self.lock_state();
            let next = reduce(&state, action);
            let persist = state.persisted() != next.persisted();
            *state = next.clone();
            (next, persist)
        };

        if persist && self.is_hydrated() {
            self.flush().await;
        }
        next
    }

    /// Load the stored snapshot once and merge it into the current session.
    ///
    /// The store counts as hydrated afterwards even when nothing could be
    /// read, so later changes are persisted again.
    pub async fn hydrate(&self) -> Session {
        self.inner
            .hydration
            .get_or_init(|| async {
                if let Some(patch) = self.read_snapshot().await {
                    let mut state = self.lock_state();
                    *state = reduce(&state, Action::Hydrate(patch));
                    info!(
                        questions = state.questions().len(),
                        answers = state.answers().len(),
                        "session hydrated"
                    );
                }
                self.inner.hydrated.store(true, Ordering::Release);
            })
            .await;
        self.snapshot()
    }

    /// Write the latest persistent snapshot unless it matches the last write.
    pub async fn flush(&self) {
        let mut last_written = self.inner.last_written.lock().await;
        let snapshot = self.snapshot().persisted();
        let payload = match serde_json::to_string(&snapshot) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "failed to serialize session snapshot");
                return;
            }
        };
        if last_written.as_deref() == Some(payload.as_str()) {
            return;
        }
        match self
            .inner
            .blobs
            .write_blob(SESSION_STORAGE_KEY, &payload)
            .await
        {
            Ok(()) => {
                debug!(bytes = payload.len(), "session snapshot written");
                *last_written = Some(payload);
            }
            Err(err) => warn!(error = %err, "failed to persist session snapshot"),
        }
    }

    async fn read_snapshot(&self) -> Option<SessionPatch> {
        let raw = match self.inner.blobs.read_blob(SESSION_STORAGE_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("no stored session snapshot");
                return None;
            }
            Err(err) => {
                warn!(error = %err, "failed to read stored session");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(patch) => Some(patch),
            Err(err) => {
                warn!(error = %err, "ignoring unreadable stored session");
                None
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, Session> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
