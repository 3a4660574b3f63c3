//! Per-session dialect bookkeeping for the dispatcher.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use wdrelay_protocol::{Dialect, DialectTracker, DialectUpdate};

/// What the dispatcher remembers about one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    id: String,
    dialect: DialectTracker,
}

impl SessionRecord {
    /// Session id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Dialect the session's responses are shaped for, once known.
    #[must_use]
    pub const fn dialect(&self) -> Option<Dialect> {
        self.dialect.current()
    }
}

/// Sessions seen by the dispatcher, keyed by id.
///
/// Records appear when `createSession` succeeds, or lazily the first time a
/// command reveals a dialect for a session created elsewhere, and go away on
/// `deleteSession`.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl SessionRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a freshly created session and pins its dialect.
    ///
    /// Re-creating an id replaces the old record.
    pub fn insert(&self, id: &str, dialect: Option<Dialect>) -> DialectUpdate {
        let mut tracker = DialectTracker::new();
        let update = tracker.settle(dialect);
        self.write().insert(
            id.to_owned(),
            SessionRecord {
                id: id.to_owned(),
                dialect: tracker,
            },
        );
        update
    }

    /// Gives `dialect` to the session if it has none yet.
    pub fn adopt_dialect(&self, id: &str, dialect: Dialect) -> DialectUpdate {
        let mut sessions = self.write();
        let record = sessions
            .entry(id.to_owned())
            .or_insert_with(|| SessionRecord {
                id: id.to_owned(),
                dialect: DialectTracker::new(),
            });
        record.dialect.adopt(dialect)
    }

    /// Dialect recorded for `id`.
    #[must_use]
    pub fn dialect(&self, id: &str) -> Option<Dialect> {
        self.read().get(id).and_then(SessionRecord::dialect)
    }

    /// Snapshot of the record for `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<SessionRecord> {
        self.read().get(id).cloned()
    }

    /// Forgets `id`, returning its last record.
    pub fn remove(&self, id: &str) -> Option<SessionRecord> {
        self.write().remove(id)
    }

    /// Whether a record exists for `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.read().contains_key(id)
    }

    /// Number of recorded sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether no sessions are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, SessionRecord>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, SessionRecord>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}
