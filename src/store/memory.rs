use super::{UserRecord, UserStore};
use crate::auth::UserKind;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// In-memory record spaces, one map per user kind.
///
/// Built up front and read-only afterwards. The server always runs against
/// Postgres; this store backs the unit and HTTP test suites.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserStore {
    teachers: HashMap<String, UserRecord>,
    students: HashMap<String, UserRecord>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record to the space of `kind`, replacing any record with the same identifier.
    #[must_use]
    pub fn with_record(mut self, kind: UserKind, record: UserRecord) -> Self {
        self.insert(kind, record);
        self
    }

    pub fn insert(&mut self, kind: UserKind, record: UserRecord) {
        let space = match kind {
            UserKind::Teacher => &mut self.teachers,
            UserKind::Student => &mut self.students,
        };
        space.insert(record.identifier.clone(), record);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_one(&self, kind: UserKind, identifier: &str) -> Result<Option<UserRecord>> {
        let space = match kind {
            UserKind::Teacher => &self.teachers,
            UserKind::Student => &self.students,
        };
        Ok(space.get(identifier).cloned())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
