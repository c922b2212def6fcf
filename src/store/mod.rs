//! Document store collaborators.

use anyhow::Result;

use crate::record::StoredRecord;

pub mod supabase;

pub use supabase::SupabaseStore;

/// Write-only sink for embedded documents.
pub trait DocumentStore {
    /// Persists one record. Failures are reported as-is and never retried.
    fn insert(&self, record: &StoredRecord) -> Result<()>;

    /// Total number of rows in the backing table, when the store can tell.
    fn count(&self) -> Result<Option<u64>> {
        Ok(None)
    }
}

impl<T: DocumentStore + ?Sized> DocumentStore for &T {
    fn insert(&self, record: &StoredRecord) -> Result<()> {
        (**self).insert(record)
    }

    fn count(&self) -> Result<Option<u64>> {
        (**self).count()
    }
}

impl<T: DocumentStore + ?Sized> DocumentStore for Box<T> {
    fn insert(&self, record: &StoredRecord) -> Result<()> {
        (**self).insert(record)
    }

    fn count(&self) -> Result<Option<u64>> {
        (**self).count()
    }
}

/// Table name exposed through the REST API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName(String);

impl TableName {
    /// Validates a table name: non-empty ASCII letters, digits, `_`, `-` only.
    pub fn new<T>(table: T) -> Result<Self>
    where
        T: Into<String>,
    {
        let table = table.into();
        let table = table.trim();
        anyhow::ensure!(!table.is_empty(), "table name is required");
        anyhow::ensure!(
            table
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-'),
            "table name {:?} contains unsupported characters",
            table
        );
        Ok(Self(table.to_string()))
    }

    /// Returns the raw table string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
