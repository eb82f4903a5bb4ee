//! Provider clients: one query string in, a list of flat records out.

mod news;
mod preprint;
mod repository;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::ProviderError;

pub use news::{NewsClient, NewsHeadline};
pub use preprint::{Paper, PreprintClient};
pub use repository::{Repository, RepositoryClient};

#[async_trait]
pub trait SignalSource: Send + Sync {
    type Record: Serialize + Send + Sync;

    /// Short provider label used in logs and metrics.
    fn name(&self) -> &'static str;

    async fn search(&self, query: &str) -> Result<Vec<Self::Record>, ProviderError>;

    /// Identity used to deduplicate records across queries. `None` keeps
    /// every record.
    fn record_key(record: &Self::Record) -> Option<String>;
}

/// Records gathered across the queries of one scout run.
///
/// Keyed records are unique: a later record with the same key replaces the
/// earlier one in place. Unkeyed records are always appended.
#[derive(Debug, Clone)]
pub struct RecordSet<R> {
    records: Vec<R>,
    positions: HashMap<String, usize>,
}

impl<R> Default for RecordSet<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

impl<R> RecordSet<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: Option<String>, record: R) {
        match key {
            Some(key) => match self.positions.get(&key) {
                Some(&index) => self.records[index] = record,
                None => {
                    self.positions.insert(key, self.records.len());
                    self.records.push(record);
                }
            },
            None => self.records.push(record),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.records.iter()
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_keys_keep_the_last_record() {
        let mut set = RecordSet::new();
        set.insert(Some("org/a".to_string()), ("org/a", 10));
        set.insert(Some("org/b".to_string()), ("org/b", 5));
        set.insert(Some("org/a".to_string()), ("org/a", 42));

        let records: Vec<_> = set.iter().copied().collect();
        assert_eq!(records, vec![("org/a", 42), ("org/b", 5)]);
    }

    #[test]
    fn unkeyed_records_are_never_merged() {
        let mut set = RecordSet::new();
        set.insert(None, "same headline");
        set.insert(None, "same headline");
        assert_eq!(set.len(), 2);
    }
}
