// src/storage/mod.rs
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::extractors::codes::CodeRecord;
use crate::utils::error::StorageError;

/// A code record after the store has assigned it an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCode {
    pub id: u64,
    #[serde(flatten)]
    pub record: CodeRecord,
}

/// Filters accepted by the search endpoint. All present filters must match;
/// blank values, and a year that is not a number, mean "no filter".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    pub term: Option<String>,
    pub payer: Option<String>,
    pub lob: Option<String>,
    pub year: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl SearchQuery {
    pub fn payer_filter(&self) -> Option<&str> {
        non_blank(&self.payer)
    }

    pub fn lob_filter(&self) -> Option<&str> {
        non_blank(&self.lob)
    }

    pub fn year_filter(&self) -> Option<i32> {
        non_blank(&self.year).and_then(|y| y.parse().ok())
    }
}

/// Storage seam for extracted codes; handlers receive it as shared state.
pub trait CodeStore: Send + Sync {
    fn all(&self) -> Result<Vec<StoredCode>, StorageError>;

    /// Assigns ids in input order and returns the stored copies.
    fn save(&self, records: Vec<CodeRecord>) -> Result<Vec<StoredCode>, StorageError>;

    fn clear(&self) -> Result<(), StorageError>;

    /// Case-insensitive substring match over code, payer, line of business
    /// and source file. An empty term returns everything.
    fn search(&self, term: &str) -> Result<Vec<StoredCode>, StorageError> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return self.all();
        }
        Ok(self
            .all()?
            .into_iter()
            .filter(|c| {
                let r = &c.record;
                r.code.to_lowercase().contains(&term)
                    || r.payer_name.to_lowercase().contains(&term)
                    || r.line_of_business.to_lowercase().contains(&term)
                    || r.source_file.to_lowercase().contains(&term)
            })
            .collect())
    }

    /// Search term first, then exact (case-insensitive) payer and line of
    /// business filters, then exact year.
    fn query(&self, query: &SearchQuery) -> Result<Vec<StoredCode>, StorageError> {
        let codes = self.search(query.term.as_deref().unwrap_or(""))?;
        let payer = query.payer_filter();
        let lob = query.lob_filter();
        let year = query.year_filter();
        Ok(codes
            .into_iter()
            .filter(|c| payer.map_or(true, |p| c.record.payer_name.eq_ignore_ascii_case(p)))
            .filter(|c| lob.map_or(true, |l| c.record.line_of_business.eq_ignore_ascii_case(l)))
            .filter(|c| year.map_or(true, |y| c.record.year == y))
            .collect())
    }

    /// Sorted distinct payer names.
    fn payers(&self) -> Result<Vec<String>, StorageError> {
        let set: BTreeSet<String> = self.all()?.into_iter().map(|c| c.record.payer_name).collect();
        Ok(set.into_iter().collect())
    }

    /// Sorted distinct lines of business.
    fn lines_of_business(&self) -> Result<Vec<String>, StorageError> {
        let set: BTreeSet<String> = self
            .all()?
            .into_iter()
            .map(|c| c.record.line_of_business)
            .collect();
        Ok(set.into_iter().collect())
    }
}

#[derive(Default)]
struct Inner {
    codes: BTreeMap<u64, StoredCode>,
    last_id: u64,
}

/// Process-lifetime, in-memory code store.
#[derive(Default)]
pub struct MemStore {
    inner: RwLock<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, StorageError> {
        self.inner.read().map_err(|_| StorageError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, StorageError> {
        self.inner.write().map_err(|_| StorageError::LockPoisoned)
    }
}

impl CodeStore for MemStore {
    fn all(&self) -> Result<Vec<StoredCode>, StorageError> {
        Ok(self.read()?.codes.values().cloned().collect())
    }

    fn save(&self, records: Vec<CodeRecord>) -> Result<Vec<StoredCode>, StorageError> {
        let mut inner = self.write()?;
        let mut saved = Vec::with_capacity(records.len());

        for record in records {
            inner.last_id += 1;
            let stored = StoredCode {
                id: inner.last_id,
                record,
            };
            inner.codes.insert(stored.id, stored.clone());
            saved.push(stored);
        }

        tracing::info!("Saved {} codes ({} total)", saved.len(), inner.codes.len());
        Ok(saved)
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut inner = self.write()?;
        let removed = inner.codes.len();
        *inner = Inner::default();
        tracing::info!("Cleared {} codes from storage", removed);
        Ok(())
    }
}
