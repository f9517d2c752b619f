// Content-addressed memo for month-to-date aggregates.
//
// The key is a SHA-256 over every header and cell of the four raw tables plus
// the reference date. The engine knows nothing about this cache.
use crate::schema::{RawTable, RawTables};
use crate::types::MonthlyAggregate;
use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentKey(String);

impl ContentKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn hash_table(hasher: &mut Sha256, table: &RawTable) {
    // Length prefixes keep ("ab","c") and ("a","bc") apart.
    let mut field = |s: &str| {
        hasher.update((s.len() as u64).to_le_bytes());
        hasher.update(s.as_bytes());
    };
    field(&table.name);
    field(&table.headers.len().to_string());
    for h in &table.headers {
        field(h);
    }
    field(&table.rows.len().to_string());
    for row in &table.rows {
        field(&row.len().to_string());
        for cell in row {
            field(cell);
        }
    }
}

pub fn content_key(tables: &RawTables, reference_date: NaiveDate) -> ContentKey {
    let mut hasher = Sha256::new();
    for table in [&tables.movements, &tables.operations, &tables.sales, &tables.bom] {
        hash_table(&mut hasher, table);
    }
    hasher.update(reference_date.format("%Y-%m-%d").to_string().as_bytes());
    ContentKey(hex::encode(hasher.finalize()))
}

/// Entries kept by [`AggregateCache::new`].
pub const DEFAULT_CAPACITY: usize = 8;

/// Bounded memo; the oldest entry is evicted once `capacity` is reached.
#[derive(Debug)]
pub struct AggregateCache {
    entries: HashMap<ContentKey, MonthlyAggregate>,
    order: VecDeque<ContentKey>,
    capacity: usize,
}

impl Default for AggregateCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl AggregateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the cached aggregate for `key`, computing and storing it on a miss.
    pub fn get_or_compute<F>(&mut self, key: ContentKey, compute: F) -> MonthlyAggregate
    where
        F: FnOnce() -> MonthlyAggregate,
    {
        let short = key.as_str().get(..12).unwrap_or_default();
        if let Some(hit) = self.entries.get(&key) {
            debug!(key = short, "aggregate cache hit");
            return hit.clone();
        }
        debug!(key = short, "aggregate cache miss");
        let value = compute();
        while self.entries.len() >= self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, value.clone());
        value
    }
}
