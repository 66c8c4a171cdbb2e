//! SQL text loaded from the queries directory

use crate::error::{LetterError, Result};
use letter_types::LetterKind;
use std::collections::HashMap;
use std::path::Path;

/// Per-property schedule lookup, takes the property identifier as its only parameter
pub const SCHEDULE_QUERY_FILE: &str = "schedule_info.sql";

/// Fixed query texts for one run
#[derive(Debug, Clone, Default)]
pub struct QuerySet {
    listings: HashMap<LetterKind, String>,
    schedule: Option<String>,
    updates: Vec<(LetterKind, String)>,
}

impl QuerySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the files needed to produce `kinds`. Update statements are
    /// required for garden waste and recycling when `with_updates` is set,
    /// and picked up for change letters only if the file exists.
    pub fn load<P: AsRef<Path>>(dir: P, kinds: &[LetterKind], with_updates: bool) -> Result<Self> {
        let dir = dir.as_ref();
        let mut queries = Self::new();

        for kind in kinds {
            queries.listings.insert(*kind, read_query(dir, kind.listing_query_file())?);

            if *kind == LetterKind::CollectionChange {
                queries.schedule = Some(read_query(dir, SCHEDULE_QUERY_FILE)?);
            }

            if with_updates {
                let update_path = dir.join(kind.update_query_file());
                if kind.requires_update_query() || update_path.exists() {
                    queries.updates.push((*kind, read_query(dir, kind.update_query_file())?));
                }
            }
        }

        log::debug!(
            "Loaded {} listing queries and {} update statements from {}",
            queries.listings.len(),
            queries.updates.len(),
            dir.display()
        );

        Ok(queries)
    }

    pub fn with_listing(mut self, kind: LetterKind, sql: impl Into<String>) -> Self {
        self.listings.insert(kind, sql.into());
        self
    }

    pub fn with_schedule(mut self, sql: impl Into<String>) -> Self {
        self.schedule = Some(sql.into());
        self
    }

    pub fn with_update(mut self, kind: LetterKind, sql: impl Into<String>) -> Self {
        self.updates.push((kind, sql.into()));
        self
    }

    pub fn listing(&self, kind: LetterKind) -> Result<&str> {
        self.listings
            .get(&kind)
            .map(String::as_str)
            .ok_or_else(|| LetterError::Config(format!("No listing query loaded for {} letters", kind)))
    }

    pub fn schedule(&self) -> Result<&str> {
        self.schedule
            .as_deref()
            .ok_or_else(|| LetterError::Config("No schedule query loaded".to_string()))
    }

    /// Update statements for `kinds`, in load order
    pub fn updates_for(&self, kinds: &[LetterKind]) -> Vec<&str> {
        self.updates
            .iter()
            .filter(|(kind, _)| kinds.contains(kind))
            .map(|(_, sql)| sql.as_str())
            .collect()
    }
}

fn read_query(dir: &Path, file_name: &str) -> Result<String> {
    let path = dir.join(file_name);
    std::fs::read_to_string(&path).map_err(|e| {
        LetterError::Config(format!("Failed to read query file {}: {}", path.display(), e))
    })
}
