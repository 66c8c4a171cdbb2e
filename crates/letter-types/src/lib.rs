//! Shared types for the collection letter generator

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// The three letters the service sends out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LetterKind {
    GardenWaste,
    Recycling,
    CollectionChange,
}

impl LetterKind {
    pub const ALL: [LetterKind; 3] = [
        LetterKind::GardenWaste,
        LetterKind::Recycling,
        LetterKind::CollectionChange,
    ];

    /// Short name used for staging directories and on the command line
    pub fn directory_name(&self) -> &'static str {
        match self {
            LetterKind::GardenWaste => "gw",
            LetterKind::Recycling => "rec",
            LetterKind::CollectionChange => "changes",
        }
    }

    /// SQL file listing the recipients for this letter
    pub fn listing_query_file(&self) -> &'static str {
        match self {
            LetterKind::GardenWaste => "gw_address_info.sql",
            LetterKind::Recycling => "rec_address_info.sql",
            LetterKind::CollectionChange => "changes_info.sql",
        }
    }

    /// SQL file flagging this letter's requests as processed
    pub fn update_query_file(&self) -> &'static str {
        match self {
            LetterKind::GardenWaste => "update_gw.sql",
            LetterKind::Recycling => "update_rec.sql",
            LetterKind::CollectionChange => "update_changes.sql",
        }
    }

    /// Whether a run fails when the update file is absent
    pub fn requires_update_query(&self) -> bool {
        !matches!(self, LetterKind::CollectionChange)
    }

    /// Parse a comma separated list such as `gw,rec`
    pub fn parse_list(list: &str) -> Result<Vec<LetterKind>, ParseKindError> {
        let mut kinds = Vec::new();
        for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let kind: LetterKind = part.parse()?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        if kinds.is_empty() {
            return Err(ParseKindError(list.to_string()));
        }
        Ok(kinds)
    }
}

impl fmt::Display for LetterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.directory_name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown letter kind '{0}' (expected gw, rec or changes)")]
pub struct ParseKindError(pub String);

impl FromStr for LetterKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gw" | "garden_waste" => Ok(LetterKind::GardenWaste),
            "rec" | "recycling" => Ok(LetterKind::Recycling),
            "changes" | "collection_change" => Ok(LetterKind::CollectionChange),
            other => Err(ParseKindError(other.to_string())),
        }
    }
}

/// Case reference or property identifier identifying one source row
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceKey(String);

impl ReferenceKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One letter recipient, as returned by the listing queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LetterRequest {
    GardenWaste {
        occupier: String,
        address: String,
        reference: ReferenceKey,
        subscriptions: u32,
    },
    Recycling {
        occupier: String,
        address: String,
        reference: ReferenceKey,
    },
    CollectionChange {
        occupier: String,
        address: String,
        property: ReferenceKey,
    },
}

impl LetterRequest {
    pub fn kind(&self) -> LetterKind {
        match self {
            LetterRequest::GardenWaste { .. } => LetterKind::GardenWaste,
            LetterRequest::Recycling { .. } => LetterKind::Recycling,
            LetterRequest::CollectionChange { .. } => LetterKind::CollectionChange,
        }
    }

    pub fn occupier(&self) -> &str {
        match self {
            LetterRequest::GardenWaste { occupier, .. }
            | LetterRequest::Recycling { occupier, .. }
            | LetterRequest::CollectionChange { occupier, .. } => occupier,
        }
    }

    pub fn address(&self) -> &str {
        match self {
            LetterRequest::GardenWaste { address, .. }
            | LetterRequest::Recycling { address, .. }
            | LetterRequest::CollectionChange { address, .. } => address,
        }
    }

    /// Case reference, or the property identifier for change letters
    pub fn key(&self) -> &ReferenceKey {
        match self {
            LetterRequest::GardenWaste { reference, .. }
            | LetterRequest::Recycling { reference, .. } => reference,
            LetterRequest::CollectionChange { property, .. } => property,
        }
    }

    /// Number of identical copies the letter is printed in
    pub fn copies(&self) -> u32 {
        match self {
            LetterRequest::GardenWaste { subscriptions, .. } => *subscriptions,
            _ => 1,
        }
    }
}

/// Collection schedule for one property, one value per heading
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleTable {
    pub headings: Vec<String>,
    pub values: Vec<String>,
}

impl ScheduleTable {
    pub fn new(headings: Vec<String>, values: Vec<String>) -> Self {
        Self { headings, values }
    }

    /// Heading/value pairs in column order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headings
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }
}

/// Timestamp shared by every stage of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunContext {
    pub started_at: DateTime<Local>,
}

impl RunContext {
    pub fn new(started_at: DateTime<Local>) -> Self {
        Self { started_at }
    }

    pub fn now() -> Self {
        Self::new(Local::now())
    }

    /// Date printed on letters, e.g. `18 June 2018`
    pub fn letter_date(&self) -> String {
        self.started_at.format("%d %B %Y").to_string()
    }

    /// Timestamp prefix of log file lines, e.g. `18-Jun-2018 09:05:00`
    pub fn log_timestamp(&self) -> String {
        self.started_at.format("%d-%b-%Y %H:%M:%S").to_string()
    }

    /// File stem of merged batch output, e.g. `201806180905`
    pub fn batch_stamp(&self) -> String {
        self.started_at.format("%Y%m%d%H%M").to_string()
    }
}

/// Outcome of processing one letter kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindSummary {
    pub requests: usize,
    pub staged_files: usize,
    pub pdfs: usize,
    pub merged: Option<PathBuf>,
}

/// Outcome of a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub kinds: Vec<(LetterKind, KindSummary)>,
    pub marked_processed: bool,
}

impl RunSummary {
    pub fn get(&self, kind: LetterKind) -> Option<&KindSummary> {
        self.kinds.iter().find(|(k, _)| *k == kind).map(|(_, s)| s)
    }

    pub fn total_requests(&self) -> usize {
        self.kinds.iter().map(|(_, s)| s.requests).sum()
    }

    /// One-line description written to the run log
    pub fn describe(&self) -> String {
        let parts: Vec<String> = self
            .kinds
            .iter()
            .map(|(kind, s)| {
                format!(
                    "{}: {} requests, {} files, {} pdfs",
                    kind, s.requests, s.staged_files, s.pdfs
                )
            })
            .collect();
        if parts.is_empty() {
            "Letters generated: nothing to do".to_string()
        } else {
            format!("Letters generated ({})", parts.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_kind_list() {
        let kinds = LetterKind::parse_list("gw, rec,gw").unwrap();
        assert_eq!(kinds, vec![LetterKind::GardenWaste, LetterKind::Recycling]);

        assert!(LetterKind::parse_list("").is_err());
        assert_eq!(
            LetterKind::parse_list("gw,bins").unwrap_err(),
            ParseKindError("bins".to_string())
        );
    }

    #[test]
    fn test_request_accessors() {
        let change = LetterRequest::CollectionChange {
            occupier: "The Occupier".to_string(),
            address: "1 Main St, Thirsk".to_string(),
            property: ReferenceKey::new("100050"),
        };
        assert_eq!(change.kind(), LetterKind::CollectionChange);
        assert_eq!(change.key().as_str(), "100050");
        assert_eq!(change.copies(), 1);

        let gw = LetterRequest::GardenWaste {
            occupier: "A Resident".to_string(),
            address: "2 Main St".to_string(),
            reference: ReferenceKey::new("GW1"),
            subscriptions: 3,
        };
        assert_eq!(gw.copies(), 3);
        assert_eq!(gw.occupier(), "A Resident");
    }

    #[test]
    fn test_run_context_formats() {
        let ctx = RunContext::new(Local.with_ymd_and_hms(2018, 6, 18, 9, 5, 0).unwrap());
        assert_eq!(ctx.letter_date(), "18 June 2018");
        assert_eq!(ctx.log_timestamp(), "18-Jun-2018 09:05:00");
        assert_eq!(ctx.batch_stamp(), "201806180905");
    }

    #[test]
    fn test_summary_description() {
        let summary = RunSummary {
            kinds: vec![(
                LetterKind::GardenWaste,
                KindSummary { requests: 2, staged_files: 3, pdfs: 3, merged: None },
            )],
            marked_processed: false,
        };
        assert_eq!(
            summary.describe(),
            "Letters generated (gw: 2 requests, 3 files, 3 pdfs)"
        );
        assert_eq!(summary.total_requests(), 2);
        assert_eq!(RunSummary::default().describe(), "Letters generated: nothing to do");
    }

    #[test]
    fn test_request_serializes_with_kind_tag() {
        let rec = LetterRequest::Recycling {
            occupier: "X".to_string(),
            address: "Y".to_string(),
            reference: ReferenceKey::new("R1"),
        };
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains("\"kind\":\"recycling\""));
    }
}
