use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod commons;
pub mod pager;

/// One search result rendered as a card in the gallery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageHit {
    pub page_id: u64,
    /// Display title, without the file-namespace prefix.
    pub title: String,
    /// Full-size image URL (viewer + "open original" link).
    pub url: String,
    /// Sized-down rendition for the card grid and the AI payload.
    pub thumb_url: String,
    pub mime: Option<String>,
    pub size_bytes: Option<u64>,
    pub uploaded: Option<DateTime<Utc>>,
    /// Attribution from extmetadata, HTML stripped.
    pub artist: Option<String>,
    pub license: Option<String>,
}

/// What the pager hands to the network layer when a fetch is due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub query: String,
    pub offset: u64,
    pub limit: u32,
    /// Pager epoch at issue time; outcomes from an older epoch are discarded.
    pub epoch: u64,
}

/// Completed page fetch, reported back over the search channel.
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    Page {
        epoch: u64,
        hits: Vec<ImageHit>,
        next_offset: Option<u64>,
    },
    Failed {
        epoch: u64,
        error: String,
    },
}
