//! Loading of curated ("official") links at startup

use std::path::Path;

use crate::database::LinkStore;
use crate::error::AppResult;
use crate::exchange::{favicon_url, link_from_json_entry, ImportEntry, ImportSummary};
use crate::model::User;

/// Id of the system user that owns official links
pub const CURATOR_ID: &str = "ledgerly";

fn curator() -> User {
    User {
        id: CURATOR_ID.to_string(),
        username: "Ledgerly".to_string(),
        avatar: String::new(),
        email: String::new(),
    }
}

/// Inserts the official links described by `entries`.
///
/// Seeded links are public and marked official. Entries whose URL the
/// curator already has are skipped, so running this again is harmless.
pub fn seed_official_links(store: &LinkStore, entries: Vec<ImportEntry>) -> AppResult<ImportSummary> {
    store.remember_user(&curator())?;

    let total = entries.len();
    let links: Vec<_> = entries
        .into_iter()
        .filter_map(|entry| link_from_json_entry(CURATOR_ID, entry))
        .map(|mut link| {
            link.is_official = true;
            link.is_public = true;
            link.starred_by.clear();
            link.is_starred = false;
            if link.image.is_empty() {
                link.image = favicon_url(&link.url).unwrap_or_default();
            }
            link
        })
        .collect();
    let invalid = total - links.len();

    let (imported, skipped) = store.insert_batch(CURATOR_ID, links)?;
    Ok(ImportSummary {
        imported,
        skipped: skipped + invalid,
    })
}

/// Reads a JSON array of link entries from `path` and seeds them.
pub fn seed_from_file(store: &LinkStore, path: &Path) -> AppResult<ImportSummary> {
    let content = std::fs::read_to_string(path)?;
    let entries: Vec<ImportEntry> = serde_json::from_str(&content)?;
    let summary = seed_official_links(store, entries)?;

    tracing::info!(
        path = %path.display(),
        imported = summary.imported,
        skipped = summary.skipped,
        "seeded official links"
    );
    Ok(summary)
}
