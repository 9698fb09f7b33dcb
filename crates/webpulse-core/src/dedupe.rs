use std::collections::HashSet;

use webpulse_models::FeedEntry;

/// Drop entries whose (trimmed lowercase title, source) was already seen.
///
/// First occurrence wins and order is preserved, so on a time-sorted list the
/// most recent copy survives. Idempotent.
pub fn dedupe(entries: Vec<FeedEntry>) -> Vec<FeedEntry> {
    let mut seen: HashSet<(String, String)> = HashSet::with_capacity(entries.len());
    entries
        .into_iter()
        .filter(|entry| seen.insert(dedupe_key(entry)))
        .collect()
}

fn dedupe_key(entry: &FeedEntry) -> (String, String) {
    (
        entry.title.trim().to_lowercase(),
        entry.source_name.clone(),
    )
}
