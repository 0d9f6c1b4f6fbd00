use std::{cmp::Ordering, collections::HashSet};

use crate::models::Quote;

/// Newest `creation_date` first; equal dates fall back to the id, which is
/// time-ordered, so the later insert wins.
pub(crate) fn newest_first(a: &Quote, b: &Quote) -> Ordering {
    b.creation_date
        .cmp(&a.creation_date)
        .then_with(|| b.id.cmp(&a.id))
}

/// Flattens independently fetched batches, keeping the first copy of each
/// quote id.
pub(crate) fn merge_feed(batches: impl IntoIterator<Item = Vec<Quote>>) -> Vec<Quote> {
    let mut seen = HashSet::new();
    let mut merged: Vec<Quote> = batches
        .into_iter()
        .flatten()
        .filter(|quote| seen.insert(quote.id))
        .collect();

    merged.sort_by(newest_first);
    merged
}
