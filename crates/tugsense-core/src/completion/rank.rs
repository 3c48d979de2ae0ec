//! Ordering, deduplication and prefix filtering of completion items.
//!
//! Sort key, in order:
//!
//! 1. category priority, descending
//! 2. empty display text first
//! 3. snippet payloads before everything else
//! 4. case bucket: lowercase-initial before uppercase-initial
//! 5. display text, lexicographic
//!
//! The key is a total preorder, so sorting is deterministic and a stable
//! sort of an already ranked list leaves it unchanged.

use std::cmp::{Ordering, Reverse};
use std::collections::HashSet;

use super::item::{CompletionItem, PayloadKind};

/// Compare two items by the ranking key.
pub fn compare_items(a: &CompletionItem, b: &CompletionItem) -> Ordering {
    sort_key(a).cmp(&sort_key(b))
}

fn sort_key(item: &CompletionItem) -> (Reverse<i32>, bool, bool, u8, &str) {
    (
        Reverse(item.order),
        !item.text.is_empty(),
        !item.is_snippet(),
        case_bucket(&item.text),
        item.text.as_str(),
    )
}

fn case_bucket(text: &str) -> u8 {
    match text.chars().next() {
        Some(ch) if ch.is_uppercase() => 1,
        _ => 0,
    }
}

/// Stable-sort items by the ranking key.
pub fn sort_items(items: &mut [CompletionItem]) {
    items.sort_by(compare_items);
}

/// Keep the first item of each (text, payload kind), in ranked order.
///
/// Duplicates from different categories are not adjacent after sorting,
/// so the check covers the whole list.
pub fn dedup_ranked(items: Vec<CompletionItem>) -> Vec<CompletionItem> {
    let mut seen: HashSet<(String, PayloadKind)> = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert((item.text.clone(), item.payload_kind())))
        .collect()
}

/// Merge candidate lists into one ranked, duplicate-free list.
pub fn rank(lists: impl IntoIterator<Item = Vec<CompletionItem>>) -> Vec<CompletionItem> {
    let mut items: Vec<CompletionItem> = lists.into_iter().flatten().collect();
    sort_items(&mut items);
    dedup_ranked(items)
}

/// Keep items whose text starts with `typed` (case-sensitive), in order.
///
/// A lone survivor equal to `typed` is dropped: there is nothing left to
/// complete.
pub fn filter_by_prefix(items: &[CompletionItem], typed: &str) -> Vec<CompletionItem> {
    if typed.is_empty() {
        return items.to_vec();
    }
    let filtered: Vec<CompletionItem> = items
        .iter()
        .filter(|item| item.text.starts_with(typed))
        .cloned()
        .collect();
    if filtered.len() == 1 && filtered[0].text == typed {
        return Vec::new();
    }
    filtered
}
