//! Thread reconstruction: reorders a flat feed into a reply-nested display
//! sequence.
//!
//! Replies authored by the archived profile are queued under their parent,
//! oldest first. Top-level records keep server order; each one is followed
//! depth-first by its queued replies. A queued reply is never emitted at top
//! level while its parent is present, so it always lands after the parent.
//! Records reachable only through a reply cycle are emitted afterwards,
//! each cycle entered at the member its earliest leftover leads to, so
//! replies hanging off a cycle still follow their parent.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use skyarchive_core::PostRecord;

/// Returns `records` in threaded display order.
///
/// The output is a permutation of the input. Running it again on its own
/// output yields the same order.
#[must_use]
pub fn reconstruct_threads(records: Vec<PostRecord>, archived_did: &str) -> Vec<PostRecord> {
    let order = display_order(&records, archived_did);
    let mut slots: Vec<Option<PostRecord>> = records.into_iter().map(Some).collect();
    order.into_iter().filter_map(|idx| slots[idx].take()).collect()
}

fn display_order(records: &[PostRecord], archived_did: &str) -> Vec<usize> {
    let index_of: HashMap<&str, usize> = records
        .iter()
        .enumerate()
        .map(|(idx, r)| (r.uri.as_str(), idx))
        .collect();

    let mut children: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut parent_of: Vec<Option<usize>> = vec![None; records.len()];
    for (idx, record) in records.iter().enumerate() {
        if record.author_did != archived_did {
            continue;
        }
        let Some(parent) = record.reply_to_uri.as_deref() else {
            continue;
        };
        children.entry(parent).or_default().push(idx);
        parent_of[idx] = index_of.get(parent).copied();
    }
    for queue in children.values_mut() {
        queue.sort_by_key(|&idx| created_at_key(&records[idx].created_at));
    }

    let mut placed = vec![false; records.len()];
    let mut order = Vec::with_capacity(records.len());
    let mut stack = Vec::new();

    let roots = (0..records.len()).filter(|&idx| parent_of[idx].is_none());
    // Anything still unplaced after the first sweep hangs off a reply cycle.
    let leftovers = 0..records.len();
    for start in roots.chain(leftovers) {
        if placed[start] {
            continue;
        }
        let start = if parent_of[start].is_some() {
            cycle_entry(start, &parent_of)
        } else {
            start
        };
        stack.push(start);
        while let Some(idx) = stack.pop() {
            if placed[idx] {
                continue;
            }
            placed[idx] = true;
            order.push(idx);
            if let Some(queue) = children.get(records[idx].uri.as_str()) {
                stack.extend(queue.iter().rev().copied().filter(|&child| !placed[child]));
            }
        }
    }
    order
}

/// Follows parent links from `idx` to the first record met twice, which
/// lies on the reply cycle the chain ends in.
fn cycle_entry(idx: usize, parent_of: &[Option<usize>]) -> usize {
    let mut seen = HashSet::new();
    let mut current = idx;
    while seen.insert(current) {
        match parent_of[current] {
            Some(parent) => current = parent,
            None => break,
        }
    }
    current
}

/// Sort key for reply queues. Missing or unparseable timestamps sort first.
fn created_at_key(created_at: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(created_at)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
