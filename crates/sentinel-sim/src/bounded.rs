//! Newest-first bounded logs.
//!
//! Every capped collection in the world snapshot is ordered newest-first,
//! so inserting means prepending and eviction always drops from the tail.

/// Prepend `item` and drop the oldest entries beyond `cap`.
///
/// Returns the number of evicted entries.
pub fn push_front_bounded<T>(items: &mut Vec<T>, item: T, cap: usize) -> usize {
    items.insert(0, item);
    enforce_bound(items, cap)
}

/// Drop the oldest entries beyond `cap`. Returns the number evicted.
pub fn enforce_bound<T>(items: &mut Vec<T>, cap: usize) -> usize {
    let evicted = items.len().saturating_sub(cap);
    items.truncate(cap);
    evicted
}
