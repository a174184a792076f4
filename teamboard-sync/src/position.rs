//! Position assignment policy
//!
//! Pure functions over ordered sequences. Appends use `max + 1` and never renumber
//! siblings, so positions may become sparse over time; every move goes through
//! [`reindex_after_move`] or [`renumber`], which restore a dense `0..N-1` numbering.

use crate::types::Positioned;
use std::collections::HashMap;

/// Position for an item appended at the end of a container.
///
/// `0` for an empty container, otherwise one past the largest existing position.
/// Gaps left by deletions are not reused.
pub fn next_append_position(existing: impl IntoIterator<Item = usize>) -> usize {
    existing
        .into_iter()
        .max()
        .map(|max| max.saturating_add(1))
        .unwrap_or(0)
}

/// Stable sort by position. Items with equal positions keep their relative order.
pub fn sort_by_position<T: Positioned>(items: &mut [T]) {
    items.sort_by_key(|item| item.position());
}

/// Rewrite every position to its index
pub fn renumber<T: Positioned>(mut items: Vec<T>) -> Vec<T> {
    for (index, item) in items.iter_mut().enumerate() {
        item.set_position(index);
    }
    items
}

/// Move the element at `from` to `to` and renumber densely.
///
/// `to` is an index into the result and is clamped to the valid range. An
/// out-of-range `from` leaves the order unchanged (the result is still renumbered).
pub fn reindex_after_move<T: Positioned>(items: &[T], from: usize, to: usize) -> Vec<T> {
    let mut moved = items.to_vec();
    if from < moved.len() {
        let item = moved.remove(from);
        let to = to.min(moved.len());
        moved.insert(to, item);
    }
    renumber(moved)
}

/// Insert `item` at `index` (clamped to the end) and renumber densely
pub fn insert_at<T: Positioned>(items: &[T], item: T, index: usize) -> Vec<T> {
    let mut inserted = items.to_vec();
    let index = index.min(inserted.len());
    inserted.insert(index, item);
    renumber(inserted)
}

/// Whether positions are exactly `0..N-1` in sequence order
pub fn is_dense<T: Positioned>(items: &[T]) -> bool {
    items
        .iter()
        .enumerate()
        .all(|(index, item)| item.position() == index)
}

/// Minimal write set to turn `before` into `after`.
///
/// Returns `(id, new position)` for every item of `after` whose position differs
/// from the one it had in `before`. Items absent from `before` are always included.
pub fn changed_positions<T: Positioned>(before: &[T], after: &[T]) -> Vec<(String, usize)> {
    let previous: HashMap<&str, usize> = before
        .iter()
        .map(|item| (item.id(), item.position()))
        .collect();

    after
        .iter()
        .filter(|item| previous.get(item.id()) != Some(&item.position()))
        .map(|item| (item.id().to_string(), item.position()))
        .collect()
}

/// Index of the item with `id`
pub fn index_of<T: Positioned>(items: &[T], id: &str) -> Option<usize> {
    items.iter().position(|item| item.id() == id)
}
