use crate::error::{AppError, AppResult};
use std::collections::HashMap;

/// Secondary index mapping an external identifier (name or id) to a slot in a
/// sibling positional `Vec`.
///
/// Lookups are O(1). Removing an element from the sibling sequence shifts
/// every trailing slot, so removal rebuilds the whole map from the sequence:
/// O(n), acceptable for a read-heavy store.
#[derive(Debug, Default)]
pub struct PositionIndex {
    map: HashMap<String, usize>,
}

impl PositionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.map.contains_key(id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.map.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn add(&mut self, id: &str, position: usize) -> AppResult<()> {
        if self.map.contains_key(id) {
            return Err(AppError::Duplicate(format!(
                "Identifier `{}` is already indexed.",
                id
            )));
        }
        self.map.insert(id.to_string(), position);
        Ok(())
    }

    /// Remove `id` and restore the position invariant for every element that
    /// shifted when the sibling sequence was edited.
    pub fn remove<T>(
        &mut self,
        id: &str,
        items: &[T],
        key: impl Fn(&T) -> &str,
    ) -> AppResult<()> {
        if self.map.remove(id).is_none() {
            return Err(AppError::NotFound(format!(
                "Identifier `{}` is not indexed.",
                id
            )));
        }
        self.rebuild(items, key);
        Ok(())
    }

    /// Idempotent full rebuild from the sibling sequence.
    pub fn rebuild<T>(&mut self, items: &[T], key: impl Fn(&T) -> &str) {
        self.map = items
            .iter()
            .enumerate()
            .map(|(i, item)| (key(item).to_string(), i))
            .collect();
    }
}
