//! Append-only, round-bucketed object stores with dense identifiers.

use serde::{Deserialize, Serialize};

use super::metadata::Metadata;

/// Items are inserted once, receive the next dense id, and are bucketed by
/// their declaration round. Buckets keep insertion order, so iterating a
/// round yields monotonically increasing ids.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ByRoundRegister<T> {
    items: Vec<T>,
    rounds: Vec<usize>,
    by_round: Vec<Vec<usize>>,
    #[serde(skip)]
    metadata: Vec<Metadata>,
}

impl<T> ByRoundRegister<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            rounds: Vec::new(),
            by_round: Vec::new(),
            metadata: Vec::new(),
        }
    }

    /// Inserts an item, returning its dense id.
    pub fn insert(&mut self, item: T, round: usize, metadata: Metadata) -> usize {
        let id = self.items.len();
        self.items.push(item);
        self.rounds.push(round);
        self.metadata.push(metadata);
        self.reserve_for(round);
        self.by_round[round].push(id);
        id
    }

    pub fn get(&self, id: usize) -> &T {
        &self.items[id]
    }

    pub fn get_mut(&mut self, id: usize) -> &mut T {
        &mut self.items[id]
    }

    pub fn metadata(&self, id: usize) -> &Metadata {
        &self.metadata[id]
    }

    pub fn round_of(&self, id: usize) -> usize {
        self.rounds[id]
    }

    /// Ids declared at `round`, in insertion order. Rounds beyond the
    /// register's extent are empty, not an error.
    pub fn ids_at_round(&self, round: usize) -> &[usize] {
        self.by_round.get(round).map(|ids| ids.as_slice()).unwrap_or(&[])
    }

    pub fn at_round(&self, round: usize) -> impl Iterator<Item = (usize, &T)> {
        self.ids_at_round(round).iter().map(|id| (*id, &self.items[*id]))
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.items.iter().enumerate()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn num_rounds(&self) -> usize {
        self.by_round.len()
    }

    /// Extends the bucket list with empty rounds so `round` is addressable.
    pub fn reserve_for(&mut self, round: usize) {
        if self.by_round.len() <= round {
            self.by_round.resize_with(round + 1, Vec::new);
        }
    }
}

impl<T> Default for ByRoundRegister<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_ids_and_round_buckets() {
        let mut register = ByRoundRegister::new();
        let a = register.insert("a", 0, Metadata::default());
        let b = register.insert("b", 2, Metadata::default());
        let c = register.insert("c", 0, Metadata::default());
        assert_eq!((a, b, c), (0, 1, 2));
        assert_eq!(register.ids_at_round(0), &[0, 2]);
        assert_eq!(register.ids_at_round(1), &[] as &[usize]);
        assert_eq!(register.ids_at_round(2), &[1]);
        assert_eq!(register.ids_at_round(7), &[] as &[usize]);
        assert_eq!(register.num_rounds(), 3);
        assert_eq!(register.round_of(1), 2);
    }

    #[test]
    fn reserving_extends_with_empty_buckets() {
        let mut register = ByRoundRegister::<&str>::new();
        register.reserve_for(4);
        assert_eq!(register.num_rounds(), 5);
        assert!(register.ids_at_round(4).is_empty());
    }
}
