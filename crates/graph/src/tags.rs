//! Tag layers attached to nodes, edges and sub-graphs.
//!
//! Each phase of the schedule analysis owns one layer. A layer is a dense,
//! index-keyed map whose entries start out unassigned and are written in
//! validated batches: a batch that assigns two different values to the same
//! key is rejected before anything is written.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// Keys that can address an entry of a [`TagLayer`].
pub trait TagKey: Copy {
    /// Zero-based position of the key inside the layer.
    fn position(self) -> usize;

    /// Rebuild the key from its zero-based position.
    fn from_position(position: usize) -> Self;
}

macro_rules! one_based_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(usize);

        impl $name {
            /// Create an id from its 1-based value.
            ///
            /// Returns `None` for zero.
            #[must_use]
            pub const fn new(value: usize) -> Option<Self> {
                if value == 0 { None } else { Some(Self(value)) }
            }

            /// The 1-based value of this id.
            #[must_use]
            pub const fn get(self) -> usize {
                self.0
            }
        }

        impl TagKey for $name {
            fn position(self) -> usize {
                self.0 - 1
            }

            fn from_position(position: usize) -> Self {
                Self(position + 1)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

one_based_id!(
    /// Identifier of a weakly-connected component (1-based).
    ComponentId
);

one_based_id!(
    /// Identifier of a bounded-size sub-graph (1-based).
    SubGraphId
);

one_based_id!(
    /// Topological rank of a sub-graph (1-based, level 1 has no dependencies).
    SubGraphLevel
);

/// Synchronisation step assigned to an edge inside its sub-graph.
///
/// `External` is the reserved value carried by every edge that crosses
/// sub-graphs; it orders before every numbered slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimeSlot {
    /// Cross-sub-graph edge, applied before any local work.
    External,
    /// Local step, numbered from 1.
    Slot(u32),
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::External => write!(f, "external"),
            Self::Slot(slot) => write!(f, "{slot}"),
        }
    }
}

/// A sparse tag assignment keyed by node, edge or sub-graph.
#[derive(Debug, Clone)]
pub struct TagLayer<K, V> {
    name: &'static str,
    values: Vec<Option<V>>,
    _key: PhantomData<fn(K)>,
}

impl<K: TagKey, V: Copy + PartialEq> TagLayer<K, V> {
    /// Create an empty layer with room for `len` keys.
    #[must_use]
    pub fn new(name: &'static str, len: usize) -> Self {
        Self {
            name,
            values: vec![None; len],
            _key: PhantomData,
        }
    }

    /// Name of the layer, used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The value assigned to `key`, if any.
    #[must_use]
    pub fn get(&self, key: K) -> Option<V> {
        self.values.get(key.position()).copied().flatten()
    }

    /// Values for several keys, in the order given.
    #[must_use]
    pub fn get_many(&self, keys: &[K]) -> Vec<Option<V>> {
        keys.iter().map(|&key| self.get(key)).collect()
    }

    /// Assign a batch of values.
    ///
    /// The batch is validated as a whole before any entry is written, so a
    /// rejected batch leaves the layer untouched. Repeating the same value
    /// for a key within one batch is allowed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AmbiguousAssignment`] if the batch assigns two
    /// different values to the same key.
    pub fn set(&mut self, assignments: impl IntoIterator<Item = (K, V)>) -> Result<()> {
        let mut batch: HashMap<usize, V> = HashMap::new();
        let mut ordered = Vec::new();
        for (key, value) in assignments {
            let position = key.position();
            match batch.get(&position) {
                Some(existing) if *existing != value => {
                    return Err(Error::AmbiguousAssignment {
                        layer: self.name,
                        key: position + 1,
                    });
                }
                Some(_) => {}
                None => {
                    batch.insert(position, value);
                    ordered.push((position, value));
                }
            }
        }

        for (position, value) in ordered {
            if position >= self.values.len() {
                self.values.resize(position + 1, None);
            }
            self.values[position] = Some(value);
        }
        Ok(())
    }

    /// Clear every assignment in the layer.
    pub fn reset(&mut self) {
        self.values.iter_mut().for_each(|value| *value = None);
    }

    /// Clear the assignments of the given keys only.
    pub fn reset_keys(&mut self, keys: impl IntoIterator<Item = K>) {
        for key in keys {
            if let Some(value) = self.values.get_mut(key.position()) {
                *value = None;
            }
        }
    }

    /// Iterate over assigned `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (K, V)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(position, value)| value.map(|v| (K::from_position(position), v)))
    }

    /// Number of assigned keys.
    #[must_use]
    pub fn assigned_count(&self) -> usize {
        self.values.iter().filter(|value| value.is_some()).count()
    }

    /// Whether no key has been assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub_graph(value: usize) -> SubGraphId {
        SubGraphId::new(value).unwrap()
    }

    #[test]
    fn test_set_and_get() {
        let mut layer: TagLayer<SubGraphId, SubGraphLevel> = TagLayer::new("level", 2);
        let level = SubGraphLevel::new(3).unwrap();
        layer.set([(sub_graph(1), level)]).unwrap();

        assert_eq!(layer.get(sub_graph(1)), Some(level));
        assert_eq!(layer.get(sub_graph(2)), None);
        assert_eq!(layer.assigned_count(), 1);
    }

    #[test]
    fn test_set_grows_layer() {
        let mut layer: TagLayer<SubGraphId, SubGraphLevel> = TagLayer::new("level", 0);
        let level = SubGraphLevel::new(1).unwrap();
        layer.set([(sub_graph(5), level)]).unwrap();
        assert_eq!(layer.get(sub_graph(5)), Some(level));
        assert_eq!(layer.get(sub_graph(9)), None);
    }

    #[test]
    fn test_ambiguous_batch_is_rejected_without_writes() {
        let mut layer: TagLayer<SubGraphId, TimeSlot> = TagLayer::new("time-slot", 3);
        let result = layer.set([
            (sub_graph(1), TimeSlot::Slot(1)),
            (sub_graph(2), TimeSlot::Slot(1)),
            (sub_graph(1), TimeSlot::Slot(2)),
        ]);

        assert_eq!(
            result,
            Err(Error::AmbiguousAssignment {
                layer: "time-slot",
                key: 1
            })
        );
        assert!(layer.is_empty());
    }

    #[test]
    fn test_repeated_identical_value_is_accepted() {
        let mut layer: TagLayer<SubGraphId, TimeSlot> = TagLayer::new("time-slot", 1);
        layer
            .set([
                (sub_graph(1), TimeSlot::External),
                (sub_graph(1), TimeSlot::External),
            ])
            .unwrap();
        assert_eq!(layer.get(sub_graph(1)), Some(TimeSlot::External));
    }

    #[test]
    fn test_reset_keys_and_reset() {
        let mut layer: TagLayer<SubGraphId, TimeSlot> = TagLayer::new("time-slot", 3);
        layer
            .set([
                (sub_graph(1), TimeSlot::Slot(1)),
                (sub_graph(2), TimeSlot::Slot(2)),
                (sub_graph(3), TimeSlot::Slot(3)),
            ])
            .unwrap();

        layer.reset_keys([sub_graph(2)]);
        let remaining: Vec<_> = layer.iter().map(|(key, _)| key.get()).collect();
        assert_eq!(remaining, vec![1, 3]);

        layer.reset();
        assert!(layer.is_empty());
    }

    #[test]
    fn test_external_slot_orders_first() {
        assert!(TimeSlot::External < TimeSlot::Slot(1));
        assert!(TimeSlot::Slot(1) < TimeSlot::Slot(2));
    }

    #[test]
    fn test_zero_id_is_rejected() {
        assert!(ComponentId::new(0).is_none());
        assert_eq!(ComponentId::new(4).map(ComponentId::get), Some(4));
    }
}
