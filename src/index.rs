//! Bounding-box index over a feature collection.
//!
//! Backed by an R-tree. The index is built fresh for every scoring call
//! and owned by that call; matching deletes entries as ground-truth
//! features are claimed.

use geo::Coord;
use rstar::{Envelope, RTree, RTreeObject, SelectionFunction, AABB};

use crate::geometry::{BBox, FeatureId};

/// An indexed entry: feature ID, its bounding box and an arbitrary payload.
#[derive(Clone, Debug)]
pub struct IndexEntry<T> {
    pub id: FeatureId,
    pub bbox: BBox,
    pub payload: T,
}

impl<T> RTreeObject for IndexEntry<T> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.bbox.to_aabb()
    }
}

/// Selects the single entry with a given ID and envelope.
struct EntrySelector {
    id: FeatureId,
    envelope: AABB<[f64; 2]>,
}

impl<T> SelectionFunction<IndexEntry<T>> for EntrySelector {
    fn should_unpack_parent(&self, parent_envelope: &AABB<[f64; 2]>) -> bool {
        parent_envelope.contains_envelope(&self.envelope)
    }

    fn should_unpack_leaf(&self, leaf: &IndexEntry<T>) -> bool {
        leaf.id == self.id
    }
}

/// Spatial index supporting insert, box/point query and delete.
pub struct SpatialIndex<T> {
    tree: RTree<IndexEntry<T>>,
}

impl<T> Default for SpatialIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SpatialIndex<T> {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Bulk-loads an index from entries.
    pub fn from_entries(entries: Vec<IndexEntry<T>>) -> Self {
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Inserts an entry.
    pub fn insert(&mut self, id: FeatureId, bbox: BBox, payload: T) {
        self.tree.insert(IndexEntry { id, bbox, payload });
    }

    /// All entries whose bbox intersects `bbox` (boundary inclusive), ordered by ID.
    pub fn query(&self, bbox: &BBox) -> Vec<(FeatureId, &T)> {
        let mut hits: Vec<&IndexEntry<T>> = self
            .tree
            .locate_in_envelope_intersecting(&bbox.to_aabb())
            .collect();
        hits.sort_by_key(|entry| entry.id);
        hits.into_iter()
            .map(|entry| (entry.id, &entry.payload))
            .collect()
    }

    /// All entries whose bbox contains `coord` (boundary inclusive), ordered by ID.
    pub fn query_point(&self, coord: Coord<f64>) -> Vec<(FeatureId, &T)> {
        self.query(&BBox::from_coord(coord))
    }

    /// Removes the entry with `id` stored under `bbox`, returning its payload.
    pub fn delete(&mut self, id: FeatureId, bbox: &BBox) -> Option<T> {
        self.tree
            .remove_with_selection_function(EntrySelector {
                id,
                envelope: bbox.to_aabb(),
            })
            .map(|entry| entry.payload)
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
