use std::collections::BTreeMap;

use glam::DVec3;
use log::debug;

/// Point sets kept between detection runs, keyed by name.
///
/// Owned by the caller; nothing is shared between sessions.
#[derive(Debug, Clone, Default)]
pub struct DetectionSession {
    kept: BTreeMap<String, Vec<DVec3>>,
}

impl DetectionSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `points` under `name`, returning the set it replaces.
    pub fn keep(&mut self, name: impl Into<String>, points: Vec<DVec3>) -> Option<Vec<DVec3>> {
        let name = name.into();
        debug!("Keeping {} points as '{}'", points.len(), name);
        self.kept.insert(name, points)
    }

    pub fn get(&self, name: &str) -> Option<&[DVec3]> {
        self.kept.get(name).map(Vec::as_slice)
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<DVec3>> {
        self.kept.remove(name)
    }

    /// Names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.kept.keys().map(String::as_str)
    }

    pub fn reset(&mut self) {
        debug!("Discarding {} kept point sets", self.kept.len());
        self.kept.clear();
    }

    pub fn len(&self) -> usize {
        self.kept.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
}
