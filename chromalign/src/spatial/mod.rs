//! Nearest-neighbor search over sparse sample locations.
//!
//! A k-d tree over 2-D or 3-D points, each carrying a value. The tree is
//! built once and then queried concurrently through shared references.

use glam::DVec3;

use crate::grid::Dimensionality;

#[cfg(test)]
mod tests;

/// Result of a nearest-neighbor query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Index of the point in the slice the tree was built from.
    pub index: usize,
    pub dist_sq: f64,
}

impl Neighbor {
    /// Closer wins; equal distances resolve to the lower index.
    #[inline]
    fn beats(&self, other: &Neighbor) -> bool {
        self.dist_sq < other.dist_sq || (self.dist_sq == other.dist_sq && self.index < other.index)
    }
}

#[derive(Debug)]
pub struct KdTree<V> {
    nodes: Vec<KdNode>,
    points: Vec<DVec3>,
    values: Vec<V>,
    dims: usize,
}

#[derive(Debug, Clone)]
struct KdNode {
    point_idx: usize,
    left: Option<usize>,
    right: Option<usize>,
    split_dim: usize,
}

impl<V> KdTree<V> {
    /// Builds a median-split tree. Planar trees ignore the `z` coordinate.
    ///
    /// Returns `None` when `points` is empty or its length differs from `values`.
    pub fn build(points: &[DVec3], values: Vec<V>, dims: Dimensionality) -> Option<Self> {
        if points.is_empty() || points.len() != values.len() {
            return None;
        }

        let dims = dims.count();
        let points: Vec<DVec3> = points
            .iter()
            .map(|p| if dims == 2 { p.truncate().extend(0.0) } else { *p })
            .collect();
        let mut indices: Vec<usize> = (0..points.len()).collect();
        let mut nodes = Vec::with_capacity(points.len());

        Self::build_recursive(&points, &mut indices, 0, dims, &mut nodes);

        Some(Self {
            nodes,
            points,
            values,
            dims,
        })
    }

    fn build_recursive(
        points: &[DVec3],
        indices: &mut [usize],
        depth: usize,
        dims: usize,
        nodes: &mut Vec<KdNode>,
    ) -> Option<usize> {
        if indices.is_empty() {
            return None;
        }

        let split_dim = depth % dims;
        indices.sort_by(|&a, &b| {
            points[a][split_dim]
                .total_cmp(&points[b][split_dim])
                .then(a.cmp(&b))
        });

        let median = indices.len() / 2;
        let node_idx = nodes.len();
        nodes.push(KdNode {
            point_idx: indices[median],
            left: None,
            right: None,
            split_dim,
        });

        let (left_indices, right_part) = indices.split_at_mut(median);
        let right_indices = &mut right_part[1..];

        let left = Self::build_recursive(points, left_indices, depth + 1, dims, nodes);
        let right = Self::build_recursive(points, right_indices, depth + 1, dims, nodes);

        nodes[node_idx].left = left;
        nodes[node_idx].right = right;

        Some(node_idx)
    }

    /// Closest point to `query`, lowest index among equidistant points.
    pub fn nearest(&self, query: DVec3) -> Option<Neighbor> {
        if self.nodes.is_empty() {
            return None;
        }
        let query = if self.dims == 2 {
            query.truncate().extend(0.0)
        } else {
            query
        };
        let mut best = Neighbor {
            index: usize::MAX,
            dist_sq: f64::INFINITY,
        };
        self.nearest_recursive(0, query, &mut best);
        // Non-finite distances never beat the sentinel.
        (best.index < self.points.len()).then_some(best)
    }

    fn nearest_recursive(&self, node_idx: usize, query: DVec3, best: &mut Neighbor) {
        let node = &self.nodes[node_idx];
        let point = self.points[node.point_idx];

        let candidate = Neighbor {
            index: node.point_idx,
            dist_sq: query.distance_squared(point),
        };
        if candidate.beats(best) {
            *best = candidate;
        }

        let diff = query[node.split_dim] - point[node.split_dim];
        let (first, second) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(first_idx) = first {
            self.nearest_recursive(first_idx, query, best);
        }

        // Equal distances may hide a lower index on the far side.
        if let Some(second_idx) = second {
            if diff * diff <= best.dist_sq {
                self.nearest_recursive(second_idx, query, best);
            }
        }
    }

    /// Value carried by the nearest point.
    pub fn nearest_value(&self, query: DVec3) -> Option<&V> {
        self.nearest(query).map(|n| &self.values[n.index])
    }

    #[inline]
    pub fn value(&self, index: usize) -> &V {
        &self.values[index]
    }

    #[inline]
    pub fn point(&self, index: usize) -> DVec3 {
        self.points[index]
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
