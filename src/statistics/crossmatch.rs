//! Spatial hashing of sky positions.
//!
//! Positions are stored as unit vectors binned on a cubic grid whose cell side is the
//! matching radius expressed as a chord. Any point within the radius of a query is then in
//! one of the 27 cells surrounding the query cell.
use std::collections::HashMap;

use ahash::RandomState;
use nalgebra::Vector3;
use smallvec::SmallVec;

use crate::{
    constants::{Degree, RADEG},
    sky::vector_separation,
};

type CellKey = (i64, i64, i64);

/// Chord length subtending `angle` on the unit sphere.
#[inline]
fn chord(angle: Degree) -> f64 {
    2.0 * (0.5 * angle * RADEG).sin()
}

#[derive(Debug, Clone)]
pub(crate) struct SkyGrid {
    cell: f64,
    cells: HashMap<CellKey, SmallVec<[usize; 4]>, RandomState>,
}

impl SkyGrid {
    /// Empty grid able to answer queries up to `radius` degrees.
    pub(crate) fn new(radius: Degree) -> Self {
        SkyGrid {
            cell: chord(radius).max(f64::MIN_POSITIVE),
            cells: HashMap::with_hasher(RandomState::new()),
        }
    }

    fn key(&self, p: &Vector3<f64>) -> CellKey {
        (
            (p.x / self.cell).floor() as i64,
            (p.y / self.cell).floor() as i64,
            (p.z / self.cell).floor() as i64,
        )
    }

    pub(crate) fn insert(&mut self, p: &Vector3<f64>, index: usize) {
        let key = self.key(p);
        self.cells.entry(key).or_default().push(index);
    }

    /// Move `index` from the cell of `from` to the cell of `to`.
    pub(crate) fn relocate(&mut self, from: &Vector3<f64>, to: &Vector3<f64>, index: usize) {
        let (old, new) = (self.key(from), self.key(to));
        if old == new {
            return;
        }
        if let Some(indices) = self.cells.get_mut(&old) {
            indices.retain(|i| *i != index);
            if indices.is_empty() {
                self.cells.remove(&old);
            }
        }
        self.cells.entry(new).or_default().push(index);
    }

    /// Every stored index whose cell neighbours the cell of `p`.
    pub(crate) fn candidates<'a>(&'a self, p: &Vector3<f64>) -> impl Iterator<Item = usize> + 'a {
        let (i, j, k) = self.key(p);
        (-1..=1)
            .flat_map(move |di| (-1..=1).flat_map(move |dj| (-1..=1).map(move |dk| (di, dj, dk))))
            // saturated keys (vanishing radius) have no neighbour past the edge
            .filter_map(move |(di, dj, dk)| {
                Some((i.checked_add(di)?, j.checked_add(dj)?, k.checked_add(dk)?))
            })
            .filter_map(|key| self.cells.get(&key))
            .flat_map(|indices| indices.iter().copied())
    }
}

/// Fixed set of positions indexed for nearest-neighbour queries.
#[derive(Debug, Clone)]
pub(crate) struct PointIndex {
    radius: Degree,
    points: Vec<Vector3<f64>>,
    grid: SkyGrid,
}

impl PointIndex {
    pub(crate) fn new(points: Vec<Vector3<f64>>, radius: Degree) -> Self {
        let mut grid = SkyGrid::new(radius);
        for (index, p) in points.iter().enumerate() {
            grid.insert(p, index);
        }
        PointIndex {
            radius,
            points,
            grid,
        }
    }

    /// Nearest indexed point within the radius, with its separation in degrees.
    pub(crate) fn nearest(&self, p: &Vector3<f64>) -> Option<(usize, Degree)> {
        self.grid
            .candidates(p)
            .map(|index| (index, vector_separation(p, &self.points[index])))
            .filter(|&(_, sep)| sep <= self.radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

/// Group of detections believed to be the same physical star.
#[derive(Debug, Clone)]
pub(crate) struct StarGroup {
    sum: Vector3<f64>,
    pub(crate) members: SmallVec<[usize; 8]>,
}

impl StarGroup {
    /// Running centroid, as a unit vector.
    pub(crate) fn centroid(&self) -> Vector3<f64> {
        self.sum.normalize()
    }
}

/// Friends-of-centroid association.
///
/// Each position joins the group whose running centroid is nearest and within `radius`
/// degrees, or seeds a new group. Positions are consumed in the given order, so the
/// grouping depends on the input order.
pub(crate) fn group_positions(positions: &[Vector3<f64>], radius: Degree) -> Vec<StarGroup> {
    // groups are indexed by their current centroid
    let mut grid = SkyGrid::new(radius);
    let mut groups: Vec<StarGroup> = Vec::new();

    for (index, p) in positions.iter().enumerate() {
        let best = grid
            .candidates(p)
            .map(|g| (g, vector_separation(p, &groups[g].centroid())))
            .filter(|&(_, sep)| sep <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1));

        match best {
            Some((g, _)) => {
                let before = groups[g].centroid();
                groups[g].sum += p;
                groups[g].members.push(index);
                grid.relocate(&before, &groups[g].centroid(), g);
            }
            None => {
                grid.insert(p, groups.len());
                let mut members = SmallVec::new();
                members.push(index);
                groups.push(StarGroup { sum: *p, members });
            }
        }
    }
    groups
}
