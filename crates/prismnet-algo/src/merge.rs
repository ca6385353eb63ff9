//! Tolerance-based canonicalization of near-duplicate coordinates.
//!
//! Points are clustered by the transitive closure of "within tolerance" and
//! each cluster is replaced by its centroid. The pass is repeated until no
//! two canonical points are within tolerance of each other, which makes the
//! result a fixed point: merging it again changes nothing.

use nalgebra::Point2;
use prismnet_core::error::GeometryError;
use prismnet_core::model::Segment;
use prismnet_core::report::{Diagnostic, DiagnosticCode};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct MergeResult {
    pub canonical: Vec<Point2<f64>>,
    /// For every input point, the index of its canonical point.
    pub assignment: Vec<usize>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Copy)]
pub struct PointMerger {
    tolerance: f64,
}

impl PointMerger {
    pub fn new(tolerance: f64) -> Result<Self, GeometryError> {
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(GeometryError::InvalidTolerance(tolerance));
        }
        Ok(Self { tolerance })
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn merge(&self, points: &[Point2<f64>]) -> MergeResult {
        let mut current = points.to_vec();
        let mut assignment: Vec<usize> = (0..points.len()).collect();
        let mut diagnostics = Vec::new();

        loop {
            let pass = self.cluster_pass(&current);
            for a in assignment.iter_mut() {
                *a = pass.labels[*a];
            }
            diagnostics.extend(pass.diagnostics);
            let merged_any = pass.centroids.len() < current.len();
            current = pass.centroids;
            if !merged_any {
                break;
            }
        }

        MergeResult {
            canonical: current,
            assignment,
            diagnostics,
        }
    }

    fn cluster_pass(&self, points: &[Point2<f64>]) -> ClusterPass {
        let tol = self.tolerance;
        let grid = SpatialGrid::build(points, tol);
        let mut dsu = DisjointSet::new(points.len());

        for (i, p) in points.iter().enumerate() {
            for j in grid.neighbors(p) {
                if j > i && (points[j] - p).norm() <= tol {
                    dsu.union(i, j);
                }
            }
        }

        // Cluster ids follow the first member's input order.
        let mut cluster_of_root: HashMap<usize, usize> = HashMap::new();
        let mut members: Vec<Vec<usize>> = Vec::new();
        let mut labels = Vec::with_capacity(points.len());
        for i in 0..points.len() {
            let root = dsu.find(i);
            let id = *cluster_of_root.entry(root).or_insert_with(|| {
                members.push(Vec::new());
                members.len() - 1
            });
            members[id].push(i);
            labels.push(id);
        }

        let mut diagnostics = Vec::new();
        let centroids = members
            .iter()
            .map(|m| {
                let (sx, sy) = m
                    .iter()
                    .fold((0.0, 0.0), |(sx, sy), &i| (sx + points[i].x, sy + points[i].y));
                let k = m.len() as f64;
                let c = Point2::new(sx / k, sy / k);
                if m.len() > 2 && cluster_diameter(points, m) > tol {
                    diagnostics.push(Diagnostic::warning(
                        DiagnosticCode::ChainedMerge,
                        format!(
                            "{} points chained into one vertex at ({:.4}, {:.4}); some pairs are farther apart than the tolerance {tol}",
                            m.len(),
                            c.x,
                            c.y
                        ),
                    ));
                }
                c
            })
            .collect();

        ClusterPass {
            centroids,
            labels,
            diagnostics,
        }
    }
}

/// Endpoints of `segments` snapped to canonical vertices.
#[derive(Debug, Clone)]
pub struct CanonicalSegments {
    pub vertices: Vec<Point2<f64>>,
    /// Per kept segment, the canonical vertex ids of its two endpoints.
    pub segments: Vec<[usize; 2]>,
    /// Per kept segment, its index in the input slice.
    pub source: Vec<usize>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Snaps segment endpoints together. Segments with a non-finite coordinate
/// are dropped and reported.
pub fn canonicalize_segments(merger: &PointMerger, segments: &[Segment]) -> CanonicalSegments {
    let mut diagnostics = Vec::new();
    let mut source = Vec::with_capacity(segments.len());
    let mut endpoints = Vec::with_capacity(segments.len() * 2);
    for (i, s) in segments.iter().enumerate() {
        if !(s.a.is_finite() && s.b.is_finite()) {
            diagnostics.push(
                Diagnostic::warning(
                    DiagnosticCode::NonFiniteSegment,
                    format!("segment {i} has a non-finite coordinate"),
                )
                .with_segment(i),
            );
            continue;
        }
        source.push(i);
        endpoints.push(Point2::new(s.a.x, s.a.y));
        endpoints.push(Point2::new(s.b.x, s.b.y));
    }

    let merged = merger.merge(&endpoints);
    diagnostics.extend(merged.diagnostics);
    let segments = merged
        .assignment
        .chunks_exact(2)
        .map(|ids| [ids[0], ids[1]])
        .collect();
    CanonicalSegments {
        vertices: merged.canonical,
        segments,
        source,
        diagnostics,
    }
}

struct ClusterPass {
    centroids: Vec<Point2<f64>>,
    labels: Vec<usize>,
    diagnostics: Vec<Diagnostic>,
}

fn cluster_diameter(points: &[Point2<f64>], members: &[usize]) -> f64 {
    let mut max_d = 0.0f64;
    for (k, &i) in members.iter().enumerate() {
        for &j in &members[k + 1..] {
            max_d = max_d.max((points[i] - points[j]).norm());
        }
    }
    max_d
}

/// Uniform hash grid with cells as wide as the query radius, so every
/// candidate within the radius sits in one of the 3x3 surrounding cells.
pub(crate) struct SpatialGrid {
    cell: f64,
    cells: HashMap<(i64, i64), Vec<usize>>,
}

impl SpatialGrid {
    pub(crate) fn new(cell: f64) -> Self {
        Self {
            cell,
            cells: HashMap::new(),
        }
    }

    pub(crate) fn build(points: &[Point2<f64>], cell: f64) -> Self {
        let mut grid = Self::new(cell);
        for (i, p) in points.iter().enumerate() {
            grid.insert(i, p);
        }
        grid
    }

    fn key(&self, p: &Point2<f64>) -> (i64, i64) {
        (
            (p.x / self.cell).floor() as i64,
            (p.y / self.cell).floor() as i64,
        )
    }

    pub(crate) fn insert(&mut self, id: usize, p: &Point2<f64>) {
        let key = self.key(p);
        self.cells.entry(key).or_default().push(id);
    }

    pub(crate) fn neighbors<'a>(&'a self, p: &Point2<f64>) -> impl Iterator<Item = usize> + 'a {
        let (gx, gy) = self.key(p);
        (gx - 1..=gx + 1)
            .flat_map(move |x| (gy - 1..=gy + 1).map(move |y| (x, y)))
            .filter_map(move |k| self.cells.get(&k))
            .flatten()
            .copied()
    }
}

#[derive(Debug, Clone)]
struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = x;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let mut ra = self.find(a);
        let mut rb = self.find(b);
        if ra == rb {
            return;
        }
        let rank_a = self.rank[ra];
        let rank_b = self.rank[rb];
        if rank_a < rank_b {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        if rank_a == rank_b {
            self.rank[ra] = rank_a.saturating_add(1);
        }
    }
}
