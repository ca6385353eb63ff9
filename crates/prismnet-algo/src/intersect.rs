use crate::merge::{CanonicalSegments, SpatialGrid};
use itertools::Itertools;
use nalgebra::{Point2, Vector2};
use prismnet_core::error::GeometryError;
use prismnet_core::report::{Diagnostic, DiagnosticCode};
use rayon::prelude::*;
use std::collections::BTreeSet;

/// Relative sine below which two directions count as parallel.
const PARALLEL_EPS: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub enum Intersection {
    None,
    /// Proper crossing or endpoint contact.
    Point(Point2<f64>),
    /// Collinear overlap; the overlap boundaries, i.e. every endpoint of one
    /// segment that lies on the other.
    Overlap(Vec<Point2<f64>>),
}

#[derive(Debug, Clone)]
pub struct SplitResult {
    pub vertices: Vec<Point2<f64>>,
    /// Atomic edges as `[low, high]` vertex ids, sorted and unique.
    pub edges: Vec<[usize; 2]>,
    /// For every canonical segment, the vertex ids lying on it ordered from
    /// its first endpoint to its second. Empty for rejected segments.
    pub points_on_segment: Vec<Vec<usize>>,
    /// Input indices of the segments that collapsed to a point.
    pub rejected: Vec<usize>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Copy)]
pub struct IntersectionDetector {
    tolerance: f64,
    parallel: bool,
}

impl IntersectionDetector {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            parallel: true,
        }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Tests one pair of segments, accepting contact within the tolerance.
    pub fn intersect_pair(
        &self,
        p: Point2<f64>,
        p2: Point2<f64>,
        q: Point2<f64>,
        q2: Point2<f64>,
    ) -> Intersection {
        let tol = self.tolerance;
        let r = p2 - p;
        let s = q2 - q;
        let rl = r.norm();
        let sl = s.norm();
        if rl <= f64::EPSILON || sl <= f64::EPSILON {
            return Intersection::None;
        }

        let qp = q - p;
        let dq1 = perp_dot(r, qp) / rl;
        let dq2 = perp_dot(r, q2 - p) / rl;
        if dq1.abs() <= tol && dq2.abs() <= tol {
            return self.collinear_overlap(p, p2, q, q2);
        }

        let denom = perp_dot(r, s);
        if denom.abs() > PARALLEL_EPS * rl * sl {
            let t = perp_dot(qp, s) / denom;
            let u = perp_dot(qp, r) / denom;
            let et = tol / rl;
            let eu = tol / sl;
            if (-et..=1.0 + et).contains(&t) && (-eu..=1.0 + eu).contains(&u) {
                return Intersection::Point(p + r * t);
            }
        }

        // At shallow angles the lines meet far past an endpoint that is
        // still within tolerance of the other segment.
        self.endpoint_contact(p, p2, q, q2)
            .map_or(Intersection::None, Intersection::Point)
    }

    /// The endpoint closest to the other segment, if within tolerance.
    fn endpoint_contact(
        &self,
        p: Point2<f64>,
        p2: Point2<f64>,
        q: Point2<f64>,
        q2: Point2<f64>,
    ) -> Option<Point2<f64>> {
        [(p, q, q2), (p2, q, q2), (q, p, p2), (q2, p, p2)]
            .into_iter()
            .map(|(x, a, b)| (x, distance_to_segment(x, a, b)))
            .filter(|&(_, d)| d <= self.tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(x, _)| x)
    }

    fn collinear_overlap(
        &self,
        p: Point2<f64>,
        p2: Point2<f64>,
        q: Point2<f64>,
        q2: Point2<f64>,
    ) -> Intersection {
        let on = |x: Point2<f64>, a: Point2<f64>, b: Point2<f64>| {
            let d = b - a;
            let t = (x - a).dot(&d) / d.norm_squared();
            let e = self.tolerance / d.norm();
            (-e..=1.0 + e).contains(&t)
        };
        let points: Vec<Point2<f64>> = [(p, q, q2), (p2, q, q2), (q, p, p2), (q2, p, p2)]
            .into_iter()
            .filter(|&(x, a, b)| on(x, a, b))
            .map(|(x, _, _)| x)
            .collect();
        if points.is_empty() {
            Intersection::None
        } else {
            Intersection::Overlap(points)
        }
    }

    /// Splits every canonical segment at all intersection points lying on it.
    pub fn split(&self, input: &CanonicalSegments) -> SplitResult {
        let tol = self.tolerance;
        let mut diagnostics = Vec::new();
        let mut rejected = Vec::new();

        let valid: Vec<usize> = input
            .segments
            .iter()
            .enumerate()
            .filter_map(|(i, &[a, b])| {
                if a == b {
                    let index = input.source.get(i).copied().unwrap_or(i);
                    let err = GeometryError::ZeroLengthSegment { index };
                    diagnostics.push(
                        Diagnostic::warning(DiagnosticCode::ZeroLengthSegment, err.to_string())
                            .with_segment(index),
                    );
                    rejected.push(index);
                    None
                } else {
                    Some(i)
                }
            })
            .collect();

        let ends = |i: usize| {
            let [a, b] = input.segments[i];
            (input.vertices[a], input.vertices[b])
        };

        let test = |x: usize, y: usize| -> Option<(usize, usize, Intersection)> {
            let (i, j) = (valid[x], valid[y]);
            let (p, p2) = ends(i);
            let (q, q2) = ends(j);
            if !boxes_touch(p, p2, q, q2, tol) {
                return None;
            }
            match self.intersect_pair(p, p2, q, q2) {
                Intersection::None => None,
                hit => Some((i, j, hit)),
            }
        };

        // Collected in pair order either way, so the merge below is stable.
        let m = valid.len();
        let hits: Vec<(usize, usize, Intersection)> = if self.parallel {
            (0..m)
                .into_par_iter()
                .flat_map_iter(|x| (x + 1..m).filter_map(move |y| test(x, y)))
                .collect()
        } else {
            (0..m)
                .flat_map(|x| (x + 1..m).filter_map(move |y| test(x, y)))
                .collect()
        };

        let mut pool = VertexPool::new(&input.vertices, tol);
        let mut on_segment: Vec<Vec<usize>> = vec![Vec::new(); input.segments.len()];
        for &i in &valid {
            on_segment[i].extend(input.segments[i]);
        }
        for (i, j, hit) in hits {
            let points = match hit {
                Intersection::None => Vec::new(),
                Intersection::Point(p) => vec![p],
                Intersection::Overlap(ps) => ps,
            };
            for p in points {
                let id = pool.insert(p);
                on_segment[i].push(id);
                on_segment[j].push(id);
            }
        }

        let vertices = pool.into_points();
        let mut edges = BTreeSet::new();
        for &i in &valid {
            let [a, _] = input.segments[i];
            let (start, end) = ends(i);
            let dir = end - start;
            let ids = &mut on_segment[i];
            ids.sort_by(|&x, &y| {
                let tx = (vertices[x] - vertices[a]).dot(&dir);
                let ty = (vertices[y] - vertices[a]).dot(&dir);
                tx.total_cmp(&ty).then(x.cmp(&y))
            });
            ids.dedup();
            for (&u, &v) in ids.iter().tuple_windows() {
                if u != v {
                    edges.insert([u.min(v), u.max(v)]);
                }
            }
        }

        SplitResult {
            vertices,
            edges: edges.into_iter().collect(),
            points_on_segment: on_segment,
            rejected,
            diagnostics,
        }
    }
}

fn perp_dot(v1: Vector2<f64>, v2: Vector2<f64>) -> f64 {
    v1.x * v2.y - v1.y * v2.x
}

fn distance_to_segment(x: Point2<f64>, a: Point2<f64>, b: Point2<f64>) -> f64 {
    let d = b - a;
    let t = ((x - a).dot(&d) / d.norm_squared()).clamp(0.0, 1.0);
    (x - (a + d * t)).norm()
}

fn boxes_touch(p: Point2<f64>, p2: Point2<f64>, q: Point2<f64>, q2: Point2<f64>, tol: f64) -> bool {
    p.x.min(p2.x) - tol <= q.x.max(q2.x)
        && q.x.min(q2.x) - tol <= p.x.max(p2.x)
        && p.y.min(p2.y) - tol <= q.y.max(q2.y)
        && q.y.min(q2.y) - tol <= p.y.max(p2.y)
}

/// Canonical vertices plus intersection points snapped onto them.
struct VertexPool {
    points: Vec<Point2<f64>>,
    grid: SpatialGrid,
    tolerance: f64,
}

impl VertexPool {
    fn new(seed: &[Point2<f64>], tolerance: f64) -> Self {
        Self {
            points: seed.to_vec(),
            grid: SpatialGrid::build(seed, tolerance),
            tolerance,
        }
    }

    /// Id of the nearest existing vertex within tolerance, or a new vertex.
    fn insert(&mut self, p: Point2<f64>) -> usize {
        let nearest = self
            .grid
            .neighbors(&p)
            .map(|id| (id, (self.points[id] - p).norm()))
            .filter(|&(_, d)| d <= self.tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        if let Some((id, _)) = nearest {
            return id;
        }
        let id = self.points.len();
        self.points.push(p);
        self.grid.insert(id, &p);
        id
    }

    fn into_points(self) -> Vec<Point2<f64>> {
        self.points
    }
}
