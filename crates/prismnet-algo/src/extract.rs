use crate::graph::{PlanarGraph, VertexId};
use itertools::Itertools;
use prismnet_core::geom::Vec2;
use prismnet_core::model::{FillRegion, Polygon};
use prismnet_core::report::{Diagnostic, DiagnosticCode};
use std::collections::HashSet;

/// Clearance used when deciding whether an interior point is strictly inside
/// another face.
const CONTAINMENT_EPS: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPolygon {
    /// Position in the output set.
    pub index: usize,
    /// Counter-clockwise corner loop.
    pub polygon: Polygon,
    /// Graph vertices of the traced loop, before straight-through vertices
    /// were dropped.
    pub face: Vec<VertexId>,
    pub area: f64,
    pub interior: Vec2,
    /// Index into the drawing's fills of the region this face was painted by.
    pub fill: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub polygons: Vec<ExtractedPolygon>,
    pub faces_traced: usize,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Copy)]
pub struct PolygonExtractor {
    pub tolerance: f64,
    pub max_sides: usize,
    pub min_area: f64,
}

impl PolygonExtractor {
    pub fn new(tolerance: f64, max_sides: usize, min_area: f64) -> Self {
        Self {
            tolerance,
            max_sides,
            min_area,
        }
    }

    pub fn extract(&self, graph: &PlanarGraph, fills: &[FillRegion]) -> Extraction {
        let mut diagnostics = Vec::new();

        let (graph, dangling) = graph.without_dangling();
        for [a, b] in dangling {
            let (pa, pb) = (graph.vertex(a), graph.vertex(b));
            diagnostics.push(Diagnostic::warning(
                DiagnosticCode::DanglingEdge,
                format!(
                    "edge ({:.4}, {:.4})-({:.4}, {:.4}) does not bound any face",
                    pa.x, pa.y, pb.x, pb.y
                ),
            ));
        }

        let trace = graph.trace_faces();
        for walk in &trace.open {
            diagnostics.push(Diagnostic::error(
                DiagnosticCode::OpenFace,
                format!(
                    "face walk starting at vertex {} did not close after {} steps",
                    walk.first().copied().unwrap_or_default(),
                    walk.len()
                ),
            ));
        }

        let faces_traced = trace.faces.len();
        let mut candidates = Vec::new();
        for face in trace.faces {
            let loop_points: Vec<Vec2> = face
                .iter()
                .map(|&v| {
                    let p = graph.vertex(v);
                    Vec2::new(p.x, p.y)
                })
                .collect();
            let raw = Polygon::new(loop_points);

            // Clockwise loops are outer boundaries of connected components.
            if raw.signed_area() <= 0.0 {
                continue;
            }

            let unique: HashSet<VertexId> = face.iter().copied().collect();
            if unique.len() != face.len() {
                diagnostics.push(Diagnostic::warning(
                    DiagnosticCode::DegenerateFace,
                    format!(
                        "face near ({:.4}, {:.4}) revisits a vertex",
                        raw.centroid().x,
                        raw.centroid().y
                    ),
                ));
                continue;
            }

            let polygon = drop_straight_vertices(&raw, self.tolerance);
            let area = polygon.area();
            if polygon.len() < 3 || area <= self.min_area {
                diagnostics.push(Diagnostic::warning(
                    DiagnosticCode::DegenerateFace,
                    format!(
                        "face near ({:.4}, {:.4}) collapses to area {area:.3e}",
                        raw.centroid().x,
                        raw.centroid().y
                    ),
                ));
                continue;
            }

            if polygon.len() > self.max_sides {
                let c = polygon.centroid();
                diagnostics.push(Diagnostic::warning(
                    DiagnosticCode::TooManySides,
                    format!(
                        "face near ({:.4}, {:.4}) has {} sides; at most {} are supported",
                        c.x,
                        c.y,
                        polygon.len(),
                        self.max_sides
                    ),
                ));
                continue;
            }

            candidates.push(ExtractedPolygon {
                index: 0,
                interior: polygon.interior_point(),
                area,
                polygon,
                face,
                fill: None,
            });
        }

        let nested = nested_outer_faces(&candidates);
        let mut polygons = Vec::new();
        for (i, mut cand) in candidates.into_iter().enumerate() {
            if let Some(&inner) = nested.get(&i) {
                let c = cand.polygon.centroid();
                diagnostics.push(Diagnostic::info(
                    DiagnosticCode::NestedFace,
                    format!(
                        "face near ({:.4}, {:.4}) encloses a smaller face (candidate {inner}); keeping the inner one",
                        c.x, c.y
                    ),
                ));
                continue;
            }
            cand.index = polygons.len();
            polygons.push(cand);
        }

        if !fills.is_empty() {
            let outlines: Vec<Polygon> = fills.iter().map(|f| Polygon::new(f.outline.clone())).collect();
            for poly in &mut polygons {
                let (fill, exact) = match_fill(poly.interior, &outlines);
                poly.fill = fill;
                if !exact {
                    if let Some(f) = fill {
                        diagnostics.push(
                            Diagnostic::info(
                                DiagnosticCode::UnmatchedFill,
                                format!(
                                    "no fill contains polygon {}; using nearest fill {:?}",
                                    poly.index, fills[f].color
                                ),
                            )
                            .with_polygon(poly.index),
                        );
                    }
                }
            }
        }

        Extraction {
            polygons,
            faces_traced,
            diagnostics,
        }
    }
}

/// Removes vertices lying within `tolerance` of the chord between their
/// neighbors, repeating until every remaining vertex is a real corner.
pub fn drop_straight_vertices(polygon: &Polygon, tolerance: f64) -> Polygon {
    let mut pts = polygon.vertices.clone();
    loop {
        let n = pts.len();
        if n <= 3 {
            break;
        }
        let straight = (0..n).find(|&i| {
            let prev = pts[(i + n - 1) % n];
            let cur = pts[i];
            let next = pts[(i + 1) % n];
            let chord = next - prev;
            let len = chord.norm();
            if len <= f64::EPSILON {
                return false;
            }
            let t = (cur - prev).dot(chord) / (len * len);
            let off = (cur - prev).cross(chord).abs() / len;
            t > 0.0 && t < 1.0 && off <= tolerance
        });
        match straight {
            Some(i) => {
                pts.remove(i);
            }
            None => break,
        }
    }
    Polygon::new(pts)
}

/// Maps the index of every face that strictly contains a smaller face's
/// interior point to the index of one such inner face. Larger absolute area
/// is the outer one; equal areas never nest.
fn nested_outer_faces(candidates: &[ExtractedPolygon]) -> std::collections::HashMap<usize, usize> {
    let mut outer = std::collections::HashMap::new();
    for ((i, a), (j, b)) in candidates.iter().enumerate().tuple_combinations() {
        let (small, big, small_idx, big_idx) = if a.area < b.area {
            (a, b, i, j)
        } else if b.area < a.area {
            (b, a, j, i)
        } else {
            continue;
        };
        if big.polygon.strictly_contains(small.interior, CONTAINMENT_EPS) {
            outer.entry(big_idx).or_insert(small_idx);
        }
    }
    outer
}

/// Topmost (last drawn) fill containing `p`, else the fill whose outline is
/// nearest. The flag is false for the nearest-outline fallback.
fn match_fill(p: Vec2, outlines: &[Polygon]) -> (Option<usize>, bool) {
    if let Some(i) = outlines
        .iter()
        .rposition(|o| o.len() >= 3 && o.contains_point(p))
    {
        return (Some(i), true);
    }
    let nearest = outlines
        .iter()
        .enumerate()
        .filter(|(_, o)| !o.is_empty())
        .map(|(i, o)| (i, o.boundary_distance(p)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i);
    (nearest, false)
}
