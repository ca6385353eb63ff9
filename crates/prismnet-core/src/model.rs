use crate::geom::{point_segment_distance, BBox2, Vec2};
use serde::{Deserialize, Serialize};

/// One drawn line, as handed over by an importer. Never mutated, only split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub a: Vec2,
    pub b: Vec2,
}

impl Segment {
    pub const fn new(a: Vec2, b: Vec2) -> Self {
        Self { a, b }
    }
}

/// A filled closed shape from the source drawing, kept so detected faces can
/// be traced back to the color they were painted with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillRegion {
    pub id: u64,
    pub color: String,
    pub outline: Vec<Vec2>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Drawing {
    pub segments: Vec<Segment>,
    /// In document order; later entries paint over earlier ones.
    pub fills: Vec<FillRegion>,
}

/// A closed vertex loop; the closing edge from the last vertex back to the
/// first is implicit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub vertices: Vec<Vec2>,
}

impl Polygon {
    pub fn new(vertices: Vec<Vec2>) -> Self {
        Self { vertices }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Edges as `(start, end)` pairs in loop order, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Shoelace area; positive for counter-clockwise loops.
    pub fn signed_area(&self) -> f64 {
        if self.vertices.len() < 3 {
            return 0.0;
        }
        self.edges().map(|(a, b)| a.cross(b)).sum::<f64>() * 0.5
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn is_ccw(&self) -> bool {
        self.signed_area() > 0.0
    }

    /// Copy of this polygon with counter-clockwise winding.
    pub fn to_ccw(&self) -> Polygon {
        let mut vertices = self.vertices.clone();
        if self.signed_area() < 0.0 {
            vertices.reverse();
        }
        Polygon { vertices }
    }

    /// Area centroid; falls back to the vertex mean for zero-area loops.
    pub fn centroid(&self) -> Vec2 {
        let n = self.vertices.len();
        if n == 0 {
            return Vec2::new(0.0, 0.0);
        }
        let area = self.signed_area();
        if area.abs() <= f64::EPSILON {
            let sum = self
                .vertices
                .iter()
                .fold(Vec2::new(0.0, 0.0), |acc, v| acc + *v);
            return sum * (1.0 / n as f64);
        }
        let mut cx = 0.0;
        let mut cy = 0.0;
        for (a, b) in self.edges() {
            let f = a.cross(b);
            cx += (a.x + b.x) * f;
            cy += (a.y + b.y) * f;
        }
        Vec2::new(cx / (6.0 * area), cy / (6.0 * area))
    }

    pub fn bbox(&self) -> BBox2 {
        BBox2::from_points(&self.vertices)
    }

    /// Even-odd ray casting. Points exactly on the boundary may land either way;
    /// use [`Polygon::boundary_distance`] when that matters.
    pub fn contains_point(&self, p: Vec2) -> bool {
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > p.y) != (b.y > p.y) {
                let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x {
                    inside = !inside;
                }
            }
        }
        inside
    }

    pub fn boundary_distance(&self, p: Vec2) -> f64 {
        self.edges()
            .map(|(a, b)| point_segment_distance(p, a, b))
            .fold(f64::INFINITY, f64::min)
    }

    /// Inside and farther than `eps` from every edge.
    pub fn strictly_contains(&self, p: Vec2, eps: f64) -> bool {
        self.contains_point(p) && self.boundary_distance(p) > eps
    }

    /// A point guaranteed to lie inside the loop: the centroid when it does,
    /// otherwise the middle of the widest interior span on the horizontal line
    /// through the centroid.
    pub fn interior_point(&self) -> Vec2 {
        let c = self.centroid();
        if self.strictly_contains(c, 1e-9) {
            return c;
        }

        let mut xs: Vec<f64> = self
            .edges()
            .filter(|(a, b)| (a.y > c.y) != (b.y > c.y))
            .map(|(a, b)| a.x + (c.y - a.y) * (b.x - a.x) / (b.y - a.y))
            .collect();
        xs.sort_by(f64::total_cmp);

        xs.chunks_exact(2)
            .max_by(|l, r| (l[1] - l[0]).total_cmp(&(r[1] - r[0])))
            .map(|span| Vec2::new((span[0] + span[1]) * 0.5, c.y))
            .unwrap_or(c)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GluesTo {
    /// Flap on a side face's bottom edge, glued under a base edge.
    Base,
    /// Flap on a base edge, glued behind a side face's bottom edge.
    SideFace,
    /// Flap on the free vertical edge of the strip, closing the tube.
    Seam,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PieceKind {
    SideFace { edge: usize },
    Base,
    Flap { edge: usize, glues_to: GluesTo },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetPiece {
    pub kind: PieceKind,
    pub outline: Vec<Vec2>,
}

impl NetPiece {
    pub fn bbox(&self) -> BBox2 {
        BBox2::from_points(&self.outline)
    }
}

/// Flattened cut-and-fold pattern for one prism.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Net {
    pub height: f64,
    pub flap_width: f64,
    pub pieces: Vec<NetPiece>,
    /// Shared edges between pieces, drawn as fold marks.
    pub fold_lines: Vec<(Vec2, Vec2)>,
}

impl Net {
    pub fn side_faces(&self) -> impl Iterator<Item = &NetPiece> {
        self.pieces
            .iter()
            .filter(|p| matches!(p.kind, PieceKind::SideFace { .. }))
    }

    pub fn base(&self) -> Option<&NetPiece> {
        self.pieces.iter().find(|p| p.kind == PieceKind::Base)
    }

    pub fn flaps(&self) -> impl Iterator<Item = &NetPiece> {
        self.pieces
            .iter()
            .filter(|p| matches!(p.kind, PieceKind::Flap { .. }))
    }

    /// Every piece outline as closed point-pair paths, in piece order.
    pub fn segments(&self) -> Vec<(Vec2, Vec2)> {
        let mut out = Vec::new();
        for piece in &self.pieces {
            let n = piece.outline.len();
            for i in 0..n {
                out.push((piece.outline[i], piece.outline[(i + 1) % n]));
            }
        }
        out
    }

    pub fn bbox(&self) -> BBox2 {
        self.pieces
            .iter()
            .fold(BBox2::empty(), |acc, p| acc.union(&p.bbox()))
    }
}
