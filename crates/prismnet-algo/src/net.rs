//! Unfolding of a right prism into a flat cut-and-fold pattern.
//!
//! Layout, in net coordinates (y up):
//! - side faces form one strip along the x axis, face `i` spanning
//!   `[s_i, s_i + |e_i|] x [0, h]` with `s_0 = 0`;
//! - the base hangs below face 0, mirrored across the hinge `y = 0` so it is
//!   seen from outside;
//! - odd faces carry a bottom flap glued under the base, even base edges
//!   other than the hinge carry a flap glued behind their side face, and the
//!   free right edge of the strip carries the seam flap.

use nalgebra::{Matrix2, Point2, Vector2};
use prismnet_core::error::NetError;
use prismnet_core::geom::Vec2;
use prismnet_core::model::{GluesTo, Net, NetPiece, PieceKind, Polygon};

pub const MIN_SIDES: usize = 3;
pub const MAX_SIDES: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetOptions {
    /// Angle between a flap's slanted side and the edge normal.
    pub flap_angle_deg: f64,
    pub include_base: bool,
    pub seam_flap: bool,
}

impl Default for NetOptions {
    fn default() -> Self {
        Self {
            flap_angle_deg: 30.0,
            include_base: true,
            seam_flap: true,
        }
    }
}

/// Uniform flap width for `polygon`: a third of the shortest distance from
/// any edge midpoint to the centroid.
pub fn flap_width(polygon: &Polygon) -> f64 {
    let c = polygon.centroid();
    polygon
        .edges()
        .map(|(a, b)| a.midpoint(b).distance(c))
        .fold(f64::INFINITY, f64::min)
        / 3.0
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NetBuilder {
    options: NetOptions,
}

impl NetBuilder {
    pub fn new(options: NetOptions) -> Self {
        Self { options }
    }

    pub fn build(&self, polygon: &Polygon, height: f64) -> Result<Net, NetError> {
        if !(height.is_finite() && height > 0.0) {
            return Err(NetError::InvalidHeight(height));
        }
        let n = polygon.len();
        if !(MIN_SIDES..=MAX_SIDES).contains(&n) {
            return Err(NetError::InvalidSideCount(n));
        }
        let angle = self.options.flap_angle_deg;
        if !(angle.is_finite() && (0.0..90.0).contains(&angle)) {
            return Err(NetError::InvalidFlapAngle(angle));
        }
        if polygon.area() <= f64::EPSILON
            || polygon.edges().any(|(a, b)| a.distance(b) <= f64::EPSILON)
        {
            return Err(NetError::DegeneratePolygon);
        }

        let w = flap_width(polygon);
        let slope = angle.to_radians().tan();
        let poly = polygon.to_ccw();
        let lengths: Vec<f64> = poly.edges().map(|(a, b)| a.distance(b)).collect();

        let mut pieces = Vec::new();
        let mut fold_lines = Vec::new();

        let mut x = 0.0;
        for (i, &len) in lengths.iter().enumerate() {
            let bl = Vec2::new(x, 0.0);
            let br = Vec2::new(x + len, 0.0);
            let tr = Vec2::new(x + len, height);
            let tl = Vec2::new(x, height);
            pieces.push(NetPiece {
                kind: PieceKind::SideFace { edge: i },
                outline: vec![bl, br, tr, tl],
            });
            if i > 0 {
                fold_lines.push((bl, tl));
            }
            if i % 2 == 1 {
                pieces.push(flap(bl, br, Vec2::new(0.0, -1.0), w, slope, i, GluesTo::Base));
                fold_lines.push((bl, br));
            }
            x += len;
        }

        if self.options.include_base {
            let base = mirrored_base(&poly);
            fold_lines.push((base[0], base[1]));
            for k in (2..n).step_by(2) {
                let a = base[k];
                let b = base[(k + 1) % n];
                let d = b - a;
                let outward = Vec2::new(-d.y, d.x) * (1.0 / d.norm());
                pieces.push(flap(a, b, outward, w, slope, k, GluesTo::SideFace));
                fold_lines.push((a, b));
            }
            pieces.push(NetPiece {
                kind: PieceKind::Base,
                outline: base,
            });
        }

        if self.options.seam_flap {
            let last = n - 1;
            let a = Vec2::new(x, 0.0);
            let b = Vec2::new(x, height);
            pieces.push(flap(a, b, Vec2::new(1.0, 0.0), w, slope, last, GluesTo::Seam));
            fold_lines.push((a, b));
        }

        Ok(Net {
            height,
            flap_width: w,
            pieces,
            fold_lines,
        })
    }
}

/// The counter-clockwise `poly` reflected so edge 0 lands on `(0,0)-(|e_0|,0)`
/// with the interior below it.
fn mirrored_base(poly: &Polygon) -> Vec<Vec2> {
    let to_point = |v: Vec2| Point2::new(v.x, v.y);
    let origin = to_point(poly.vertices[0]);
    let dir: Vector2<f64> = (to_point(poly.vertices[1]) - origin).normalize();
    let reflect = Matrix2::new(dir.x, dir.y, dir.y, -dir.x);
    poly.vertices
        .iter()
        .map(|&v| {
            let p = reflect * (to_point(v) - origin);
            Vec2::new(p.x, p.y)
        })
        .collect()
}

/// Trapezoid on `a-b` extending `width` along `outward`, each slanted side
/// inset by `width * slope`. Collapses to a triangle when the edge is too
/// short for both insets.
fn flap(a: Vec2, b: Vec2, outward: Vec2, width: f64, slope: f64, edge: usize, glues_to: GluesTo) -> NetPiece {
    let len = a.distance(b);
    let dir = (b - a) * (1.0 / len);
    let inset = width * slope;
    let outline = if 2.0 * inset < len {
        vec![
            a,
            b,
            b + outward * width - dir * inset,
            a + outward * width + dir * inset,
        ]
    } else {
        let apex_height = if slope > 0.0 {
            width.min(0.5 * len / slope)
        } else {
            width
        };
        vec![a, b, a.midpoint(b) + outward * apex_height]
    };
    NetPiece {
        kind: PieceKind::Flap { edge, glues_to },
        outline,
    }
}

/// Whether a flap piece had to be narrowed to a triangle.
pub fn is_narrow_flap(piece: &NetPiece) -> bool {
    matches!(piece.kind, PieceKind::Flap { .. }) && piece.outline.len() == 3
}
