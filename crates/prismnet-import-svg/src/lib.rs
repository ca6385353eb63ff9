use anyhow::{ensure, Context, Result};
use prismnet_core::geom::Vec2;
use prismnet_core::model::{Drawing, FillRegion, Segment};
use roxmltree::{Document, Node};
use std::path::Path;

/// Upper bound on the samples taken along one curve.
const MAX_CURVE_SAMPLES: usize = 256;
const MIN_CURVE_SAMPLES: usize = 10;
const CIRCLE_SIDES: usize = 16;

pub fn import_svg(path: &Path, tolerance: f64) -> Result<Drawing> {
    let xml = std::fs::read_to_string(path).with_context(|| format!("read SVG: {path:?}"))?;
    parse_svg(&xml, tolerance).with_context(|| format!("import SVG: {path:?}"))
}

/// Line work of every `line`, `polyline`, `polygon`, `rect` and `path`
/// element, plus the outlines of filled shapes. Curves are flattened with
/// steps no finer than `tolerance`.
pub fn parse_svg(xml: &str, tolerance: f64) -> Result<Drawing> {
    ensure!(
        tolerance.is_finite() && tolerance > 0.0,
        "tolerance must be finite and positive, got {tolerance}"
    );
    let doc = Document::parse(xml).context("parse SVG XML")?;

    let svg = doc
        .descendants()
        .find(|n| n.has_tag_name("svg"))
        .context("no <svg> root element")?;

    let height = parse_viewbox(svg.attribute("viewBox"))
        .map(|v| v.3)
        .or_else(|| svg.attribute("height").and_then(parse_len));

    let mut importer = Importer {
        svg_height: height,
        tolerance,
        next_id: 1,
        drawing: Drawing::default(),
    };
    importer.walk(svg, Transform2D::identity());
    Ok(importer.drawing)
}

struct Importer {
    svg_height: Option<f64>,
    tolerance: f64,
    next_id: u64,
    drawing: Drawing,
}

impl Importer {
    fn walk(&mut self, node: Node<'_, '_>, parent_tx: Transform2D) {
        let node_tx = parse_transform(node.attribute("transform"));
        let tx = parent_tx.mul(node_tx);

        if node.is_element() {
            match node.tag_name().name() {
                "line" => {
                    if let Some(seg) = parse_line(node) {
                        self.push_segment(tx, seg.0, seg.1);
                    }
                }
                "polyline" | "polygon" => {
                    let closed = node.tag_name().name() == "polygon";
                    if let Some(points) = node.attribute("points").map(parse_points) {
                        self.push_outline(node, tx, &points, closed);
                    }
                }
                "rect" => {
                    if let Some(points) = parse_rect(node) {
                        self.push_outline(node, tx, &points, true);
                    }
                }
                "circle" => {
                    // Circles are never prism outlines but can carry a fill.
                    if let Some(points) = parse_circle(node) {
                        self.push_fill(node, tx, &points);
                    }
                }
                "path" => {
                    if let Some(d) = node.attribute("d") {
                        self.push_path(node, tx, d);
                    }
                }
                _ => {}
            }
        }

        for c in node.children() {
            self.walk(c, tx);
        }
    }

    fn to_drawing(&self, tx: Transform2D, p: Vec2) -> Vec2 {
        flip_y(tx.apply_point(p), self.svg_height)
    }

    fn push_segment(&mut self, tx: Transform2D, a: Vec2, b: Vec2) {
        let a = self.to_drawing(tx, a);
        let b = self.to_drawing(tx, b);
        self.drawing.segments.push(Segment::new(a, b));
    }

    fn push_outline(&mut self, node: Node<'_, '_>, tx: Transform2D, points: &[Vec2], closed: bool) {
        if points.len() < 2 {
            return;
        }
        for pair in points.windows(2) {
            self.push_segment(tx, pair[0], pair[1]);
        }
        if closed && points.len() > 2 {
            self.push_segment(tx, points[points.len() - 1], points[0]);
        }
        self.push_fill(node, tx, points);
    }

    fn push_fill(&mut self, node: Node<'_, '_>, tx: Transform2D, points: &[Vec2]) {
        let Some(color) = fill_color(node) else {
            return;
        };
        if points.len() < 3 {
            return;
        }
        let outline = points.iter().map(|&p| self.to_drawing(tx, p)).collect();
        let id = self.next_id;
        self.next_id += 1;
        self.drawing.fills.push(FillRegion {
            id,
            color: color.to_string(),
            outline,
        });
    }

    /// Every subpath becomes segments; the points of all subpaths together
    /// form the fill outline, which is exact for the single closed subpath
    /// a prism outline is drawn with.
    fn push_path(&mut self, node: Node<'_, '_>, tx: Transform2D, d: &str) {
        let mut cur = Vec2::new(0.0, 0.0);
        let mut start = cur;
        let mut outline: Vec<Vec2> = Vec::new();

        for seg in svgtypes::SimplifyingPathParser::from(d) {
            // Keep what parsed before the first error, as browsers do.
            let Ok(seg) = seg else {
                break;
            };
            use svgtypes::SimplePathSegment::*;
            match seg {
                MoveTo { x, y } => {
                    cur = Vec2::new(x, y);
                    start = cur;
                    outline.push(cur);
                }
                LineTo { x, y } => {
                    let next = Vec2::new(x, y);
                    self.push_segment(tx, cur, next);
                    outline.push(next);
                    cur = next;
                }
                Quadratic { x1, y1, x, y } => {
                    let (p1, p3) = (Vec2::new(x1, y1), Vec2::new(x, y));
                    let control_len = cur.distance(p1) + p1.distance(p3);
                    let p0 = cur;
                    let samples = self.sample_curve(control_len, |t| quadratic_at(p0, p1, p3, t));
                    cur = self.push_polyline(tx, cur, &samples, &mut outline);
                }
                CurveTo { x1, y1, x2, y2, x, y } => {
                    let (p1, p2, p3) = (Vec2::new(x1, y1), Vec2::new(x2, y2), Vec2::new(x, y));
                    let control_len = cur.distance(p1) + p1.distance(p2) + p2.distance(p3);
                    let p0 = cur;
                    let samples = self.sample_curve(control_len, |t| cubic_at(p0, p1, p2, p3, t));
                    cur = self.push_polyline(tx, cur, &samples, &mut outline);
                }
                ClosePath => {
                    if cur.distance(start) > 0.0 {
                        self.push_segment(tx, cur, start);
                    }
                    if outline.last() == Some(&start) && outline.len() > 1 {
                        outline.pop();
                    }
                    cur = start;
                }
            }
        }

        self.push_fill(node, tx, &outline);
    }

    /// Points along a curve at `t = i / n`, `i = 1..=n`, where
    /// `n = max(10, length / tolerance)` capped at 256.
    fn sample_curve(&self, length: f64, at: impl Fn(f64) -> Vec2) -> Vec<Vec2> {
        let n = ((length / self.tolerance) as usize).clamp(MIN_CURVE_SAMPLES, MAX_CURVE_SAMPLES);
        (1..=n).map(|i| at(i as f64 / n as f64)).collect()
    }

    /// Chains `samples` from `from`, skipping steps shorter than the
    /// tolerance so the chain never produces segments that merge away. The
    /// chain always ends on the last sample. Returns that end point.
    fn push_polyline(&mut self, tx: Transform2D, from: Vec2, samples: &[Vec2], outline: &mut Vec<Vec2>) -> Vec2 {
        let Some(&end) = samples.last() else {
            return from;
        };
        let mut kept = vec![from];
        for &p in &samples[..samples.len() - 1] {
            if kept.last().is_some_and(|&q| q.distance(p) > self.tolerance) {
                kept.push(p);
            }
        }
        if kept.len() > 1 && kept.last().is_some_and(|&q| q.distance(end) <= self.tolerance) {
            kept.pop();
        }
        kept.push(end);
        for pair in kept.windows(2) {
            self.push_segment(tx, pair[0], pair[1]);
        }
        outline.extend_from_slice(&kept[1..]);
        end
    }
}

fn quadratic_at(p0: Vec2, p1: Vec2, p2: Vec2, t: f64) -> Vec2 {
    let s = 1.0 - t;
    p0 * (s * s) + p1 * (2.0 * s * t) + p2 * (t * t)
}

fn cubic_at(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, t: f64) -> Vec2 {
    let s = 1.0 - t;
    p0 * (s * s * s) + p1 * (3.0 * s * s * t) + p2 * (3.0 * s * t * t) + p3 * (t * t * t)
}

/// The fill paint of an element, `style` taking precedence over the
/// attribute. `None` for unfilled elements.
fn fill_color<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    let fill = node
        .attribute("style")
        .and_then(find_fill_in_style)
        .or_else(|| node.attribute("fill"))?
        .trim();
    if fill.is_empty() || fill.eq_ignore_ascii_case("none") || fill.eq_ignore_ascii_case("transparent") {
        None
    } else {
        Some(fill)
    }
}

fn find_fill_in_style(style: &str) -> Option<&str> {
    // style="stroke:#000;fill: #ff0000"
    for part in style.split(';') {
        if let Some((key, value)) = part.split_once(':') {
            if key.trim() == "fill" {
                return Some(value.trim());
            }
        }
    }
    None
}

fn parse_viewbox(viewbox: Option<&str>) -> Option<(f64, f64, f64, f64)> {
    let vb = viewbox?;
    let parts: Vec<_> = vb
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .collect();
    if parts.len() != 4 {
        return None;
    }
    let a = parts[0].parse().ok()?;
    let b = parts[1].parse().ok()?;
    let c = parts[2].parse().ok()?;
    let d = parts[3].parse().ok()?;
    Some((a, b, c, d))
}

fn parse_line(node: Node<'_, '_>) -> Option<(Vec2, Vec2)> {
    let x1 = parse_len(node.attribute("x1")?)?;
    let y1 = parse_len(node.attribute("y1")?)?;
    let x2 = parse_len(node.attribute("x2")?)?;
    let y2 = parse_len(node.attribute("y2")?)?;
    Some((Vec2::new(x1, y1), Vec2::new(x2, y2)))
}

fn parse_rect(node: Node<'_, '_>) -> Option<Vec<Vec2>> {
    let x = node.attribute("x").and_then(parse_len).unwrap_or(0.0);
    let y = node.attribute("y").and_then(parse_len).unwrap_or(0.0);
    let w = parse_len(node.attribute("width")?)?;
    let h = parse_len(node.attribute("height")?)?;
    if w <= 0.0 || h <= 0.0 {
        return None;
    }
    Some(vec![
        Vec2::new(x, y),
        Vec2::new(x + w, y),
        Vec2::new(x + w, y + h),
        Vec2::new(x, y + h),
    ])
}

fn parse_circle(node: Node<'_, '_>) -> Option<Vec<Vec2>> {
    let cx = node.attribute("cx").and_then(parse_len).unwrap_or(0.0);
    let cy = node.attribute("cy").and_then(parse_len).unwrap_or(0.0);
    let r = parse_len(node.attribute("r")?)?;
    if r <= 0.0 {
        return None;
    }
    Some(
        (0..CIRCLE_SIDES)
            .map(|i| {
                let a = std::f64::consts::TAU * i as f64 / CIRCLE_SIDES as f64;
                Vec2::new(cx + r * a.cos(), cy + r * a.sin())
            })
            .collect(),
    )
}

/// `points="0,0 10,0 10 10"`: commas and whitespace both separate numbers.
fn parse_points(points: &str) -> Vec<Vec2> {
    let numbers: Vec<f64> = points
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map_while(|s| s.parse().ok())
        .collect();
    numbers
        .chunks_exact(2)
        .map(|xy| Vec2::new(xy[0], xy[1]))
        .collect()
}

fn parse_len(s: &str) -> Option<f64> {
    // Numeric prefix; units (px/mm/etc) are ignored.
    let mut end = 0usize;
    for (i, ch) in s.char_indices() {
        if ch.is_ascii_digit() || ch == '.' || ch == '-' || ch == '+' || ch == 'e' || ch == 'E' {
            end = i + ch.len_utf8();
        } else {
            break;
        }
    }
    s[..end].trim().parse().ok()
}

fn parse_transform(transform: Option<&str>) -> Transform2D {
    let Some(t) = transform else {
        return Transform2D::identity();
    };

    match t.parse::<svgtypes::Transform>() {
        Ok(m) => Transform2D {
            a: m.a,
            b: m.b,
            c: m.c,
            d: m.d,
            e: m.e,
            f: m.f,
        },
        Err(_) => Transform2D::identity(),
    }
}

fn flip_y(p: Vec2, svg_height: Option<f64>) -> Vec2 {
    // SVG y points down; drawing y points up.
    match svg_height {
        Some(h) => Vec2::new(p.x, h - p.y),
        None => p,
    }
}

#[derive(Debug, Clone, Copy)]
struct Transform2D {
    // SVG affine matrix: [a c e; b d f; 0 0 1]
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
}

impl Transform2D {
    fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    fn mul(self, rhs: Self) -> Self {
        Self {
            a: self.a * rhs.a + self.c * rhs.b,
            b: self.b * rhs.a + self.d * rhs.b,
            c: self.a * rhs.c + self.c * rhs.d,
            d: self.b * rhs.c + self.d * rhs.d,
            e: self.a * rhs.e + self.c * rhs.f + self.e,
            f: self.b * rhs.e + self.d * rhs.f + self.f,
        }
    }

    fn apply_point(self, p: Vec2) -> Vec2 {
        Vec2::new(
            self.a * p.x + self.c * p.y + self.e,
            self.b * p.x + self.d * p.y + self.f,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_accept_mixed_separators() {
        let pts = parse_points("0,0 10,0 10 10, 0 10");
        assert_eq!(pts.len(), 4);
        assert_eq!(pts[2], Vec2::new(10.0, 10.0));
    }

    #[test]
    fn style_fill_overrides_attribute() {
        assert_eq!(find_fill_in_style("stroke:#000; fill: red"), Some("red"));
        assert_eq!(find_fill_in_style("stroke:#000"), None);
    }

    #[test]
    fn transforms_compose_parent_first() {
        let parent = parse_transform(Some("translate(10, 0)"));
        let child = parse_transform(Some("scale(2)"));
        let p = parent.mul(child).apply_point(Vec2::new(1.0, 1.0));
        assert_eq!(p, Vec2::new(12.0, 2.0));
    }
}
