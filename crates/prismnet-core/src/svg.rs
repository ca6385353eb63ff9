use crate::geom::{BBox2, Vec2};
use crate::model::{Net, PieceKind};
use std::fmt::{self, Write as _};

/// Blank border around the pattern, in drawing units.
pub const MARGIN: f64 = 20.0;

/// Serializes one net as a standalone SVG document. Net coordinates are
/// y-up; the document flips them so the base hangs below the strip.
pub fn net_svg(net: &Net, name: &str) -> Result<String, fmt::Error> {
    let mut out = String::new();
    write_net(&mut out, net, name)?;
    Ok(out)
}

fn write_net(out: &mut String, net: &Net, name: &str) -> fmt::Result {
    let bbox = net.bbox();
    let bbox = if bbox.is_empty() {
        BBox2::new(Vec2::new(0.0, 0.0), Vec2::new(0.0, 0.0))
    } else {
        bbox
    };
    let width = bbox.width() + 2.0 * MARGIN;
    let height = bbox.height() + 2.0 * MARGIN;
    let to_svg = |p: Vec2| Vec2::new(p.x - bbox.min.x + MARGIN, bbox.max.y - p.y + MARGIN);

    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = num(width),
        h = num(height),
    )?;
    writeln!(out, "<title>{}</title>", escape_xml(name))?;
    writeln!(
        out,
        "<desc>prism height {} flap width {}</desc>",
        num(net.height),
        num(net.flap_width)
    )?;

    for piece in &net.pieces {
        let (class, fill, dash) = match piece.kind {
            PieceKind::Base => ("base", "lightblue", None),
            PieceKind::SideFace { .. } => ("side", "lightgreen", None),
            PieceKind::Flap { .. } => ("flap", "lightyellow", Some("2,2")),
        };
        write!(
            out,
            r#"<polygon class="{class}" points="{}" fill="{fill}" stroke="black" stroke-width="1""#,
            points(piece.outline.iter().map(|p| to_svg(*p))),
        )?;
        if let Some(dash) = dash {
            write!(out, r#" stroke-dasharray="{dash}""#)?;
        }
        writeln!(out, "/>")?;
    }

    for (a, b) in &net.fold_lines {
        let (a, b) = (to_svg(*a), to_svg(*b));
        writeln!(
            out,
            r#"<line class="fold" x1="{}" y1="{}" x2="{}" y2="{}" stroke="gray" stroke-width="0.5" stroke-dasharray="4,2"/>"#,
            num(a.x),
            num(a.y),
            num(b.x),
            num(b.y)
        )?;
    }

    writeln!(out, "</svg>")
}

fn points(iter: impl Iterator<Item = Vec2>) -> String {
    let mut s = String::new();
    for (i, p) in iter.enumerate() {
        if i > 0 {
            s.push(' ');
        }
        s.push_str(&num(p.x));
        s.push(',');
        s.push_str(&num(p.y));
    }
    s
}

fn num(v: f64) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    let mut s = format!("{v:.3}");
    if s == "-0.000" {
        s = "0.000".to_string();
    }
    s
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
