use prismnet_core::geom::Vec2;
use prismnet_core::model::{GluesTo, Net, NetPiece, PieceKind};
use prismnet_core::svg::net_svg;

#[test]
fn writes_pieces_and_fold_lines() {
    let net = Net {
        height: 2.0,
        flap_width: 0.1,
        pieces: vec![
            NetPiece {
                kind: PieceKind::SideFace { edge: 0 },
                outline: vec![
                    Vec2::new(0.0, 0.0),
                    Vec2::new(1.0, 0.0),
                    Vec2::new(1.0, 2.0),
                    Vec2::new(0.0, 2.0),
                ],
            },
            NetPiece {
                kind: PieceKind::Flap {
                    edge: 0,
                    glues_to: GluesTo::Seam,
                },
                outline: vec![
                    Vec2::new(1.0, 0.0),
                    Vec2::new(1.1, 0.05),
                    Vec2::new(1.1, 1.95),
                    Vec2::new(1.0, 2.0),
                ],
            },
        ],
        fold_lines: vec![(Vec2::new(1.0, 0.0), Vec2::new(1.0, 2.0))],
    };

    let svg = net_svg(&net, "prism <1>").unwrap();
    assert!(svg.starts_with("<?xml"));
    assert!(svg.contains("<title>prism &lt;1&gt;</title>"));
    assert!(svg.contains(r#"class="side""#));
    assert!(svg.contains(r#"class="flap""#));
    assert!(svg.contains(r#"stroke-dasharray="2,2""#));
    assert!(svg.contains(r#"class="fold""#));
    // Lowest-left corner of the strip lands on the margin, y flipped.
    assert!(svg.contains("20.000,22.000"));
    assert!(svg.trim_end().ends_with("</svg>"));
}
