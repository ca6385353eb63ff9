use approx::assert_relative_eq;
use prismnet_algo::net::{flap_width, NetBuilder, NetOptions};
use prismnet_core::error::NetError;
use prismnet_core::geom::Vec2;
use prismnet_core::model::{GluesTo, Net, PieceKind, Polygon};
use std::collections::BTreeSet;
use std::f64::consts::TAU;

fn unit_square() -> Polygon {
    Polygon::new(vec![
        Vec2::new(0.0, 0.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(0.0, 1.0),
    ])
}

fn regular(n: usize, radius: f64) -> Polygon {
    Polygon::new(
        (0..n)
            .map(|i| {
                let a = TAU * i as f64 / n as f64;
                Vec2::new(radius * a.cos(), radius * a.sin())
            })
            .collect(),
    )
}

fn close(a: Vec2, b: Vec2) -> bool {
    a.distance(b) < 1e-9
}

fn flap_edges(net: &Net, glue: GluesTo) -> BTreeSet<usize> {
    net.flaps()
        .filter_map(|p| match p.kind {
            PieceKind::Flap { edge, glues_to } if glues_to == glue => Some(edge),
            _ => None,
        })
        .collect()
}

#[test]
fn unit_square_net() {
    let net = NetBuilder::default().build(&unit_square(), 2.0).unwrap();

    let sides: Vec<_> = net.side_faces().collect();
    assert_eq!(sides.len(), 4);
    for (i, side) in sides.iter().enumerate() {
        let bbox = side.bbox();
        assert_relative_eq!(bbox.width(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(bbox.height(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(bbox.min.x, i as f64, epsilon = 1e-12);
    }
    // Consecutive faces share their vertical edge.
    for pair in sides.windows(2) {
        assert!(close(pair[0].outline[1], pair[1].outline[0]));
        assert!(close(pair[0].outline[2], pair[1].outline[3]));
    }

    let base = net.base().unwrap();
    assert_eq!(base.outline.len(), 4);
    let bbox = base.bbox();
    assert_relative_eq!(bbox.min.x, 0.0, epsilon = 1e-12);
    assert_relative_eq!(bbox.max.x, 1.0, epsilon = 1e-12);
    assert_relative_eq!(bbox.min.y, -1.0, epsilon = 1e-12);
    assert_relative_eq!(bbox.max.y, 0.0, epsilon = 1e-12);
    assert_eq!(net.pieces.iter().filter(|p| p.kind == PieceKind::Base).count(), 1);

    // The base hinges on the bottom edge of the first side face.
    let hinge = (sides[0].outline[0], sides[0].outline[1]);
    assert!(net
        .fold_lines
        .iter()
        .any(|&(a, b)| close(a, hinge.0) && close(b, hinge.1)));

    assert_eq!(flap_edges(&net, GluesTo::Base), BTreeSet::from([1, 3]));
    assert_eq!(flap_edges(&net, GluesTo::SideFace), BTreeSet::from([2]));
    assert_eq!(flap_edges(&net, GluesTo::Seam), BTreeSet::from([3]));

    // 4 rectangles, the base, 4 trapezoids.
    assert_eq!(net.segments().len(), 4 * 4 + 4 + 4 * 4);
}

#[test]
fn flap_width_is_a_third_of_the_closest_midpoint() {
    let shapes = vec![
        unit_square(),
        regular(3, 2.0),
        regular(5, 1.5),
        regular(6, 3.0),
        Polygon::new(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(4.0, 0.0),
            Vec2::new(5.0, 2.0),
            Vec2::new(1.0, 3.0),
            Vec2::new(-0.5, 1.0),
        ]),
        Polygon::new(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(0.0, 1.0),
        ]),
    ];
    for poly in shapes {
        let c = poly.centroid();
        let expected = poly
            .edges()
            .map(|(a, b)| a.midpoint(b).distance(c))
            .fold(f64::INFINITY, f64::min)
            / 3.0;
        assert_eq!(flap_width(&poly), expected);
        let net = NetBuilder::default().build(&poly, 1.0).unwrap();
        assert_eq!(net.flap_width, expected);
    }
}

#[test]
fn side_flaps_alternate() {
    for n in 3..=6 {
        let net = NetBuilder::default().build(&regular(n, 2.0), 1.5).unwrap();
        let edges = flap_edges(&net, GluesTo::Base);
        assert_eq!(edges.len(), n / 2, "n = {n}");
        for &e in &edges {
            assert!(!edges.contains(&((e + 1) % n)), "adjacent flaps at {e} for n = {n}");
        }

        // Every bottom edge is either the hinge, a side flap or a base flap.
        let base_flaps = flap_edges(&net, GluesTo::SideFace);
        for i in 1..n {
            assert!(edges.contains(&i) ^ base_flaps.contains(&i), "edge {i} for n = {n}");
        }
        assert!(!edges.contains(&0) && !base_flaps.contains(&0));
    }
}

#[test]
fn flaps_point_away_from_their_piece() {
    let net = NetBuilder::default().build(&regular(5, 2.0), 3.0).unwrap();
    let strip_right = net
        .side_faces()
        .map(|p| p.bbox().max.x)
        .fold(f64::NEG_INFINITY, f64::max);
    let base = Polygon::new(net.base().unwrap().outline.clone());

    for flap in net.flaps() {
        let PieceKind::Flap { glues_to, .. } = flap.kind else {
            unreachable!()
        };
        let tip = flap.outline[2].midpoint(*flap.outline.last().unwrap());
        match glues_to {
            GluesTo::Base => assert!(flap.outline.iter().all(|p| p.y <= 1e-12)),
            GluesTo::Seam => assert!(flap.outline.iter().all(|p| p.x >= strip_right - 1e-12)),
            GluesTo::SideFace => assert!(!base.contains_point(tip)),
        }
    }
}

#[test]
fn trapezoid_sides_follow_flap_angle() {
    let net = NetBuilder::default().build(&unit_square(), 2.0).unwrap();
    let w = net.flap_width;
    assert_relative_eq!(w, 0.5 / 3.0, epsilon = 1e-12);

    let flap = net
        .flaps()
        .find(|p| p.kind == PieceKind::Flap { edge: 1, glues_to: GluesTo::Base })
        .unwrap();
    assert_eq!(flap.outline.len(), 4);
    let slant = flap.outline[3] - flap.outline[0];
    assert_relative_eq!(slant.x, w * 30f64.to_radians().tan(), epsilon = 1e-12);
    assert_relative_eq!(slant.y, -w, epsilon = 1e-12);
}

#[test]
fn clockwise_input_builds_the_same_strip() {
    let mut cw = unit_square();
    cw.vertices.reverse();
    let net = NetBuilder::default().build(&cw, 2.0).unwrap();
    assert_eq!(net.side_faces().count(), 4);
    let base = net.base().unwrap();
    assert!(base.outline.iter().all(|p| p.y <= 1e-12));
}

#[test]
fn options_drop_base_and_seam() {
    let builder = NetBuilder::new(NetOptions {
        include_base: false,
        seam_flap: false,
        ..NetOptions::default()
    });
    let net = builder.build(&unit_square(), 1.0).unwrap();
    assert!(net.base().is_none());
    assert!(flap_edges(&net, GluesTo::SideFace).is_empty());
    assert!(flap_edges(&net, GluesTo::Seam).is_empty());
    assert_eq!(net.flaps().count(), 2);
}

#[test]
fn rejects_invalid_input() {
    let builder = NetBuilder::default();
    assert_eq!(
        builder.build(&unit_square(), 0.0),
        Err(NetError::InvalidHeight(0.0))
    );
    assert_eq!(
        builder.build(&unit_square(), -2.0),
        Err(NetError::InvalidHeight(-2.0))
    );
    assert!(matches!(
        builder.build(&unit_square(), f64::NAN),
        Err(NetError::InvalidHeight(_))
    ));
    assert_eq!(
        builder.build(&regular(7, 1.0), 1.0),
        Err(NetError::InvalidSideCount(7))
    );
    let segment = Polygon::new(vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)]);
    assert_eq!(builder.build(&segment, 1.0), Err(NetError::InvalidSideCount(2)));

    let flat = Polygon::new(vec![
        Vec2::new(0.0, 0.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(2.0, 0.0),
    ]);
    assert_eq!(builder.build(&flat, 1.0), Err(NetError::DegeneratePolygon));

    let steep = NetBuilder::new(NetOptions {
        flap_angle_deg: 90.0,
        ..NetOptions::default()
    });
    assert_eq!(
        steep.build(&unit_square(), 1.0),
        Err(NetError::InvalidFlapAngle(90.0))
    );
}
