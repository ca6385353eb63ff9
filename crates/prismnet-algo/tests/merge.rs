use approx::assert_relative_eq;
use nalgebra::Point2;
use prismnet_algo::merge::{canonicalize_segments, PointMerger};
use prismnet_core::geom::Vec2;
use prismnet_core::model::Segment;
use prismnet_core::report::DiagnosticCode;

#[test]
fn rejects_bad_tolerance() {
    assert!(PointMerger::new(0.0).is_err());
    assert!(PointMerger::new(-1.0).is_err());
    assert!(PointMerger::new(f64::NAN).is_err());
    assert_eq!(PointMerger::new(0.1).unwrap().tolerance(), 0.1);
}

#[test]
fn close_points_share_a_centroid() {
    let merger = PointMerger::new(0.1).unwrap();
    let points = vec![
        Point2::new(0.0, 0.0),
        Point2::new(0.05, 0.0),
        Point2::new(1.0, 1.0),
        Point2::new(1.02, 1.03),
        Point2::new(5.0, 5.0),
    ];
    let merged = merger.merge(&points);

    assert_eq!(merged.canonical.len(), 3);
    assert_eq!(merged.assignment, vec![0, 0, 1, 1, 2]);
    assert_relative_eq!(merged.canonical[0].x, 0.025, epsilon = 1e-12);
    assert_relative_eq!(merged.canonical[1].y, 1.015, epsilon = 1e-12);
    assert!(merged.diagnostics.is_empty());
}

#[test]
fn merging_is_idempotent() {
    let merger = PointMerger::new(0.1).unwrap();
    let points: Vec<Point2<f64>> = (0..40)
        .map(|i| {
            let f = i as f64;
            Point2::new((f * 0.37).sin() * 3.0, (f * 0.53).cos() * 3.0)
        })
        .collect();
    let once = merger.merge(&points);
    let twice = merger.merge(&once.canonical);

    assert_eq!(twice.canonical, once.canonical);
    assert_eq!(twice.assignment, (0..once.canonical.len()).collect::<Vec<_>>());
}

#[test]
fn canonical_points_are_farther_apart_than_tolerance() {
    let merger = PointMerger::new(0.1).unwrap();
    let points: Vec<Point2<f64>> = (0..30)
        .map(|i| Point2::new((i % 6) as f64 * 0.09, (i / 6) as f64 * 0.13))
        .collect();
    let merged = merger.merge(&points);
    for (i, a) in merged.canonical.iter().enumerate() {
        for b in &merged.canonical[i + 1..] {
            assert!((a - b).norm() > 0.1);
        }
    }
}

#[test]
fn chained_cluster_is_reported() {
    let merger = PointMerger::new(0.1).unwrap();
    let points = vec![
        Point2::new(0.0, 0.0),
        Point2::new(0.08, 0.0),
        Point2::new(0.16, 0.0),
    ];
    let merged = merger.merge(&points);

    assert_eq!(merged.canonical.len(), 1);
    assert_relative_eq!(merged.canonical[0].x, 0.08, epsilon = 1e-12);
    assert_eq!(merged.diagnostics.len(), 1);
    assert_eq!(merged.diagnostics[0].code, DiagnosticCode::ChainedMerge);
}

#[test]
fn segments_share_snapped_endpoints() {
    let merger = PointMerger::new(0.1).unwrap();
    let segments = vec![
        Segment::new(Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)),
        Segment::new(Vec2::new(1.03, 0.02), Vec2::new(1.0, 1.0)),
        Segment::new(Vec2::new(f64::NAN, 0.0), Vec2::new(1.0, 1.0)),
    ];
    let canonical = canonicalize_segments(&merger, &segments);

    assert_eq!(canonical.segments.len(), 2);
    assert_eq!(canonical.source, vec![0, 1]);
    assert_eq!(canonical.segments[0][1], canonical.segments[1][0]);
    assert_eq!(canonical.vertices.len(), 3);
    assert_eq!(canonical.diagnostics.len(), 1);
    assert_eq!(canonical.diagnostics[0].code, DiagnosticCode::NonFiniteSegment);
    assert_eq!(canonical.diagnostics[0].segment, Some(2));
}
