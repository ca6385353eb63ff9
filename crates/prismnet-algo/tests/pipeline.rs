use approx::assert_relative_eq;
use prismnet_algo::pipeline::{detect_polygons, run, PipelineConfig};
use prismnet_core::color::ColorHeightMap;
use prismnet_core::geom::Vec2;
use prismnet_core::model::{Drawing, FillRegion, Segment};
use prismnet_core::report::DiagnosticCode;

fn outline(x: f64, y: f64, size: f64) -> Vec<Vec2> {
    vec![
        Vec2::new(x, y),
        Vec2::new(x + size, y),
        Vec2::new(x + size, y + size),
        Vec2::new(x, y + size),
    ]
}

fn closed(points: &[Vec2]) -> Vec<Segment> {
    (0..points.len())
        .map(|i| Segment::new(points[i], points[(i + 1) % points.len()]))
        .collect()
}

fn two_squares() -> Drawing {
    let a = outline(0.0, 0.0, 1.0);
    let b = outline(2.0, 0.0, 2.0);
    let mut segments = closed(&a);
    segments.extend(closed(&b));
    Drawing {
        segments,
        fills: vec![
            FillRegion {
                id: 10,
                color: "#ff0000".into(),
                outline: a,
            },
            FillRegion {
                id: 11,
                color: "blue".into(),
                outline: b,
            },
        ],
    }
}

#[test]
fn builds_one_net_per_polygon() {
    let heights: ColorHeightMap = "red:2, blue:3".parse().unwrap();
    let out = run(&two_squares(), &heights, &PipelineConfig::default(), "two.svg").unwrap();

    assert_eq!(out.polygons.len(), 2);
    assert_eq!(out.nets.len(), 2);
    assert!(out.nets.iter().all(Option::is_some));

    let report = &out.report;
    assert_eq!(report.input, "two.svg");
    assert_eq!(report.stats.segments_in, 8);
    assert_eq!(report.stats.polygons, 2);
    assert_eq!(report.stats.nets, 2);

    for (poly, net) in report.polygons.iter().zip(&out.nets) {
        let net = net.as_ref().unwrap();
        let expected = if poly.fill == Some(10) { 2.0 } else { 3.0 };
        assert_relative_eq!(poly.height.unwrap(), expected);
        assert_relative_eq!(net.height, expected);
        assert!(poly.net_built);
    }
}

#[test]
fn unknown_colors_fall_back_to_default_height() {
    let mut drawing = two_squares();
    drawing.fills[1].color = "no-such-color".into();
    let heights: ColorHeightMap = "red:2".parse().unwrap();
    let out = run(&drawing, &heights, &PipelineConfig::default(), "x").unwrap();

    assert_eq!(out.report.count(DiagnosticCode::UnknownColor), 1);
    let fallback = out
        .report
        .polygons
        .iter()
        .find(|p| p.fill == Some(11))
        .unwrap();
    assert_relative_eq!(fallback.height.unwrap(), 1.0);
    assert!(fallback.net_built);
}

#[test]
fn unfilled_polygons_use_default_height() {
    let mut drawing = two_squares();
    drawing.fills.clear();
    let heights: ColorHeightMap = "red:2".parse().unwrap();
    let out = run(&drawing, &heights, &PipelineConfig::default(), "x").unwrap();

    assert_eq!(out.report.count(DiagnosticCode::UnknownColor), 2);
    assert!(out.report.polygons.iter().all(|p| p.color.is_none()));
}

#[test]
fn rejected_nets_do_not_stop_the_run() {
    let config = PipelineConfig {
        max_sides: 8,
        ..PipelineConfig::default()
    };
    let octagon: Vec<Vec2> = (0..8)
        .map(|i| {
            let a = std::f64::consts::TAU * i as f64 / 8.0;
            Vec2::new(10.0 + 2.0 * a.cos(), 2.0 * a.sin())
        })
        .collect();
    let mut drawing = two_squares();
    drawing.segments.extend(closed(&octagon));
    let heights: ColorHeightMap = "red:1".parse().unwrap();
    let out = run(&drawing, &heights, &config, "x").unwrap();

    assert_eq!(out.polygons.len(), 3);
    assert_eq!(out.nets.iter().filter(|n| n.is_some()).count(), 2);
    assert_eq!(out.report.count(DiagnosticCode::NetRejected), 1);
    let rejected = out.report.polygons.iter().find(|p| !p.net_built).unwrap();
    assert_eq!(rejected.sides, 8);
}

#[test]
fn serial_and_parallel_runs_match() {
    let heights: ColorHeightMap = "red:2, blue:3".parse().unwrap();
    let drawing = two_squares();
    let par = run(&drawing, &heights, &PipelineConfig::default(), "x").unwrap();
    let serial = PipelineConfig {
        parallel: false,
        ..PipelineConfig::default()
    };
    let ser = run(&drawing, &heights, &serial, "x").unwrap();

    assert_eq!(par.polygons, ser.polygons);
    assert_eq!(par.nets, ser.nets);
    assert_eq!(par.report, ser.report);
}

#[test]
fn detect_reports_without_heights() {
    let (polygons, report) = detect_polygons(&two_squares(), &PipelineConfig::default(), "x").unwrap();
    assert_eq!(polygons.len(), 2);
    assert!(report.polygons.iter().all(|p| p.height.is_none() && !p.net_built));
    assert!(report.polygons.iter().any(|p| p.color.as_deref() == Some("blue")));
}

#[test]
fn shallow_near_miss_still_closes_a_face() {
    let drawing = Drawing {
        segments: vec![
            Segment::new(Vec2::new(0.0, 0.0), Vec2::new(12.0, 0.0)),
            Segment::new(Vec2::new(0.0, 0.0), Vec2::new(0.0, 1.7633)),
            Segment::new(Vec2::new(0.0, 1.7633), Vec2::new(9.7164, 0.05)),
        ],
        fills: Vec::new(),
    };
    let (polygons, report) = detect_polygons(&drawing, &PipelineConfig::default(), "x").unwrap();

    assert_eq!(polygons.len(), 1);
    assert_eq!(report.polygons[0].sides, 3);
    // Only the stub of the base past the contact is left over.
    assert!(report
        .diagnostics
        .iter()
        .any(|d| d.code == DiagnosticCode::DanglingEdge));
}

#[test]
fn whole_run_failures_are_errors() {
    let heights: ColorHeightMap = "red:1".parse().unwrap();

    let bad_tolerance = PipelineConfig {
        tolerance: 0.0,
        ..PipelineConfig::default()
    };
    assert!(run(&two_squares(), &heights, &bad_tolerance, "x").is_err());

    let tiny_budget = PipelineConfig {
        max_segments: 4,
        ..PipelineConfig::default()
    };
    let err = run(&two_squares(), &heights, &tiny_budget, "x").unwrap_err();
    assert!(format!("{err:#}").contains("exceed the limit"));

    assert!(run(&Drawing::default(), &heights, &PipelineConfig::default(), "x").is_err());
}
