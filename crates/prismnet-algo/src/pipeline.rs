use crate::extract::{ExtractedPolygon, PolygonExtractor};
use crate::graph::PlanarGraph;
use crate::intersect::IntersectionDetector;
use crate::merge::{canonicalize_segments, PointMerger};
use crate::net::{is_narrow_flap, NetBuilder, NetOptions};
use anyhow::{bail, Context, Result};
use prismnet_core::color::{ColorHeightMap, MatchKind, DEFAULT_HEIGHT};
use prismnet_core::error::{GeometryError, NetError};
use prismnet_core::model::{Drawing, Net};
use prismnet_core::report::{Diagnostic, DiagnosticCode, PolygonReport, RunReport, RunStats};
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    /// Coordinates closer than this are the same point.
    pub tolerance: f64,
    /// Ceiling on input segments, bounding the pairwise intersection pass.
    pub max_segments: usize,
    pub max_sides: usize,
    pub min_face_area: f64,
    pub parallel: bool,
    pub net: NetOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.1,
            max_segments: 20_000,
            max_sides: 6,
            min_face_area: 1e-6,
            parallel: true,
            net: NetOptions::default(),
        }
    }
}

/// State for one input's run: the config plus everything reported so far.
#[derive(Debug)]
pub struct PipelineContext {
    pub config: PipelineConfig,
    pub stats: RunStats,
    pub diagnostics: Vec<Diagnostic>,
}

impl PipelineContext {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            stats: RunStats::default(),
            diagnostics: Vec::new(),
        }
    }

    fn report(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    /// Segments to polygons. Fails only on bad configuration or when the
    /// segment ceiling is exceeded; everything else is a diagnostic.
    pub fn detect_polygons(&mut self, drawing: &Drawing) -> Result<Vec<ExtractedPolygon>> {
        let config = self.config;
        let merger = PointMerger::new(config.tolerance).context("invalid pipeline tolerance")?;

        let count = drawing.segments.len();
        self.stats.segments_in = count;
        if count > config.max_segments {
            return Err(GeometryError::TooManySegments {
                count,
                limit: config.max_segments,
            })
            .context("drawing is too large to process");
        }

        let canonical = canonicalize_segments(&merger, &drawing.segments);
        let non_finite = count - canonical.segments.len();
        self.report(canonical.diagnostics.iter().cloned());

        let split = IntersectionDetector::new(config.tolerance)
            .with_parallel(config.parallel)
            .split(&canonical);
        self.stats.segments_rejected = non_finite + split.rejected.len();
        self.report(split.diagnostics.iter().cloned());

        let graph = PlanarGraph::from_split(&split);
        self.stats.vertices = graph.vertex_count();
        self.stats.atomic_edges = graph.edge_count();

        let extraction =
            PolygonExtractor::new(config.tolerance, config.max_sides, config.min_face_area)
                .extract(&graph, &drawing.fills);
        self.stats.faces_traced = extraction.faces_traced;
        self.stats.polygons = extraction.polygons.len();
        self.report(extraction.diagnostics);

        Ok(extraction.polygons)
    }

    /// Resolves each polygon's height and builds its net. Nets are built
    /// concurrently but returned in polygon order.
    pub fn build_nets(
        &mut self,
        drawing: &Drawing,
        polygons: &[ExtractedPolygon],
        heights: &ColorHeightMap,
    ) -> Vec<(PolygonReport, Option<Net>)> {
        let resolved: Vec<(Option<String>, f64)> = polygons
            .iter()
            .map(|p| {
                let color = p.fill.map(|f| drawing.fills[f].color.clone());
                let height = match &color {
                    Some(c) => {
                        let m = heights.resolve(c);
                        if m.kind == MatchKind::Default {
                            self.diagnostics.push(
                                Diagnostic::warning(
                                    DiagnosticCode::UnknownColor,
                                    format!(
                                        "color {c:?} of polygon {} is not in the mapping; using height {}",
                                        p.index, m.height
                                    ),
                                )
                                .with_polygon(p.index),
                            );
                        }
                        m.height
                    }
                    None => {
                        self.diagnostics.push(
                            Diagnostic::warning(
                                DiagnosticCode::UnknownColor,
                                format!("polygon {} has no fill; using height {DEFAULT_HEIGHT}", p.index),
                            )
                            .with_polygon(p.index),
                        );
                        DEFAULT_HEIGHT
                    }
                };
                (color, height)
            })
            .collect();

        let builder = NetBuilder::new(self.config.net);
        let build = |(p, (_, h)): (&ExtractedPolygon, &(Option<String>, f64))| {
            builder.build(&p.polygon, *h)
        };
        let nets: Vec<Result<Net, NetError>> = if self.config.parallel {
            polygons.par_iter().zip(resolved.par_iter()).map(build).collect()
        } else {
            polygons.iter().zip(resolved.iter()).map(build).collect()
        };

        let mut out = Vec::with_capacity(polygons.len());
        for ((p, (color, height)), net) in polygons.iter().zip(resolved).zip(nets) {
            let net = match net {
                Ok(net) => {
                    let narrow = net.pieces.iter().filter(|piece| is_narrow_flap(piece)).count();
                    if narrow > 0 {
                        self.diagnostics.push(
                            Diagnostic::info(
                                DiagnosticCode::NarrowFlap,
                                format!(
                                    "{narrow} flap(s) of polygon {} narrowed to triangles",
                                    p.index
                                ),
                            )
                            .with_polygon(p.index),
                        );
                    }
                    Some(net)
                }
                Err(err) => {
                    let code = match err {
                        NetError::InvalidHeight(_) => DiagnosticCode::InvalidHeight,
                        _ => DiagnosticCode::NetRejected,
                    };
                    self.diagnostics.push(
                        Diagnostic::error(code, format!("polygon {}: {err}", p.index))
                            .with_polygon(p.index),
                    );
                    None
                }
            };
            out.push((
                PolygonReport {
                    index: p.index,
                    sides: p.polygon.len(),
                    area: p.area,
                    centroid: p.polygon.centroid(),
                    fill: p.fill.map(|f| drawing.fills[f].id),
                    color,
                    height: Some(height),
                    net_built: net.is_some(),
                },
                net,
            ));
        }
        self.stats.nets = out.iter().filter(|(_, n)| n.is_some()).count();
        out
    }

    pub fn into_report(self, input: &str, polygons: Vec<PolygonReport>) -> RunReport {
        RunReport {
            input: input.to_string(),
            generated_at: None,
            stats: self.stats,
            polygons,
            diagnostics: self.diagnostics,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub polygons: Vec<ExtractedPolygon>,
    /// One entry per polygon; `None` where the net was rejected.
    pub nets: Vec<Option<Net>>,
    pub report: RunReport,
}

/// Polygon detection only, for inspecting a drawing without building nets.
pub fn detect_polygons(
    drawing: &Drawing,
    config: &PipelineConfig,
    input: &str,
) -> Result<(Vec<ExtractedPolygon>, RunReport)> {
    let mut ctx = PipelineContext::new(*config);
    let polygons = ctx.detect_polygons(drawing)?;
    let reports = polygons
        .iter()
        .map(|p| PolygonReport {
            index: p.index,
            sides: p.polygon.len(),
            area: p.area,
            centroid: p.polygon.centroid(),
            fill: p.fill.map(|f| drawing.fills[f].id),
            color: p.fill.map(|f| drawing.fills[f].color.clone()),
            height: None,
            net_built: false,
        })
        .collect();
    Ok((polygons, ctx.into_report(input, reports)))
}

pub fn run(
    drawing: &Drawing,
    heights: &ColorHeightMap,
    config: &PipelineConfig,
    input: &str,
) -> Result<PipelineOutput> {
    if drawing.segments.is_empty() {
        bail!("{input}: drawing contains no line segments");
    }
    let mut ctx = PipelineContext::new(*config);
    let polygons = ctx.detect_polygons(drawing)?;
    let built = ctx.build_nets(drawing, &polygons, heights);
    let (reports, nets): (Vec<_>, Vec<_>) = built.into_iter().unzip();
    Ok(PipelineOutput {
        polygons,
        nets,
        report: ctx.into_report(input, reports),
    })
}
