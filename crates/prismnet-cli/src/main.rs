use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use prismnet_algo::net::NetOptions;
use prismnet_algo::pipeline::{self, PipelineConfig};
use prismnet_core::color::ColorHeightMap;
use prismnet_core::model::Drawing;
use prismnet_core::report::{RunReport, Severity};
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "prismnet")]
#[command(about = "Generate paper-craft prism nets from SVG polygon patterns.")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Detect polygons and write one net per polygon.
    Generate {
        input: PathBuf,
        /// Color to height mapping, e.g. "red:1,blue:2,#00ff00:1.5".
        #[arg(long)]
        colors: ColorHeightMap,
        #[arg(long, default_value = "nets")]
        output_dir: PathBuf,
        /// Write the run report here instead of printing diagnostics.
        #[arg(long)]
        report: Option<PathBuf>,
        #[command(flatten)]
        geometry: GeometryArgs,
        #[arg(long, default_value_t = 30.0)]
        flap_angle: f64,
        #[arg(long)]
        no_base: bool,
        #[arg(long)]
        no_seam_flap: bool,
    },
    /// Detect polygons only and print them as JSON.
    Detect {
        input: PathBuf,
        #[arg(long)]
        report: Option<PathBuf>,
        #[command(flatten)]
        geometry: GeometryArgs,
    },
}

#[derive(Debug, Args)]
struct GeometryArgs {
    /// Distance under which two coordinates are the same point.
    #[arg(long, default_value_t = 0.1)]
    tolerance: f64,
    #[arg(long, default_value_t = 20_000)]
    max_segments: usize,
    /// Run every stage on the current thread.
    #[arg(long)]
    serial: bool,
}

impl GeometryArgs {
    fn config(&self, net: NetOptions) -> PipelineConfig {
        PipelineConfig {
            tolerance: self.tolerance,
            max_segments: self.max_segments,
            parallel: !self.serial,
            net,
            ..PipelineConfig::default()
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Generate {
            input,
            colors,
            output_dir,
            report,
            geometry,
            flap_angle,
            no_base,
            no_seam_flap,
        } => {
            let net = NetOptions {
                flap_angle_deg: flap_angle,
                include_base: !no_base,
                seam_flap: !no_seam_flap,
            };
            generate(
                &input,
                &colors,
                &output_dir,
                report.as_deref(),
                &geometry.config(net),
            )
        }
        Command::Detect {
            input,
            report,
            geometry,
        } => detect(
            &input,
            report.as_deref(),
            &geometry.config(NetOptions::default()),
        ),
    }
}

fn generate(
    input: &Path,
    colors: &ColorHeightMap,
    output_dir: &Path,
    report: Option<&Path>,
    config: &PipelineConfig,
) -> Result<()> {
    let drawing = load_drawing(input, config.tolerance)?;
    eprintln!("found {} line segments", drawing.segments.len());

    let out = pipeline::run(&drawing, colors, config, &input.display().to_string())?;
    eprintln!("detected {} polygons", out.polygons.len());

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("create output directory: {output_dir:?}"))?;
    let mut written = 0usize;
    for (poly, net) in out.polygons.iter().zip(&out.nets) {
        let Some(net) = net else {
            continue;
        };
        let name = format!("prism_net_{}", poly.index + 1);
        let path = output_dir.join(format!("{name}.svg"));
        let svg = prismnet_core::svg::net_svg(net, &name)
            .with_context(|| format!("render net: {name}"))?;
        std::fs::write(&path, svg).with_context(|| format!("write net: {path:?}"))?;
        written += 1;
    }

    finish_report(out.report, report)?;
    eprintln!("generated {written} prism nets in {output_dir:?}");
    Ok(())
}

fn detect(input: &Path, report: Option<&Path>, config: &PipelineConfig) -> Result<()> {
    let drawing = load_drawing(input, config.tolerance)?;
    let (_, run_report) =
        pipeline::detect_polygons(&drawing, config, &input.display().to_string())?;

    let json = serde_json::to_string_pretty(&run_report.polygons).context("serialize polygons")?;
    println!("{json}");
    finish_report(run_report, report)
}

fn load_drawing(input: &Path, tolerance: f64) -> Result<Drawing> {
    ensure_input_file(input)?;

    let ext = input
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "svg" => prismnet_import_svg::import_svg(input, tolerance),
        _ => bail!("Unsupported input extension: .{ext} (expected .svg)"),
    }
}

/// Stamps the report and writes it to `path`, or echoes its warnings and
/// errors to stderr when no path is given.
fn finish_report(mut report: RunReport, path: Option<&Path>) -> Result<()> {
    report.generated_at = Some(chrono::Utc::now().to_rfc3339());

    if let Some(path) = path {
        let json = serde_json::to_string_pretty(&report).context("serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        std::fs::write(path, &json).with_context(|| format!("write report: {path:?}"))?;
    } else {
        for d in report.diagnostics.iter().filter(|d| d.severity >= Severity::Warning) {
            let level = match d.severity {
                Severity::Error => "error",
                _ => "warning",
            };
            eprintln!("{level}: {}", d.message);
        }
    }
    Ok(())
}

fn ensure_input_file(input: &Path) -> Result<()> {
    match std::fs::metadata(input) {
        Ok(meta) => {
            if meta.is_file() {
                Ok(())
            } else {
                bail!("input is not a file: {input:?}");
            }
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            let hint_root = find_workspace_root(&cwd);
            if let Some(root) = hint_root {
                bail!(
                    "input not found: {input:?} (cwd: {cwd:?}).\nHint: run from the workspace root {root:?} or pass an absolute path."
                );
            }
            bail!("input not found: {input:?} (cwd: {cwd:?}).");
        }
        Err(err) => Err(err).with_context(|| format!("stat input: {input:?}")),
    }
}

fn find_workspace_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join("Cargo.lock").is_file())
        .map(|dir| dir.to_path_buf())
}
