pub mod extract;
pub mod graph;
pub mod intersect;
pub mod merge;
pub mod net;
pub mod pipeline;

pub use extract::{ExtractedPolygon, Extraction, PolygonExtractor};
pub use graph::PlanarGraph;
pub use intersect::{Intersection, IntersectionDetector};
pub use merge::PointMerger;
pub use net::{flap_width, NetBuilder, NetOptions};
pub use pipeline::{detect_polygons, run, PipelineConfig, PipelineContext, PipelineOutput};
