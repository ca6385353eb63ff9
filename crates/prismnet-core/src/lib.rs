pub mod color;
pub mod error;
pub mod geom;
pub mod model;
pub mod report;
pub mod svg;
