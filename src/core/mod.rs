//! Radiometric processing of band chunks

pub mod functions;
pub mod correction;
pub mod nodata;
pub mod mask;
pub mod writer;
pub mod stats;
pub mod raster;

// Re-export main types
pub use functions::ProcessingFunction;
pub use correction::{CorrectionPipeline, KELVIN_OFFSET, THERMAL_EMISSIVITY};
pub use nodata::NoDataPropagator;
pub use mask::MaskCompositor;
pub use stats::{BandStatistics, StatsAccumulator};
pub use raster::Raster;
