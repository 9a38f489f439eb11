//! bandcal: chunked, radiometrically corrected access to single raster bands
//!
//! Raw digital counts are read from a storage driver chunk by chunk, masked,
//! linearized, atmospherically corrected, converted to reflectance or brightness
//! temperature and passed through a user function list. Writes invert the
//! linearization and crop padded chunks back to their core footprint.

pub mod types;
pub mod config;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{
    AtmosphereModel, BandMetadata, Chunk, ChunkLayout, DataType, MaskBuffer, Pixel, PixelBuffer,
    RasterError, RasterResult, ThermalConstants, Units,
};
pub use config::{IoContext, RadiometricConfig};
pub use io::{BandDriver, MemoryBand, RawAccessor};
#[cfg(feature = "gdal")]
pub use io::GdalBand;
pub use crate::core::{BandStatistics, ProcessingFunction, Raster};
