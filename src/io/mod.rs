//! Storage driver interface and region transfer

pub mod driver;
pub mod memory;
pub mod raw;
#[cfg(feature = "gdal")]
pub mod gdal_band;

pub use driver::BandDriver;
pub use memory::MemoryBand;
pub use raw::RawAccessor;
#[cfg(feature = "gdal")]
pub use gdal_band::GdalBand;
