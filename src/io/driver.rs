use crate::types::{BandMetadata, DataType, RasterResult};
use ndarray::Array2;

/// Storage engine behind a single raster band.
///
/// Regions are exchanged as f64 arrays shaped (height, width); the driver converts
/// to and from its own storage [`DataType`]. Any non-success status must be reported
/// as an error carrying the driver's diagnostic text.
pub trait BandDriver {
    /// Short name used in diagnostics
    fn name(&self) -> String;

    /// Band size as (width, height)
    fn size(&self) -> (usize, usize);

    fn data_type(&self) -> DataType;

    fn read_region(&self, x: usize, y: usize, width: usize, height: usize) -> RasterResult<Array2<f64>>;

    fn write_region(&mut self, x: usize, y: usize, data: &Array2<f64>) -> RasterResult<()>;

    fn metadata(&self) -> RasterResult<BandMetadata>;

    fn set_metadata(&mut self, metadata: &BandMetadata) -> RasterResult<()>;
}
