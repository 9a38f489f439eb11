use crate::io::driver::BandDriver;
use crate::types::{Chunk, Pixel, PixelBuffer, RasterError, RasterResult};

/// Region transfer between a band driver and typed pixel buffers.
///
/// No radiometric interpretation happens here; rectangles are validated against
/// the band extent before the driver is called.
pub struct RawAccessor;

impl RawAccessor {
    /// Read `chunk` from the driver as `T`
    pub fn read<T: Pixel>(driver: &dyn BandDriver, chunk: &Chunk) -> RasterResult<PixelBuffer<T>> {
        Self::check_bounds(driver, chunk)?;

        let data = driver.read_region(chunk.x0(), chunk.y0(), chunk.width(), chunk.height())?;
        if data.dim() != chunk.shape() {
            return Err(RasterError::Shape(format!(
                "{}: driver returned {:?} for {} (expected {:?})",
                driver.name(),
                data.dim(),
                chunk,
                chunk.shape()
            )));
        }

        log::debug!("{}: read {} as {}", driver.name(), chunk, T::DATA_TYPE);
        Ok(data.mapv(T::from_f64))
    }

    /// Write `buffer` into `chunk`; the buffer must have exactly the chunk's shape
    pub fn write<T: Pixel>(
        driver: &mut dyn BandDriver,
        buffer: &PixelBuffer<T>,
        chunk: &Chunk,
    ) -> RasterResult<()> {
        Self::check_bounds(driver, chunk)?;
        if buffer.dim() != chunk.shape() {
            return Err(RasterError::Shape(format!(
                "{}: cannot write {:?} buffer to {} ({:?})",
                driver.name(),
                buffer.dim(),
                chunk,
                chunk.shape()
            )));
        }

        log::debug!(
            "{}: writing {} x {} buffer to {}",
            driver.name(),
            chunk.width(),
            chunk.height(),
            chunk
        );
        driver.write_region(chunk.x0(), chunk.y0(), &buffer.mapv(Pixel::to_f64))
    }

    fn check_bounds(driver: &dyn BandDriver, chunk: &Chunk) -> RasterResult<()> {
        let (width, height) = driver.size();
        if chunk.fits_within(width, height) {
            Ok(())
        } else {
            Err(RasterError::Bounds {
                chunk: *chunk,
                width,
                height,
            })
        }
    }
}
