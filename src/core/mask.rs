use crate::core::raster::Raster;
use crate::types::{Chunk, Pixel, PixelBuffer, RasterResult};
use ndarray::{Array2, Zip};

/// Multiplies auxiliary masks into one composite and stamps out pixels it rejects
pub struct MaskCompositor<'a> {
    masks: &'a [Raster],
}

impl<'a> MaskCompositor<'a> {
    pub fn new(masks: &'a [Raster]) -> Self {
        Self { masks }
    }

    /// Elementwise product of all masks over `chunk`, read through their full pipelines.
    ///
    /// An empty mask list yields all ones.
    pub fn composite(&self, chunk: &Chunk) -> RasterResult<Array2<f32>> {
        let mut composite = Array2::<f32>::ones(chunk.shape());
        for mask in self.masks {
            let values = mask.read_rect::<f32>(chunk)?;
            composite *= &values;
        }
        Ok(composite)
    }

    /// Overwrite with `fill` every pixel whose composite is not exactly 1.
    ///
    /// Returns the number of pixels masked out.
    pub fn apply<T: Pixel>(&self, buffer: &mut PixelBuffer<T>, chunk: &Chunk, fill: T) -> RasterResult<usize> {
        if self.masks.is_empty() {
            return Ok(0);
        }
        let composite = self.composite(chunk)?;

        let mut masked = 0;
        Zip::from(buffer).and(&composite).for_each(|pixel, &m| {
            if m != 1.0 {
                *pixel = fill;
                masked += 1;
            }
        });
        Ok(masked)
    }
}
