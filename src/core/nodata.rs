use crate::types::{Pixel, PixelBuffer};
use ndarray::{Array2, Zip};

/// Whether `value` is the no-data `sentinel`; a NaN sentinel matches any NaN
pub fn is_nodata(value: f64, sentinel: f64) -> bool {
    value == sentinel || (sentinel.is_nan() && value.is_nan())
}

/// Restores the no-data sentinel on pixels that held it before any transform ran
#[derive(Debug, Clone, Copy)]
pub struct NoDataPropagator {
    nodata: Option<f64>,
}

impl NoDataPropagator {
    pub fn new(nodata: Option<f64>) -> Self {
        Self { nodata }
    }

    /// Sentinel as stored in `T`, or `None` when `T` cannot represent it exactly
    pub fn sentinel<T: Pixel>(&self) -> Option<T> {
        let nodata = self.nodata?;
        let (lo, hi) = T::DATA_TYPE.range();
        if T::DATA_TYPE.is_integer() && (nodata.fract() != 0.0 || nodata < lo || nodata > hi) {
            return None;
        }
        Some(T::from_f64(nodata))
    }

    /// Flags pixels equal to the sentinel; `None` when no sentinel applies
    pub fn invalid_pixels<T: Pixel>(&self, buffer: &PixelBuffer<T>) -> Option<Array2<bool>> {
        let sentinel = self.sentinel::<T>()?;
        let sentinel = sentinel.to_f64();
        Some(buffer.mapv(|v| is_nodata(v.to_f64(), sentinel)))
    }

    /// Force the sentinel back wherever `original` held it.
    ///
    /// Only runs when a transform actually touched the buffer. Returns the number of
    /// pixels re-stamped.
    pub fn propagate<T: Pixel>(
        &self,
        original: &PixelBuffer<T>,
        corrected: &mut PixelBuffer<T>,
        updated: bool,
    ) -> usize {
        if !updated {
            return 0;
        }
        let sentinel = match self.sentinel::<T>() {
            Some(sentinel) => sentinel,
            None => return 0,
        };

        let sentinel_f64 = sentinel.to_f64();
        let mut restamped = 0;
        Zip::from(corrected).and(original).for_each(|out, &orig| {
            if is_nodata(orig.to_f64(), sentinel_f64) {
                *out = sentinel;
                restamped += 1;
            }
        });
        restamped
    }
}
