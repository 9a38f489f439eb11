use crate::io::driver::BandDriver;
use crate::types::{BandMetadata, DataType, RasterError, RasterResult};
use ndarray::{s, Array2};

/// In-process band held in memory.
///
/// Written values are quantized to the declared storage type the way a file-backed
/// band would store them.
#[derive(Debug, Clone)]
pub struct MemoryBand {
    name: String,
    data_type: DataType,
    data: Array2<f64>,
    metadata: BandMetadata,
    writes: usize,
}

impl MemoryBand {
    /// Zero-filled band of the given size
    pub fn new(name: &str, width: usize, height: usize, data_type: DataType) -> Self {
        Self::from_array(name, Array2::zeros((height, width)), data_type)
    }

    /// Band initialized from an array shaped (height, width)
    pub fn from_array(name: &str, data: Array2<f64>, data_type: DataType) -> Self {
        let data = data.mapv(|v| data_type.quantize(v));
        Self {
            name: name.to_string(),
            data_type,
            data,
            metadata: BandMetadata::default(),
            writes: 0,
        }
    }

    pub fn with_metadata(mut self, metadata: BandMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Full band contents
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// Number of successful region writes
    pub fn write_count(&self) -> usize {
        self.writes
    }

    fn check_region(&self, x: usize, y: usize, width: usize, height: usize) -> RasterResult<()> {
        let (rows, cols) = self.data.dim();
        if width == 0 || height == 0 || x + width > cols || y + height > rows {
            return Err(RasterError::Driver(format!(
                "{}: access window {}x{} at ({}, {}) exceeds {}x{} band",
                self.name, width, height, x, y, cols, rows
            )));
        }
        Ok(())
    }
}

impl BandDriver for MemoryBand {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn size(&self) -> (usize, usize) {
        let (rows, cols) = self.data.dim();
        (cols, rows)
    }

    fn data_type(&self) -> DataType {
        self.data_type
    }

    fn read_region(&self, x: usize, y: usize, width: usize, height: usize) -> RasterResult<Array2<f64>> {
        self.check_region(x, y, width, height)?;
        Ok(self.data.slice(s![y..y + height, x..x + width]).to_owned())
    }

    fn write_region(&mut self, x: usize, y: usize, data: &Array2<f64>) -> RasterResult<()> {
        let (height, width) = data.dim();
        self.check_region(x, y, width, height)?;
        let data_type = self.data_type;
        self.data
            .slice_mut(s![y..y + height, x..x + width])
            .zip_mut_with(data, |dst, &src| *dst = data_type.quantize(src));
        self.writes += 1;
        Ok(())
    }

    fn metadata(&self) -> RasterResult<BandMetadata> {
        Ok(self.metadata.clone())
    }

    fn set_metadata(&mut self, metadata: &BandMetadata) -> RasterResult<()> {
        self.metadata = metadata.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_region_read_write() {
        let mut band = MemoryBand::new("mem", 4, 3, DataType::Float32);
        band.write_region(1, 1, &array![[1.0, 2.0], [3.0, 4.0]]).unwrap();

        let region = band.read_region(0, 1, 3, 2).unwrap();
        assert_eq!(region, array![[0.0, 1.0, 2.0], [0.0, 3.0, 4.0]]);
        assert_eq!(band.write_count(), 1);
    }

    #[test]
    fn test_writes_are_quantized() {
        let mut band = MemoryBand::new("mem", 2, 1, DataType::UInt8);
        band.write_region(0, 0, &array![[12.6, 400.0]]).unwrap();
        assert_eq!(band.data(), &array![[13.0, 255.0]]);
    }

    #[test]
    fn test_out_of_range_window_is_driver_error() {
        let band = MemoryBand::new("mem", 4, 4, DataType::UInt16);
        let err = band.read_region(2, 2, 3, 1).unwrap_err();
        assert!(err.is_driver_error());
        assert!(err.to_string().contains("exceeds"));
    }
}
