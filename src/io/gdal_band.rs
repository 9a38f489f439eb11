use crate::io::driver::BandDriver;
use crate::types::{BandMetadata, DataType, RasterError, RasterResult};
use gdal::raster::{Buffer, ColorInterpretation, GdalDataType, RasterBand};
use gdal::{Dataset, DatasetOptions, GdalOpenFlags, Metadata};
use ndarray::Array2;
use std::ffi::{CStr, CString};
use std::path::Path;

/// Band of a GDAL dataset
pub struct GdalBand {
    dataset: Dataset,
    band_index: isize,
    name: String,
}

impl GdalBand {
    /// Open `band_index` (1-based) of a dataset read-only
    pub fn open<P: AsRef<Path>>(path: P, band_index: isize) -> RasterResult<Self> {
        log::info!("Opening {} band {}", path.as_ref().display(), band_index);
        let dataset = Dataset::open(path.as_ref())?;
        Self::from_dataset(dataset, band_index, path.as_ref())
    }

    /// Open `band_index` (1-based) of a dataset for update
    pub fn open_update<P: AsRef<Path>>(path: P, band_index: isize) -> RasterResult<Self> {
        log::info!("Opening {} band {} for update", path.as_ref().display(), band_index);
        let options = DatasetOptions {
            open_flags: GdalOpenFlags::GDAL_OF_UPDATE | GdalOpenFlags::GDAL_OF_RASTER,
            ..Default::default()
        };
        let dataset = Dataset::open_ex(path.as_ref(), options)?;
        Self::from_dataset(dataset, band_index, path.as_ref())
    }

    /// Wrap an already open dataset
    pub fn from_dataset(dataset: Dataset, band_index: isize, path: &Path) -> RasterResult<Self> {
        if band_index < 1 || band_index > dataset.raster_count() {
            return Err(RasterError::Driver(format!(
                "{} has no band {} ({} bands)",
                path.display(),
                band_index,
                dataset.raster_count()
            )));
        }
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            dataset,
            band_index,
            name: format!("{}[{}]", name, band_index),
        })
    }

    fn band(&self) -> RasterResult<RasterBand<'_>> {
        Ok(self.dataset.rasterband(self.band_index)?)
    }

    fn category_names(band: &RasterBand<'_>) -> Vec<String> {
        let mut names = Vec::new();
        unsafe {
            let list = gdal_sys::GDALGetRasterCategoryNames(band.c_rasterband());
            if list.is_null() {
                return names;
            }
            let mut i = 0;
            loop {
                let entry = *list.offset(i);
                if entry.is_null() {
                    break;
                }
                names.push(CStr::from_ptr(entry).to_string_lossy().into_owned());
                i += 1;
            }
        }
        names
    }

    fn set_category_names(band: &RasterBand<'_>, names: &[String]) -> RasterResult<()> {
        let owned: Vec<CString> = names
            .iter()
            .map(|n| CString::new(n.as_str()))
            .collect::<Result<_, _>>()
            .map_err(|e| RasterError::Driver(format!("Invalid category name: {}", e)))?;
        let mut pointers: Vec<*mut std::os::raw::c_char> =
            owned.iter().map(|c| c.as_ptr() as *mut _).collect();
        pointers.push(std::ptr::null_mut());

        let err = unsafe { gdal_sys::GDALSetRasterCategoryNames(band.c_rasterband(), pointers.as_mut_ptr()) };
        if err != gdal_sys::CPLErr::CE_None {
            return Err(RasterError::Driver(format!("Failed to set category names: {:?}", err)));
        }
        Ok(())
    }
}

fn data_type_from_gdal(data_type: GdalDataType) -> DataType {
    match data_type {
        GdalDataType::UInt8 => DataType::UInt8,
        GdalDataType::UInt16 => DataType::UInt16,
        GdalDataType::Int16 => DataType::Int16,
        GdalDataType::UInt32 => DataType::UInt32,
        GdalDataType::Int32 => DataType::Int32,
        GdalDataType::Float32 => DataType::Float32,
        GdalDataType::Float64 => DataType::Float64,
        other => {
            log::warn!("Unsupported GDAL data type {:?}; reading as Float64", other);
            DataType::Float64
        }
    }
}

impl BandDriver for GdalBand {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn size(&self) -> (usize, usize) {
        self.dataset.raster_size()
    }

    fn data_type(&self) -> DataType {
        match self.band() {
            Ok(band) => data_type_from_gdal(band.band_type()),
            Err(e) => {
                log::warn!("{}: cannot query band type ({}); assuming Float64", self.name, e);
                DataType::Float64
            }
        }
    }

    fn read_region(&self, x: usize, y: usize, width: usize, height: usize) -> RasterResult<Array2<f64>> {
        let band = self.band()?;
        let buffer = band
            .read_as::<f64>((x as isize, y as isize), (width, height), (width, height), None)
            .map_err(|e| RasterError::Driver(format!("error reading {}: {}", self.name, e)))?;
        Array2::from_shape_vec((height, width), buffer.data)
            .map_err(|e| RasterError::Shape(format!("Failed to reshape band data: {}", e)))
    }

    fn write_region(&mut self, x: usize, y: usize, data: &Array2<f64>) -> RasterResult<()> {
        let (height, width) = data.dim();
        let buffer = Buffer {
            size: (width, height),
            data: data.iter().copied().collect(),
        };
        let mut band = self.band()?;
        band.write((x as isize, y as isize), (width, height), &buffer)
            .map_err(|e| RasterError::Driver(format!("error writing {}: {}", self.name, e)))
    }

    fn metadata(&self) -> RasterResult<BandMetadata> {
        let band = self.band()?;
        let items = band
            .metadata_domain("")
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| {
                entry
                    .split_once('=')
                    .map(|(k, v)| (k.to_string(), v.to_string()))
            })
            .collect();

        Ok(BandMetadata {
            description: band.description()?,
            color_interpretation: band.color_interpretation().name(),
            items,
            coordinate_system: self.dataset.projection(),
            category_names: Self::category_names(&band),
        })
    }

    fn set_metadata(&mut self, metadata: &BandMetadata) -> RasterResult<()> {
        {
            let mut band = self.band()?;
            band.set_description(&metadata.description)?;
            if let Ok(ci) = ColorInterpretation::from_name(&metadata.color_interpretation) {
                band.set_color_interpretation(ci)?;
            }
            for (key, value) in &metadata.items {
                band.set_metadata_item(key, value, "")?;
            }
            Self::set_category_names(&band, &metadata.category_names)?;
        }
        if !metadata.coordinate_system.is_empty() {
            self.dataset.set_projection(&metadata.coordinate_system)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdal::DriverManager;
    use ndarray::array;

    fn create_tiff(path: &Path) {
        let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
        let dataset = driver
            .create_with_band_type::<u16, _>(path, 4, 3, 1)
            .unwrap();
        drop(dataset);
    }

    #[test]
    fn test_gdal_region_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("band.tif");
        create_tiff(&path);

        let mut band = GdalBand::open_update(&path, 1).unwrap();
        assert_eq!(band.size(), (4, 3));
        assert_eq!(band.data_type(), DataType::UInt16);

        band.write_region(1, 1, &array![[7.0, 8.0]]).unwrap();
        let region = band.read_region(0, 1, 3, 1).unwrap();
        assert_eq!(region, array![[0.0, 7.0, 8.0]]);
    }

    #[test]
    fn test_data_type_mapping() {
        assert_eq!(data_type_from_gdal(GdalDataType::Int16), DataType::Int16);
        assert_eq!(data_type_from_gdal(GdalDataType::Float64), DataType::Float64);
        assert_eq!(data_type_from_gdal(GdalDataType::Unknown), DataType::Float64);
    }

    #[test]
    fn test_gdal_missing_band() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("band.tif");
        create_tiff(&path);

        assert!(GdalBand::open(&path, 2).unwrap_err().is_driver_error());
    }
}
