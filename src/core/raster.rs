use crate::config::{IoContext, RadiometricConfig};
use crate::core::correction::CorrectionPipeline;
use crate::core::mask::MaskCompositor;
use crate::core::nodata::{is_nodata, NoDataPropagator};
use crate::core::stats::{BandStatistics, StatsAccumulator};
use crate::core::writer::{crop_to_core, invert_linearization};
use crate::io::driver::BandDriver;
use crate::io::raw::RawAccessor;
use crate::types::{
    Chunk, ChunkLayout, DataType, MaskBuffer, Pixel, PixelBuffer, RasterError, RasterResult,
};
use ndarray::Array2;

/// A single band with its radiometric configuration, chunk layout and masks.
///
/// Chunk index 0 always means the whole image; indices `1..=n` address the layout.
/// Reads by index use the padded chunk, writes the core chunk. An instance is not
/// synchronized; use one per worker or guard it with a lock.
pub struct Raster {
    driver: Box<dyn BandDriver>,
    config: RadiometricConfig,
    layout: ChunkLayout,
    masks: Vec<Raster>,
    context: IoContext,
    valid_stats: bool,
    stats: Option<BandStatistics>,
}

impl std::fmt::Debug for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Raster")
            .field("config", &self.config)
            .field("masks", &self.masks)
            .field("valid_stats", &self.valid_stats)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Raster {
    /// Wrap a driver with a single whole-image chunk
    pub fn new(driver: Box<dyn BandDriver>, config: RadiometricConfig) -> RasterResult<Self> {
        config.validate()?;
        let (width, height) = driver.size();
        let layout = ChunkLayout::whole(width, height)?;
        log::debug!(
            "{}: {}x{} {} band (gain {}, offset {}, nodata {:?})",
            driver.name(),
            width,
            height,
            driver.data_type(),
            config.gain,
            config.offset,
            config.nodata
        );
        Ok(Self {
            driver,
            config,
            layout,
            masks: Vec::new(),
            context: IoContext::default(),
            valid_stats: true,
            stats: None,
        })
    }

    /// Convenience constructor taking the driver by value
    pub fn from_driver<D: BandDriver + 'static>(driver: D, config: RadiometricConfig) -> RasterResult<Self> {
        Self::new(Box::new(driver), config)
    }

    /// Replace the chunk layout; it must describe an image of this band's size
    pub fn with_layout(mut self, layout: ChunkLayout) -> RasterResult<Self> {
        let (width, height) = self.size();
        if layout.core(0)? != Chunk::whole(width, height) {
            return Err(RasterError::Config(format!(
                "{}: chunk layout describes a different image size than {}x{}",
                self.name(),
                width,
                height
            )));
        }
        self.layout = layout;
        Ok(self)
    }

    pub fn with_context(mut self, context: IoContext) -> Self {
        self.context = context;
        self
    }

    pub fn name(&self) -> String {
        self.driver.name()
    }

    /// (width, height)
    pub fn size(&self) -> (usize, usize) {
        self.driver.size()
    }

    pub fn width(&self) -> usize {
        self.size().0
    }

    pub fn height(&self) -> usize {
        self.size().1
    }

    pub fn data_type(&self) -> DataType {
        self.driver.data_type()
    }

    pub fn config(&self) -> &RadiometricConfig {
        &self.config
    }

    pub fn layout(&self) -> &ChunkLayout {
        &self.layout
    }

    pub fn num_chunks(&self) -> usize {
        self.layout.len()
    }

    pub fn context(&self) -> IoContext {
        self.context
    }

    pub fn driver(&self) -> &dyn BandDriver {
        self.driver.as_ref()
    }

    /// Whether cached statistics still describe the band contents
    pub fn stats_valid(&self) -> bool {
        self.valid_stats
    }

    pub fn masks(&self) -> &[Raster] {
        &self.masks
    }

    /// Add a mask band; it must cover the same image extent
    pub fn add_mask(&mut self, mask: Raster) -> RasterResult<()> {
        if mask.size() != self.size() {
            return Err(RasterError::Config(format!(
                "{}: mask {} is {:?}, expected {:?}",
                self.name(),
                mask.name(),
                mask.size(),
                self.size()
            )));
        }
        if self.config.nodata.is_none() && self.config.is_thermal() && self.config.converts_to_reflectance() {
            return Err(RasterError::Config(format!(
                "{}: thermal band needs a no-data value before adding mask {}; masked pixels would enter temperature recovery",
                self.name(),
                mask.name()
            )));
        }
        if self.config.nodata.is_none() {
            log::warn!(
                "{}: mask {} added without a no-data value; masked pixels will read as {}",
                self.name(),
                mask.name(),
                self.config.fill_value()
            );
        }
        self.masks.push(mask);
        Ok(())
    }

    pub fn clear_masks(&mut self) {
        self.masks.clear();
    }

    /// Read the padded chunk `index` without any transform
    pub fn read_raw<T: Pixel>(&self, index: usize) -> RasterResult<PixelBuffer<T>> {
        let chunk = self.layout.padded(index)?;
        self.read_raw_rect(&chunk)
    }

    /// Read an explicit rectangle without any transform
    pub fn read_raw_rect<T: Pixel>(&self, chunk: &Chunk) -> RasterResult<PixelBuffer<T>> {
        RawAccessor::read(self.driver.as_ref(), chunk)
    }

    /// Read the padded chunk `index` through the full correction pipeline
    pub fn read<T: Pixel>(&self, index: usize) -> RasterResult<PixelBuffer<T>> {
        let chunk = self.layout.padded(index)?;
        self.read_rect(&chunk)
    }

    /// Read an explicit rectangle through masks, correction and no-data propagation
    pub fn read_rect<T: Pixel>(&self, chunk: &Chunk) -> RasterResult<PixelBuffer<T>> {
        let mut raw = self.read_raw_rect::<T>(chunk)?;
        let label = self.name();
        let trace = self.context.traces_steps() && chunk.origin() == (0, 0);

        if !self.masks.is_empty() {
            if trace {
                log::debug!("{}: applying {} masks", label, self.masks.len());
            }
            let fill = T::from_f64(self.config.fill_value());
            MaskCompositor::new(&self.masks).apply(&mut raw, chunk, fill)?;
        }

        let propagator = NoDataPropagator::new(self.config.nodata);
        let invalid = propagator.invalid_pixels(&raw);

        let mut pipeline = CorrectionPipeline::new(&self.config);
        if trace {
            pipeline = pipeline.with_trace(&label);
        }
        let mut work = raw.mapv(Pixel::to_f64);
        let updated = pipeline.apply(&mut work, invalid.as_ref())?;
        if !updated {
            return Ok(raw);
        }

        let mut corrected = work.mapv(T::from_f64);
        propagator.propagate(&raw, &mut corrected, updated);
        Ok(corrected)
    }

    /// Write a raw-scale buffer to the core chunk `index`
    pub fn write_raw<T: Pixel>(&mut self, buffer: &PixelBuffer<T>, index: usize) -> RasterResult<&mut Self> {
        let chunk = self.layout.core(index)?;
        self.write_raw_rect(buffer, &chunk)
    }

    /// Write a raw-scale buffer to an explicit rectangle; invalidates band statistics
    pub fn write_raw_rect<T: Pixel>(&mut self, buffer: &PixelBuffer<T>, chunk: &Chunk) -> RasterResult<&mut Self> {
        RawAccessor::write(self.driver.as_mut(), buffer, chunk)?;
        self.valid_stats = false;
        Ok(self)
    }

    /// Write a corrected-scale buffer read for chunk `index`.
    ///
    /// Padded buffers are cropped to the core chunk, then the gain/offset
    /// linearization is inverted (no-data pixels untouched) before the raw write.
    pub fn write<T: Pixel>(&mut self, buffer: &PixelBuffer<T>, index: usize) -> RasterResult<&mut Self> {
        self.write_as::<T, T>(buffer, index)
    }

    /// Write a buffer of type `S` into storage type `T`, narrowing only after inversion
    fn write_as<S: Pixel, T: Pixel>(&mut self, buffer: &PixelBuffer<S>, index: usize) -> RasterResult<&mut Self> {
        let core = self.layout.core(index)?;
        let padded = self.layout.padded(index)?;
        let cropped = crop_to_core(buffer, &core, &padded)?;

        // Sentinel pixels are identified in the buffer's own type before widening
        let invalid = NoDataPropagator::new(self.config.nodata).invalid_pixels(&cropped);
        let mut work = cropped.mapv(Pixel::to_f64);
        let inverted = invert_linearization(&mut work, &self.config, invalid.as_ref());
        if inverted && self.context.traces_steps() && core.origin() == (0, 0) {
            log::debug!(
                "{}: writing ({}x + {})",
                self.name(),
                self.config.gain,
                self.config.offset
            );
        }
        let raw: PixelBuffer<T> = work.mapv(T::from_f64);
        self.write_raw_rect(&raw, &core)
    }

    /// Copy `source` into this band chunk by chunk through the full read pipeline,
    /// storing the values as `T`, then replicate the source's band metadata.
    ///
    /// Chunks follow this band's layout; the source is read over the same rectangles.
    ///
    /// Aborts on the first failing chunk; chunks already written stay written.
    pub fn process<T: Pixel>(&mut self, source: &Raster) -> RasterResult<&mut Self> {
        if source.size() != self.size() {
            return Err(RasterError::Config(format!(
                "cannot process {} ({:?}) into {} ({:?})",
                source.name(),
                source.size(),
                self.name(),
                self.size()
            )));
        }

        let chunks = self.num_chunks();
        log::info!(
            "Processing {} into {} as {} ({} chunks)",
            source.name(),
            self.name(),
            T::DATA_TYPE,
            chunks
        );

        let source_nodata = source.config.nodata;
        let target_nodata = self.config.nodata;

        for index in 1..=chunks {
            let padded = self.layout.padded(index)?;
            let mut buffer = source.read_rect::<f64>(&padded)?;
            if let (Some(from), Some(to)) = (source_nodata, target_nodata) {
                if !is_nodata(to, from) {
                    buffer.mapv_inplace(|v| if is_nodata(v, from) { to } else { v });
                }
            }
            self.write_as::<f64, T>(&buffer, index)?;
            log::debug!("{}: chunk {}/{} written", self.name(), index, chunks);
        }

        let metadata = source.driver.metadata()?;
        self.driver.set_metadata(&metadata)?;

        log::info!("Processing of {} completed", self.name());
        Ok(self)
    }

    /// `process` using this band's own storage type
    pub fn process_native(&mut self, source: &Raster) -> RasterResult<&mut Self> {
        match self.data_type() {
            DataType::UInt8 => self.process::<u8>(source),
            DataType::UInt16 => self.process::<u16>(source),
            DataType::Int16 => self.process::<i16>(source),
            DataType::UInt32 => self.process::<u32>(source),
            DataType::Int32 => self.process::<i32>(source),
            DataType::Float32 => self.process::<f32>(source),
            DataType::Float64 => self.process::<f64>(source),
        }
    }

    /// 1 where the raw digital count reaches the saturation level `max_dc`
    pub fn saturation_mask(&self, index: usize) -> RasterResult<MaskBuffer> {
        let raw = self.read_raw::<f32>(index)?;
        let max_dc = self.config.max_dc;
        Ok(raw.mapv(|v| u8::from(v as f64 >= max_dc)))
    }

    /// 1 where the raw pixel is valid, 0 where it holds the no-data sentinel
    pub fn nodata_mask(&self, index: usize) -> RasterResult<MaskBuffer> {
        let raw = self.read_raw::<f64>(index)?;
        let data_type = self.data_type();
        let sentinel = self
            .config
            .nodata
            .map(|v| if v.is_nan() { v } else { data_type.quantize(v) });
        let propagator = NoDataPropagator::new(sentinel);
        match propagator.invalid_pixels(&raw) {
            Some(invalid) => Ok(invalid.mapv(|nd| u8::from(!nd))),
            None => Ok(Array2::ones(raw.dim())),
        }
    }

    /// Statistics of the corrected band over the core chunks, cached until the next write
    pub fn statistics(&mut self) -> RasterResult<BandStatistics> {
        if self.valid_stats {
            if let Some(stats) = self.stats {
                return Ok(stats);
            }
        }

        let mut acc = StatsAccumulator::new(self.config.nodata);
        let indices: Vec<usize> = if self.layout.is_empty() {
            vec![0]
        } else {
            (1..=self.num_chunks()).collect()
        };
        for index in indices {
            let core = self.layout.core(index)?;
            let padded = self.layout.padded(index)?;
            let buffer = crop_to_core(&self.read::<f64>(index)?, &core, &padded)?;
            acc.extend(buffer.iter().copied());
        }

        let stats = acc.finish();
        log::info!(
            "{}: min {:.4} max {:.4} mean {:.4} stddev {:.4} ({} valid pixels)",
            self.name(),
            stats.min,
            stats.max,
            stats.mean,
            stats.stddev,
            stats.valid_count
        );
        self.stats = Some(stats);
        self.valid_stats = true;
        Ok(stats)
    }
}
