use ndarray::Array2;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Dense 2D pixel array for one chunk (rows x columns = height x width)
pub type PixelBuffer<T> = Array2<T>;

/// 0/1 mask produced by the derived-mask operations
pub type MaskBuffer = Array2<u8>;

/// Axis-aligned integer rectangle identified by two inclusive corner points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "ChunkCorners")]
pub struct Chunk {
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
}

impl Chunk {
    /// Create a chunk from two corners; corners are normalized so that (x0, y0) is the origin
    pub fn new(x0: usize, y0: usize, x1: usize, y1: usize) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// Chunk covering a full `width` x `height` image
    pub fn whole(width: usize, height: usize) -> Self {
        Self::new(0, 0, width.saturating_sub(1), height.saturating_sub(1))
    }

    pub fn x0(&self) -> usize {
        self.x0
    }

    pub fn y0(&self) -> usize {
        self.y0
    }

    pub fn x1(&self) -> usize {
        self.x1
    }

    pub fn y1(&self) -> usize {
        self.y1
    }

    pub fn origin(&self) -> (usize, usize) {
        (self.x0, self.y0)
    }

    pub fn width(&self) -> usize {
        self.x1 - self.x0 + 1
    }

    pub fn height(&self) -> usize {
        self.y1 - self.y0 + 1
    }

    /// Buffer shape for this chunk as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.height(), self.width())
    }

    /// Whether `other` lies entirely inside this chunk
    pub fn contains(&self, other: &Chunk) -> bool {
        other.x0 >= self.x0 && other.y0 >= self.y0 && other.x1 <= self.x1 && other.y1 <= self.y1
    }

    /// Whether the chunk fits inside a `width` x `height` image
    pub fn fits_within(&self, width: usize, height: usize) -> bool {
        self.x1 < width && self.y1 < height
    }

    /// Offset of this chunk's origin relative to the origin of `outer`
    pub fn offset_within(&self, outer: &Chunk) -> Option<(usize, usize)> {
        if outer.contains(self) {
            Some((self.x0 - outer.x0, self.y0 - outer.y0))
        } else {
            None
        }
    }
}

#[derive(Deserialize)]
struct ChunkCorners {
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
}

impl From<ChunkCorners> for Chunk {
    fn from(c: ChunkCorners) -> Self {
        Chunk::new(c.x0, c.y0, c.x1, c.y1)
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[({}, {}) - ({}, {})]", self.x0, self.y0, self.x1, self.y1)
    }
}

/// Core chunks (output partition) and their padded counterparts (core + context margin).
///
/// Both sequences are indexed from 1; index 0 always means the whole image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LayoutParts")]
pub struct ChunkLayout {
    width: usize,
    height: usize,
    core: Vec<Chunk>,
    padded: Vec<Chunk>,
}

impl ChunkLayout {
    /// Build a layout, checking that every padded chunk contains its core chunk
    /// and that all chunks lie within the image
    pub fn new(width: usize, height: usize, core: Vec<Chunk>, padded: Vec<Chunk>) -> RasterResult<Self> {
        if width == 0 || height == 0 {
            return Err(RasterError::Config(format!(
                "Image has invalid dimensions: {}x{}",
                width, height
            )));
        }
        if core.len() != padded.len() {
            return Err(RasterError::Config(format!(
                "Chunk layout mismatch: {} core chunks but {} padded chunks",
                core.len(),
                padded.len()
            )));
        }
        for (i, (c, p)) in core.iter().zip(padded.iter()).enumerate() {
            if !p.contains(c) {
                return Err(RasterError::Config(format!(
                    "Padded chunk {} {} does not contain core chunk {}",
                    i + 1,
                    p,
                    c
                )));
            }
            if !p.fits_within(width, height) {
                return Err(RasterError::Bounds {
                    chunk: *p,
                    width,
                    height,
                });
            }
        }
        Ok(Self {
            width,
            height,
            core,
            padded,
        })
    }

    /// Layout with a single unpadded chunk spanning the image
    pub fn whole(width: usize, height: usize) -> RasterResult<Self> {
        let chunk = Chunk::whole(width, height);
        Self::new(width, height, vec![chunk], vec![chunk])
    }

    pub fn len(&self) -> usize {
        self.core.len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.is_empty()
    }

    pub fn core_chunks(&self) -> &[Chunk] {
        &self.core
    }

    pub fn padded_chunks(&self) -> &[Chunk] {
        &self.padded
    }

    /// Core chunk for `index` (0 = whole image)
    pub fn core(&self, index: usize) -> RasterResult<Chunk> {
        self.lookup(&self.core, index)
    }

    /// Padded chunk for `index` (0 = whole image)
    pub fn padded(&self, index: usize) -> RasterResult<Chunk> {
        self.lookup(&self.padded, index)
    }

    fn lookup(&self, chunks: &[Chunk], index: usize) -> RasterResult<Chunk> {
        if index == 0 {
            return Ok(Chunk::whole(self.width, self.height));
        }
        chunks
            .get(index - 1)
            .copied()
            .ok_or(RasterError::ChunkIndex {
                index,
                count: chunks.len(),
            })
    }
}

#[derive(Deserialize)]
struct LayoutParts {
    width: usize,
    height: usize,
    core: Vec<Chunk>,
    padded: Vec<Chunk>,
}

impl TryFrom<LayoutParts> for ChunkLayout {
    type Error = RasterError;

    fn try_from(parts: LayoutParts) -> RasterResult<Self> {
        ChunkLayout::new(parts.width, parts.height, parts.core, parts.padded)
    }
}

/// Storage numeric type of a band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    UInt8,
    UInt16,
    Int16,
    UInt32,
    Int32,
    Float32,
    Float64,
}

impl DataType {
    pub fn is_integer(&self) -> bool {
        !matches!(self, DataType::Float32 | DataType::Float64)
    }

    /// Representable (min, max) range
    pub fn range(&self) -> (f64, f64) {
        match self {
            DataType::UInt8 => (u8::MIN as f64, u8::MAX as f64),
            DataType::UInt16 => (u16::MIN as f64, u16::MAX as f64),
            DataType::Int16 => (i16::MIN as f64, i16::MAX as f64),
            DataType::UInt32 => (u32::MIN as f64, u32::MAX as f64),
            DataType::Int32 => (i32::MIN as f64, i32::MAX as f64),
            DataType::Float32 => (f32::MIN as f64, f32::MAX as f64),
            DataType::Float64 => (f64::MIN, f64::MAX),
        }
    }

    /// Value as it would be stored in a band of this type
    pub fn quantize(&self, value: f64) -> f64 {
        match self {
            DataType::UInt8 => u8::from_f64(value) as f64,
            DataType::UInt16 => u16::from_f64(value) as f64,
            DataType::Int16 => i16::from_f64(value) as f64,
            DataType::UInt32 => u32::from_f64(value) as f64,
            DataType::Int32 => i32::from_f64(value) as f64,
            DataType::Float32 => value as f32 as f64,
            DataType::Float64 => value,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::UInt8 => "Byte",
            DataType::UInt16 => "UInt16",
            DataType::Int16 => "Int16",
            DataType::UInt32 => "UInt32",
            DataType::Int32 => "Int32",
            DataType::Float32 => "Float32",
            DataType::Float64 => "Float64",
        };
        write!(f, "{}", name)
    }
}

/// Numeric pixel type a band can be read or written as
pub trait Pixel: Copy + PartialEq + PartialOrd + fmt::Debug + Zero + One + Send + Sync + 'static {
    const DATA_TYPE: DataType;

    fn to_f64(self) -> f64;

    /// Convert from f64, rounding and saturating for integer types (NaN maps to 0)
    fn from_f64(value: f64) -> Self;
}

macro_rules! impl_integer_pixel {
    ($($t:ty => $dt:ident),*) => {
        $(
            impl Pixel for $t {
                const DATA_TYPE: DataType = DataType::$dt;

                fn to_f64(self) -> f64 {
                    self as f64
                }

                fn from_f64(value: f64) -> Self {
                    value.round() as $t
                }
            }
        )*
    };
}

impl_integer_pixel!(u8 => UInt8, u16 => UInt16, i16 => Int16, u32 => UInt32, i32 => Int32);

impl Pixel for f32 {
    const DATA_TYPE: DataType = DataType::Float32;

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn from_f64(value: f64) -> Self {
        value as f32
    }
}

impl Pixel for f64 {
    const DATA_TYPE: DataType = DataType::Float64;

    fn to_f64(self) -> f64 {
        self
    }

    fn from_f64(value: f64) -> Self {
        value
    }
}

/// Physical units of a band's values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Raw,
    Radiance,
    Reflectance,
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Units::Raw => write!(f, "raw"),
            Units::Radiance => write!(f, "radiance"),
            Units::Reflectance => write!(f, "reflectance"),
        }
    }
}

impl FromStr for Units {
    type Err = RasterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "raw" => Ok(Units::Raw),
            "radiance" => Ok(Units::Radiance),
            "reflectance" => Ok(Units::Reflectance),
            other => Err(RasterError::Config(format!("Unknown units: {}", other))),
        }
    }
}

/// Atmospheric parameters for removing the atmosphere's contribution from at-sensor radiance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AtmosphereModel {
    /// Upwelling path radiance
    pub lu: f64,
    /// Downwelling radiance
    pub ld: f64,
    /// Atmospheric transmittance
    pub t: f64,
}

impl AtmosphereModel {
    pub fn new(lu: f64, ld: f64, t: f64) -> Self {
        Self { lu, ld, t }
    }
}

/// Calibration constants for brightness-temperature recovery of a thermal band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermalConstants {
    pub k1: f64,
    pub k2: f64,
}

/// Band-level metadata replicated by `Raster::process`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BandMetadata {
    pub description: String,
    pub color_interpretation: String,
    /// Free-form key/value items of the default domain
    pub items: BTreeMap<String, String>,
    /// Coordinate system as WKT
    pub coordinate_system: String,
    pub category_names: Vec<String>,
}

/// Error types for band I/O and radiometric processing
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("Storage driver error: {0}")]
    Driver(String),

    #[cfg(feature = "gdal")]
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("Region {chunk} lies outside the {width}x{height} image")]
    Bounds { chunk: Chunk, width: usize, height: usize },

    #[error("Chunk index {index} out of range (1..={count}, 0 = whole image)")]
    ChunkIndex { index: usize, count: usize },

    #[error("Domain error: {0}")]
    Domain(String),

    #[error("Shape mismatch: {0}")]
    Shape(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl RasterError {
    /// Whether the error came from the storage driver itself
    pub fn is_driver_error(&self) -> bool {
        match self {
            RasterError::Driver(_) => true,
            #[cfg(feature = "gdal")]
            RasterError::Gdal(_) => true,
            _ => false,
        }
    }

    /// Whether the error is a rectangle or chunk-index bounds violation
    pub fn is_bounds_error(&self) -> bool {
        matches!(self, RasterError::Bounds { .. } | RasterError::ChunkIndex { .. })
    }
}

/// Result type for band operations
pub type RasterResult<T> = Result<T, RasterError>;
