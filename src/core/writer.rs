use crate::config::RadiometricConfig;
use crate::types::{Chunk, Pixel, PixelBuffer, RasterError, RasterResult};
use ndarray::{s, Array2, Zip};

/// Crop a buffer read for `padded` down to the footprint of `core`.
///
/// Buffers for unpadded chunks are returned unchanged.
pub fn crop_to_core<T: Pixel>(buffer: &PixelBuffer<T>, core: &Chunk, padded: &Chunk) -> RasterResult<PixelBuffer<T>> {
    if core == padded {
        return Ok(buffer.clone());
    }
    if buffer.dim() != padded.shape() {
        return Err(RasterError::Shape(format!(
            "buffer {:?} does not match padded chunk {} ({:?})",
            buffer.dim(),
            padded,
            padded.shape()
        )));
    }
    let (ox, oy) = core.offset_within(padded).ok_or_else(|| {
        RasterError::Config(format!("core chunk {} lies outside padded chunk {}", core, padded))
    })?;

    Ok(buffer
        .slice(s![oy..oy + core.height(), ox..ox + core.width()])
        .to_owned())
}

/// Undo the gain/offset linearization, `(v - offset) / gain`, on every pixel not
/// flagged in `invalid`.
///
/// Returns whether anything was inverted.
pub fn invert_linearization(
    buffer: &mut Array2<f64>,
    config: &RadiometricConfig,
    invalid: Option<&Array2<bool>>,
) -> bool {
    if config.is_identity_scaling() {
        return false;
    }
    let invert = |v: &mut f64| *v = (*v - config.offset) / config.gain;
    match invalid {
        Some(mask) => Zip::from(buffer).and(mask).for_each(|v, &skip| {
            if !skip {
                invert(v);
            }
        }),
        None => buffer.map_inplace(invert),
    }
    true
}
