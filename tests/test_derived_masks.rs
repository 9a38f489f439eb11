use bandcal::{Chunk, ChunkLayout, DataType, MemoryBand, RadiometricConfig, Raster};
use ndarray::array;

fn raster(data: ndarray::Array2<f64>, data_type: DataType, config: RadiometricConfig) -> Raster {
    Raster::from_driver(MemoryBand::from_array("band", data, data_type), config).unwrap()
}

#[test]
fn test_saturation_mask_flags_max_dc() {
    let config = RadiometricConfig {
        max_dc: 4095.0,
        gain: 0.01,
        ..Default::default()
    };
    let band = raster(array![[4094.0, 4095.0, 4096.0, 0.0]], DataType::UInt16, config);
    assert_eq!(band.saturation_mask(0).unwrap(), array![[0u8, 1, 1, 0]]);
}

#[test]
fn test_saturation_mask_follows_padded_chunk() {
    let layout = ChunkLayout::new(
        4,
        2,
        vec![Chunk::new(0, 0, 1, 1), Chunk::new(2, 0, 3, 1)],
        vec![Chunk::new(0, 0, 2, 1), Chunk::new(1, 0, 3, 1)],
    )
    .unwrap();
    let band = raster(
        array![[255.0, 10.0, 255.0, 3.0], [0.0, 255.0, 1.0, 2.0]],
        DataType::UInt8,
        RadiometricConfig::default(),
    )
    .with_layout(layout)
    .unwrap();

    let mask = band.saturation_mask(2).unwrap();
    assert_eq!(mask, array![[0u8, 1, 0], [1, 0, 0]]);
}

#[test]
fn test_nodata_mask_marks_valid_pixels() {
    let config = RadiometricConfig {
        nodata: Some(0.0),
        ..Default::default()
    };
    let band = raster(array![[0.0, 5.0], [7.0, 0.0]], DataType::Int16, config);
    assert_eq!(band.nodata_mask(0).unwrap(), array![[0u8, 1], [1, 0]]);
}

#[test]
fn test_nodata_mask_without_sentinel_is_all_valid() {
    let band = raster(array![[0.0, 5.0]], DataType::UInt8, RadiometricConfig::default());
    assert_eq!(band.nodata_mask(0).unwrap(), array![[1u8, 1]]);
}

#[test]
fn test_nodata_mask_ignores_correction() {
    let config = RadiometricConfig {
        nodata: Some(-9999.0),
        gain: 2.0,
        offset: 1.0,
        ..Default::default()
    };
    let band = raster(array![[-9999.0, 3.5]], DataType::Float32, config);
    assert_eq!(band.nodata_mask(0).unwrap(), array![[0u8, 1]]);
}

#[test]
fn test_derived_mask_usable_as_band_mask() {
    let config = RadiometricConfig {
        nodata: Some(0.0),
        max_dc: 200.0,
        ..Default::default()
    };
    let source = raster(array![[50.0, 200.0, 120.0]], DataType::UInt8, config.clone());
    let saturated = source.saturation_mask(0).unwrap();
    let valid = saturated.mapv(|s| f64::from(1 - s));

    let mut band = raster(array![[50.0, 200.0, 120.0]], DataType::UInt8, config);
    band.add_mask(raster(valid, DataType::UInt8, RadiometricConfig::default()))
        .unwrap();
    assert_eq!(band.read::<u8>(0).unwrap(), array![[50u8, 0, 120]]);
}
