//! Tests for Pool2dConfig window arithmetic.

use crate::config::Pool2dConfig;

#[test]
fn test_stride_defaults_to_kernel() {
    let config = Pool2dConfig::new(3);
    assert_eq!(config.stride(), (3, 3));
    assert_eq!(config.with_stride(1).stride(), (1, 1));
}

#[test]
fn test_output_size_floor_mode() {
    assert_eq!(Pool2dConfig::new(2).output_size(4, 4).unwrap(), (2, 2));
    assert_eq!(Pool2dConfig::new(2).output_size(5, 7).unwrap(), (2, 3));
    assert_eq!(
        Pool2dConfig::new(3).with_stride(1).with_padding(1).output_size(4, 4).unwrap(),
        (4, 4)
    );
    assert_eq!(
        Pool2dConfig::new(2).with_stride(1).with_dilation(2).output_size(5, 5).unwrap(),
        (3, 3)
    );
}

#[test]
fn test_output_size_ceil_mode() {
    assert_eq!(
        Pool2dConfig::new(2).with_ceil_mode(true).output_size(5, 5).unwrap(),
        (3, 3)
    );
    // last window would start in the right padding and is dropped
    assert_eq!(
        Pool2dConfig::new(2).with_padding(1).with_ceil_mode(true).output_size(5, 5).unwrap(),
        (3, 3)
    );
}

#[test]
fn test_validation_failures() {
    assert!(Pool2dConfig::new(0).validate().is_err());
    assert!(Pool2dConfig::new(2).with_stride(0).validate().is_err());
    assert!(Pool2dConfig::new(2).with_dilation(0).validate().is_err());
    assert!(Pool2dConfig::new(2).with_padding(2).validate().is_err());
    assert!(Pool2dConfig::new(2).with_padding(1).validate().is_ok());
    assert!(Pool2dConfig::new(3).output_size(2, 2).is_err());
}

#[test]
fn test_pool_config_serialization_roundtrip() {
    let config = Pool2dConfig::new(3).with_stride(2).with_padding(1);
    let json = serde_json::to_string(&config).unwrap();
    let back: Pool2dConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(config, back);
}
