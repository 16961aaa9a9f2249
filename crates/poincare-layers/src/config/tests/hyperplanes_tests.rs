//! Tests for HyperplaneConfig.

use crate::config::HyperplaneConfig;

#[test]
fn test_hyperplane_config_default() {
    let config = HyperplaneConfig::default();
    assert!(config.signed);
    assert!(!config.squared);
    assert!(!config.scaled);
    assert!(!config.zero);
    assert_eq!(config.std, 1.0);
    assert!(config.validate().is_ok());
}

#[test]
fn test_hyperplane_config_validation() {
    assert!(HyperplaneConfig::with_spatial_rank(3).validate().is_ok());
    assert!(HyperplaneConfig::with_spatial_rank(4).validate().is_err());

    let config = HyperplaneConfig {
        std: 0.0,
        ..Default::default()
    };
    assert!(config.validate().is_err());

    let config = HyperplaneConfig {
        std: f64::NAN,
        ..Default::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_hyperplane_config_deserializes_from_json() {
    let json = r#"{"signed":false,"squared":true,"scaled":true,"zero":true,"std":0.5,"n":1}"#;
    let config: HyperplaneConfig = serde_json::from_str(json).unwrap();
    assert!(!config.signed && config.squared && config.scaled && config.zero);
    assert_eq!(config.n, 1);
}
