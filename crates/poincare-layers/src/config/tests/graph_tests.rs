//! Tests for GraphConvConfig and Aggregation.

use crate::config::{Aggregation, GraphConvConfig};

#[test]
fn test_aggregation_parsing() {
    assert_eq!("add".parse::<Aggregation>().unwrap(), Aggregation::Add);
    assert_eq!("MEAN".parse::<Aggregation>().unwrap(), Aggregation::Mean);
    assert_eq!("Max".parse::<Aggregation>().unwrap(), Aggregation::Max);
    assert!("median".parse::<Aggregation>().is_err());
    assert_eq!(Aggregation::default(), Aggregation::Add);
    assert_eq!(Aggregation::Mean.to_string(), "mean");
}

#[test]
fn test_graph_conv_config_defaults() {
    let config = GraphConvConfig::default();
    assert_eq!(config.aggregation, Aggregation::Add);
    assert_eq!(config.num_basis(8), 8);
    assert!(config.validate().is_ok());

    let config = GraphConvConfig {
        num_basis: Some(0),
        ..Default::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_graph_conv_config_serialization() {
    let config = GraphConvConfig {
        aggregation: Aggregation::Max,
        num_basis: Some(4),
    };
    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains("\"max\""));
    let back: GraphConvConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(config, back);
}
