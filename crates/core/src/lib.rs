//! idproxy core library.
//!
//! Building blocks for the response side of a federated identity proxy:
//! subject identifier normalization, the attribute-name map, configuration,
//! and the pipeline that runs response stages in order.

pub mod attribute_map;
pub mod config;
pub mod errors;
pub mod identity;
pub mod pipeline;

// Re-exports for convenience.
pub use attribute_map::AttributeMap;
pub use config::ProxyConfig;
pub use identity::UpnNormalizer;
pub use pipeline::{Pipeline, ResponseContext};
