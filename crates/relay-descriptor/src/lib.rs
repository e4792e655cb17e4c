//! Relay Service Descriptors
//!
//! This crate describes the set of remote endpoints a client may call and the
//! order in which they should be tried.
//!
//! # Overview
//!
//! - [`Target`]: one concrete endpoint (address, checksum, timeouts)
//! - [`Group`]: an ordered collection of child descriptors with a
//!   [`SelectionPolicy`] (ordered, random, load-balanced)
//! - [`Descriptor`]: the tree node unifying both
//! - [`DescriptorConfig`]: serde declaration of a tree (TOML or JSON)
//!
//! A descriptor is built once, shared read-only, and asked for a fresh
//! candidate list ([`Descriptor::leaves`]) at the start of every logical call.
//!
//! # Example
//!
//! ```
//! use relay_descriptor::DescriptorConfig;
//!
//! let config = DescriptorConfig::from_toml_str(r#"
//! policy = "load_balanced"
//!
//! [[children]]
//! address = "10.0.0.1:9001"
//!
//! [[children]]
//! address = "10.0.0.2:9001"
//! "#).unwrap();
//!
//! let descriptor = config.build().unwrap();
//! assert_eq!(descriptor.leaves()[0].address(), "10.0.0.1:9001");
//! assert_eq!(descriptor.leaves()[0].address(), "10.0.0.2:9001");
//! ```

pub mod checksum;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod group;
pub mod target;

pub use checksum::checksum;
pub use config::{DescriptorConfig, GroupConfig, TargetConfig};
pub use descriptor::Descriptor;
pub use error::{DescriptorError, Result};
pub use group::{Group, SelectionPolicy};
pub use target::{Target, TargetTimeouts};
