//! # efq-query
//!
//! Turns a flat map of DSL parameters into one normalized
//! [`QueryDescriptor`] and drives an entity-query backend with it.
//!
//! This crate provides:
//! - The table-driven [`DescriptorBuilder`] and its [`QueryConfig`]
//! - The [`EntityQuery`] contract and the translator that walks condition trees
//! - The [`QueryExecutor`] contract used by the dispatcher
//! - [`MemoryStore`], a reference backend over JSON records
//!
//! ```rust
//! use efq_query::{DescriptorBuilder, MemoryStore, QueryConfig, QueryExecutor};
//! use efq_shared::params;
//!
//! let store = MemoryStore::from_json(
//!     "nid",
//!     r#"[{"nid": 1, "type": "page", "status": 1, "field_price": 5},
//!         {"nid": 2, "type": "page", "status": 1, "field_price": 50}]"#,
//! )?;
//! let request = DescriptorBuilder::new(QueryConfig::default())?
//!     .build(&params([("field", "field_price--10--<=")]))?;
//! assert_eq!(store.execute(&request.descriptor)?, vec![1]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod builder;
pub mod config;
pub mod descriptor;
pub mod executor;
pub mod memory;
pub mod translate;

pub use builder::{is_known_key, BuildError, DescriptorBuilder, ParsedRequest};
pub use config::{default_bundle_key, InvalidDatePolicy, QueryConfig};
pub use descriptor::{Bundle, QueryDescriptor};
pub use executor::{EntityId, ExecutionError, QueryExecutor};
pub use memory::{MemoryGroup, MemoryQuery, MemoryStore};
pub use translate::{
    apply_filters, apply_query, build_group, ConditionSink, EntityQuery, QueryGroup,
    RANDOM_ORDER_TAG,
};

/// Re-export commonly used types from efq-shared
pub use efq_shared::{Params, Result};
