//! efq: entity field queries for filtered, sorted and paginated listings
//!
//! Clients describe a listing as a flat map of keys to compact DSL strings
//! (`field`, `category`, `date`, `sort`, `paged`, ...). The workspace is split
//! the same way a request flows:
//!
//! - [`parser`] - fragment grammars (`efq-parser`)
//! - [`query`] - descriptor building, backend translation, the in-memory
//!   store (`efq-query`)
//! - [`dispatch`] - dispatching, pagination, rendering and caching (`efq-core`)
//!
//! ```rust
//! use efq::{params, DescriptorBuilder, Dispatcher, MemoryStore, QueryConfig, Response};
//!
//! let store = MemoryStore::from_json(
//!     "nid",
//!     r#"[{"nid": 1, "type": "article", "status": 1},
//!         {"nid": 2, "type": "article", "status": 1}]"#,
//! )?;
//! let mut dispatcher = Dispatcher::new(
//!     DescriptorBuilder::new(QueryConfig::default())?,
//!     &store,
//!     &store,
//! );
//!
//! let response = dispatcher.respond(&params([("content_type", "article"), ("paged", "1-1")]));
//! let Response::Rendered { pager: Some(pager), .. } = response else {
//!     panic!("expected a paged listing");
//! };
//! assert_eq!(pager.state.total_pages, 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use efq_core as dispatch;
pub use efq_parser as parser;
pub use efq_query as query;
pub use efq_shared as shared;

pub use efq_core::{
    nodes_route, paged_nodes_route, paginate, replay_params, BlockConfig, DispatchError,
    Dispatcher, LruResponseCache, Pager, PagerLink, PagerLinkKind, PagerState, RenderError,
    RenderedOutput, Renderer, Response, ResponseCache,
};
pub use efq_parser::{PagerMode, PagerSpec, ParseError};
pub use efq_query::{
    BuildError, DescriptorBuilder, EntityId, ExecutionError, InvalidDatePolicy, MemoryStore,
    ParsedRequest, QueryConfig, QueryDescriptor, QueryExecutor,
};
pub use efq_shared::{params, stable_hash, Params, VERSION};
