//! efq-core: Request dispatching for the efq query DSL
//!
//! This crate ties the parser and the query builder to the collaborators a
//! listing needs: a [`QueryExecutor`](efq_query::QueryExecutor) to find ids, a
//! [`Renderer`] to turn them into output, and an optional [`ResponseCache`].
//!
//! # Architecture
//!
//! - [`api`] - The [`Dispatcher`], [`Response`] placeholders and block entry point
//! - [`pager`] - Page arithmetic and pager links (default, simple, restricted)
//! - [`render`] - Rendering contract and the JSON renderer of the memory store
//! - [`cache`] - Response cache contract and an LRU implementation
//! - [`routes`] - Fixed listing routes expressed as parameter maps
//! - [`error`] - Dispatcher errors

#![warn(missing_docs)]

pub mod api;
pub mod cache;
pub mod error;
pub mod pager;
pub mod render;
pub mod routes;

pub use api::{
    BlockConfig, Dispatcher, Response, DEFAULT_CACHE_TTL, EMPTY_BLOCK_MESSAGE, FAILURE_MESSAGE,
    INVALID_DATE_MESSAGE, INVALID_INPUT_MESSAGE, NO_RESULTS_MESSAGE,
};
pub use cache::{LruResponseCache, ResponseCache, DEFAULT_CACHE_CAPACITY};
pub use error::{DispatchError, Result};
pub use pager::{
    links, paginate, replay_params, Pager, PagerLink, PagerLinkKind, PagerState,
};
pub use render::{RenderError, RenderedOutput, Renderer};
pub use routes::{nodes_route, paged_nodes_route};

pub use efq_shared::VERSION;
