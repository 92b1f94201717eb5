//! Request dispatching
//!
//! A [`Dispatcher`] runs one request end to end: build the descriptor, run
//! the records query, count and paginate when paged, then render. Anything
//! the presentation layer can show as a placeholder comes back as a
//! [`Response`] variant rather than an error.
//!
//! ```rust
//! use efq_core::{Dispatcher, Response};
//! use efq_query::{DescriptorBuilder, MemoryStore, QueryConfig};
//! use efq_shared::params;
//!
//! let store = MemoryStore::from_json(
//!     "nid",
//!     r#"[{"nid": 1, "type": "article", "status": 1, "title": "Hello"}]"#,
//! )?;
//! let builder = DescriptorBuilder::new(QueryConfig::default())?;
//! let mut dispatcher = Dispatcher::new(builder, &store, &store);
//!
//! let response = dispatcher.respond(&params([("content_type", "article")]));
//! assert!(matches!(response, Response::Rendered { .. }));
//!
//! let response = dispatcher.respond(&params([("content_type", "event")]));
//! assert_eq!(response, Response::NoResults);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::time::Duration;

use efq_query::{BuildError, DescriptorBuilder, EntityId, QueryExecutor};
use efq_shared::{stable_hash, Params};
use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::cache::ResponseCache;
use crate::error::{DispatchError, Result};
use crate::pager::{paginate, Pager};
use crate::render::{RenderedOutput, Renderer};

/// Message shown when a request matches nothing
pub const NO_RESULTS_MESSAGE: &str = "Sorry, there are no results for your current selection.";
/// Message shown for an invalid date filter
pub const INVALID_DATE_MESSAGE: &str = "Sorry, the date format is not valid.";
/// Message shown for a malformed request
pub const INVALID_INPUT_MESSAGE: &str = "Sorry, the request could not be understood.";
/// Message shown by a block without a content type
pub const EMPTY_BLOCK_MESSAGE: &str = "This block is empty";
/// Message shown when a backend fails
pub const FAILURE_MESSAGE: &str = "Sorry, the results could not be loaded.";

/// Default lifetime of a cached response
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Outcome of a request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    /// Records were found and rendered
    Rendered {
        /// Rendered records
        output: RenderedOutput,
        /// Pager, when the request is paged over more than one page
        pager: Option<Pager>,
    },
    /// The request matched nothing
    NoResults,
    /// A date filter failed validation
    InvalidDate,
    /// A fragment was malformed
    InvalidInput {
        /// What was wrong
        reason: String,
    },
    /// A block was configured without a content type
    EmptyBlock,
    /// A backend failed; details are logged, not shown
    Failure,
}

impl Response {
    /// Placeholder text for the presentation layer, `None` when records
    /// were rendered
    pub fn message(&self) -> Option<&'static str> {
        match self {
            Response::Rendered { .. } => None,
            Response::NoResults => Some(NO_RESULTS_MESSAGE),
            Response::InvalidDate => Some(INVALID_DATE_MESSAGE),
            Response::InvalidInput { .. } => Some(INVALID_INPUT_MESSAGE),
            Response::EmptyBlock => Some(EMPTY_BLOCK_MESSAGE),
            Response::Failure => Some(FAILURE_MESSAGE),
        }
    }

    /// Whether this response may be served from the cache
    pub fn is_cacheable(&self) -> bool {
        matches!(self, Response::Rendered { .. } | Response::NoResults)
    }
}

/// Block placement settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockConfig {
    /// Bundle(s) listed by the block, comma-separated
    pub content_type: Option<String>,
    /// View mode, the builder's default when unset
    pub view_mode: Option<String>,
}

/// Runs requests against an executor and a renderer
pub struct Dispatcher<E, R> {
    builder: DescriptorBuilder,
    executor: E,
    renderer: R,
    cache: Option<Box<dyn ResponseCache>>,
    cache_ttl: Duration,
}

impl<E: QueryExecutor, R: Renderer> Dispatcher<E, R> {
    /// Dispatcher without a cache
    pub fn new(builder: DescriptorBuilder, executor: E, renderer: R) -> Self {
        Self {
            builder,
            executor,
            renderer,
            cache: None,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Cache finished responses for `ttl` unless a call says otherwise
    #[must_use]
    pub fn with_cache(mut self, cache: Box<dyn ResponseCache>, ttl: Duration) -> Self {
        self.cache = Some(cache);
        self.cache_ttl = ttl;
        self
    }

    /// The builder requests go through
    pub fn builder(&self) -> &DescriptorBuilder {
        &self.builder
    }

    /// Run `params`, caching with the default lifetime
    pub fn dispatch(&mut self, params: &Params) -> Result<Response> {
        self.dispatch_with_ttl(params, None)
    }

    /// Run `params`, caching for `ttl` (or the default lifetime)
    pub fn dispatch_with_ttl(&mut self, params: &Params, ttl: Option<Duration>) -> Result<Response> {
        let key = self.cache.as_ref().map(|_| stable_hash(params));
        if let (Some(cache), Some(key)) = (self.cache.as_mut(), key.as_deref()) {
            if let Some(hit) = cache.get(key) {
                debug!("Serving cached response for {}", key);
                return Ok(hit);
            }
        }

        let response = self.run(params)?;

        if let (Some(cache), Some(key)) = (self.cache.as_mut(), key.as_deref()) {
            if response.is_cacheable() {
                cache.set(key, response.clone(), ttl.unwrap_or(self.cache_ttl));
            }
        }
        Ok(response)
    }

    /// Run `params`, turning backend failures into [`Response::Failure`]
    pub fn respond(&mut self, params: &Params) -> Response {
        match self.dispatch(params) {
            Ok(response) => response,
            Err(err) => {
                error!("Request failed: {}", err);
                Response::Failure
            }
        }
    }

    /// Ids matching `params`, without rendering
    pub fn ids(&self, params: &Params) -> Result<Vec<EntityId>> {
        let request = self.builder.build(params)?;
        Ok(self.executor.execute(&request.descriptor)?)
    }

    /// Render a block placement
    pub fn block(&mut self, config: &BlockConfig) -> Response {
        let Some(content_type) = config.content_type.as_deref().filter(|c| !c.trim().is_empty())
        else {
            return Response::EmptyBlock;
        };
        let mut params = Params::new();
        params.insert("content_type".to_string(), content_type.to_string());
        if let Some(view_mode) = &config.view_mode {
            params.insert("view_mode".to_string(), view_mode.clone());
        }
        self.respond(&params)
    }

    fn run(&self, params: &Params) -> Result<Response> {
        let request = match self.builder.build(params) {
            Ok(request) => request,
            Err(BuildError::InvalidDate { key, value }) => {
                debug!("Rejecting invalid date in '{}': {}", key, value);
                return Ok(Response::InvalidDate);
            }
            Err(BuildError::Parse(err)) => {
                debug!("Rejecting malformed request: {}", err);
                return Ok(Response::InvalidInput {
                    reason: err.to_string(),
                });
            }
            Err(err) => return Err(DispatchError::Build(err)),
        };

        let descriptor = &request.descriptor;
        let ids = self.executor.execute(descriptor)?;
        if ids.is_empty() {
            return Ok(Response::NoResults);
        }

        let pager = match request.pager {
            Some(spec) => paginate(spec, self.executor.count(descriptor)?),
            None => None,
        };

        match self
            .renderer
            .render(&ids, &request.view_mode, &descriptor.entity_kind)?
        {
            Some(output) => Ok(Response::Rendered { output, pager }),
            None => Ok(Response::NoResults),
        }
    }
}
