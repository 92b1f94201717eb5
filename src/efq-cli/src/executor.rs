//! Command execution for the efq CLI
//!
//! Runs requests against a [`MemoryStore`] loaded from a JSON records file.
//! Results are returned as JSON values; printing is left to the caller.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use efq_core::{links, BlockConfig, Dispatcher, LruResponseCache, PagerState, Response};
use efq_parser::parse_pager;
use efq_query::{DescriptorBuilder, MemoryStore};
use efq_shared::Params;
use log::{debug, info};
use serde_json::{json, Map, Value};

use crate::config::Config;
use crate::output::OutputWriter;

/// Result of a command plus whether any request hit a backend failure
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// JSON to print
    pub value: Value,
    /// Set when at least one response was [`Response::Failure`]
    pub failed: bool,
}

type StoreDispatcher<'a> = Dispatcher<&'a MemoryStore, &'a MemoryStore>;

/// Main executor for efq operations
pub struct Executor {
    config: Config,
    output: OutputWriter,
}

impl Executor {
    /// Create a new executor with the given configuration
    pub fn new(config: Config) -> Self {
        let output = OutputWriter::new(&config);
        Self { config, output }
    }

    /// Configuration in effect
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Writer matching the output configuration
    pub fn output(&self) -> &OutputWriter {
        &self.output
    }

    /// Records file from `--data`, falling back to the configured one
    pub fn records_path(&self, data: Option<PathBuf>) -> Result<PathBuf> {
        data.or_else(|| self.config.data.records.clone())
            .ok_or_else(|| anyhow!("No records file given; pass --data or set data.records"))
    }

    /// Load the records file
    pub fn load_store(&self, path: &Path) -> Result<MemoryStore> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read records from {}", path.display()))?;
        let store = MemoryStore::from_json(self.config.query.id_field.as_str(), &json)
            .with_context(|| format!("Failed to load records from {}", path.display()))?;
        info!("Loaded {} records from {}", store.len(), path.display());
        Ok(store)
    }

    fn builder(&self) -> Result<DescriptorBuilder> {
        Ok(DescriptorBuilder::new(self.config.query.clone())?)
    }

    fn dispatcher<'a>(&self, store: &'a MemoryStore) -> Result<StoreDispatcher<'a>> {
        let dispatcher = Dispatcher::new(self.builder()?, store, store);
        if !self.config.cache.enabled {
            return Ok(dispatcher);
        }
        Ok(dispatcher.with_cache(
            Box::new(LruResponseCache::new(self.config.cache.capacity)),
            Duration::from_secs(self.config.cache.ttl_secs),
        ))
    }

    fn respond(&self, dispatcher: &mut StoreDispatcher<'_>, params: &Params) -> Result<Outcome> {
        let response = dispatcher.respond(params);
        Ok(Outcome {
            failed: response == Response::Failure,
            value: self.output.response_value(&response)?,
        })
    }

    /// Answer one request
    pub fn query(&self, store: &MemoryStore, params: &Params) -> Result<Outcome> {
        let mut dispatcher = self.dispatcher(store)?;
        self.respond(&mut dispatcher, params)
    }

    /// Ids matching one request, without rendering
    pub fn ids(&self, store: &MemoryStore, params: &Params) -> Result<Outcome> {
        let ids = self.dispatcher(store)?.ids(params)?;
        Ok(Outcome {
            value: json!({ "ids": ids }),
            failed: false,
        })
    }

    /// Answer every request of a batch file through one dispatcher, so
    /// repeated requests are served from the cache
    pub fn batch(&self, store: &MemoryStore, path: &Path) -> Result<Outcome> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read batch file {}", path.display()))?;
        let requests = parse_batch(&text)
            .with_context(|| format!("Invalid batch file {}", path.display()))?;
        debug!("Running {} batched requests", requests.len());

        let mut dispatcher = self.dispatcher(store)?;
        let mut values = Vec::with_capacity(requests.len());
        let mut failed = false;
        for params in &requests {
            let outcome = self.respond(&mut dispatcher, params)?;
            failed |= outcome.failed;
            values.push(outcome.value);
        }
        Ok(Outcome {
            value: Value::Array(values),
            failed,
        })
    }

    /// Render a block placement
    pub fn block(&self, store: &MemoryStore, block: &BlockConfig) -> Result<Outcome> {
        let response = self.dispatcher(store)?.block(block);
        Ok(Outcome {
            failed: response == Response::Failure,
            value: self.output.response_value(&response)?,
        })
    }

    /// The parsed request a parameter map builds
    pub fn parse(&self, params: &Params) -> Result<Value> {
        let request = self.builder()?.build(params)?;
        Ok(serde_json::to_value(request)?)
    }

    /// Pager state and links for `spec` over `total` records
    pub fn pager(&self, spec: &str, total: u64) -> Result<Value> {
        let state = PagerState::new(parse_pager(spec)?, total);
        Ok(json!({ "state": state, "links": links(&state) }))
    }
}

fn scalar_text(key: &str, value: Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => bail!("parameter '{key}' must be a string, got {other}"),
    }
}

/// Parameter maps from a JSON array of objects
pub fn parse_batch(text: &str) -> Result<Vec<Params>> {
    let requests: Vec<Map<String, Value>> = serde_json::from_str(text)?;
    requests
        .into_iter()
        .map(|request| {
            request
                .into_iter()
                .map(|(key, value)| {
                    let text = scalar_text(&key, value)?;
                    Ok((key, text))
                })
                .collect::<Result<Params>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use efq_core::{EMPTY_BLOCK_MESSAGE, INVALID_DATE_MESSAGE};
    use efq_shared::params;
    use pretty_assertions::assert_eq;

    fn store() -> MemoryStore {
        MemoryStore::from_json(
            "nid",
            r#"[
                {"nid": 1, "type": "article", "status": 1, "created": 10},
                {"nid": 2, "type": "article", "status": 1, "created": 30},
                {"nid": 3, "type": "article", "status": 1, "created": 20},
                {"nid": 4, "type": "page", "status": 1, "created": 40}
            ]"#,
        )
        .unwrap()
    }

    fn executor() -> Executor {
        Executor::new(Config::default())
    }

    #[test]
    fn test_query_renders_in_sort_order() {
        let outcome = executor()
            .query(
                &store(),
                &params([("content_type", "article"), ("sort", "created-DESC")]),
            )
            .unwrap();
        assert!(!outcome.failed);
        assert_eq!(outcome.value["status"], "rendered");
        let nids: Vec<u64> = outcome.value["output"]["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["nid"].as_u64().unwrap())
            .collect();
        assert_eq!(nids, vec![2, 3, 1]);
    }

    #[test]
    fn test_invalid_date_is_a_placeholder() {
        let outcome = executor()
            .query(&store(), &params([("date", "field_date--2024-13-01,2024-01-02")]))
            .unwrap();
        assert!(!outcome.failed);
        assert_eq!(outcome.value["status"], "invalid_date");
        assert_eq!(outcome.value["message"], INVALID_DATE_MESSAGE);
    }

    #[test]
    fn test_ids_only() {
        let outcome = executor()
            .ids(&store(), &params([("content_type", "article,page"), ("sort", "created-ASC")]))
            .unwrap();
        assert_eq!(outcome.value, json!({"ids": [1, 3, 2, 4]}));
    }

    #[test]
    fn test_batch() {
        let requests = parse_batch(r#"[{"content_type": "page"}, {"nid": 2, "content_type": "article"}]"#)
            .unwrap();
        assert_eq!(requests[1]["nid"], "2");
        assert!(parse_batch(r#"[{"nid": [1]}]"#).is_err());
        assert!(parse_batch(r#"{"nid": 1}"#).is_err());
    }

    #[test]
    fn test_block_without_content_type() {
        let outcome = executor().block(&store(), &BlockConfig::default()).unwrap();
        assert_eq!(outcome.value["message"], EMPTY_BLOCK_MESSAGE);
    }

    #[test]
    fn test_parse_and_pager() {
        let value = executor().parse(&params([("paged", "2-10")])).unwrap();
        assert_eq!(value["descriptor"]["range"], json!({"start": 10, "length": 10}));

        let value = executor().pager("1-10", 25).unwrap();
        assert_eq!(value["state"]["total_pages"], 3);
        assert_eq!(value["links"].as_array().unwrap().len(), 4);

        assert!(executor().parse(&params([("sort", "title-UP")])).is_err());
        assert!(executor().pager("0-10", 25).is_err());
    }

    #[test]
    fn test_records_path() {
        let executor = executor();
        assert!(executor.records_path(None).is_err());
        assert_eq!(
            executor.records_path(Some(PathBuf::from("nodes.json"))).unwrap(),
            PathBuf::from("nodes.json")
        );
    }
}
