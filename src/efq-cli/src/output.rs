//! Output formatting for the efq CLI
//!
//! Everything is printed as JSON. Responses keep their `status` tag and,
//! unless disabled, carry the placeholder `message` a page would show.

use anyhow::{Context, Result};
use efq_core::Response;
use serde::Serialize;
use serde_json::Value;
use std::io::Write;

use crate::config::Config;

/// Output writer for efq results
pub struct OutputWriter {
    pretty: bool,
    include_message: bool,
}

impl OutputWriter {
    /// Writer following the output section of `config`
    pub fn new(config: &Config) -> Self {
        Self {
            pretty: config.output.pretty,
            include_message: config.output.include_message,
        }
    }

    /// JSON form of a response
    pub fn response_value(&self, response: &Response) -> Result<Value> {
        let mut value = serde_json::to_value(response).context("Failed to serialize response")?;
        if let (true, Some(message), Value::Object(map)) =
            (self.include_message, response.message(), &mut value)
        {
            map.insert("message".to_string(), Value::String(message.to_string()));
        }
        Ok(value)
    }

    /// Serialize `value` as configured
    pub fn format<T: Serialize>(&self, value: &T) -> Result<String> {
        let text = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        text.context("JSON serialization error")
    }

    /// Write `value` followed by a newline
    pub fn write<T: Serialize>(&self, out: &mut impl Write, value: &T) -> Result<()> {
        writeln!(out, "{}", self.format(value)?).context("Failed to write output")
    }

    /// Write `value` to stdout
    pub fn write_to_stdout<T: Serialize>(&self, value: &T) -> Result<()> {
        self.write(&mut std::io::stdout().lock(), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use efq_core::NO_RESULTS_MESSAGE;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn writer(pretty: bool, include_message: bool) -> OutputWriter {
        let mut config = Config::default();
        config.output.pretty = pretty;
        config.output.include_message = include_message;
        OutputWriter::new(&config)
    }

    #[test]
    fn test_placeholder_carries_message() {
        let value = writer(true, true).response_value(&Response::NoResults).unwrap();
        assert_eq!(
            value,
            json!({"status": "no_results", "message": NO_RESULTS_MESSAGE})
        );

        let value = writer(true, false).response_value(&Response::NoResults).unwrap();
        assert_eq!(value, json!({"status": "no_results"}));
    }

    #[test]
    fn test_compact_and_pretty() {
        let value = json!({"a": [1, 2]});
        assert_eq!(writer(false, true).format(&value).unwrap(), r#"{"a":[1,2]}"#);
        assert!(writer(true, true).format(&value).unwrap().contains('\n'));

        let mut out = Vec::new();
        writer(false, true).write(&mut out, &value).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\"a\":[1,2]}\n");
    }
}
