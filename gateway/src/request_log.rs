//! Structured request/response logging.
//!
//! Every HTTP attempt made by the gateway client, token exchanges included,
//! produces one [`RequestLogEntry`]. Entries are written as one JSON document
//! per line into the dated `api_requests` stream and summarised on the regular
//! tracing output. Failing to write an entry never fails the request.

use crate::{
    log_sink::DailyLogSink,
    payload::Payload,
};
use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::{
    Map,
    Value,
};
use std::{
    collections::BTreeMap,
    path::Path,
    sync::atomic::{
        AtomicU64,
        Ordering,
    },
    time::Duration,
};
use url::Url;

pub const SAMPLE_RESULT_LIMIT: usize = 500;
pub const RESPONSE_CONTENT_LIMIT: usize = 1000;
pub const RAW_TEXT_LIMIT: usize = 500;

/// Free-form tags attached to a request, most importantly the operation name
/// and whether the entry belongs to a retried attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    pub operation: String,
    #[serde(default)]
    pub retry_attempted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_status: Option<u16>,
    #[serde(flatten)]
    pub tags: Map<String, Value>,
}

impl RequestContext {
    pub fn new(operation: impl ToString) -> Self {
        Self {
            operation: operation.to_string(),
            retry_attempted: false,
            original_status: None,
            tags: Map::new(),
        }
    }

    pub fn tag(mut self, key: impl ToString, value: impl Into<Value>) -> Self {
        self.tags.insert(key.to_string(), value.into());
        self
    }

    /// Context for the single retry that follows a rejected attempt.
    pub fn retry(&self, original_status: u16) -> Self {
        Self {
            retry_attempted: true,
            original_status: Some(original_status),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsSummary {
    pub total_results: u64,
    pub returned_results: usize,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestLogEntry {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub method: String,
    pub url: String,
    pub parameters: BTreeMap<String, String>,
    pub context: RequestContext,
    pub response_time_ms: Option<f64>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_size_bytes: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_summary: Option<ResultsSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_parse_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl RequestLogEntry {
    /// Records a received response. Success means HTTP 200 and no error.
    pub fn with_response(mut self, status: u16, body: &[u8], elapsed: Duration) -> Self {
        self.response_time_ms = Some(millis(elapsed));
        self.status_code = Some(status);
        self.response_size_bytes = Some(body.len());
        self.success = self.error.is_none() && status == 200;

        match serde_json::from_slice::<Value>(body) {
            Ok(value) => match Payload::from(value) {
                Payload::Paginated(page) => {
                    self.response_summary = Some(ResultsSummary {
                        total_results: page.total.unwrap_or(page.results.len() as u64),
                        returned_results: page.results.len(),
                        has_more: page.has_more,
                    });
                    self.sample_result = page
                        .results
                        .first()
                        .map(|first| truncate(&first.to_string(), SAMPLE_RESULT_LIMIT));
                }
                Payload::Generic(value) => {
                    self.response_content = Some(truncate(&value.to_string(), RESPONSE_CONTENT_LIMIT));
                }
            },
            Err(err) => {
                self.response_parse_error = Some(err.to_string());
                self.response_content = Some(truncate(&String::from_utf8_lossy(body), RAW_TEXT_LIMIT));
            }
        }
        self
    }

    /// Records a failure that happened before (or instead of) a response.
    pub fn with_error(mut self, error: impl ToString, error_type: &str, elapsed: Duration) -> Self {
        self.response_time_ms = Some(millis(elapsed));
        self.success = false;
        self.error = Some(error.to_string());
        self.error_type = Some(error_type.to_string());
        self
    }
}

fn millis(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 100_000.0).round() / 100.0
}

/// Cuts `text` to at most `limit` characters, marking the cut with `...`.
pub fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Issues request ids and writes entries to the dated request log.
#[derive(Debug)]
pub struct RequestLog {
    sink: Option<DailyLogSink>,
    counter: AtomicU64,
}

impl RequestLog {
    pub const STREAM_PREFIX: &'static str = "api_requests";

    pub fn new(sink: DailyLogSink) -> Self {
        Self {
            sink: Some(sink),
            counter: AtomicU64::new(0),
        }
    }

    /// Request log writing into `<logs_dir>/api_requests_YYYYMMDD.log`.
    pub fn in_dir(logs_dir: impl AsRef<Path>) -> Self {
        Self::new(DailyLogSink::new(logs_dir.as_ref(), Self::STREAM_PREFIX))
    }

    /// Only emits the tracing summary lines.
    pub fn disabled() -> Self {
        Self {
            sink: None,
            counter: AtomicU64::new(0),
        }
    }

    pub fn sink(&self) -> Option<&DailyLogSink> {
        self.sink.as_ref()
    }

    /// Starts an entry for an attempt that is about to be made.
    pub fn entry(
        &self,
        method: &str,
        url: &Url,
        params: &[(&str, String)],
        context: &RequestContext,
    ) -> RequestLogEntry {
        let timestamp = Utc::now();
        let sequence = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        RequestLogEntry {
            timestamp,
            request_id: format!("req_{}_{}", sequence, timestamp.timestamp()),
            method: method.to_string(),
            url: url.to_string(),
            parameters: params
                .iter()
                .map(|(key, value)| (key.to_string(), value.clone()))
                .collect(),
            context: context.clone(),
            response_time_ms: None,
            success: false,
            status_code: None,
            response_size_bytes: None,
            response_summary: None,
            sample_result: None,
            response_content: None,
            response_parse_error: None,
            error: None,
            error_type: None,
        }
    }

    pub fn record(&self, entry: &RequestLogEntry) {
        if let Err(err) = self.write(entry) {
            error!("Error in API logging: {err}");
            info!(
                "API Request: {} {} -> {}",
                entry.method,
                entry.url,
                entry
                    .status_code
                    .map(|status| status.to_string())
                    .unwrap_or_else(|| "Unknown".to_string())
            );
            return;
        }

        let mut summary = format!(
            "API {} {}: {}",
            entry.method,
            if entry.success { "SUCCESS" } else { "FAILED" },
            entry.url
        );
        if let Some(ms) = entry.response_time_ms {
            summary.push_str(&format!(" ({ms}ms)"));
        }
        if let Some(status) = entry.status_code {
            summary.push_str(&format!(" [HTTP {status}]"));
        }

        if entry.success {
            info!(request_id = %entry.request_id, "{summary}");
        } else {
            error!(request_id = %entry.request_id, "{summary}");
        }
    }

    fn write(&self, entry: &RequestLogEntry) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let Some(sink) = &self.sink else {
            return Ok(());
        };
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');
        sink.append(&line)?;
        Ok(())
    }
}
