//! `reqwest`-backed fetcher for the listing API.

use crate::context::RunContext;
use crate::error::{FetchError, Result};
use crate::page::{Fetcher, PageResult};
use async_trait::async_trait;
use harvester_core::{Direction, EndpointConfig, Record, ScanKey};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

/// Fetches listing pages over HTTP with a primed cookie session.
#[derive(Debug)]
pub struct HttpFetcher {
    client: Client,
    context: RunContext,
}

impl HttpFetcher {
    /// Build the HTTP client and bootstrap the session.
    ///
    /// # Errors
    /// Returns error if the configuration is invalid, the client cannot be
    /// built, or the bootstrap request fails at the transport level.
    pub async fn connect(endpoint: EndpointConfig) -> Result<Self> {
        let context = RunContext::new(endpoint)?;
        let client = Client::builder()
            .cookie_provider(context.jar())
            .timeout(context.endpoint().timeout())
            .build()
            .map_err(FetchError::Client)?;

        context.bootstrap(&client).await?;
        Ok(Self { client, context })
    }

    /// Request context of this session.
    #[must_use]
    pub fn context(&self) -> &RunContext {
        &self.context
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, key: &ScanKey, direction: Direction, page: u32) -> PageResult {
        let payload = self.context.build_payload(key, direction, page);
        debug!(key = %key, direction = %direction, page, "requesting page");

        let response = match self
            .client
            .post(self.context.target().clone())
            .headers(self.context.request_headers())
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return PageResult::TransportFault(e.to_string()),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return PageResult::TransportFault(format!("failed to read response body: {e}")),
        };

        classify_response(&self.context, status, &body)
    }
}

/// Map a response to a `PageResult`.
///
/// Only `200 OK` carries rows. A missing or `null` rows field is an empty
/// page; rows that are not objects are skipped.
fn classify_response(context: &RunContext, status: StatusCode, body: &str) -> PageResult {
    if context.is_rate_limit(status.as_u16()) {
        return PageResult::RateLimited;
    }
    if status != StatusCode::OK {
        return PageResult::HttpError {
            status: status.as_u16(),
            body: body.to_string(),
        };
    }

    let mut document: Value = match serde_json::from_str(body) {
        Ok(document) => document,
        Err(e) => return PageResult::TransportFault(format!("response is not valid JSON: {e}")),
    };

    let rows_field = &context.endpoint().rows_field;
    let rows = match document.get_mut(rows_field).map(Value::take) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(rows)) => rows,
        Some(other) => {
            return PageResult::HttpError {
                status: status.as_u16(),
                body: format!("field '{rows_field}' is not an array: {other}"),
            }
        }
    };

    let total = rows.len();
    let records: Vec<Record> = rows
        .into_iter()
        .filter_map(|row| match row {
            Value::Object(record) => Some(record),
            _ => None,
        })
        .collect();
    if records.len() < total {
        warn!(skipped = total - records.len(), "page contained non-object rows");
    }

    PageResult::Rows(records)
}
