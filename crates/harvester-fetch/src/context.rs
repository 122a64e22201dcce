//! Per-run request context.
//!
//! Everything a page request needs besides the page coordinates: endpoint
//! configuration, the session cookie jar and the identity pool. Built once
//! per run and owned by the fetcher.

use crate::error::{FetchError, Result};
use crate::identity::IdentityPool;
use harvester_core::{Direction, EndpointConfig, ScanKey};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, ORIGIN, REFERER, USER_AGENT};
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// Cookie set by the bootstrap page and echoed back as a header.
const XSRF_COOKIE: &str = "XSRF-TOKEN";

/// Request context shared by every page request of a run.
#[derive(Debug)]
pub struct RunContext {
    target: Url,
    bootstrap: Option<Url>,
    endpoint: EndpointConfig,
    identities: IdentityPool,
    jar: Arc<Jar>,
}

impl RunContext {
    /// Build a context from endpoint configuration.
    ///
    /// # Errors
    /// Returns error if a URL does not parse or no user agent is configured.
    pub fn new(endpoint: EndpointConfig) -> Result<Self> {
        let target = parse_url("target", &endpoint.target_url)?;
        let bootstrap = if endpoint.bootstrap_url.trim().is_empty() {
            None
        } else {
            Some(parse_url("bootstrap", &endpoint.bootstrap_url)?)
        };
        let identities = IdentityPool::new(endpoint.user_agents.clone())?;

        Ok(Self {
            target,
            bootstrap,
            endpoint,
            identities,
            jar: Arc::new(Jar::default()),
        })
    }

    /// Prime session cookies by fetching the bootstrap page once.
    ///
    /// A non-success status is logged but not fatal; the listing endpoint
    /// decides whether the session is usable.
    pub async fn bootstrap(&self, client: &Client) -> Result<()> {
        let Some(url) = &self.bootstrap else {
            info!("no bootstrap URL configured, skipping session priming");
            return Ok(());
        };

        let response = client
            .get(url.clone())
            .header(USER_AGENT, self.identities.pick())
            .send()
            .await
            .map_err(|source| FetchError::Bootstrap {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            info!(
                url = %url,
                xsrf_token = self.xsrf_token().is_some(),
                "session bootstrapped"
            );
        } else {
            warn!(url = %url, status = status.as_u16(), "bootstrap page returned non-success status");
        }
        Ok(())
    }

    /// Cookie jar to install on the HTTP client.
    #[must_use]
    pub fn jar(&self) -> Arc<Jar> {
        Arc::clone(&self.jar)
    }

    /// Listing endpoint requests are POSTed to.
    #[must_use]
    pub fn target(&self) -> &Url {
        &self.target
    }

    /// Endpoint configuration for this run.
    #[must_use]
    pub fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    /// Whether `status` means the client is being rate limited or banned.
    #[must_use]
    pub fn is_rate_limit(&self, status: u16) -> bool {
        self.endpoint.rate_limit_statuses.contains(&status)
    }

    /// Current XSRF token from the session cookies, if any.
    #[must_use]
    pub fn xsrf_token(&self) -> Option<String> {
        let cookies = self.jar.cookies(&self.target).or_else(|| {
            self.bootstrap
                .as_ref()
                .and_then(|url| self.jar.cookies(url))
        })?;
        let cookies = cookies.to_str().ok()?;

        cookies
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == XSRF_COOKIE)
            .map(|(_, value)| value.to_string())
    }

    /// Headers for one request, with a freshly rotated user agent.
    #[must_use]
    pub fn request_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json-patch+json"));

        insert_header(&mut headers, USER_AGENT, self.identities.pick());
        if let Some(origin) = &self.endpoint.origin {
            insert_header(&mut headers, ORIGIN, origin);
        }
        if let Some(url) = &self.bootstrap {
            insert_header(&mut headers, REFERER, url.as_str());
        }
        let token = self.xsrf_token().unwrap_or_default();
        insert_header(&mut headers, HeaderName::from_static("x-xsrf-token"), &token);

        headers
    }

    /// Request body for `page` of `key` in `direction`.
    ///
    /// The configured template is extended with the filter, ordering and
    /// page fields; those always override template entries of the same name.
    #[must_use]
    pub fn build_payload(&self, key: &ScanKey, direction: Direction, page: u32) -> Value {
        let mut body = self.endpoint.payload_template.clone();
        body.insert(key.dimension().to_string(), json!([key.value()]));
        body.insert("OrderColumn".to_string(), json!(key.dimension()));
        body.insert("OrderDirection".to_string(), json!(direction.as_wire()));
        body.insert("PageNumber".to_string(), json!(page));
        Value::Object(body)
    }
}

fn parse_url(field: &'static str, raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|source| FetchError::InvalidUrl {
        field,
        url: raw.to_string(),
        source,
    })
}

fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(e) => warn!(header = %name, error = %e, "skipping invalid header value"),
    }
}
