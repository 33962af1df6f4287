//! HTTP client for the reporting backend.
//!
//! Wraps `reqwest` with the backend's error envelope handling, the session
//! cookie, and typed response deserialization. Failures the backend reports as
//! `{ "error": <code>, "message": <text> }` surface as [`ClientError::Api`],
//! whatever the HTTP status.

use std::time::Duration;

use awrc_core::{AppConfig, ApiFailure, Ccid};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::ClientError;
use crate::types::{Account, Mcc};

/// Client for the reporting REST API.
///
/// Use [`ReportingClient::from_config`] in the binary or
/// [`ReportingClient::with_base_url`] to point at a mock server in tests.
pub struct ReportingClient {
    client: Client,
    base_url: Url,
}

impl ReportingClient {
    /// Builds a client from the loaded application config.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidBaseUrl`] for an unusable base URL or
    /// [`ClientError::Http`] if the `reqwest::Client` cannot be constructed.
    pub fn from_config(config: &AppConfig) -> Result<Self, ClientError> {
        Self::with_options(
            &config.base_url,
            config.request_timeout_secs,
            &config.user_agent,
            config.auth_cookie.as_deref(),
        )
    }

    /// Creates a client with default timeout and user agent (for wiremock).
    ///
    /// # Errors
    ///
    /// See [`ReportingClient::with_options`].
    pub fn with_base_url(base_url: &str) -> Result<Self, ClientError> {
        Self::with_options(base_url, 30, "awrc/0.1 (reporting-console)", None)
    }

    /// Creates a client with every knob explicit.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidBaseUrl`] when `base_url` does not parse
    /// or cannot carry path segments, or when `auth_cookie` is not a valid
    /// header value. Returns [`ClientError::Http`] if the underlying client
    /// cannot be constructed.
    pub fn with_options(
        base_url: &str,
        timeout_secs: u64,
        user_agent: &str,
        auth_cookie: Option<&str>,
    ) -> Result<Self, ClientError> {
        let invalid = |reason: String| ClientError::InvalidBaseUrl {
            base_url: base_url.to_string(),
            reason,
        };

        let mut headers = HeaderMap::new();
        if let Some(cookie) = auth_cookie {
            let mut value = HeaderValue::from_str(cookie)
                .map_err(|e| invalid(format!("auth cookie is not a valid header: {e}")))?;
            value.set_sensitive(true);
            headers.insert(COOKIE, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .default_headers(headers)
            .build()?;

        // Exactly one trailing slash so path segments append under the base
        // path instead of replacing its last segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| invalid(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid("URL cannot carry a path".to_string()));
        }

        Ok(Self { client, base_url })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Lists the MCCs the signed-in user has added.
    ///
    /// Entries whose id fails validation are skipped with a warning rather
    /// than failing the whole list.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Api`] if the backend reports a failure.
    /// - [`ClientError::Http`] on network failure.
    /// - [`ClientError::Deserialize`] if the body is not a JSON array.
    pub async fn list_mccs(&self) -> Result<Vec<Mcc>, ClientError> {
        let url = self.build_url(&["mcc"], &[])?;
        let entries: Vec<Value> = self.get_json(url, "list MCCs").await?;
        Ok(keep_valid(entries, "MCC"))
    }

    /// Removes an MCC from the user's list.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Api`] if the backend reports a failure.
    /// - [`ClientError::Http`] on network failure.
    pub async fn delete_mcc(&self, mcc: Ccid) -> Result<(), ClientError> {
        let url = self.build_url(&["mcc", &mcc.normalized().to_string()], &[])?;
        self.send_value(Method::DELETE, url, None::<&()>, "delete MCC")
            .await?;
        Ok(())
    }

    /// Lists the sub-accounts of an MCC. With `live`, the backend refreshes
    /// the list from the ads API instead of its stored copy.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Api`] if the backend reports a failure.
    /// - [`ClientError::Http`] on network failure.
    /// - [`ClientError::Deserialize`] if the body is not a JSON array.
    pub async fn list_accounts(&self, mcc: Ccid, live: bool) -> Result<Vec<Account>, ClientError> {
        let query: &[(&str, &str)] = if live { &[("live", "true")] } else { &[] };
        let url = self.build_url(&["mcc", &mcc.normalized().to_string(), "accounts"], query)?;
        let entries: Vec<Value> = self.get_json(url, "list accounts").await?;
        Ok(keep_valid(entries, "account"))
    }

    /// Builds `base/<segments...>?<query>` with every part percent-encoded.
    pub(crate) fn build_url(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: "URL cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// GETs `url` and deserializes the body as `T`.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        context: &str,
    ) -> Result<T, ClientError> {
        let body = self.send_value(Method::GET, url, None::<&()>, context).await?;
        serde_json::from_value(body).map_err(|e| ClientError::Deserialize {
            context: context.to_string(),
            source: e,
        })
    }

    /// Sends a request and returns the body as JSON, `Value::Null` when empty.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Api`] when the body is an error envelope, whatever
    ///   the status.
    /// - [`ClientError::UnexpectedStatus`] for any other non-2xx response.
    /// - [`ClientError::Deserialize`] when a 2xx body is not JSON.
    pub(crate) async fn send_value<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        context: &str,
    ) -> Result<Value, ClientError> {
        tracing::debug!(%method, %url, context, "reporting API request");
        let mut request: RequestBuilder = self.client.request(method, url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            if let Ok(failure) = serde_json::from_str::<ApiFailure>(&text) {
                tracing::debug!(status = status.as_u16(), code = %failure.code, "API failure");
                return Err(ClientError::Api(failure));
            }
            return Err(ClientError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        let value: Value = serde_json::from_str(&text).map_err(|e| ClientError::Deserialize {
            context: context.to_string(),
            source: e,
        })?;
        check_api_error(&value)?;
        Ok(value)
    }
}

/// Some endpoints answer 200 with an error envelope; treat those as failures.
fn check_api_error(body: &Value) -> Result<(), ClientError> {
    if body.get("error").and_then(Value::as_str).is_some() {
        if let Ok(failure) = serde_json::from_value::<ApiFailure>(body.clone()) {
            return Err(ClientError::Api(failure));
        }
    }
    Ok(())
}

fn keep_valid<T: DeserializeOwned>(entries: Vec<Value>, what: &str) -> Vec<T> {
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<T>(entry) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed {what} entry");
                None
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
