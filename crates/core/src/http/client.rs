use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::backoff::{backoff_delay, is_retryable_status, parse_retry_after};
use super::HttpError;
use crate::config::ApiConfig;
use crate::metrics;

/// Longest error body kept on an `HttpError::Status`.
const MAX_ERROR_BODY: usize = 500;

/// Connection-level settings shared by every request.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub user_agent: String,
    /// Headers sent with every request (auth tokens and the like).
    pub default_headers: Vec<(String, String)>,
}

impl From<&ApiConfig> for HttpClientConfig {
    fn from(api: &ApiConfig) -> Self {
        Self {
            base_url: api.base_url.clone(),
            timeout: Duration::from_secs(api.timeout_secs),
            max_retries: api.max_retries,
            backoff_base: Duration::from_millis(api.backoff_base_ms),
            user_agent: api.user_agent.clone(),
            default_headers: Vec::new(),
        }
    }
}

/// Per-request overrides.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub query: Vec<(String, String)>,
    pub form: Option<Vec<(String, String)>>,
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    pub max_retries: Option<u32>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            query: Vec::new(),
            form: None,
            headers: Vec::new(),
            timeout: None,
            max_retries: None,
        }
    }
}

impl RequestOptions {
    /// GET with query parameters.
    pub fn get(query: &[(&str, String)]) -> Self {
        Self {
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            ..Self::default()
        }
    }
}

/// HTTP client with timeout, retry and backoff.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self, HttpError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.default_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| HttpError::InvalidRequest(format!("header {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| HttpError::InvalidRequest(format!("header {}: {}", name, e)))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .build()
            .map_err(|e| HttpError::InvalidRequest(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Issue a request and decode the JSON body.
    ///
    /// Retries up to `max_retries` times after the first attempt; the last
    /// error is returned with the attempt count attached.
    pub async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, HttpError> {
        let url = self.url_for(path);
        let max_retries = options.max_retries.unwrap_or(self.config.max_retries);
        let timeout = options.timeout.unwrap_or(self.config.timeout);
        let mut attempt: u32 = 0;

        loop {
            let attempts = attempt + 1;
            debug!(method = %options.method, url = %url, attempt = attempts, "HTTP request");

            let (error, retry_after) = match self.send_once(&url, &options, timeout).await {
                Ok(response) if response.status().is_success() => match response.text().await {
                    Ok(body) => {
                        metrics::HTTP_ATTEMPTS.with_label_values(&["success"]).inc();
                        return decode(path, &body);
                    }
                    Err(e) => {
                        metrics::HTTP_ATTEMPTS.with_label_values(&["network"]).inc();
                        (
                            HttpError::Network {
                                message: e.to_string(),
                                attempts,
                            },
                            None,
                        )
                    }
                },
                Ok(response) => {
                    metrics::HTTP_ATTEMPTS.with_label_values(&["status"]).inc();
                    let status = response.status().as_u16();
                    let retry_after = response
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(parse_retry_after);
                    let body = response.text().await.unwrap_or_default();
                    let error = HttpError::Status {
                        status,
                        body: body.chars().take(MAX_ERROR_BODY).collect(),
                        attempts,
                    };
                    if !is_retryable_status(status) {
                        return Err(error);
                    }
                    (error, retry_after)
                }
                Err(e) => {
                    metrics::HTTP_ATTEMPTS.with_label_values(&["network"]).inc();
                    (
                        HttpError::Network {
                            message: describe_send_error(&e),
                            attempts,
                        },
                        None,
                    )
                }
            };

            if attempt >= max_retries {
                warn!(url = %url, attempts, error = %error, "HTTP retry budget exhausted");
                return Err(error);
            }

            let delay = backoff_delay(attempt, self.config.backoff_base, retry_after);
            warn!(
                url = %url,
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retryable HTTP failure"
            );
            metrics::HTTP_RETRIES.inc();
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn send_once(
        &self,
        url: &str,
        options: &RequestOptions,
        timeout: Duration,
    ) -> Result<Response, reqwest::Error> {
        let mut request = self
            .client
            .request(options.method.clone(), url)
            .timeout(timeout);

        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(form) = &options.form {
            request = request.form(form);
        }

        request.send().await
    }
}

fn describe_send_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("request timed out: {}", e)
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    }
}

fn decode<T: DeserializeOwned>(path: &str, body: &str) -> Result<T, HttpError> {
    let body = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(body).map_err(|e| HttpError::Decode {
        path: path.to_string(),
        message: e.to_string(),
    })
}
