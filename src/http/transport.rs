//! Request/response plumbing with explicit redirect handling (C8).
//!
//! Redirects are followed manually (the client is built with
//! `redirect::Policy::none()`) because the cross-origin credential
//! scrubbing and method-rewrite rules in §4.8 need control no generic
//! redirect policy callback exposes: `reqwest::redirect::Policy::custom`
//! can only accept or reject the next hop, not rewrite its method or
//! headers.

use crate::error::{ContainerToolError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, LOCATION, WWW_AUTHENTICATE};
use reqwest::Method;
use url::Url;

const MAX_REDIRECTS: usize = 10;

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers.get(name).and_then(|v| v.to_str().ok()).map(|s| s.to_string())
    }

    pub fn body_as_string(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl RequestSpec {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }
}

pub struct Transport {
    client: reqwest::Client,
}

impl Transport {
    pub fn new(insecure_tls: bool) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(300));
        if insecure_tls {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder.build().map_err(|e| ContainerToolError::Transport(e.to_string()))?;
        Ok(Self { client })
    }

    /// Execute `spec`, following redirects per the Fetch-derived rules in
    /// §4.8, and succeed only if the final response's status equals
    /// `expected_status`. A 401 on the *original* request (prior to any
    /// redirect) is surfaced as [`ContainerToolError::Unauthorized`] so the
    /// auth layer can retry with credentials; any other mismatched status
    /// becomes [`ContainerToolError::UnexpectedStatus`].
    pub async fn execute(&self, spec: RequestSpec, expected_status: u16) -> Result<HttpResponse> {
        let mut method = spec.method;
        let mut url = Url::parse(&spec.url)?;
        let mut headers = to_header_map(&spec.headers)?;
        let mut body = spec.body;
        let original_origin = origin_of(&url);

        for hop in 0..=MAX_REDIRECTS {
            if hop == MAX_REDIRECTS {
                return Err(ContainerToolError::TooManyRedirects(MAX_REDIRECTS));
            }

            let mut request = self.client.request(method.clone(), url.clone());
            request = request.headers(headers.clone());
            if let Some(b) = body.clone() {
                request = request.body(b);
            }

            let response = request
                .send()
                .await
                .map_err(|_| ContainerToolError::NonHttpResponse)?;

            let status = response.status().as_u16();

            if (301..=308).contains(&status) && matches!(status, 301 | 302 | 303 | 307 | 308) {
                let Some(location) = response.headers().get(LOCATION).cloned() else {
                    return finish(response, status).await;
                };
                let location_str = location.to_str().map_err(|_| ContainerToolError::Transport(
                    "invalid Location header".to_string(),
                ))?;
                let next_url = url.join(location_str)?;
                let cross_origin = origin_of(&next_url) != original_origin;

                if cross_origin {
                    headers.remove(AUTHORIZATION);
                }

                match status {
                    301 | 302 | 303 => {
                        method = Method::GET;
                        body = None;
                    }
                    // 307/308 preserve method and body verbatim.
                    _ => {}
                }

                url = next_url;
                continue;
            }

            if status == 401 && hop == 0 {
                let www_authenticate = response
                    .headers()
                    .get(WWW_AUTHENTICATE)
                    .and_then(|v| v.to_str().ok())
                    .map(|s| s.to_string());
                return Err(ContainerToolError::Unauthorized {
                    method: method.to_string(),
                    url: url.to_string(),
                    www_authenticate,
                });
            }

            return finish_checked(response, status, expected_status, &method, &url).await;
        }

        unreachable!("loop always returns before exhausting MAX_REDIRECTS + 1 iterations")
    }
}

async fn finish(response: reqwest::Response, status: u16) -> Result<HttpResponse> {
    let headers = response.headers().clone();
    let body = response.bytes().await.map_err(ContainerToolError::from)?.to_vec();
    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}

async fn finish_checked(
    response: reqwest::Response,
    status: u16,
    expected_status: u16,
    method: &Method,
    url: &Url,
) -> Result<HttpResponse> {
    let headers = response.headers().clone();
    let body = response.bytes().await.map_err(ContainerToolError::from)?.to_vec();
    if status != expected_status {
        return Err(ContainerToolError::UnexpectedStatus {
            status,
            method: method.to_string(),
            url: url.to_string(),
            body: String::from_utf8_lossy(&body).to_string(),
        });
    }
    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}

fn to_header_map(headers: &[(String, String)]) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (k, v) in headers {
        let name = HeaderName::from_bytes(k.as_bytes())
            .map_err(|e| ContainerToolError::Transport(format!("invalid header name '{k}': {e}")))?;
        let value = HeaderValue::from_str(v)
            .map_err(|e| ContainerToolError::Transport(format!("invalid header value for '{k}': {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

fn origin_of(url: &Url) -> (String, String, Option<u16>) {
    (url.scheme().to_string(), url.host_str().unwrap_or("").to_string(), url.port())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_origin_detection() {
        let a = Url::parse("https://registry.example.com/v2/foo").unwrap();
        let b = Url::parse("https://objectstore.example.net/bucket/key").unwrap();
        assert_ne!(origin_of(&a), origin_of(&b));
    }

    #[test]
    fn same_origin_different_path_is_not_cross_origin() {
        let a = Url::parse("https://registry.example.com/v2/foo").unwrap();
        let b = Url::parse("https://registry.example.com/v2/bar").unwrap();
        assert_eq!(origin_of(&a), origin_of(&b));
    }

    #[test]
    fn port_distinguishes_origin() {
        let a = Url::parse("http://localhost:5000/v2/").unwrap();
        let b = Url::parse("http://localhost:5001/v2/").unwrap();
        assert_ne!(origin_of(&a), origin_of(&b));
    }
}
