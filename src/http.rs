use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::error::BirdcallError;

/// Timeout for catalog, taxonomy and scrape requests.
pub const CATALOG_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Blocking GET capability shared by every catalog client and the fetcher.
///
/// `timeout == None` leaves the transport default in place. Implementations
/// return `UpstreamUnavailable` for transport failures; status handling is up
/// to the caller.
pub trait HttpClient: Send + Sync {
    fn get(&self, url: &str, timeout: Option<Duration>) -> Result<HttpResponse, BirdcallError>;
}

impl<T: HttpClient + ?Sized> HttpClient for &T {
    fn get(&self, url: &str, timeout: Option<Duration>) -> Result<HttpResponse, BirdcallError> {
        (**self).get(url, timeout)
    }
}

#[derive(Clone)]
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self, BirdcallError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("birdcall/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| BirdcallError::upstream("http", err))?,
        );
        // Media downloads run without a deadline; catalog calls set one per request.
        let client = Client::builder()
            .default_headers(headers)
            .timeout(None::<Duration>)
            .build()
            .map_err(|err| BirdcallError::upstream("http", err))?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestHttpClient {
    fn get(&self, url: &str, timeout: Option<Duration>) -> Result<HttpResponse, BirdcallError> {
        let mut request = self.client.get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request
            .send()
            .map_err(|err| BirdcallError::upstream("http", err))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|err| BirdcallError::upstream("http", err))?;
        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

/// GET that also requires a 2xx status.
pub fn get_success<H: HttpClient + ?Sized>(
    http: &H,
    service: &str,
    url: &str,
    timeout: Option<Duration>,
) -> Result<HttpResponse, BirdcallError> {
    let response = http.get(url, timeout).map_err(|err| match err {
        BirdcallError::UpstreamUnavailable { message, .. } => BirdcallError::UpstreamUnavailable {
            service: service.to_string(),
            message,
        },
        other => other,
    })?;
    if !response.is_success() {
        return Err(BirdcallError::UpstreamStatus {
            service: service.to_string(),
            status: response.status,
            url: url.to_string(),
        });
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_range() {
        let ok = HttpResponse {
            status: 204,
            body: Vec::new(),
        };
        let not_found = HttpResponse {
            status: 404,
            body: b"missing".to_vec(),
        };
        assert!(ok.is_success());
        assert!(!not_found.is_success());
        assert_eq!(not_found.text(), "missing");
    }
}
