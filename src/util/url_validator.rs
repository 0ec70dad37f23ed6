use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Errors that can occur during URL validation.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// Plain HTTP to a non-loopback host.
    #[error("Insecure endpoint: HTTPS required (except localhost for testing)")]
    Insecure,
}

/// Validates a link before handing it to the system browser.
///
/// Feed items carry arbitrary upstream links; anything that is not
/// `http`/`https` (e.g. `file://`, `javascript:`) is refused so `open::that`
/// never launches a local handler.
///
/// ```
/// use homedeck::util::validate_url_for_open;
///
/// assert!(validate_url_for_open("https://example.com/post").is_ok());
/// assert!(validate_url_for_open("file:///etc/passwd").is_err());
/// ```
pub fn validate_url_for_open(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }
}

/// Validates a service endpoint (feed converter, OAuth, playback API).
///
/// Endpoints must be HTTPS. Plain HTTP is accepted only for loopback hosts so
/// tests can point the clients at a local mock server.
pub fn validate_endpoint(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = validate_url_for_open(url_str)?;
    if url.scheme() == "https" || is_loopback_host(&url) {
        Ok(url)
    } else {
        Err(UrlValidationError::Insecure)
    }
}

fn is_loopback_host(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    if host == "localhost" {
        return true;
    }
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_accepts_http_and_https() {
        assert!(validate_url_for_open("https://example.com/a").is_ok());
        assert!(validate_url_for_open("http://news.example.org").is_ok());
    }

    #[test]
    fn test_open_rejects_other_schemes() {
        assert!(matches!(
            validate_url_for_open("javascript:alert(1)"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
        assert!(validate_url_for_open("file:///etc/passwd").is_err());
        assert!(validate_url_for_open("#").is_err());
    }

    #[test]
    fn test_endpoint_requires_https() {
        assert!(validate_endpoint("https://api.rss2json.com/v1/api.json").is_ok());
        assert!(matches!(
            validate_endpoint("http://evil.com/token"),
            Err(UrlValidationError::Insecure)
        ));
    }

    #[test]
    fn test_endpoint_allows_loopback_http() {
        assert!(validate_endpoint("http://127.0.0.1:8080/api").is_ok());
        assert!(validate_endpoint("http://localhost:3000").is_ok());
        assert!(validate_endpoint("http://[::1]:3000").is_ok());
    }
}
