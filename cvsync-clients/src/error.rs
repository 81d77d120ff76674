//! Error types for cvsync-clients.

use thiserror::Error;

/// Everything that can go wrong talking to MetaContrata or CVSecurity.
///
/// URLs carried here never include the CVSecurity access token.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid base URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// The service answered 2xx but its envelope reported a failure.
    #[error("{service} rejected {operation}: {message}")]
    Api {
        service: &'static str,
        operation: &'static str,
        message: String,
    },

    /// A paged listing did not terminate.
    #[error("{operation} paging aborted: {reason}")]
    Paging {
        operation: &'static str,
        reason: String,
    },

    #[error("unexpected response to {operation}: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientError {
    /// Wrap a transport failure, dropping the request URL reqwest embeds in it.
    pub(crate) fn http(url: &str, source: reqwest::Error) -> Self {
        ClientError::Http {
            url: url.to_owned(),
            source: source.without_url(),
        }
    }
}

/// Parse `raw` as a base URL that relative endpoints can be joined onto.
pub(crate) fn base_url(raw: &str) -> Result<reqwest::Url, ClientError> {
    let with_slash = if raw.ends_with('/') {
        raw.to_owned()
    } else {
        format!("{raw}/")
    };
    reqwest::Url::parse(&with_slash).map_err(|e| ClientError::InvalidUrl {
        url: raw.to_owned(),
        reason: e.to_string(),
    })
}

pub(crate) fn join(base: &reqwest::Url, endpoint: &str) -> Result<reqwest::Url, ClientError> {
    base.join(endpoint).map_err(|e| ClientError::InvalidUrl {
        url: format!("{base}{endpoint}"),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let base = base_url("https://meta.example.com/api").expect("parse");
        assert_eq!(
            join(&base, "login/passkey").expect("join").as_str(),
            "https://meta.example.com/api/login/passkey"
        );
    }

    #[test]
    fn garbage_base_url_is_rejected() {
        let err = base_url("not a url").unwrap_err();
        assert!(matches!(err, ClientError::InvalidUrl { .. }));
    }
}
