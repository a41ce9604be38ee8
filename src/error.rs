use reqwest::StatusCode;
use thiserror::Error;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by [`Client`](crate::Client) operations.
///
/// Authentication failures (HTTP 401) are not represented here: they clear
/// the session credential and yield an empty result instead.
#[derive(Debug, Error)]
pub enum Error {
    /// The indicator name is not present in the current catalog.
    #[error("indicator name '{0}' not found")]
    IndicatorNotFound(String),

    /// The API answered with a status other than 200 or 401.
    #[error("error fetching {operation}: HTTP {status} for url ({url}){}", detail_suffix(.detail))]
    Remote {
        operation: &'static str,
        status: StatusCode,
        url: String,
        detail: Option<String>,
    },

    /// No usable response: the connection failed or the body could not be
    /// read.
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    /// A successful response did not have the expected JSON shape.
    #[error("failed to parse API JSON (url={url}, status={status})")]
    Decode {
        url: String,
        status: StatusCode,
        #[source]
        source: serde_json::Error,
    },

    /// Any failure while fetching one indicator's series.
    #[error("error fetching data for {indicator}: {source}")]
    Indicator {
        indicator: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// HTTP status of the innermost remote error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Remote { status, .. } | Error::Decode { status, .. } => Some(*status),
            Error::Indicator { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Indicator name this error is attributed to, if any.
    pub fn indicator(&self) -> Option<&str> {
        match self {
            Error::Indicator { indicator, .. } => Some(indicator),
            Error::IndicatorNotFound(name) => Some(name),
            _ => None,
        }
    }

    /// Whether the root cause is an unknown indicator name.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::IndicatorNotFound(_) => true,
            Error::Indicator { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    pub(crate) fn for_indicator(self, indicator: &str) -> Self {
        Error::Indicator {
            indicator: indicator.to_string(),
            source: Box::new(self),
        }
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(d) if !d.is_empty() => format!(": {}", d),
        _ => String::new(),
    }
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct ApiErrorResponse {
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) detail: Option<String>,
    // Some endpoints respond with {"message": ...}
    #[serde(default)]
    pub(crate) message: Option<String>,
}

/// Builds a [`Error::Remote`], keeping whatever message the server put in
/// its error body.
pub(crate) fn remote_error(
    operation: &'static str,
    status: StatusCode,
    url: &str,
    body: &str,
) -> Error {
    let detail = match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(e) => {
            let parts: Vec<&str> = [e.title.as_deref(), e.message.as_deref(), e.detail.as_deref()]
                .into_iter()
                .flatten()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(" - "))
            }
        }
        Err(_) => {
            let text = body.trim();
            if text.is_empty() || text.starts_with('<') {
                None
            } else {
                Some(text.chars().take(200).collect())
            }
        }
    };

    Error::Remote {
        operation,
        status,
        url: url.to_string(),
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_uses_json_message() {
        let err = remote_error(
            "indicators",
            StatusCode::INTERNAL_SERVER_ERROR,
            "https://x/indicators",
            r#"{"title":"Internal Server Error","detail":"database offline"}"#,
        );
        assert_eq!(
            err.to_string(),
            "error fetching indicators: HTTP 500 Internal Server Error for url (https://x/indicators): Internal Server Error - database offline"
        );
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn remote_error_ignores_html_bodies() {
        let err = remote_error(
            "targets",
            StatusCode::BAD_GATEWAY,
            "https://x/targets",
            "<html>bad gateway</html>",
        );
        match err {
            Error::Remote { detail, .. } => assert!(detail.is_none()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn transport_error_names_url_and_keeps_cause() {
        let err = Error::Transport {
            url: "https://x/targets".to_string(),
            source: anyhow::anyhow!("connection refused"),
        };
        assert_eq!(err.to_string(), "request to https://x/targets failed");
        let cause = std::error::Error::source(&err).map(|e| e.to_string());
        assert_eq!(cause.as_deref(), Some("connection refused"));
        assert_eq!(err.status(), None);
    }

    #[test]
    fn indicator_wrapping_keeps_root_cause() {
        let err = Error::IndicatorNotFound("Nope".to_string()).for_indicator("Nope");
        assert!(err.is_not_found());
        assert_eq!(err.indicator(), Some("Nope"));
        assert_eq!(
            err.to_string(),
            "error fetching data for Nope: indicator name 'Nope' not found"
        );
    }
}
