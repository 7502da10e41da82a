//! Validated backend base URL.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::{Error, InvalidInputError};

/// The backend API base URL.
///
/// HTTPS is required; plain HTTP is accepted for localhost only. The base is
/// kept in a canonical form without a trailing slash, so endpoint paths (which
/// carry their own leading slash) concatenate cleanly and the rendered form
/// round-trips through the session file unchanged.
///
/// # Example
///
/// ```
/// use voltbank::ApiUrl;
///
/// let base = ApiUrl::new("https://api.voltbank.example").unwrap();
/// assert_eq!(base.as_str(), "https://api.voltbank.example");
/// assert_eq!(base.endpoint_url("/api/refresh"),
///            "https://api.voltbank.example/api/refresh");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ApiUrl {
    url: Url,
    base: String,
}

impl ApiUrl {
    /// Parse and validate a base URL.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let s = s.as_ref();
        let url = Url::parse(s).map_err(|e| InvalidInputError::ApiUrl {
            value: s.to_string(),
            reason: e.to_string(),
        })?;

        let localhost = url
            .host_str()
            .is_some_and(|h| h == "localhost" || h == "127.0.0.1" || h == "[::1]");
        match url.scheme() {
            "https" => {}
            "http" if localhost => {}
            _ => {
                return Err(InvalidInputError::ApiUrl {
                    value: s.to_string(),
                    reason: "must use HTTPS (HTTP allowed only for localhost)".to_string(),
                }
                .into())
            }
        }

        // Url renders a bare authority with a trailing "/".
        let base = url.as_str().trim_end_matches('/').to_string();
        Ok(Self { url, base })
    }

    /// Full URL for an endpoint path such as `/api/refresh`.
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// The canonical base, without a trailing slash.
    pub fn as_str(&self) -> &str {
        &self.base
    }

    /// The parsed URL, for cookie-domain matching.
    pub fn as_url(&self) -> &Url {
        &self.url
    }
}

impl fmt::Display for ApiUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)
    }
}

impl FromStr for ApiUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for ApiUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.base)
    }
}

impl<'de> Deserialize<'de> for ApiUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ApiUrl::new(&s).map_err(serde::de::Error::custom)
    }
}

impl AsRef<str> for ApiUrl {
    fn as_ref(&self) -> &str {
        &self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_form_has_no_trailing_slash() {
        let base = ApiUrl::new("http://127.0.0.1:4123").unwrap();
        assert_eq!(base.as_str(), "http://127.0.0.1:4123");
        assert_eq!(base.to_string(), "http://127.0.0.1:4123");
    }

    #[test]
    fn endpoint_url_joins_cleanly_with_and_without_slash() {
        for input in ["https://api.voltbank.example", "https://api.voltbank.example/"] {
            let base = ApiUrl::new(input).unwrap();
            assert_eq!(
                base.endpoint_url("/api/dashboard"),
                "https://api.voltbank.example/api/dashboard"
            );
        }
    }

    #[test]
    fn http_allowed_for_localhost_only() {
        assert!(ApiUrl::new("http://localhost:8080").is_ok());
        assert!(ApiUrl::new("http://api.voltbank.example").is_err());
    }

    #[test]
    fn relative_url_rejected() {
        assert!(ApiUrl::new("/api/dashboard").is_err());
    }

    #[test]
    fn serializes_canonical_form() {
        let base = ApiUrl::new("https://api.voltbank.example/").unwrap();
        let json = serde_json::to_string(&base).unwrap();
        assert_eq!(json, r#""https://api.voltbank.example""#);
        let back: ApiUrl = serde_json::from_str(&json).unwrap();
        assert_eq!(back, base);
    }
}
