#![warn(clippy::nursery, clippy::pedantic)]

//! Contains common functions and structures used by multiple projects

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
pub use url::Url;

pub const PASTES_ENDPOINT: &str = "/api/pastes";
pub const HEALTH_ENDPOINT: &str = "/api/healthz";
/// Prefix of the human-readable paste page.
pub const PAGE_ENDPOINT: &str = "/p";

/// Request body for creating a paste.
///
/// The server validates the raw JSON itself so it can reject non-integer
/// limits with a useful message; this type is what well-behaved clients send.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CreatePaste {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_views: Option<u64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CreatedPaste {
    pub id: String,
    pub url: String,
}

/// A successfully consumed paste, as returned by the API.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PasteView {
    pub content: String,
    /// `None` when the paste has no view limit.
    pub remaining_views: Option<u64>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl PasteView {
    /// Human readable description of what is left of this paste.
    #[must_use]
    pub fn summary(&self) -> String {
        let views = match self.remaining_views {
            Some(0) => "This was the last view of this paste.".to_string(),
            Some(1) => "1 view left.".to_string(),
            Some(n) => format!("{} views left.", n),
            None => "No view limit.".to_string(),
        };

        let expiration = self.expires_at.map_or_else(
            || "This paste will not expire.".to_string(),
            |time| {
                time.format("This paste will expire on %A, %B %-d, %Y at %T %Z.")
                    .to_string()
            },
        );

        format!("{} {}", views, expiration)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl Display for ErrorBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.error)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Health {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Builds the shareable page URL for a paste.
#[must_use]
pub fn paste_url(base: &Url, id: &str) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    let path = format!("{}{}/{}", base.path().trim_end_matches('/'), PAGE_ENDPOINT, id);
    url.set_path(&path);
    url
}

/// A link to a paste, either its page or its API resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasteUrl {
    pub base: Url,
    pub id: String,
}

impl PasteUrl {
    /// The API resource that consumes a view of this paste.
    #[must_use]
    pub fn api_url(&self) -> Url {
        let mut url = self.base.clone();
        let path = format!(
            "{}{}/{}",
            self.base.path().trim_end_matches('/'),
            PASTES_ENDPOINT,
            self.id
        );
        url.set_path(&path);
        url
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParsePasteUrlError {
    #[error("The provided url was bad")]
    BadUrl,
    #[error("The url does not point to a paste")]
    NotAPaste,
}

impl FromStr for PasteUrl {
    type Err = ParsePasteUrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut url = Url::from_str(s).map_err(|_| ParsePasteUrlError::BadUrl)?;
        url.set_query(None);
        url.set_fragment(None);

        let path = url.path().trim_end_matches('/').to_string();
        let (prefix, id) = path.rsplit_once('/').ok_or(ParsePasteUrlError::NotAPaste)?;
        if id.is_empty() {
            return Err(ParsePasteUrlError::NotAPaste);
        }

        let base_path = prefix
            .strip_suffix(PASTES_ENDPOINT)
            .or_else(|| prefix.strip_suffix(PAGE_ENDPOINT))
            .ok_or(ParsePasteUrlError::NotAPaste)?
            .to_string();

        let id = id.to_string();
        url.set_path(&base_path);

        Ok(Self { base: url, id })
    }
}
