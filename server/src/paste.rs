use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

const CONTENT_ERROR: &str = "content is required and must be a non-empty string";
const TTL_ERROR: &str = "ttl_seconds must be an integer >= 1";
const MAX_VIEWS_ERROR: &str = "max_views must be an integer >= 1";

/// A stored paste record.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Paste {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_views: Option<u64>,
    pub view_count: u64,
}

impl Paste {
    pub fn new(id: String, new_paste: NewPaste, now: DateTime<Utc>) -> Result<Self, Error> {
        let expires_at = match new_paste.ttl_seconds {
            Some(ttl) => {
                let ttl = i64::try_from(ttl)
                    .ok()
                    .and_then(Duration::try_seconds)
                    .ok_or_else(|| Error::InvalidArgument(TTL_ERROR.to_string()))?;
                Some(
                    now.checked_add_signed(ttl)
                        .ok_or_else(|| Error::InvalidArgument(TTL_ERROR.to_string()))?,
                )
            }
            None => None,
        };

        Ok(Self {
            id,
            content: new_paste.content,
            created_at: now,
            expires_at,
            max_views: new_paste.max_views,
            view_count: 0,
        })
    }

    /// Whether the deadline, if any, has been reached at `now`.
    pub fn expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .map(|expires_at| now >= expires_at)
            .unwrap_or_default()
    }

    /// The precondition of the atomic consume.
    pub fn has_views_left(&self) -> bool {
        self.max_views
            .map(|max_views| self.view_count < max_views)
            .unwrap_or(true)
    }
}

/// Validated input for creating a paste. Only constructible through
/// validation, so holding one means the request is safe to persist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPaste {
    content: String,
    ttl_seconds: Option<u64>,
    max_views: Option<u64>,
}

impl NewPaste {
    pub fn new(
        content: impl Into<String>,
        ttl_seconds: Option<u64>,
        max_views: Option<u64>,
    ) -> Result<Self, Error> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(Error::InvalidArgument(CONTENT_ERROR.to_string()));
        }

        if matches!(ttl_seconds, Some(0)) {
            return Err(Error::InvalidArgument(TTL_ERROR.to_string()));
        }

        if matches!(max_views, Some(0)) {
            return Err(Error::InvalidArgument(MAX_VIEWS_ERROR.to_string()));
        }

        Ok(Self {
            content,
            ttl_seconds,
            max_views,
        })
    }

    /// Validates a raw JSON request body.
    pub fn from_json(body: &[u8]) -> Result<Self, Error> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|_| Error::InvalidArgument("request body must be a JSON object".to_string()))?;

        let object = value
            .as_object()
            .ok_or_else(|| Error::InvalidArgument("request body must be a JSON object".to_string()))?;

        let content = match object.get("content") {
            Some(Value::String(content)) => content.clone(),
            _ => return Err(Error::InvalidArgument(CONTENT_ERROR.to_string())),
        };

        let ttl_seconds = object
            .get("ttl_seconds")
            .map(|v| positive_integer(v).ok_or_else(|| Error::InvalidArgument(TTL_ERROR.to_string())))
            .transpose()?;

        let max_views = object
            .get("max_views")
            .map(|v| {
                positive_integer(v).ok_or_else(|| Error::InvalidArgument(MAX_VIEWS_ERROR.to_string()))
            })
            .transpose()?;

        Self::new(content, ttl_seconds, max_views)
    }

    /// Validates the fields of the HTML form. Blank limits mean "no limit".
    pub fn from_form(content: &str, ttl_seconds: &str, max_views: &str) -> Result<Self, Error> {
        let ttl_seconds = form_limit(ttl_seconds)
            .map_err(|_| Error::InvalidArgument(TTL_ERROR.to_string()))?;
        let max_views = form_limit(max_views)
            .map_err(|_| Error::InvalidArgument(MAX_VIEWS_ERROR.to_string()))?;

        Self::new(content, ttl_seconds, max_views)
    }
}

fn form_limit(raw: &str) -> Result<Option<u64>, std::num::ParseIntError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    raw.parse().map(Some)
}

/// Accepts integers `>= 1`, including integral floats such as `3600.0`.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn positive_integer(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return (n >= 1).then(|| n);
    }

    let n = value.as_f64()?;
    // u64::MAX as f64 rounds up, so compare with `<`
    let in_range = n >= 1.0 && n < u64::MAX as f64;
    (in_range && n.fract() == 0.0).then(|| n as u64)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn invalid(result: Result<NewPaste, Error>) -> String {
        match result {
            Err(Error::InvalidArgument(message)) => message,
            other => panic!("expected invalid argument, got {:?}", other),
        }
    }

    #[test]
    fn ttl_sets_exact_deadline() {
        let new_paste = NewPaste::new("hello", Some(3600), None).unwrap();
        let paste = Paste::new("id".to_string(), new_paste, now()).unwrap();
        assert_eq!(paste.created_at, now());
        assert_eq!(paste.expires_at, Some(now() + Duration::seconds(3600)));
        assert_eq!(paste.view_count, 0);
    }

    #[test]
    fn expiry_is_inclusive_of_the_deadline() {
        let new_paste = NewPaste::new("hello", Some(1), None).unwrap();
        let paste = Paste::new("id".to_string(), new_paste, now()).unwrap();
        assert!(!paste.expired(now()));
        assert!(!paste.expired(now() + Duration::milliseconds(999)));
        assert!(paste.expired(now() + Duration::seconds(1)));
    }

    #[test]
    fn view_limit_precondition() {
        let new_paste = NewPaste::new("hello", None, Some(2)).unwrap();
        let mut paste = Paste::new("id".to_string(), new_paste, now()).unwrap();
        assert!(paste.has_views_left());
        paste.view_count = 1;
        assert!(paste.has_views_left());
        paste.view_count = 2;
        assert!(!paste.has_views_left());
    }

    #[test]
    fn unlimited_paste_never_runs_out() {
        let new_paste = NewPaste::new("hello", None, None).unwrap();
        let mut paste = Paste::new("id".to_string(), new_paste, now()).unwrap();
        paste.view_count = u64::MAX;
        assert!(paste.has_views_left());
        assert!(!paste.expired(now() + Duration::days(10_000)));
    }

    #[test]
    fn rejects_blank_content() {
        assert_eq!(invalid(NewPaste::new("", None, None)), CONTENT_ERROR);
        assert_eq!(invalid(NewPaste::new(" \n\t ", None, None)), CONTENT_ERROR);
        assert_eq!(invalid(NewPaste::from_json(br#"{"content": 5}"#)), CONTENT_ERROR);
        assert_eq!(invalid(NewPaste::from_json(br#"{}"#)), CONTENT_ERROR);
    }

    #[test]
    fn rejects_non_positive_or_fractional_limits() {
        for body in [
            r#"{"content": "a", "ttl_seconds": 0}"#,
            r#"{"content": "a", "ttl_seconds": -5}"#,
            r#"{"content": "a", "ttl_seconds": 1.5}"#,
            r#"{"content": "a", "ttl_seconds": "60"}"#,
            r#"{"content": "a", "ttl_seconds": null}"#,
        ] {
            assert_eq!(invalid(NewPaste::from_json(body.as_bytes())), TTL_ERROR, "{}", body);
        }

        for body in [
            r#"{"content": "a", "max_views": 0}"#,
            r#"{"content": "a", "max_views": 2.25}"#,
            r#"{"content": "a", "max_views": true}"#,
        ] {
            assert_eq!(
                invalid(NewPaste::from_json(body.as_bytes())),
                MAX_VIEWS_ERROR,
                "{}",
                body
            );
        }
    }

    #[test]
    fn accepts_integral_floats() {
        let parsed =
            NewPaste::from_json(br#"{"content": "a", "ttl_seconds": 3600.0, "max_views": 3}"#)
                .unwrap();
        assert_eq!(parsed, NewPaste::new("a", Some(3600), Some(3)).unwrap());
    }

    #[test]
    fn content_is_kept_verbatim() {
        let parsed = NewPaste::from_json(br#"{"content": "  padded\n"}"#).unwrap();
        let paste = Paste::new("id".to_string(), parsed, now()).unwrap();
        assert_eq!(paste.content, "  padded\n");
    }

    #[test]
    fn rejects_non_object_bodies() {
        assert!(matches!(
            NewPaste::from_json(b"[1, 2]"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            NewPaste::from_json(b"not json"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn form_fields_treat_blank_limits_as_unset() {
        assert_eq!(
            NewPaste::from_form("hello", " ", "").unwrap(),
            NewPaste::new("hello", None, None).unwrap()
        );
        assert_eq!(
            NewPaste::from_form("hello", "60", " 2 ").unwrap(),
            NewPaste::new("hello", Some(60), Some(2)).unwrap()
        );
    }

    #[test]
    fn form_fields_are_validated_like_json() {
        assert_eq!(invalid(NewPaste::from_form("  ", "", "")), CONTENT_ERROR);
        assert_eq!(invalid(NewPaste::from_form("a", "soon", "")), TTL_ERROR);
        assert_eq!(invalid(NewPaste::from_form("a", "0", "")), TTL_ERROR);
        assert_eq!(invalid(NewPaste::from_form("a", "", "-1")), MAX_VIEWS_ERROR);
        assert_eq!(invalid(NewPaste::from_form("a", "", "1.5")), MAX_VIEWS_ERROR);
    }

    #[test]
    fn huge_ttl_is_rejected_instead_of_overflowing() {
        let new_paste = NewPaste::new("hello", Some(u64::MAX), None).unwrap();
        assert!(matches!(
            Paste::new("id".to_string(), new_paste, now()),
            Err(Error::InvalidArgument(_))
        ));
    }
}
