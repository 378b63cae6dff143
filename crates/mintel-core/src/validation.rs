//! Intake validation rules.
//!
//! Fields arrive as raw JSON so each rule can name the offending field
//! instead of failing the whole body at deserialization.

use serde_json::Value;
use thiserror::Error;
use url::{Host, Url};

use crate::{Platform, TimeframeDays, MAX_COMPETITORS, MIN_COMPETITORS};

/// Longest competitor URL accepted.
pub const MAX_URL_LEN: usize = 2048;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// A request body that passed every intake rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub platform: Platform,
    pub timeframe: TimeframeDays,
    pub competitors: Vec<String>,
    pub client_id: Option<String>,
}

/// Validates the raw intake fields in body order: platform, timeframe,
/// competitors, then the optional client tag.
///
/// # Errors
///
/// Returns the first [`ValidationError`] encountered.
pub fn validate_request(
    platform: Option<&Value>,
    timeframe_days: Option<&Value>,
    competitors: Option<&Value>,
    client_id: Option<&Value>,
) -> Result<ValidatedRequest, ValidationError> {
    let platform = validate_platform(platform)?;
    let timeframe = validate_timeframe(timeframe_days)?;
    let competitors = validate_competitors(platform, competitors)?;
    let client_id = match client_id {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(_) => return Err(ValidationError::new("client_id", "must be a string")),
    };

    Ok(ValidatedRequest {
        platform,
        timeframe,
        competitors,
        client_id,
    })
}

/// # Errors
///
/// Missing, non-string, unknown or not-yet-supported platforms.
pub fn validate_platform(value: Option<&Value>) -> Result<Platform, ValidationError> {
    let raw = value
        .and_then(Value::as_str)
        .ok_or_else(|| ValidationError::new("platform", "is required and must be a string"))?;
    let platform: Platform = raw
        .parse()
        .map_err(|_| ValidationError::new("platform", format!("unknown platform '{raw}'")))?;
    if !platform.is_supported() {
        return Err(ValidationError::new(
            "platform",
            format!("platform '{platform}' is not supported yet"),
        ));
    }
    Ok(platform)
}

/// # Errors
///
/// Anything other than the integers 30, 60 or 90.
pub fn validate_timeframe(value: Option<&Value>) -> Result<TimeframeDays, ValidationError> {
    let days = value
        .and_then(Value::as_i64)
        .ok_or_else(|| ValidationError::new("timeframe_days", "must be one of 30, 60, 90"))?;
    TimeframeDays::try_from(days)
        .map_err(|_| ValidationError::new("timeframe_days", "must be one of 30, 60, 90"))
}

/// # Errors
///
/// A non-array value, a count outside the allowed range, or any URL that
/// fails [`check_competitor_url`].
pub fn validate_competitors(
    platform: Platform,
    value: Option<&Value>,
) -> Result<Vec<String>, ValidationError> {
    let Some(Value::Array(items)) = value else {
        return Err(ValidationError::new(
            "competitors",
            "must be an array of URLs",
        ));
    };
    if items.len() < MIN_COMPETITORS || items.len() > MAX_COMPETITORS {
        return Err(ValidationError::new(
            "competitors",
            format!(
                "must contain between {MIN_COMPETITORS} and {MAX_COMPETITORS} URLs, got {}",
                items.len()
            ),
        ));
    }

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let url = item.as_str().ok_or_else(|| {
                ValidationError::new("competitors", format!("item {i} must be a string"))
            })?;
            check_competitor_url(platform, url).map_err(|reason| {
                ValidationError::new("competitors", format!("item {i}: {reason}"))
            })?;
            Ok(url.trim().to_string())
        })
        .collect()
}

/// Checks one competitor URL's shape.
///
/// # Errors
///
/// Returns a human-readable reason when the URL is not an `https://` URL on
/// one of the platform's domains.
pub fn check_competitor_url(platform: Platform, url: &str) -> Result<(), String> {
    let url = url.trim();
    if url.is_empty() {
        return Err("URL is empty".to_string());
    }
    if url.len() > MAX_URL_LEN {
        return Err(format!("URL exceeds {MAX_URL_LEN} characters"));
    }
    if url.chars().any(char::is_whitespace) {
        return Err("URL contains whitespace".to_string());
    }
    let parsed = Url::parse(url).map_err(|e| format!("invalid URL: {e}"))?;
    if parsed.scheme() != "https" {
        return Err("URL must start with https://".to_string());
    }
    if !parsed.username().is_empty() || parsed.password().is_some() {
        return Err("URL must not carry credentials".to_string());
    }
    let host = match parsed.host() {
        Some(Host::Domain(host)) => host.to_ascii_lowercase(),
        Some(_) => return Err("URL host must be a domain name".to_string()),
        None => return Err("URL has no host".to_string()),
    };
    if !host.split('.').all(is_dns_label) {
        return Err(format!("invalid host '{host}'"));
    }
    if has_empty_port(url, &host) {
        return Err("URL has an invalid port".to_string());
    }

    let on_platform = platform
        .domains()
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")));
    if !on_platform {
        return Err(format!(
            "host '{host}' is not a {} URL",
            platform.display_name()
        ));
    }
    Ok(())
}

fn is_dns_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= 63
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// `Url` normalises `host:` with no digits to the default port.
fn has_empty_port(raw: &str, host: &str) -> bool {
    raw.to_ascii_lowercase()
        .split_once(&format!("://{host}:"))
        .is_some_and(|(_, after)| !after.starts_with(|c: char| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn urls(n: usize) -> Value {
        Value::Array(
            (0..n)
                .map(|i| json!(format!("https://youtube.com/@creator{i}")))
                .collect(),
        )
    }

    #[test]
    fn competitor_count_boundaries() {
        let p = Platform::Youtube;
        assert!(validate_competitors(p, Some(&urls(0))).is_err());
        assert_eq!(validate_competitors(p, Some(&urls(1))).unwrap().len(), 1);
        assert_eq!(validate_competitors(p, Some(&urls(5))).unwrap().len(), 5);
        let err = validate_competitors(p, Some(&urls(6))).unwrap_err();
        assert_eq!(err.field, "competitors");
    }

    #[test]
    fn competitors_must_be_an_array_of_strings() {
        let p = Platform::Youtube;
        assert!(validate_competitors(p, None).is_err());
        assert!(validate_competitors(p, Some(&json!("https://youtube.com/@a"))).is_err());
        assert!(validate_competitors(p, Some(&json!([42]))).is_err());
    }

    #[test]
    fn timeframe_boundaries() {
        for days in [30, 60, 90] {
            assert!(validate_timeframe(Some(&json!(days))).is_ok());
        }
        for bad in [json!(0), json!(31), json!(365), json!("30"), json!(30.5)] {
            let err = validate_timeframe(Some(&bad)).unwrap_err();
            assert_eq!(err.field, "timeframe_days");
        }
        assert!(validate_timeframe(None).is_err());
    }

    #[test]
    fn platform_rules() {
        assert_eq!(
            validate_platform(Some(&json!("youtube"))).unwrap(),
            Platform::Youtube
        );
        assert_eq!(
            validate_platform(Some(&json!("instagram"))).unwrap(),
            Platform::Instagram
        );
        let err = validate_platform(Some(&json!("tiktok"))).unwrap_err();
        assert_eq!(err.message, "platform 'tiktok' is not supported yet");
        assert!(validate_platform(Some(&json!("myspace"))).is_err());
        assert!(validate_platform(None).is_err());
    }

    #[test]
    fn url_must_be_https() {
        let p = Platform::Youtube;
        assert!(check_competitor_url(p, "http://youtube.com/@a").is_err());
        assert!(check_competitor_url(p, "youtube.com/@a").is_err());
        assert!(check_competitor_url(p, "ftp://youtube.com/@a").is_err());
        assert!(check_competitor_url(p, "https://youtube.com/@a").is_ok());
        assert!(check_competitor_url(p, "HTTPS://www.YouTube.com/channel/UC123").is_ok());
    }

    #[test]
    fn url_host_must_belong_to_platform() {
        assert!(check_competitor_url(Platform::Youtube, "https://youtu.be/abc").is_ok());
        assert!(check_competitor_url(Platform::Youtube, "https://m.youtube.com/@a").is_ok());
        assert!(check_competitor_url(Platform::Youtube, "https://notyoutube.com/@a").is_err());
        assert!(check_competitor_url(Platform::Youtube, "https://instagram.com/a").is_err());
        assert!(check_competitor_url(Platform::Instagram, "https://www.instagram.com/a/").is_ok());
    }

    #[test]
    fn url_shape_rejections() {
        let p = Platform::Youtube;
        assert!(check_competitor_url(p, "https://").is_err());
        assert!(check_competitor_url(p, "https://you tube.com/@a").is_err());
        assert!(check_competitor_url(p, "https://user:pw@youtube.com/@a").is_err());
        assert!(check_competitor_url(p, "https://youtube.com:abc/@a").is_err());
        assert!(check_competitor_url(p, "https://youtube.com:443/@a").is_ok());
        let long = format!("https://youtube.com/@{}", "a".repeat(MAX_URL_LEN));
        assert!(check_competitor_url(p, &long).is_err());
    }

    #[test]
    fn malformed_hosts_and_ports_are_rejected() {
        let p = Platform::Youtube;
        for bad in [
            "https://.youtube.com/@a",
            "https://a..youtube.com/@a",
            "https://-.youtube.com/@a",
            "https://youtube.com:/@a",
            "https://youtube.com:99999999/@a",
            "https://127.0.0.1/@a",
        ] {
            assert!(check_competitor_url(p, bad).is_err(), "{bad} should be rejected");
        }
        assert!(check_competitor_url(p, "https://www.youtube.com:8443/@a").is_ok());
    }

    #[test]
    fn full_request_trims_and_keeps_client_tag() {
        let req = validate_request(
            Some(&json!("youtube")),
            Some(&json!(30)),
            Some(&json!([" https://youtube.com/@example "])),
            Some(&json!("acme")),
        )
        .unwrap();
        assert_eq!(req.timeframe, TimeframeDays::Thirty);
        assert_eq!(req.competitors, ["https://youtube.com/@example"]);
        assert_eq!(req.client_id.as_deref(), Some("acme"));
    }

    #[test]
    fn first_failing_field_is_reported() {
        let err = validate_request(
            Some(&json!("youtube")),
            Some(&json!(45)),
            Some(&json!([])),
            None,
        )
        .unwrap_err();
        assert_eq!(err.field, "timeframe_days");
    }
}
