use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use tracing::debug;

/// Netscape-era `Expires` layout, e.g. `Wed, 21-Oct-2015 07:28:00 GMT`.
const LEGACY_EXPIRES_FORMAT: &str = "%a, %d-%b-%Y %H:%M:%S GMT";

/// The parts of a `Set-Cookie` header the pipeline cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub max_age: Option<i64>,
    pub expires: Option<DateTime<Utc>>,
}

impl SetCookie {
    /// `name=value` as sent back in a `Cookie` request header.
    pub fn pair(&self) -> String {
        format!("{}={}", self.name, self.value)
    }

    /// Absolute expiry relative to `now`. Max-Age wins over Expires.
    /// Zero or negative Max-Age expires at `now`; a Max-Age past the representable range means no expiry.
    pub fn expires_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.max_age {
            Some(secs) if secs <= 0 => Some(now),
            Some(secs) => TimeDelta::try_seconds(secs).and_then(|d| now.checked_add_signed(d)),
            None => self.expires,
        }
    }
}

/// Parse one `Set-Cookie` header value. Returns None when there is no `name=value` pair.
pub fn parse_set_cookie(raw: &str) -> Option<SetCookie> {
    let mut parts = raw.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() { return None; }
    let mut cookie = SetCookie {
        name: name.to_string(),
        value: value.trim().to_string(),
        max_age: None,
        expires: None,
    };
    for attr in parts {
        let Some((key, val)) = attr.split_once('=') else { continue; };
        let val = val.trim();
        if key.trim().eq_ignore_ascii_case("max-age") {
            cookie.max_age = val.parse::<i64>().ok();
        } else if key.trim().eq_ignore_ascii_case("expires") {
            cookie.expires = parse_expires(val);
            if cookie.expires.is_none() {
                debug!(cookie = %cookie.name, expires = val, "unparseable Expires attribute ignored");
            }
        }
    }
    Some(cookie)
}

fn parse_expires(val: &str) -> Option<DateTime<Utc>> {
    if let Ok(d) = DateTime::parse_from_rfc2822(val) {
        return Some(d.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(val, LEGACY_EXPIRES_FORMAT).ok().map(|n| n.and_utc())
}
