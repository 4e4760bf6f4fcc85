//! Service identity derivation.
//!
//! The telemetry stack reports services under the full Argo CD application
//! name, so the identity used in APM, log, and trace queries must be the
//! application name exactly as given. A separate display label strips a
//! trailing replica-hash or environment segment for UI purposes only; the two
//! are distinct types so the label can never end up in a URL or cache key.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static DISPLAY_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<prefix>.+?)(-[0-9a-f]{9,}(-[a-z0-9]{4,})?|-[0-9]+|-[a-z0-9]{4,6})?$")
        .expect("display label pattern")
});

/// Canonical service identity: the application name, unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceIdentity(String);

impl ServiceIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Best-effort short name for display. Not valid as an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayLabel(String);

impl DisplayLabel {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Total and infallible: every app name is its own canonical identity.
pub fn normalize(app_name: &str) -> ServiceIdentity {
    ServiceIdentity(app_name.to_string())
}

/// Strip one trailing hash/numeric/short-alnum segment for display.
///
/// `checkout-prod-677bfb55b7-942nr` becomes `checkout-prod`; a name without a
/// recognizable suffix passes through unchanged. Only suffixes carrying a
/// digit are treated as mechanical: a word segment like `-prod` stays, which
/// also keeps re-application a no-op.
pub fn display_label(app_name: &str) -> DisplayLabel {
    let stripped = DISPLAY_LABEL_RE.captures(app_name).and_then(|caps| {
        let prefix = caps.name("prefix")?;
        let suffix = &app_name[prefix.end()..];
        let mechanical = !suffix.is_empty() && suffix.chars().any(|c| c.is_ascii_digit());
        mechanical.then(|| prefix.as_str().to_string())
    });
    DisplayLabel(stripped.unwrap_or_else(|| app_name.to_string()))
}
