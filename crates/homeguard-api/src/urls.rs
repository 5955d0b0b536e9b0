// Endpoint URL construction
//
// Every API path hangs off a single validated base URL. Segments are
// appended through `path_segments_mut`, so device labels with spaces or
// slashes are percent-encoded instead of changing the path shape.

use url::Url;

use crate::error::Error;
use crate::models::LockStatus;

/// Builds endpoint URLs from a validated base URL.
///
/// The base must be an absolute `http`/`https` URL with a host and no
/// query string or fragment. A trailing slash is irrelevant:
/// `https://host/api/2` and `https://host/api/2/` yield the same endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Result<Self, Error> {
        let base = Url::parse(base_url.trim())?;
        let invalid = |reason: &str| Error::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: reason.to_owned(),
        };

        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid("protocol must be http or https"));
        }
        if base.host_str().is_none_or(str::is_empty) {
            return Err(invalid("missing host"));
        }
        if base.query().is_some() {
            return Err(invalid("must not contain a query string"));
        }
        if base.fragment().is_some() {
            return Err(invalid("must not contain a fragment"));
        }

        Ok(Self { base })
    }

    /// The validated base URL, as given.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `{base}/cookie` -- POST to log in, DELETE to log out.
    pub fn login(&self) -> Url {
        self.join(&["cookie"])
    }

    /// `{base}/installation/search?email={username}`
    pub fn installations(&self, username: &str) -> Url {
        let mut url = self.join(&["installation", "search"]);
        url.query_pairs_mut().append_pair("email", username);
        url
    }

    /// `{base}/installation/{giid}/overview`
    pub fn overview(&self, giid: &str) -> Url {
        self.join(&["installation", giid, "overview"])
    }

    /// `{base}/installation/{giid}/armstate/code`
    pub fn arm_state_code(&self, giid: &str) -> Url {
        self.join(&["installation", giid, "armstate", "code"])
    }

    /// `{base}/installation/{giid}/smartplug/state`
    pub fn smart_plug(&self, giid: &str) -> Url {
        self.join(&["installation", giid, "smartplug", "state"])
    }

    /// `{base}/installation/{giid}/device/{label}/lock` or `.../unlock`
    pub fn door_lock(&self, giid: &str, device_label: &str, status: LockStatus) -> Url {
        let verb = match status {
            LockStatus::Locked => "lock",
            LockStatus::Unlocked => "unlock",
        };
        self.join(&["installation", giid, "device", device_label, verb])
    }

    fn join(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // http(s) URLs always have a path, so this cannot be a cannot-be-a-base URL.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}
