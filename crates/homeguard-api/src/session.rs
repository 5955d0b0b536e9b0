// Authenticated session against the installation API
//
// Owns the session token and every remote call that uses it. The token is
// an explicitly owned, lock-guarded value: readers (`is_logged_in`) take a
// short read lock and never wait on an in-flight HTTP call, because no lock
// is held across an `.await`.
//
// Invariant: the token is non-empty iff the last login succeeded and no
// failure or logout has happened since.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::header::{ACCEPT, AUTHORIZATION, COOKIE};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::models::{
    ArmPayload, ArmStatus, CookieInfo, DoorLockPayload, ErrorResponse, Installation,
    InstallationOverview, LockStatus, SmartPlugCommand,
};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
use crate::urls::Endpoints;

/// Vendor error code: the installation is already in the requested arm state.
pub const ARM_STATE_ALREADY_SET: &str = "VAL_00818";
/// Vendor error code: the lock is already in the requested state.
pub const LOCK_STATE_ALREADY_SET: &str = "VAL_00819";

const JSON: &str = "application/json";

/// Result of a mutating call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The server accepted the change.
    Applied,
    /// The server rejected the change because the target state already holds.
    AlreadySet,
}

// ── Token ────────────────────────────────────────────────────────────

#[derive(Default)]
struct SessionToken(RwLock<Option<SecretString>>);

impl SessionToken {
    fn is_set(&self) -> bool {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn get(&self) -> Option<String> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|token| token.expose_secret().to_owned())
    }

    fn set(&self, token: String) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = Some(SecretString::from(token));
    }

    fn take(&self) -> Option<SecretString> {
        self.0.write().unwrap_or_else(PoisonError::into_inner).take()
    }
}

// ── Session ──────────────────────────────────────────────────────────

/// Session manager for one installation account.
///
/// All HTTP goes through the injected [`HttpTransport`]. Mutating calls
/// share one error classifier: `401`/`403` force a logout, a `400` whose
/// vendor code is in the "already set" set counts as success, anything
/// else is an [`Error::Response`].
pub struct Session {
    transport: Arc<dyn HttpTransport>,
    endpoints: Endpoints,
    username: String,
    password: SecretString,
    token: SessionToken,
    already_set_codes: HashSet<String>,
}

impl Session {
    pub fn new(
        endpoints: Endpoints,
        username: impl Into<String>,
        password: SecretString,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            transport,
            endpoints,
            username: username.into(),
            password,
            token: SessionToken::default(),
            already_set_codes: [ARM_STATE_ALREADY_SET, LOCK_STATE_ALREADY_SET]
                .into_iter()
                .map(str::to_owned)
                .collect(),
        }
    }

    /// Replace the vendor codes that mean "target state already holds".
    pub fn with_already_set_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.already_set_codes = codes.into_iter().map(Into::into).collect();
        self
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// `true` iff a token is held. Never blocks on network I/O.
    pub fn is_logged_in(&self) -> bool {
        self.token.is_set()
    }

    // ── Authentication ───────────────────────────────────────────────

    /// Authenticate and store the returned token.
    ///
    /// Any failure, including transport errors and undecodable bodies,
    /// leaves the session logged out.
    pub async fn login(&self) -> Result<(), Error> {
        match self.request_token().await {
            Ok(token) => {
                self.token.set(token);
                info!(username = %self.username, "logged in");
                Ok(())
            }
            Err(e) => {
                self.token.take();
                Err(e)
            }
        }
    }

    async fn request_token(&self) -> Result<String, Error> {
        let credential = BASE64.encode(format!(
            "CPE/{}:{}",
            self.username,
            self.password.expose_secret()
        ));
        let request = HttpRequest::post(self.endpoints.login())
            .header(ACCEPT, JSON)?
            .header(AUTHORIZATION, &format!("Basic {credential}"))?;

        let response = self.transport.execute(request).await?;
        if !response.is_ok() {
            return Err(auth_error("login rejected", response));
        }

        let info: CookieInfo = match serde_json::from_str(&response.body) {
            Ok(info) => info,
            Err(e) => return Err(auth_error(&format!("unreadable login response: {e}"), response)),
        };

        match info.cookie {
            Some(cookie) if !cookie.is_empty() => Ok(cookie),
            _ => Err(auth_error("login response carried no token", response)),
        }
    }

    /// Drop the token and end the session remotely.
    ///
    /// The token is cleared before the remote call is made. Returns whether
    /// the server acknowledged the logout; when no token was held, nothing is
    /// sent and the result is `Ok(false)`.
    pub async fn logout(&self) -> Result<bool, Error> {
        let Some(token) = self.token.take() else {
            debug!("logout skipped, no session");
            return Ok(false);
        };

        let request = HttpRequest::delete(self.endpoints.login())
            .header(ACCEPT, JSON)?
            .header(COOKIE, &format!("vid={}", token.expose_secret()))?;
        let response = self.transport.execute(request).await?;

        debug!(status = response.status, "logged out");
        Ok(response.is_ok())
    }

    async fn force_logout(&self) {
        warn!("session rejected by server, logging out");
        if let Err(e) = self.logout().await {
            warn!(error = %e, "forced logout failed");
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Fetch the full device-state snapshot of an installation.
    pub async fn installation_overview(&self, giid: &str) -> Result<InstallationOverview, Error> {
        let request = self.authorize(HttpRequest::get(self.endpoints.overview(giid)))?;
        self.fetch(request, "installation overview").await
    }

    /// List the installations visible to this account.
    pub async fn installations(&self) -> Result<Vec<Installation>, Error> {
        let request =
            self.authorize(HttpRequest::get(self.endpoints.installations(&self.username)))?;
        self.fetch(request, "installation list").await
    }

    async fn fetch<T: DeserializeOwned>(&self, request: HttpRequest, what: &str) -> Result<T, Error> {
        let response = self.transport.execute(request).await?;

        if !response.is_ok() {
            if matches!(response.status, 401 | 403) {
                self.force_logout().await;
            }
            return Err(Error::Response {
                message: format!("failed to fetch {what}"),
                response,
            });
        }

        match serde_json::from_str(&response.body) {
            Ok(value) => Ok(value),
            Err(e) => Err(Error::Response {
                message: format!("failed to decode {what}: {e}"),
                response,
            }),
        }
    }

    // ── Mutations ────────────────────────────────────────────────────

    pub async fn set_arm_state(
        &self,
        giid: &str,
        pin: &str,
        status: ArmStatus,
    ) -> Result<MutationOutcome, Error> {
        let request = HttpRequest::put(self.endpoints.arm_state_code(giid))
            .json(&ArmPayload { code: pin, state: status })?;
        self.mutate(request, "arm state change").await
    }

    pub async fn set_door_lock(
        &self,
        giid: &str,
        device_label: &str,
        pin: &str,
        status: LockStatus,
    ) -> Result<MutationOutcome, Error> {
        let request = HttpRequest::put(self.endpoints.door_lock(giid, device_label, status))
            .json(&DoorLockPayload { code: pin })?;
        self.mutate(request, "door lock change").await
    }

    pub async fn set_smart_plug(
        &self,
        giid: &str,
        device_label: &str,
        active: bool,
    ) -> Result<MutationOutcome, Error> {
        let payload = [SmartPlugCommand {
            device_label,
            state: active,
        }];
        let request = HttpRequest::post(self.endpoints.smart_plug(giid)).json(&payload)?;
        self.mutate(request, "smart plug change").await
    }

    async fn mutate(&self, request: HttpRequest, what: &str) -> Result<MutationOutcome, Error> {
        let request = self.authorize(request)?;
        let response = self.transport.execute(request).await?;
        if response.is_ok() {
            return Ok(MutationOutcome::Applied);
        }
        self.classify(response, what).await
    }

    /// Decide what a rejected mutation means.
    async fn classify(&self, response: HttpResponse, what: &str) -> Result<MutationOutcome, Error> {
        let vendor = serde_json::from_str::<ErrorResponse>(&response.body).unwrap_or_default();

        match response.status {
            401 | 403 => {
                self.force_logout().await;
                Err(Error::Response {
                    message: format!("{what} rejected, session no longer valid"),
                    response,
                })
            }
            400 if vendor
                .error_code
                .as_ref()
                .is_some_and(|code| self.already_set_codes.contains(code)) =>
            {
                debug!(code = ?vendor.error_code, "{what}: target state already holds");
                Ok(MutationOutcome::AlreadySet)
            }
            _ => {
                let message = match (vendor.error_code, vendor.error_message) {
                    (Some(code), Some(text)) => format!("{what} failed: {code} {text}"),
                    (Some(code), None) => format!("{what} failed: {code}"),
                    _ => format!("{what} failed"),
                };
                Err(Error::Response { message, response })
            }
        }
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn authorize(&self, request: HttpRequest) -> Result<HttpRequest, Error> {
        let Some(token) = self.token.get() else {
            return Err(Error::Authentication {
                message: "not logged in".into(),
                status: None,
                body: String::new(),
            });
        };
        request
            .header(ACCEPT, JSON)?
            .header(COOKIE, &format!("vid={token}"))
    }
}

fn auth_error(message: &str, response: HttpResponse) -> Error {
    Error::Authentication {
        message: message.to_owned(),
        status: Some(response.status),
        body: response.body,
    }
}
