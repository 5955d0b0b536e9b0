#![allow(clippy::unwrap_used)]
// Integration tests for `Session` using wiremock.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use homeguard_api::{
    ArmStatus, Endpoints, Error, LockStatus, MutationOutcome, ReqwestTransport, Session,
};

const USERNAME: &str = "someone@example.com";
const PASSWORD: &str = "hunter2";
const TOKEN: &str = "Z2V0IG91dCBvZiBoZXJl";
const GIID: &str = "112233";

// ── Helpers ─────────────────────────────────────────────────────────

fn session_for(uri: &str) -> Session {
    let endpoints = Endpoints::new(uri).unwrap();
    let transport = Arc::new(ReqwestTransport::with_client(reqwest::Client::new()));
    Session::new(
        endpoints,
        USERNAME,
        SecretString::from(PASSWORD.to_owned()),
        transport,
    )
}

async fn setup() -> (MockServer, Session) {
    let server = MockServer::start().await;
    let session = session_for(&server.uri());
    (server, session)
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/cookie"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "cookie": TOKEN })))
        .mount(server)
        .await;
}

async fn mount_logout(server: &MockServer, expected: u64) {
    Mock::given(method("DELETE"))
        .and(path("/cookie"))
        .and(header("Cookie", format!("vid={TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200))
        .expect(expected)
        .mount(server)
        .await;
}

async fn logged_in() -> (MockServer, Session) {
    let (server, session) = setup().await;
    mount_login(&server).await;
    session.login().await.unwrap();
    (server, session)
}

fn vendor_error(code: &str) -> serde_json::Value {
    json!({
        "errorGroup": "BAD_REQUEST",
        "errorCode": code,
        "errorMessage": "Request rejected"
    })
}

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_sends_basic_credentials() {
    let (server, session) = setup().await;

    let expected = format!("Basic {}", BASE64.encode(format!("CPE/{USERNAME}:{PASSWORD}")));
    Mock::given(method("POST"))
        .and(path("/cookie"))
        .and(header("Authorization", expected.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "cookie": TOKEN })))
        .expect(1)
        .mount(&server)
        .await;

    assert!(!session.is_logged_in());
    session.login().await.unwrap();
    assert!(session.is_logged_in());
}

#[tokio::test]
async fn test_login_rejected() {
    let (server, session) = setup().await;

    Mock::given(method("POST"))
        .and(path("/cookie"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let result = session.login().await;

    match result {
        Err(Error::Authentication { status, body, .. }) => {
            assert_eq!(status, Some(401));
            assert_eq!(body, "Unauthorized");
        }
        other => panic!("expected Authentication error, got: {other:?}"),
    }
    assert!(!session.is_logged_in());
}

#[tokio::test]
async fn test_login_without_token_field() {
    let (server, session) = setup().await;

    Mock::given(method("POST"))
        .and(path("/cookie"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "cookie": "" })))
        .mount(&server)
        .await;

    let result = session.login().await;
    assert!(
        matches!(result, Err(Error::Authentication { status: Some(200), .. })),
        "expected Authentication error, got: {result:?}"
    );
    assert!(!session.is_logged_in());
}

#[tokio::test]
async fn test_failed_relogin_clears_previous_token() {
    let (server, session) = logged_in().await;
    assert!(session.is_logged_in());

    server.reset().await;
    Mock::given(method("POST"))
        .and(path("/cookie"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let result = session.login().await;
    assert!(matches!(result, Err(Error::Authentication { .. })), "got: {result:?}");
    assert!(!session.is_logged_in());
}

#[tokio::test]
async fn test_login_transport_failure_leaves_session_logged_out() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let session = session_for(&uri);
    let result = session.login().await;

    assert!(matches!(result, Err(Error::Transport(_))), "got: {result:?}");
    assert!(!session.is_logged_in());
}

// ── Logout ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_logout_clears_token() {
    let (server, session) = logged_in().await;
    mount_logout(&server, 1).await;

    assert!(session.logout().await.unwrap());
    assert!(!session.is_logged_in());
}

#[tokio::test]
async fn test_logout_clears_token_even_when_rejected() {
    let (server, session) = logged_in().await;

    Mock::given(method("DELETE"))
        .and(path("/cookie"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(!session.logout().await.unwrap());
    assert!(!session.is_logged_in());
}

#[tokio::test]
async fn test_logout_when_logged_out_is_local_noop() {
    let (server, session) = setup().await;
    mount_logout(&server, 0).await;

    assert!(!session.logout().await.unwrap());
    assert!(!session.logout().await.unwrap());
    assert!(!session.is_logged_in());
}

// ── Reads ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_installation_overview() {
    let (server, session) = logged_in().await;

    let body = json!({
        "armState": { "statusType": "DISARMED", "changedVia": "CODE" },
        "climateValues": [
            { "deviceLabel": "CL1M4T3", "temperature": 21.5, "humidity": 40.0, "deviceArea": "Kitchen" }
        ],
        "doorWindow": {
            "reportState": true,
            "doorWindowDevice": [ { "deviceLabel": "DW1", "state": "CLOSE", "area": "Hall" } ]
        }
    });

    Mock::given(method("GET"))
        .and(path(format!("/installation/{GIID}/overview")))
        .and(header("Cookie", format!("vid={TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let overview = session.installation_overview(GIID).await.unwrap();

    assert_eq!(overview.arm_status(), Some(ArmStatus::Disarmed));
    let climate = overview.climate_values.unwrap();
    assert_eq!(climate[0].device_label, "CL1M4T3");
    assert_eq!(climate[0].temperature, Some(21.5));
    let door_window = overview.door_window.unwrap();
    assert!(door_window.report_state);
    assert_eq!(door_window.door_window_device.unwrap()[0].state.as_deref(), Some("CLOSE"));
    assert!(overview.smart_plugs.is_none());
}

#[tokio::test]
async fn test_installation_overview_undecodable_keeps_raw_response() {
    let (server, session) = logged_in().await;

    Mock::given(method("GET"))
        .and(path(format!("/installation/{GIID}/overview")))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    match session.installation_overview(GIID).await {
        Err(Error::Response { response, .. }) => {
            assert_eq!(response.status, 200);
            assert_eq!(response.body, "not json");
        }
        other => panic!("expected Response error, got: {other:?}"),
    }
    assert!(session.is_logged_in());
}

#[tokio::test]
async fn test_installation_overview_unauthorized_forces_logout() {
    let (server, session) = logged_in().await;
    mount_logout(&server, 1).await;

    Mock::given(method("GET"))
        .and(path(format!("/installation/{GIID}/overview")))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = session.installation_overview(GIID).await;
    assert!(
        matches!(&result, Err(e) if e.is_auth_expired()),
        "got: {result:?}"
    );
    assert!(!session.is_logged_in());
}

#[tokio::test]
async fn test_authenticated_call_requires_login() {
    let (server, session) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = session.installation_overview(GIID).await;
    assert!(matches!(result, Err(Error::Authentication { status: None, .. })), "got: {result:?}");
}

#[tokio::test]
async fn test_installations() {
    let (server, session) = logged_in().await;

    Mock::given(method("GET"))
        .and(path("/installation/search"))
        .and(query_param("email", USERNAME))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "giid": GIID, "alias": "Home", "locale": "sv_SE", "routingGroup": "EU" },
            { "giid": "445566", "alias": "Cabin" }
        ])))
        .mount(&server)
        .await;

    let installations = session.installations().await.unwrap();

    assert_eq!(installations.len(), 2);
    assert_eq!(installations[0].giid, GIID);
    assert_eq!(installations[0].locale.as_deref(), Some("sv_SE"));
    assert_eq!(installations[0].metadata["routingGroup"], json!("EU"));
    assert_eq!(installations[1].alias.as_deref(), Some("Cabin"));
}

#[tokio::test]
async fn test_installations_rejects_non_list_body() {
    let (server, session) = logged_in().await;

    Mock::given(method("GET"))
        .and(path("/installation/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "giid": GIID })))
        .mount(&server)
        .await;

    let result = session.installations().await;
    assert!(matches!(result, Err(Error::Response { .. })), "got: {result:?}");
}

// ── Mutations ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_set_arm_state() {
    let (server, session) = logged_in().await;

    Mock::given(method("PUT"))
        .and(path(format!("/installation/{GIID}/armstate/code")))
        .and(header("Content-Type", "application/json; charset=UTF-8"))
        .and(body_json(json!({ "code": "1234", "state": "ARMED_HOME" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "armStateChangeTransactionId": "x" })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = session
        .set_arm_state(GIID, "1234", ArmStatus::ArmedHome)
        .await
        .unwrap();
    assert_eq!(outcome, MutationOutcome::Applied);
}

#[tokio::test]
async fn test_set_arm_state_already_set_is_not_an_error() {
    let (server, session) = logged_in().await;

    Mock::given(method("PUT"))
        .and(path(format!("/installation/{GIID}/armstate/code")))
        .respond_with(ResponseTemplate::new(400).set_body_json(vendor_error("VAL_00818")))
        .mount(&server)
        .await;

    let outcome = session
        .set_arm_state(GIID, "1234", ArmStatus::Disarmed)
        .await
        .unwrap();
    assert_eq!(outcome, MutationOutcome::AlreadySet);
    assert!(session.is_logged_in());
}

#[tokio::test]
async fn test_set_arm_state_unknown_vendor_code_fails() {
    let (server, session) = logged_in().await;

    Mock::given(method("PUT"))
        .and(path(format!("/installation/{GIID}/armstate/code")))
        .respond_with(ResponseTemplate::new(400).set_body_json(vendor_error("unknown")))
        .mount(&server)
        .await;

    let result = session.set_arm_state(GIID, "1234", ArmStatus::ArmedAway).await;
    match result {
        Err(Error::Response { response, .. }) => assert_eq!(response.status, 400),
        other => panic!("expected Response error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_set_arm_state_unauthorized_forces_logout() {
    let (server, session) = logged_in().await;
    mount_logout(&server, 1).await;

    Mock::given(method("PUT"))
        .and(path(format!("/installation/{GIID}/armstate/code")))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = session.set_arm_state(GIID, "1234", ArmStatus::ArmedAway).await;
    assert!(matches!(result, Err(Error::Response { .. })), "got: {result:?}");
    assert!(!session.is_logged_in());
}

#[tokio::test]
async fn test_forbidden_mutation_forces_logout_even_if_logout_fails() {
    let (server, session) = logged_in().await;

    Mock::given(method("DELETE"))
        .and(path("/cookie"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/installation/{GIID}/smartplug/state")))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let result = session.set_smart_plug(GIID, "SMRT PLG1", true).await;
    assert!(result.is_err());
    assert!(!session.is_logged_in());
}

#[tokio::test]
async fn test_set_door_lock() {
    let (server, session) = logged_in().await;

    Mock::given(method("PUT"))
        .and(path(format!("/installation/{GIID}/device/D00R%20L0CK/unlock")))
        .and(body_json(json!({ "code": "9876" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = session
        .set_door_lock(GIID, "D00R L0CK", "9876", LockStatus::Unlocked)
        .await
        .unwrap();
    assert_eq!(outcome, MutationOutcome::Applied);
}

#[tokio::test]
async fn test_set_door_lock_already_locked() {
    let (server, session) = logged_in().await;

    Mock::given(method("PUT"))
        .and(path(format!("/installation/{GIID}/device/FRONT/lock")))
        .respond_with(ResponseTemplate::new(400).set_body_json(vendor_error("VAL_00819")))
        .mount(&server)
        .await;

    let outcome = session
        .set_door_lock(GIID, "FRONT", "9876", LockStatus::Locked)
        .await
        .unwrap();
    assert_eq!(outcome, MutationOutcome::AlreadySet);
}

#[tokio::test]
async fn test_set_door_lock_unauthorized_forces_logout() {
    let (server, session) = logged_in().await;
    mount_logout(&server, 1).await;

    Mock::given(method("PUT"))
        .and(path(format!("/installation/{GIID}/device/D00R%20L0CK/lock")))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let result = session
        .set_door_lock(GIID, "D00R L0CK", "9876", LockStatus::Locked)
        .await;
    assert!(
        matches!(&result, Err(e) if e.is_auth_expired()),
        "got: {result:?}"
    );
    assert!(!session.is_logged_in());
}

#[tokio::test]
async fn test_set_smart_plug_sends_singleton_list() {
    let (server, session) = logged_in().await;

    Mock::given(method("POST"))
        .and(path(format!("/installation/{GIID}/smartplug/state")))
        .and(body_json(json!([{ "deviceLabel": "SMRT PLG1", "state": false }])))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = session.set_smart_plug(GIID, "SMRT PLG1", false).await.unwrap();
    assert_eq!(outcome, MutationOutcome::Applied);
}

#[tokio::test]
async fn test_already_set_codes_are_configurable() {
    let server = MockServer::start().await;
    let session = session_for(&server.uri()).with_already_set_codes(["VAL_99999"]);
    mount_login(&server).await;
    session.login().await.unwrap();

    Mock::given(method("PUT"))
        .and(path(format!("/installation/{GIID}/armstate/code")))
        .and(body_json(json!({ "code": "1234", "state": "ARMED_AWAY" })))
        .respond_with(ResponseTemplate::new(400).set_body_json(vendor_error("VAL_99999")))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("/installation/{GIID}/armstate/code")))
        .and(body_json(json!({ "code": "1234", "state": "DISARMED" })))
        .respond_with(ResponseTemplate::new(400).set_body_json(vendor_error("VAL_00818")))
        .mount(&server)
        .await;

    let replaced = session.set_arm_state(GIID, "1234", ArmStatus::ArmedAway).await;
    assert_eq!(replaced.unwrap(), MutationOutcome::AlreadySet);

    let dropped = session.set_arm_state(GIID, "1234", ArmStatus::Disarmed).await;
    assert!(matches!(dropped, Err(Error::Response { .. })), "got: {dropped:?}");
}
