#![allow(clippy::unwrap_used)]
// Integration tests for `AppClient` using wiremock.

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nexa_api::{AppClient, Error, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, AppClient) {
    let server = MockServer::start().await;
    let base = Url::parse(&server.uri()).unwrap();
    let token_url = base.join("ocpp/user").unwrap();
    let client = AppClient::new(
        base,
        token_url,
        "alice".into(),
        &"hunter2".to_string().into(),
        &TransportConfig::default(),
    )
    .unwrap();
    (server, client)
}

async fn mount_login(server: &MockServer, times: u64) {
    Mock::given(method("POST"))
        .and(path("/ocpp/user"))
        .and(body_string_contains("cmd=shineLogin"))
        .and(body_string_contains("userId=SHINEalice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": 0, "token": "tok-123" })))
        .expect(times)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/newTwoLoginAPIV2.do"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "back": { "success": true, "msg": "", "user": { "id": 42 } }
        })))
        .expect(times)
        .mount(server)
        .await;
}

fn ok_set() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "result": 1, "msg": "ok", "obj": null }))
}

// ── Authentication tests ────────────────────────────────────────────

#[tokio::test]
async fn test_login_fetches_token_then_logs_in() {
    let (server, client) = setup().await;
    mount_login(&server, 1).await;

    client.login().await.unwrap();

    assert!(client.session().state().await.is_authenticated());
}

#[tokio::test]
async fn test_login_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/ocpp/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": 0, "token": "tok" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/newTwoLoginAPIV2.do"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "back": { "success": false, "msg": "wrong password" }
        })))
        .mount(&server)
        .await;

    let result = client.login().await;

    assert!(
        matches!(result, Err(Error::Authentication { ref message }) if message == "wrong password"),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_expired_token_relogs_and_retries() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/noahDeviceApi/nexa/getSystemStatus"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/noahDeviceApi/nexa/getSystemStatus"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": 1,
            "obj": { "pac": "120", "soc": "55", "status": "1" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    // The lazy first login plus one re-login.
    mount_login(&server, 2).await;

    let status = client.system_status("SN1").await.unwrap();

    assert_eq!(status.pac, "120");
    assert_eq!(status.soc, "55");
    assert_eq!(status.status, "1");
}

// ── Enumeration tests ───────────────────────────────────────────────

#[tokio::test]
async fn test_plant_list_and_info() {
    let (server, client) = setup().await;
    mount_login(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/newTwoPlantAPI.do"))
        .and(query_param("op", "getAllPlantListTwo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "PlantList": [{ "id": 7 }, { "id": "8" }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/noahDeviceApi/noah/isPlantNoahSystem"))
        .and(body_string("plantId=7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": 1,
            "obj": { "isPlantHaveNexa": true, "deviceSn": "SN7", "plantName": "Roof" }
        })))
        .mount(&server)
        .await;

    let plants = client.plant_list().await.unwrap();
    let ids: Vec<i64> = plants.plants.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![7, 8]);

    let info = client.plant_info(7).await.unwrap();
    assert!(info.is_plant_have_nexa);
    assert_eq!(info.device_sn, "SN7");
}

#[tokio::test]
async fn test_device_info_missing_obj_is_api_error() {
    let (server, client) = setup().await;
    mount_login(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/noahDeviceApi/nexa/getNexaInfoBySn"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": 0, "msg": "device offline", "obj": null
        })))
        .mount(&server)
        .await;

    let result = client.device_info("SN1").await;

    assert!(
        matches!(result, Err(Error::Api { ref message }) if message == "device offline"),
        "expected Api error, got: {result:?}"
    );
}

// ── Parameter write tests ───────────────────────────────────────────

#[tokio::test]
async fn test_charging_soc_is_clamped() {
    let (server, client) = setup().await;
    mount_login(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/noahDeviceApi/nexa/set"))
        .and(body_string("serialNum=SN1&type=charging_soc&param1=100&param2=30"))
        .respond_with(ok_set())
        .expect(1)
        .mount(&server)
        .await;

    client.set_charging_soc("SN1", 120.0, 45.0).await.unwrap();
}

#[tokio::test]
async fn test_output_power_sends_mode_and_rounded_power() {
    let (server, client) = setup().await;
    mount_login(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/noahDeviceApi/nexa/set"))
        .and(body_string("serialNum=SN1&type=system_out_put_power&param1=1&param2=400"))
        .respond_with(ok_set())
        .expect(1)
        .mount(&server)
        .await;

    client.set_system_output_power("SN1", 1, 399.6).await.unwrap();
}

#[tokio::test]
async fn test_toggle_sends_single_param() {
    let (server, client) = setup().await;
    mount_login(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/noahDeviceApi/nexa/set"))
        .and(body_string("serialNum=SN1&type=never_power_off&param1=1"))
        .respond_with(ok_set())
        .expect(1)
        .mount(&server)
        .await;

    client.set_never_power_off("SN1", 1).await.unwrap();
}

#[tokio::test]
async fn test_set_rejected_is_api_error() {
    let (server, client) = setup().await;
    mount_login(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/noahDeviceApi/nexa/set"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": 0, "msg": "parameter out of range"
        })))
        .mount(&server)
        .await;

    let result = client.set_allow_grid_charging("SN1", 1).await;

    assert!(
        matches!(result, Err(Error::Api { ref message }) if message == "parameter out of range"),
        "expected Api error, got: {result:?}"
    );
}
