#![allow(clippy::unwrap_used)]
// Integration tests for `WebClient` using wiremock.

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nexa_api::{TransportConfig, WebClient};

async fn setup() -> (MockServer, WebClient) {
    let server = MockServer::start().await;
    let client = WebClient::new(
        Url::parse(&server.uri()).unwrap(),
        "alice".into(),
        "hunter2".to_string().into(),
        &TransportConfig::default(),
    )
    .unwrap();
    (server, client)
}

/// The single login the client runs before its first data call.
async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": 1 })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_login_sends_account_and_password() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_string_contains("account=alice"))
        .and(body_string_contains("password=hunter2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    client.login().await.unwrap();
}

#[tokio::test]
async fn test_status_and_totals_are_plant_scoped() {
    let (server, client) = setup().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/panel/noah/getNoahStatusData"))
        .and(query_param("plantId", "1001"))
        .and(body_string_contains("deviceSn=SN1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": 1,
            "obj": {
                "pac": "300", "ppv": "410", "totalBatteryPackSoc": "64",
                "totalBatteryPackChargingPower": "-95", "workMode": "0", "status": "6"
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/panel/noah/getNoahTotalData"))
        .and(query_param("plantId", "1001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": 1,
            "obj": { "eacTotal": "812.4", "eacToday": "3.1" }
        })))
        .mount(&server)
        .await;

    let status = client.status(1001, "SN1").await.unwrap();
    let totals = client.totals(1001, "SN1").await.unwrap();

    assert_eq!(status.obj.total_battery_pack_charging_power, "-95");
    assert_eq!(status.obj.status, "6");
    assert_eq!(totals.obj.eac_total, "812.4");
}

#[tokio::test]
async fn test_device_details_filters_by_serial() {
    let (server, client) = setup().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/device/getNoahList"))
        .and(body_string_contains("deviceSn=SN1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "datas": [{
                "sn": "SN1", "plantId": "1001", "chargingSocHighLimit": "95",
                "chargingSocLowLimit": "10", "allowGridCharging": "1"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let details = client.device_details(1001, "SN1").await.unwrap();

    assert_eq!(details.datas.len(), 1);
    assert_eq!(details.datas[0].charging_soc_high_limit, "95");
    assert_eq!(details.datas[0].allow_grid_charging, "1");
}

#[tokio::test]
async fn test_history_sends_todays_date() {
    let (server, client) = setup().await;
    mount_login(&server).await;
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();

    Mock::given(method("POST"))
        .and(path("/device/getNoahHistory"))
        .and(body_string_contains(format!("startDate={today}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": 1,
            "obj": { "datas": [{ "batteryPackageQuantity": 1, "battery1SerialNum": "B1" }] }
        })))
        .mount(&server)
        .await;

    let history = client.history("SN1").await.unwrap();

    assert_eq!(history.obj.datas.len(), 1);
    assert_eq!(history.obj.datas[0].battery_package_quantity, 1);
}
