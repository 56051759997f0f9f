// ShinePhone app API client
//
// Thin endpoint layer over `SessionClient`: URL construction, envelope
// checks, and the `nexa/set` parameter family. Values are passed through as
// the API expects them (integers for toggles, clamped numbers for limits).

use secrecy::SecretString;
use tracing::debug;
use url::Url;

use super::auth::AppAuthenticator;
use super::models::{
    BatteryData, NexaInfo, PlantInfo, PlantList, ResponseContainer, SystemStatus,
};
use crate::error::Error;
use crate::session::SessionClient;
use crate::transport::TransportConfig;

/// Client for the app API's plant and `noahDeviceApi` endpoints.
pub struct AppClient {
    session: SessionClient,
    base_url: Url,
}

impl AppClient {
    /// Create a client. Nothing is sent until the first call.
    ///
    /// `base_url` is the app server root (e.g. `https://server-api.growatt.com`),
    /// `token_url` the evcharge OCPP login endpoint.
    pub fn new(
        base_url: Url,
        token_url: Url,
        username: String,
        password: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let base_url = with_trailing_slash(base_url);
        let auth = AppAuthenticator::new(username, password, &base_url, token_url)?;
        Ok(Self {
            session: SessionClient::new(transport, Box::new(auth))?,
            base_url,
        })
    }

    pub fn session(&self) -> &SessionClient {
        &self.session
    }

    pub async fn login(&self) -> Result<(), Error> {
        self.session.login().await
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── Enumeration ──────────────────────────────────────────────────

    /// All plants on the account (first page of 20, like the app).
    pub async fn plant_list(&self) -> Result<PlantList, Error> {
        self.session
            .request(
                self.url("newTwoPlantAPI.do?op=getAllPlantListTwo")?,
                &[
                    ("plantStatus", String::new()),
                    ("pageSize", "20".into()),
                    ("language", "1".into()),
                    ("toPageNum", "1".into()),
                    ("order", "1".into()),
                ],
            )
            .await
    }

    /// Whether a plant hosts a NEXA device, and its serial if so.
    pub async fn plant_info(&self, plant_id: i64) -> Result<PlantInfo, Error> {
        let resp: ResponseContainer<PlantInfo> = self
            .session
            .request(
                self.url("noahDeviceApi/noah/isPlantNoahSystem")?,
                &[("plantId", plant_id.to_string())],
            )
            .await?;
        Ok(resp.obj.unwrap_or_default())
    }

    // ── Device data ──────────────────────────────────────────────────

    pub async fn system_status(&self, serial: &str) -> Result<SystemStatus, Error> {
        self.device_call("noahDeviceApi/nexa/getSystemStatus", serial, &[])
            .await
    }

    pub async fn device_info(&self, serial: &str) -> Result<NexaInfo, Error> {
        self.device_call(
            "noahDeviceApi/nexa/getNexaInfoBySn",
            serial,
            &[("language", "1".into())],
        )
        .await
    }

    pub async fn battery_data(&self, serial: &str) -> Result<BatteryData, Error> {
        self.device_call("noahDeviceApi/nexa/getBatteryData", serial, &[])
            .await
    }

    async fn device_call<T>(
        &self,
        path: &str,
        serial: &str,
        extra: &[(&'static str, String)],
    ) -> Result<T, Error>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut form = extra.to_vec();
        form.push(("deviceSn", serial.to_owned()));
        let resp: ResponseContainer<T> = self.session.request(self.url(path)?, &form).await?;
        resp.obj.ok_or_else(|| Error::Api {
            message: if resp.msg.is_empty() {
                format!("{path}: empty response (result {})", resp.result)
            } else {
                resp.msg
            },
        })
    }

    // ── Parameter writes ─────────────────────────────────────────────

    /// Default output power and the mode it applies to (0 load-first,
    /// 1 battery-first). Power is clamped to 0..=1000 W.
    pub async fn set_system_output_power(&self, serial: &str, mode: i32, power_w: f64) -> Result<(), Error> {
        let power = power_w.clamp(0.0, 1000.0);
        self.set(serial, "system_out_put_power", &[mode.to_string(), format!("{power:.0}")])
            .await
    }

    /// Charge ceiling clamped to 70..=100 %, discharge floor to 0..=30 %.
    pub async fn set_charging_soc(&self, serial: &str, charge_limit: f64, discharge_limit: f64) -> Result<(), Error> {
        let charge = charge_limit.clamp(70.0, 100.0);
        let discharge = discharge_limit.clamp(0.0, 30.0);
        self.set(serial, "charging_soc", &[format!("{charge:.0}"), format!("{discharge:.0}")])
            .await
    }

    pub async fn set_allow_grid_charging(&self, serial: &str, enable: i32) -> Result<(), Error> {
        self.set(serial, "allow_grid_charging", &[enable.to_string()]).await
    }

    pub async fn set_grid_connection_control(&self, serial: &str, enable: i32) -> Result<(), Error> {
        self.set(serial, "grid_connection_control", &[enable.to_string()]).await
    }

    /// The app's "Power+" function.
    pub async fn set_ac_couple_power_control(&self, serial: &str, enable: i32) -> Result<(), Error> {
        self.set(serial, "ac_couple_power_control", &[enable.to_string()]).await
    }

    /// The app's "AC always on" setting.
    pub async fn set_light_load_enable(&self, serial: &str, enable: i32) -> Result<(), Error> {
        self.set(serial, "light_load_enable", &[enable.to_string()]).await
    }

    /// The app's "Always on" setting.
    pub async fn set_never_power_off(&self, serial: &str, enable: i32) -> Result<(), Error> {
        self.set(serial, "never_power_off", &[enable.to_string()]).await
    }

    /// Feed-in limiter; percentage clamped to 0..=100.
    pub async fn set_anti_backflow(&self, serial: &str, enable: i32, percentage: f64) -> Result<(), Error> {
        let pct = percentage.clamp(0.0, 100.0);
        self.set(serial, "anti_backflow", &[enable.to_string(), format!("{pct:.0}")])
            .await
    }

    async fn set(&self, serial: &str, kind: &'static str, params: &[String]) -> Result<(), Error> {
        const PARAM_KEYS: [&str; 2] = ["param1", "param2"];

        debug!(device = serial, kind, ?params, "nexa/set");
        let mut form = vec![("serialNum", serial.to_owned()), ("type", kind.to_owned())];
        form.extend(PARAM_KEYS.iter().copied().zip(params.iter().cloned()));

        let resp: ResponseContainer<serde_json::Value> = self
            .session
            .request(self.url("noahDeviceApi/nexa/set")?, &form)
            .await?;

        if resp.result <= 0 {
            return Err(Error::Api {
                message: if resp.msg.is_empty() {
                    format!("{kind} rejected (result {})", resp.result)
                } else {
                    resp.msg
                },
            });
        }
        Ok(())
    }
}

/// `Url::join` replaces the last path segment unless the base ends in `/`.
pub(crate) fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
