// Web portal client
//
// Cookie-session API behind openapi.growatt.com. Read-only: the portal's
// parameter writes are not used by the bridge.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;

use super::models::{NoahHistory, NoahList, NoahStatus, NoahTotals, WebPlant, WebResult};
use crate::app::client::with_trailing_slash;
use crate::error::Error;
use crate::session::{Authenticator, SessionClient};
use crate::transport::{FormTransport, TransportConfig};

/// Form login; the session lives in the cookie jar, so no token is returned.
pub struct WebAuthenticator {
    username: String,
    password: SecretString,
    login_url: Url,
}

#[async_trait]
impl Authenticator for WebAuthenticator {
    async fn login(&self, transport: &FormTransport) -> Result<Option<SecretString>, Error> {
        debug!(user = %self.username, "logging in to web portal");
        let result: WebResult = transport
            .post_form(
                self.login_url.clone(),
                None,
                &[
                    ("account", self.username.clone()),
                    ("password", self.password.expose_secret().to_owned()),
                ],
            )
            .await?;

        if result.result < 0 {
            return Err(Error::Authentication {
                message: result.msg,
            });
        }
        Ok(None)
    }
}

/// Client for the web portal's plant and NOAH panel endpoints.
pub struct WebClient {
    session: SessionClient,
    base_url: Url,
}

impl WebClient {
    pub fn new(
        base_url: Url,
        username: String,
        password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let base_url = with_trailing_slash(base_url);
        let auth = WebAuthenticator {
            login_url: base_url.join("login")?,
            username,
            password,
        };
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

    pub async fn plant_list(&self) -> Result<Vec<WebPlant>, Error> {
        self.session
            .request(self.url("index/getPlantListTitle")?, &[])
            .await
    }

    pub async fn device_list(&self, plant_id: i64) -> Result<NoahList, Error> {
        self.session
            .request(
                self.url("device/getNoahList")?,
                &[("plantId", plant_id.to_string()), ("currPage", "1".into())],
            )
            .await
    }

    /// The device list filtered down to one serial. Carries the parameters.
    pub async fn device_details(&self, plant_id: i64, serial: &str) -> Result<NoahList, Error> {
        self.session
            .request(
                self.url("device/getNoahList")?,
                &[
                    ("plantId", plant_id.to_string()),
                    ("deviceSn", serial.to_owned()),
                    ("currPage", "1".into()),
                ],
            )
            .await
    }

    /// Today's history samples, newest first.
    pub async fn history(&self, serial: &str) -> Result<NoahHistory, Error> {
        let today = chrono::Local::now().format("%Y-%m-%d").to_string();
        self.session
            .request(
                self.url("device/getNoahHistory")?,
                &[
                    ("deviceSn", serial.to_owned()),
                    ("start", "0".into()),
                    ("startDate", today.clone()),
                    ("endDate", today),
                ],
            )
            .await
    }

    pub async fn status(&self, plant_id: i64, serial: &str) -> Result<NoahStatus, Error> {
        self.session
            .request(
                self.url(&format!("panel/noah/getNoahStatusData?plantId={plant_id}"))?,
                &[("deviceSn", serial.to_owned())],
            )
            .await
    }

    pub async fn totals(&self, plant_id: i64, serial: &str) -> Result<NoahTotals, Error> {
        self.session
            .request(
                self.url(&format!("panel/noah/getNoahTotalData?plantId={plant_id}"))?,
                &[("deviceSn", serial.to_owned())],
            )
            .await
    }
}
