// ShinePhone app login
//
// Two round trips: a bearer token from the evcharge OCPP endpoint, then the
// app login proper, authorized with that token. The password never leaves
// this module in clear text; both calls send the app's hash of it.

use async_trait::async_trait;
use md5::{Digest, Md5};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;

use super::models::{LoginResult, TokenResponse};
use crate::error::Error;
use crate::session::Authenticator;
use crate::transport::FormTransport;

const APP_VERSION: &str = "8.3.6.0";

/// Login sequence for the app API.
pub struct AppAuthenticator {
    username: String,
    password_hash: SecretString,
    login_url: Url,
    token_url: Url,
}

impl AppAuthenticator {
    pub fn new(username: String, password: &SecretString, base_url: &Url, token_url: Url) -> Result<Self, Error> {
        Ok(Self {
            login_url: base_url.join("newTwoLoginAPIV2.do")?,
            token_url,
            password_hash: SecretString::from(hash_password(password.expose_secret())),
            username,
        })
    }

    async fn fetch_token(&self, transport: &FormTransport) -> Result<SecretString, Error> {
        let resp: TokenResponse = transport
            .post_form(
                self.token_url.clone(),
                None,
                &[
                    ("cmd", "shineLogin".into()),
                    ("userId", format!("SHINE{}", self.username)),
                    ("password", self.password_hash.expose_secret().to_owned()),
                    ("lan", "1".into()),
                ],
            )
            .await?;

        if resp.token.is_empty() {
            return Err(Error::Authentication {
                message: format!("token request rejected (code {})", resp.code),
            });
        }
        Ok(SecretString::from(resp.token))
    }
}

#[async_trait]
impl Authenticator for AppAuthenticator {
    async fn login(&self, transport: &FormTransport) -> Result<Option<SecretString>, Error> {
        debug!(user = %self.username, "requesting app token");
        let token = self.fetch_token(transport).await?;

        let now = chrono::Local::now();
        let result: LoginResult = transport
            .post_form(
                self.login_url.clone(),
                Some(&token),
                &[
                    ("userName", self.username.clone()),
                    ("password", self.password_hash.expose_secret().to_owned()),
                    ("newLogin", "1".into()),
                    ("phoneType", "android".into()),
                    ("shinephoneVersion", APP_VERSION.into()),
                    ("phoneSn", uuid::Uuid::new_v4().to_string()),
                    ("ipvcpc", ipvcpc(&self.username)),
                    ("language", "1".into()),
                    ("systemVersion", "15".into()),
                    ("phoneModel", "Mi A1".into()),
                    ("loginTime", now.format("%Y-%m-%d %H:%M:%S").to_string()),
                    ("appType", "ShinePhone".into()),
                    ("timestamp", now.timestamp_millis().to_string()),
                ],
            )
            .await?;

        if !result.back.success {
            return Err(Error::Authentication {
                message: result.back.msg,
            });
        }

        debug!(
            user_id = result.back.user.map(|u| u.id).unwrap_or_default(),
            "app login accepted"
        );
        Ok(Some(token))
    }
}

/// The app's password hash: MD5 hex digest with every `'0'` at an even
/// index replaced by `'c'`.
pub(crate) fn hash_password(password: &str) -> String {
    hex::encode(Md5::digest(password.as_bytes()))
        .char_indices()
        .map(|(i, c)| if i % 2 == 0 && c == '0' { 'c' } else { c })
        .collect()
}

/// Per-account client fingerprint sent with the login form.
fn ipvcpc(username: &str) -> String {
    hex::encode(Md5::digest(username.as_bytes()))
}
