// Minimal broker client seam. The sink only needs these three calls;
// tests substitute a recording client.

use async_trait::async_trait;
use rumqttc::{AsyncClient, ClientError, QoS};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("mqtt client: {0}")]
pub struct BusError(String);

impl From<ClientError> for BusError {
    fn from(err: ClientError) -> Self {
        Self(err.to_string())
    }
}

#[async_trait]
pub trait BusClient: Send + Sync {
    /// Publish at QoS 0, not retained.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BusError>;

    async fn subscribe(&self, topic: &str) -> Result<(), BusError>;

    async fn unsubscribe(&self, topic: &str) -> Result<(), BusError>;
}

#[async_trait]
impl BusClient for AsyncClient {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BusError> {
        Ok(AsyncClient::publish(self, topic, QoS::AtMostOnce, false, payload).await?)
    }

    async fn subscribe(&self, topic: &str) -> Result<(), BusError> {
        Ok(AsyncClient::subscribe(self, topic, QoS::AtMostOnce).await?)
    }

    async fn unsubscribe(&self, topic: &str) -> Result<(), BusError> {
        Ok(AsyncClient::unsubscribe(self, topic).await?)
    }
}
