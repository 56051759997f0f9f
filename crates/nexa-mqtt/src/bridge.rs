// ── Broker event loop ──
//
// Drives the rumqttc event loop for the lifetime of the process. Broker
// connects and disconnects become attach/detach requests, handled in order
// by a lifecycle task so the event loop keeps polling while devices are
// enumerated or in-flight polls drain. Parameter commands are decoded here
// and handed to a command task in arrival order. Home Assistant discovery is
// re-announced through the same lifecycle task when Home Assistant comes
// online and every few hours.
//
// The first attach failure ends the process. After one successful attach,
// failures are logged and retried on the next reconnect.

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet};
use secrecy::ExposeSecret;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use nexa_config::MqttSettings;
use nexa_core::{CoreError, DeviceSink, Orchestrator, ParameterDelta};

use crate::error::BridgeError;
use crate::mqtt::{Discovery, MqttSink, Topics};

const KEEP_ALIVE: Duration = Duration::from_secs(30);
const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);
const REQUEST_CAPACITY: usize = 64;
const ANNOUNCE_PERIOD: Duration = Duration::from_secs(6 * 60 * 60);

enum Lifecycle {
    Attach,
    Detach,
    Announce,
}

type Command = (String, ParameterDelta);

pub fn mqtt_options(settings: &MqttSettings) -> MqttOptions {
    let mut options = MqttOptions::new(&settings.client_id, &settings.host, settings.port);
    options.set_keep_alive(KEEP_ALIVE);
    options.set_clean_session(true);
    if let Some((username, password)) = &settings.credentials {
        options.set_credentials(username, password.expose_secret());
    }
    options
}

/// Run until `shutdown` fires or the first attach fails.
pub async fn run(
    orchestrator: Orchestrator,
    settings: &MqttSettings,
    shutdown: CancellationToken,
) -> Result<(), BridgeError> {
    let (client, mut eventloop) = AsyncClient::new(mqtt_options(settings), REQUEST_CAPACITY);
    let topics = Topics::new(settings.topic_prefix.clone());
    let discovery = settings
        .discovery
        .as_ref()
        .map(|d| Discovery::new(d.topic_prefix.clone(), d.switch_as_select));
    let ha_status = discovery.as_ref().map(Discovery::status_topic);
    let mut sink = MqttSink::new(client.clone(), topics.clone());
    if let Some(discovery) = discovery {
        sink = sink.with_discovery(discovery);
    }
    let sink = Arc::new(sink);

    let (lifecycle_tx, lifecycle_rx) = mpsc::unbounded_channel();
    let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let lifecycle = tokio::spawn(lifecycle_task(orchestrator.clone(), sink, lifecycle_rx, outcome_tx));
    let commands = tokio::spawn(command_task(orchestrator, command_rx));

    info!(host = %settings.host, port = settings.port, prefix = %settings.topic_prefix, "connecting to mqtt broker");

    let mut announce = tokio::time::interval_at(tokio::time::Instant::now() + ANNOUNCE_PERIOD, ANNOUNCE_PERIOD);
    let mut attached_once = false;
    let mut connected = false;
    let result = loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => break Ok(()),
            _ = announce.tick(), if ha_status.is_some() && connected => {
                let _ = lifecycle_tx.send(Lifecycle::Announce);
            }
            Some(outcome) = outcome_rx.recv() => match outcome {
                Ok(devices) => {
                    attached_once = true;
                    info!(devices, "bridge attached");
                }
                Err(e) if !attached_once => break Err(BridgeError::from(e)),
                Err(e) => warn!(error = %e, "attach failed, retrying on next reconnect"),
            },
            event = eventloop.poll() => match event {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    info!(code = ?ack.code, "connected to mqtt broker");
                    connected = true;
                    let _ = lifecycle_tx.send(Lifecycle::Attach);
                }
                Ok(Event::Incoming(Packet::Publish(publish))) if ha_status.as_deref() == Some(publish.topic.as_str()) => {
                    if is_online(&publish.payload) {
                        info!("home assistant online, re-announcing devices");
                        let _ = lifecycle_tx.send(Lifecycle::Announce);
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    match decode_command(&topics, &publish.topic, &publish.payload) {
                        Some(Ok(command)) => {
                            let _ = command_tx.send(command);
                        }
                        Some(Err(e)) => warn!(topic = %publish.topic, error = %e, "undecodable parameter command dropped"),
                        None => debug!(topic = %publish.topic, "ignoring message"),
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "mqtt connection error");
                    if std::mem::take(&mut connected) {
                        let _ = lifecycle_tx.send(Lifecycle::Detach);
                    }
                    tokio::select! {
                        () = shutdown.cancelled() => break Ok(()),
                        () = tokio::time::sleep(RECONNECT_DELAY) => {}
                    }
                }
            },
        }
    };

    info!("shutting down");
    let _ = lifecycle_tx.send(Lifecycle::Detach);
    drop(lifecycle_tx);
    drop(command_tx);
    drain(lifecycle, &mut eventloop).await;
    commands.abort();

    if client.disconnect().await.is_ok() {
        let _ = tokio::time::timeout(Duration::from_secs(1), eventloop.poll()).await;
    }
    result
}

/// Wait for the lifecycle task to finish its final detach while keeping the
/// event loop moving, so in-flight publishes cannot stall it.
async fn drain(lifecycle: tokio::task::JoinHandle<()>, eventloop: &mut EventLoop) {
    let deadline = tokio::time::sleep(SHUTDOWN_GRACE);
    tokio::pin!(lifecycle, deadline);
    loop {
        tokio::select! {
            _ = &mut lifecycle => return,
            () = &mut deadline => {
                warn!("shutdown grace period elapsed");
                return;
            }
            event = eventloop.poll() => {
                if event.is_err() {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                }
            }
        }
    }
}

async fn lifecycle_task(
    orchestrator: Orchestrator,
    sink: Arc<MqttSink<AsyncClient>>,
    mut requests: mpsc::UnboundedReceiver<Lifecycle>,
    outcomes: mpsc::UnboundedSender<Result<usize, CoreError>>,
) {
    while let Some(request) = requests.recv().await {
        match request {
            Lifecycle::Attach => {
                let device_sink: Arc<dyn DeviceSink> = sink.clone();
                let outcome = orchestrator.attach(device_sink).await.map(|d| d.len());
                let _ = outcomes.send(outcome);
            }
            Lifecycle::Detach => orchestrator.detach().await,
            Lifecycle::Announce => sink.announce().await,
        }
    }
}

/// Home Assistant's birth message.
fn is_online(payload: &[u8]) -> bool {
    payload.trim_ascii().eq_ignore_ascii_case(b"online")
}

async fn command_task(orchestrator: Orchestrator, mut commands: mpsc::UnboundedReceiver<Command>) {
    while let Some((serial, delta)) = commands.recv().await {
        if let Err(e) = orchestrator.submit_parameters(&serial, delta).await {
            warn!(device = %serial, error = %e, "parameter command rejected");
        }
    }
}

/// `None` for topics that are not parameter commands.
fn decode_command(topics: &Topics, topic: &str, payload: &[u8]) -> Option<Result<Command, serde_json::Error>> {
    let serial = topics.parse_parameters_set(topic)?;
    Some(serde_json::from_slice::<ParameterDelta>(payload).map(|delta| (serial.to_owned(), delta)))
}
