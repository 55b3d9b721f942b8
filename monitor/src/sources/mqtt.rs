use async_trait::async_trait;
use log::debug;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, Incoming, MqttOptions, QoS,
    SubscribeReasonCode, Transport,
};
use std::collections::VecDeque;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tmscore::telemetry::{TelemetryTransport, TransportEvent};
use tmscore::{SyncError, SyncResult};

use crate::workflow::config::BrokerConfig;

const REQUEST_CAPACITY: usize = 64;

/// Station telemetry over MQTT on (secure) websockets.
pub struct MqttTransport {
    cfg: BrokerConfig,
    session: Option<(AsyncClient, EventLoop)>,
    backlog: VecDeque<Vec<u8>>,
}

impl MqttTransport {
    pub fn new(cfg: BrokerConfig) -> Self {
        Self {
            cfg,
            session: None,
            backlog: VecDeque::new(),
        }
    }

    fn options(&self) -> MqttOptions {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let client_id = format!("{}-{}", self.cfg.client_id_prefix, millis);

        let mut opts = MqttOptions::new(client_id, self.cfg.url(), self.cfg.port);
        opts.set_keep_alive(Duration::from_secs(self.cfg.keep_alive_secs.max(5)));
        opts.set_credentials(self.cfg.username.clone(), self.cfg.password.clone());
        opts.set_clean_session(true);
        if self.cfg.secure {
            opts.set_transport(Transport::wss_with_default_config());
        } else {
            opts.set_transport(Transport::Ws);
        }
        opts
    }

    fn subscribe_error(topic: &str, reason: impl ToString) -> SyncError {
        SyncError::Subscribe {
            topic: topic.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl TelemetryTransport for MqttTransport {
    async fn connect(&mut self) -> SyncResult<()> {
        self.session = None;
        self.backlog.clear();

        let (client, mut eventloop) = AsyncClient::new(self.options(), REQUEST_CAPACITY);
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(ack))) => {
                    if ack.code != ConnectReturnCode::Success {
                        return Err(SyncError::Connect(format!("broker refused: {:?}", ack.code)));
                    }
                    break;
                }
                Ok(_) => continue,
                Err(err) => return Err(SyncError::Connect(err.to_string())),
            }
        }
        self.session = Some((client, eventloop));
        Ok(())
    }

    async fn subscribe(&mut self, topic: &str) -> SyncResult<()> {
        let Some((client, eventloop)) = self.session.as_mut() else {
            return Err(Self::subscribe_error(topic, "not connected"));
        };
        client
            .subscribe(topic, QoS::AtMostOnce)
            .await
            .map_err(|err| Self::subscribe_error(topic, err))?;

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::SubAck(ack))) => {
                    if ack
                        .return_codes
                        .iter()
                        .any(|code| matches!(code, SubscribeReasonCode::Failure))
                    {
                        return Err(Self::subscribe_error(topic, "rejected by broker"));
                    }
                    return Ok(());
                }
                Ok(Event::Incoming(Incoming::Publish(publish))) => {
                    self.backlog.push_back(publish.payload.to_vec());
                }
                Ok(_) => continue,
                Err(err) => return Err(Self::subscribe_error(topic, err)),
            }
        }
    }

    async fn recv(&mut self) -> TransportEvent {
        if let Some(payload) = self.backlog.pop_front() {
            return TransportEvent::Message(payload);
        }
        let Some((_, eventloop)) = self.session.as_mut() else {
            return TransportEvent::Lost("not connected".into());
        };

        let event = loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::Publish(publish))) => {
                    break TransportEvent::Message(publish.payload.to_vec());
                }
                Ok(Event::Incoming(Incoming::Disconnect)) => {
                    break TransportEvent::Lost("broker sent disconnect".into());
                }
                Ok(_) => continue,
                Err(err) => break TransportEvent::Lost(err.to_string()),
            }
        };
        if matches!(event, TransportEvent::Lost(_)) {
            self.session = None;
        }
        event
    }

    async fn disconnect(&mut self) {
        if let Some((client, _)) = self.session.take() {
            if let Err(err) = client.try_disconnect() {
                debug!("mqtt disconnect: {}", err);
            }
        }
    }
}
