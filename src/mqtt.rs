use crate::prelude::*;
use crate::coordinator::BridgeStats;

use rumqttc::{AsyncClient, Event, EventLoop, Incoming, LastWill, MqttOptions, Publish, QoS};
use std::sync::{Arc, Mutex};

// Message {{{
/// One MQTT publish in either direction. Payloads stay binary: inbound
/// register frames and outbound read commands are raw bytes, republished
/// telemetry is JSON bytes.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Message {
    pub topic: String,
    pub retain: bool,
    pub payload: Vec<u8>,
}
// }}}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ChannelData {
    Message(Message),
    Shutdown,
}

pub type Sender = broadcast::Sender<ChannelData>;

#[derive(Clone)]
pub struct Mqtt {
    config: ConfigWrapper,
    channels: Channels,
    shared_stats: Arc<Mutex<BridgeStats>>,
}

impl Mqtt {
    pub fn new(
        config: ConfigWrapper,
        channels: Channels,
        shared_stats: Arc<Mutex<BridgeStats>>,
    ) -> Self {
        Self {
            config,
            channels,
            shared_stats,
        }
    }

    pub async fn start(&self) -> Result<()> {
        let c = self.config.mqtt();

        let mut options = MqttOptions::new(c.client_id(), c.host(), c.port());

        let will = LastWill {
            topic: self.lwt_topic(),
            message: bytes::Bytes::from("offline"),
            qos: QoS::AtLeastOnce,
            retain: true,
        };
        options.set_last_will(will);

        options.set_keep_alive(std::time::Duration::from_secs(60));
        if let (Some(u), Some(p)) = (c.username(), c.password()) {
            options.set_credentials(u, p);
        }

        info!("initializing mqtt at {}:{}", c.host(), c.port());

        let (client, eventloop) = AsyncClient::new(options, 10);

        futures::try_join!(
            self.setup(client.clone()),
            self.receiver(eventloop),
            self.sender(client)
        )?;

        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        info!("Stopping MQTT client...");
        let _ = self.channels.to_mqtt.send(ChannelData::Shutdown);
        Ok(())
    }

    async fn setup(&self, client: AsyncClient) -> Result<()> {
        client
            .publish(self.lwt_topic(), QoS::AtLeastOnce, true, "online")
            .await?;

        // the inverter reports register frames on <report_topic>/<device id>
        client
            .subscribe(self.report_topic(), QoS::AtLeastOnce)
            .await?;
        info!("subscribed to {}", self.report_topic());

        Ok(())
    }

    // mqtt -> coordinator
    async fn receiver(&self, mut eventloop: EventLoop) -> Result<()> {
        let mut shutdown_rx = self.channels.to_mqtt.subscribe();

        loop {
            tokio::select! {
                event = eventloop.poll() => match event {
                    Ok(Event::Incoming(Incoming::Publish(publish))) => {
                        self.handle_message(publish)?;
                    }
                    Err(e) => {
                        error!("{}", e);
                        info!("reconnecting in 5s");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    }
                    _ => {} // connacks, keepalives etc
                },
                message = shutdown_rx.recv() => {
                    if let Ok(ChannelData::Shutdown) = message {
                        info!("MQTT receiver shutting down");
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    fn handle_message(&self, publish: Publish) -> Result<()> {
        let message = Message {
            topic: publish.topic,
            retain: publish.retain,
            payload: publish.payload.to_vec(),
        };
        debug!("RX: {} ({} bytes)", message.topic, message.payload.len());

        if self
            .channels
            .from_mqtt
            .send(ChannelData::Message(message))
            .is_err()
        {
            bail!("send(from_mqtt) failed - channel closed?");
        }

        Ok(())
    }

    // coordinator/scheduler -> mqtt
    async fn sender(&self, client: AsyncClient) -> Result<()> {
        use ChannelData::*;

        let mut receiver = self.channels.to_mqtt.subscribe();

        loop {
            match receiver.recv().await? {
                Shutdown => {
                    info!("MQTT sender received shutdown signal");
                    let _ = client.disconnect().await;
                    break;
                }
                Message(message) => {
                    debug!("TX: {} ({} bytes)", message.topic, message.payload.len());
                    match client
                        .publish(
                            &message.topic,
                            QoS::AtLeastOnce,
                            message.retain,
                            message.payload,
                        )
                        .await
                    {
                        Ok(_) => {
                            if let Ok(mut stats) = self.shared_stats.lock() {
                                stats.mqtt_messages_sent += 1;
                            }
                        }
                        Err(err) => {
                            error!("publish to {} failed: {:?}", message.topic, err);
                            if let Ok(mut stats) = self.shared_stats.lock() {
                                stats.mqtt_errors += 1;
                            }
                        }
                    }
                }
            }
        }

        info!("MQTT sender loop exiting");
        Ok(())
    }

    fn report_topic(&self) -> String {
        format!(
            "{}/{}",
            self.config.mqtt().report_topic(),
            self.config.device_id()
        )
    }

    fn lwt_topic(&self) -> String {
        format!("{}/LWT", self.config.mqtt().namespace())
    }
}
