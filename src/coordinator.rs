use crate::prelude::*;

use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::lumentree::packet::{Frame, FrameKind};
use crate::lumentree::registers::RegisterMap;
use crate::lumentree::telemetry::{BatteryCellSnapshot, DeviceSnapshot};

/// Counters shared across components, printed at shutdown.
#[derive(Default)]
pub struct BridgeStats {
    pub payloads_received: u64,
    pub frames_dropped: u64,
    pub device_snapshots_decoded: u64,
    pub battery_snapshots_decoded: u64,
    pub empty_battery_frames: u64,
    pub mqtt_messages_sent: u64,
    pub mqtt_errors: u64,
}

impl BridgeStats {
    pub fn print_summary(&self) {
        info!("Bridge statistics:");
        info!("  Payloads received: {}", self.payloads_received);
        info!("  Frames dropped: {}", self.frames_dropped);
        info!("  Device snapshots decoded: {}", self.device_snapshots_decoded);
        info!(
            "  Battery snapshots decoded: {}",
            self.battery_snapshots_decoded
        );
        info!("  Empty battery frames: {}", self.empty_battery_frames);
        info!("  MQTT messages sent: {}", self.mqtt_messages_sent);
        info!("  MQTT errors: {}", self.mqtt_errors);
    }
}

/// Turns inbound transport payloads into snapshots: frame extraction,
/// register decode, store update, and JSON republish.
#[derive(Clone)]
pub struct Coordinator {
    config: ConfigWrapper,
    channels: Channels,
    store: Store,
    register_map: Arc<RegisterMap>,
    pub shared_stats: Arc<Mutex<BridgeStats>>,
}

impl Coordinator {
    pub fn new(config: ConfigWrapper, channels: Channels, store: Store) -> Self {
        Self {
            config,
            channels,
            store,
            register_map: Arc::new(RegisterMap::lumentree()),
            shared_stats: Arc::new(Mutex::new(BridgeStats::default())),
        }
    }

    pub async fn start(&self) -> Result<()> {
        let mut receiver = self.channels.from_mqtt.subscribe();

        loop {
            match receiver.recv().await? {
                mqtt::ChannelData::Shutdown => {
                    info!("Coordinator shutting down");
                    break;
                }
                mqtt::ChannelData::Message(message) => {
                    if let Err(e) = self.handle_payload(&message.topic, &message.payload) {
                        error!("payload handling failed: {:?}", e);
                    }
                }
            }
        }

        Ok(())
    }

    pub fn stop(&self) {
        let _ = self.channels.from_mqtt.send(mqtt::ChannelData::Shutdown);
    }

    /// Ask the inverter for fresh device and battery blocks.
    pub fn request_refresh(&self) -> Result<()> {
        let topic = format!(
            "{}/{}",
            self.config.mqtt().command_topic(),
            self.config.device_id()
        );

        for command in self.store.refresh_commands() {
            self.publish(topic.clone(), false, command.to_vec())?;
        }

        Ok(())
    }

    fn handle_payload(&self, topic: &str, payload: &[u8]) -> Result<()> {
        if let Ok(mut stats) = self.shared_stats.lock() {
            stats.payloads_received += 1;
        }

        // the topic's trailing segment names the reporting device
        let device_id = topic.rsplit('/').next().unwrap_or(topic);

        let frame = match Frame::extract(payload) {
            Some(frame) => frame,
            None => {
                if let Ok(mut stats) = self.shared_stats.lock() {
                    stats.frames_dropped += 1;
                }
                return Ok(());
            }
        };

        match frame.kind() {
            FrameKind::DeviceTelemetry => {
                let snapshot =
                    DeviceSnapshot::decode(&frame, &self.register_map, device_id, Utc::now());
                debug!("decoded device snapshot for {}", device_id);

                let json = serde_json::to_vec(&snapshot)?;
                self.store.record_device(snapshot);
                if let Ok(mut stats) = self.shared_stats.lock() {
                    stats.device_snapshots_decoded += 1;
                }

                self.publish(self.telemetry_topic(device_id, "telemetry"), true, json)?;
            }
            FrameKind::BatteryCells => {
                match BatteryCellSnapshot::decode(&frame, device_id, Utc::now()) {
                    Some(snapshot) => {
                        debug!(
                            "decoded {} battery cells for {}",
                            snapshot.number_of_cells, device_id
                        );

                        let json = serde_json::to_vec(&snapshot)?;
                        self.store.record_battery(snapshot);
                        if let Ok(mut stats) = self.shared_stats.lock() {
                            stats.battery_snapshots_decoded += 1;
                        }

                        self.publish(self.telemetry_topic(device_id, "battery"), true, json)?;
                    }
                    None => {
                        debug!("battery frame from {} had no plausible cells", device_id);
                        if let Ok(mut stats) = self.shared_stats.lock() {
                            stats.empty_battery_frames += 1;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn publish(&self, topic: String, retain: bool, payload: Vec<u8>) -> Result<()> {
        let message = mqtt::Message {
            topic,
            retain,
            payload,
        };

        if self
            .channels
            .to_mqtt
            .send(mqtt::ChannelData::Message(message))
            .is_err()
        {
            bail!("send(to_mqtt) failed - channel closed?");
        }

        Ok(())
    }

    fn telemetry_topic(&self, device_id: &str, kind: &str) -> String {
        format!("{}/{}/{}", self.config.mqtt().namespace(), device_id, kind)
    }
}
