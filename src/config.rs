use crate::prelude::*;

use serde::Deserialize;
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub mqtt: Mqtt,
    pub device: Device,

    pub scheduler: Option<Scheduler>,

    #[serde(default = "Config::default_loglevel")]
    pub loglevel: String,

    /// Snapshots kept per history kind before the oldest are dropped.
    #[serde(default = "Config::default_retention")]
    pub retention: usize,
}

// Device {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Device {
    /// The inverter serial, which is also the trailing segment of its MQTT
    /// topics.
    pub id: String,
}

impl Device {
    pub fn id(&self) -> &str {
        &self.id
    }
} // }}}

// Mqtt {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Mqtt {
    pub host: String,
    #[serde(default = "Config::default_mqtt_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,

    #[serde(default = "Config::default_mqtt_client_id")]
    pub client_id: String,

    /// Topic prefix the inverter reports on; we subscribe
    /// `<report_topic>/<device id>`.
    #[serde(default = "Config::default_mqtt_report_topic")]
    pub report_topic: String,

    /// Topic prefix the inverter listens on; read commands are published to
    /// `<command_topic>/<device id>`.
    #[serde(default = "Config::default_mqtt_command_topic")]
    pub command_topic: String,

    /// Prefix for our own republished telemetry.
    #[serde(default = "Config::default_mqtt_namespace")]
    pub namespace: String,
}

impl Mqtt {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> Option<String> {
        self.username.clone()
    }

    pub fn password(&self) -> Option<String> {
        self.password.clone()
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn report_topic(&self) -> &str {
        &self.report_topic
    }

    pub fn command_topic(&self) -> &str {
        &self.command_topic
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
} // }}}

// Scheduler {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Scheduler {
    #[serde(default = "Config::default_enabled")]
    pub enabled: bool,

    #[serde(default = "Config::default_scheduler_interval")]
    pub interval_secs: u64,
}

impl Scheduler {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }
} // }}}

/// Cloneable handle around the loaded config.
#[derive(Clone, Debug)]
pub struct ConfigWrapper {
    config: Arc<Mutex<Config>>,
}

impl ConfigWrapper {
    pub fn new(file: String) -> Result<Self> {
        let config = Config::new(file)?;
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: Config) -> Self {
        Self {
            config: Arc::new(Mutex::new(config)),
        }
    }

    pub fn mqtt(&self) -> Mqtt {
        self.config.lock().unwrap().mqtt.clone()
    }

    pub fn device(&self) -> Device {
        self.config.lock().unwrap().device.clone()
    }

    pub fn device_id(&self) -> String {
        self.config.lock().unwrap().device.id.clone()
    }

    pub fn scheduler(&self) -> Option<Scheduler> {
        self.config.lock().unwrap().scheduler.clone()
    }

    pub fn loglevel(&self) -> String {
        self.config.lock().unwrap().loglevel.clone()
    }

    pub fn retention(&self) -> usize {
        self.config.lock().unwrap().retention
    }
}

impl Config {
    pub fn new(file: String) -> Result<Self> {
        info!("Reading configuration from {}", file);
        let content = std::fs::read_to_string(&file)
            .map_err(|err| anyhow!("error reading {}: {}", file, err))?;

        let config: Self = serde_yaml::from_str(&content)?;

        info!("Configuration loaded:");
        info!("  Device: {}", config.device.id);
        info!("  MQTT:");
        info!("    Host: {}", config.mqtt.host);
        info!("    Port: {}", config.mqtt.port);
        info!("    Report topic: {}", config.mqtt.report_topic);
        info!("    Command topic: {}", config.mqtt.command_topic);
        info!("    Namespace: {}", config.mqtt.namespace);
        info!(
            "  Scheduler: {}",
            match &config.scheduler {
                Some(s) if s.enabled => format!("every {}s", s.interval_secs),
                _ => "disabled".to_string(),
            }
        );
        info!("  Retention: {} snapshots per kind", config.retention);
        info!("  Log Level: {}", config.loglevel);

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.mqtt.host.is_empty() {
            bail!("mqtt.host cannot be empty");
        }
        if self.mqtt.port == 0 {
            bail!("mqtt.port must be between 1 and 65535");
        }
        if self.device.id.is_empty() {
            bail!("device.id cannot be empty");
        }
        if self.retention == 0 {
            bail!("retention must be at least 1");
        }
        if let Some(scheduler) = &self.scheduler {
            if scheduler.enabled && scheduler.interval_secs == 0 {
                bail!("scheduler.interval_secs must be at least 1");
            }
        }

        Ok(())
    }

    fn default_mqtt_port() -> u16 {
        1886
    }

    fn default_mqtt_client_id() -> String {
        "lumentree-bridge".to_string()
    }

    fn default_mqtt_report_topic() -> String {
        "reportApp".to_string()
    }

    fn default_mqtt_command_topic() -> String {
        "listenApp".to_string()
    }

    fn default_mqtt_namespace() -> String {
        "lumentree".to_string()
    }

    fn default_enabled() -> bool {
        true
    }

    fn default_scheduler_interval() -> u64 {
        60
    }

    fn default_loglevel() -> String {
        "info".to_string()
    }

    fn default_retention() -> usize {
        10_000
    }
}
