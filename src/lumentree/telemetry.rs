use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregates::{FieldFn, Timestamped};
use crate::lumentree::packet::{Frame, RegisterTable};
use crate::lumentree::registers::{
    RegisterMap, BACKLIGHT_MODES, BATTERY_MODES, BEEP_MODES, WORK_MODES,
};
use crate::utils::Utils;

/// One decoded device telemetry frame. Every field is optional: a register
/// the response did not reach is reported as absent, never as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSnapshot {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_model_hex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_model_ascii: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firmware_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ups_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_slave_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_celsius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_fahrenheit: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_voltage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_charge_percentage: Option<u16>,
    /// Magnitude of battery power; direction is `battery_status`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_power: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_current: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_mode: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ac_output_voltage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ac_output_power: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ac_output_frequency: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ac_output_apparent_power: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ac_input_voltage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ac_input_power: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ac_input_frequency: Option<f64>,
    /// Signed; positive is import from the grid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_power: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_load: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pv1_voltage: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pv1_power: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pv2_voltage: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pv2_power: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pv_power: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub beep_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backlight_mode: Option<String>,
}

impl DeviceSnapshot {
    /// Decode a validated device telemetry frame against a register map.
    /// Short tables degrade to absent fields; nothing here errors.
    pub fn decode(
        frame: &Frame,
        map: &RegisterMap,
        device_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::from_table(&frame.registers(), map, device_id, timestamp)
    }

    /// Decode an already-split register table.
    pub fn from_table(
        table: &RegisterTable,
        map: &RegisterMap,
        device_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let mut snap = Self {
            device_id: device_id.to_owned(),
            timestamp,
            ..Self::default()
        };

        if table.len() >= map.model_start + map.model_len {
            let model_hex: String = (map.model_start..map.model_start + map.model_len)
                .filter_map(|i| table.raw(i))
                .collect();
            snap.device_model_ascii = Some(hex_to_ascii(&model_hex));
            snap.device_model_hex = Some(model_hex);
        }
        snap.firmware_version = table.raw(map.firmware_version).map(str::to_owned);
        snap.controller_version = table.raw(map.controller_version).map(str::to_owned);
        snap.ups_mode = table.value(map.ups_mode).map(|v| v == 0);
        snap.work_mode = table
            .value(map.work_mode)
            .map(|v| mode_label(WORK_MODES, v));
        snap.master_slave_status = table.value(map.master_slave_status);

        if let Some(raw) = table.value(map.temperature) {
            let celsius = (f64::from(raw) - 1000.0) / 10.0;
            snap.temperature_celsius = Some(Utils::round(celsius, 1));
            snap.temperature_fahrenheit = Some(Utils::round(celsius * 1.8 + 32.0, 1));
        }

        snap.battery_voltage = table
            .value(map.battery_voltage)
            .map(|v| Utils::round(f64::from(v) / 100.0, 2));
        snap.battery_charge_percentage = table.value(map.battery_charge_percentage);
        if let Some(power) = table.signed(map.battery_power) {
            snap.battery_power = Some(power.abs());
            snap.battery_status = Some(
                if power < 0 { "Charging" } else { "Discharging" }.to_owned(),
            );
        }
        snap.battery_current = table
            .signed(map.battery_current)
            .map(|v| Utils::round((f64::from(v) / 100.0).abs(), 2));
        snap.battery_type = table.value(map.battery_type).map(|v| {
            if v == 2 { "No Battery" } else { "Present" }.to_owned()
        });
        snap.battery_mode = table
            .value(map.battery_mode)
            .map(|v| mode_label(BATTERY_MODES, v));

        snap.ac_output_voltage = table
            .value(map.ac_output_voltage)
            .map(|v| Utils::round(f64::from(v) / 10.0, 1));
        snap.ac_output_power = table.value(map.ac_output_power);
        snap.ac_output_frequency = table
            .value(map.ac_output_frequency)
            .map(|v| Utils::round(f64::from(v) / 100.0, 2));
        snap.ac_output_apparent_power = table.value(map.ac_output_apparent_power);

        snap.ac_input_voltage = table
            .value(map.ac_input_voltage)
            .map(|v| Utils::round(f64::from(v) / 10.0, 1));
        snap.ac_input_power = table.value(map.ac_input_power);
        snap.ac_input_frequency = table
            .value(map.ac_input_frequency)
            .map(|v| Utils::round(f64::from(v) / 100.0, 2));
        if let Some(power) = table.signed(map.grid_power) {
            snap.grid_power = Some(power);
            snap.grid_status = Some(
                if power > 0 { "Importing" } else { "Exporting" }.to_owned(),
            );
        }

        snap.home_load = table.value(map.home_load);

        snap.pv1_voltage = table.value(map.pv1_voltage);
        snap.pv1_power = table.value(map.pv1_power);
        if let (Some(pv2_voltage), Some(pv2_power)) =
            (table.value(map.pv2_voltage), table.value(map.pv2_power))
        {
            if pv2_voltage > 0 {
                snap.pv2_voltage = Some(pv2_voltage);
                snap.pv2_power = Some(pv2_power);
                snap.total_pv_power = snap
                    .pv1_power
                    .map(|pv1| u32::from(pv1) + u32::from(pv2_power));
            } else {
                snap.total_pv_power = snap.pv1_power.map(u32::from);
            }
        }

        snap.beep_mode = table.value(map.beep_mode).map(|v| {
            BEEP_MODES
                .get(usize::from(v))
                .map(|s| (*s).to_owned())
                .unwrap_or_else(|| format!("Unknown ({})", v))
        });
        snap.backlight_mode = table.value(map.backlight_mode).map(|v| {
            BACKLIGHT_MODES
                .get(usize::from(v))
                .map(|s| (*s).to_owned())
                .unwrap_or_else(|| format!("Unknown ({})", v))
        });

        snap
    }

    /// The fields that feed daily min/max/avg statistics, keyed by their
    /// JSON names.
    pub const AGGREGATE_FIELDS: &'static [(&'static str, FieldFn<DeviceSnapshot>)] = &[
        ("temperatureCelsius", device_temperature_c),
        ("acOutputVoltage", device_ac_output_voltage),
        ("acInputVoltage", device_ac_input_voltage),
        ("homeLoad", device_home_load),
        ("totalPvPower", device_total_pv_power),
        ("gridPower", device_grid_power),
    ];

    pub fn home_load_w(&self) -> Option<f64> {
        self.home_load.map(f64::from)
    }
}

impl Timestamped for DeviceSnapshot {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

fn device_temperature_c(s: &DeviceSnapshot) -> Option<f64> {
    s.temperature_celsius
}

fn device_ac_output_voltage(s: &DeviceSnapshot) -> Option<f64> {
    s.ac_output_voltage
}

fn device_ac_input_voltage(s: &DeviceSnapshot) -> Option<f64> {
    s.ac_input_voltage
}

fn device_home_load(s: &DeviceSnapshot) -> Option<f64> {
    s.home_load_w()
}

fn device_total_pv_power(s: &DeviceSnapshot) -> Option<f64> {
    s.total_pv_power.map(f64::from)
}

fn device_grid_power(s: &DeviceSnapshot) -> Option<f64> {
    s.grid_power.map(f64::from)
}

/// Per-cell battery voltages plus derived statistics, all in volts rounded
/// to 3 decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryCellSnapshot {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub number_of_cells: usize,
    pub average_voltage: f64,
    pub minimum_voltage: f64,
    pub maximum_voltage: f64,
    /// Spread between the highest and lowest cell.
    pub voltage_difference: f64,
    /// Keyed by 1-based register position, so cell numbering survives gaps
    /// left by filtered-out registers.
    pub cell_voltages: BTreeMap<u16, f64>,
}

impl BatteryCellSnapshot {
    /// Raw register values in this band (exclusive) are plausible cell
    /// voltages in millivolts; anything else is noise or an absent-cell
    /// marker and is skipped rather than zero-filled.
    pub const RAW_MIN: u16 = 10;
    pub const RAW_MAX: u16 = 50000;

    /// Decode a validated battery-cell frame. None when no register passes
    /// the plausibility filter.
    pub fn decode(frame: &Frame, device_id: &str, timestamp: DateTime<Utc>) -> Option<Self> {
        Self::from_table(&frame.registers(), device_id, timestamp)
    }

    /// Decode an already-split register table.
    pub fn from_table(
        table: &RegisterTable,
        device_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Option<Self> {
        let mut cell_voltages = BTreeMap::new();
        let mut total = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for index in 0..table.len() {
            let raw = match table.value(index) {
                Some(v) if v > Self::RAW_MIN && v < Self::RAW_MAX => v,
                _ => continue,
            };

            let volts = f64::from(raw) / 1000.0;
            cell_voltages.insert(index as u16 + 1, Utils::round(volts, 3));
            total += volts;
            min = min.min(volts);
            max = max.max(volts);
        }

        if cell_voltages.is_empty() {
            return None;
        }

        let count = cell_voltages.len();
        Some(Self {
            device_id: device_id.to_owned(),
            timestamp,
            number_of_cells: count,
            average_voltage: Utils::round(total / count as f64, 3),
            minimum_voltage: Utils::round(min, 3),
            maximum_voltage: Utils::round(max, 3),
            voltage_difference: Utils::round(max - min, 3),
            cell_voltages,
        })
    }

    pub const AGGREGATE_FIELDS: &'static [(&'static str, FieldFn<BatteryCellSnapshot>)] = &[
        ("averageVoltage", battery_average_voltage),
        ("minimumVoltage", battery_minimum_voltage),
        ("maximumVoltage", battery_maximum_voltage),
        ("voltageDifference", battery_voltage_difference),
    ];
}

impl Timestamped for BatteryCellSnapshot {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

fn battery_average_voltage(s: &BatteryCellSnapshot) -> Option<f64> {
    Some(s.average_voltage)
}

fn battery_minimum_voltage(s: &BatteryCellSnapshot) -> Option<f64> {
    Some(s.minimum_voltage)
}

fn battery_maximum_voltage(s: &BatteryCellSnapshot) -> Option<f64> {
    Some(s.maximum_voltage)
}

fn battery_voltage_difference(s: &BatteryCellSnapshot) -> Option<f64> {
    Some(s.voltage_difference)
}

fn mode_label(labels: &[&str], value: u16) -> String {
    labels
        .get(usize::from(value))
        .map(|s| (*s).to_owned())
        .unwrap_or_else(|| format!("Unknown mode ({})", value))
}

/// Hex-encoded ASCII with NUL bytes shown as spaces, trimmed. Malformed hex
/// yields a diagnostic string rather than an error.
fn hex_to_ascii(hex_str: &str) -> String {
    match hex::decode(hex_str) {
        Ok(bytes) => bytes
            .iter()
            .map(|b| match b & 0x7f {
                0 => ' ',
                c => c as char,
            })
            .collect::<String>()
            .trim()
            .to_owned(),
        Err(_) => format!("(Invalid hex: {})", hex_str),
    }
}
