//! Register offsets for the device telemetry block, reverse-engineered from
//! the vendor's register map. Kept as an explicit table passed into the
//! decoder so that another device model only needs another constructor here,
//! not a second copy of the decode logic.

pub const WORK_MODES: &[&str] = &[
    "Uninterruptible Power Mode (UPS)",
    "Save Money Mode",
    "Sell Mode",
    "Smart Meter Mode",
    "WIFI CT Mode",
    "MESH CT Mode",
];

pub const BATTERY_MODES: &[&str] = &["User Defined", "Special Battery Pack", "No Battery"];

pub const BEEP_MODES: &[&str] = &["Off", "Auto Off", "Always On"];

pub const BACKLIGHT_MODES: &[&str] = &["Auto Off", "Always On"];

/// Offsets into the register table, in registers (2-byte cells). A field is
/// decoded only when the table actually reaches its offset.
#[derive(Debug, Clone)]
pub struct RegisterMap {
    /// First of `model_len` consecutive registers holding the model name as
    /// hex-encoded ASCII.
    pub model_start: usize,
    pub model_len: usize,
    pub firmware_version: usize,
    pub controller_version: usize,
    pub ups_mode: usize,
    pub work_mode: usize,
    pub master_slave_status: usize,
    /// Raw value is offset by +1000 and scaled by 10 (so 1215 = 21.5 C).
    pub temperature: usize,

    pub battery_voltage: usize,
    pub battery_charge_percentage: usize,
    pub battery_power: usize,
    pub battery_current: usize,
    pub battery_type: usize,
    pub battery_mode: usize,

    pub ac_output_voltage: usize,
    pub ac_output_power: usize,
    pub ac_output_frequency: usize,
    pub ac_output_apparent_power: usize,

    pub ac_input_voltage: usize,
    pub ac_input_power: usize,
    pub ac_input_frequency: usize,
    pub grid_power: usize,

    pub home_load: usize,

    pub pv1_voltage: usize,
    pub pv1_power: usize,
    pub pv2_voltage: usize,
    pub pv2_power: usize,

    pub beep_mode: usize,
    pub backlight_mode: usize,
}

impl RegisterMap {
    /// The Lumentree / SUNT single-phase hybrid map.
    pub fn lumentree() -> Self {
        Self {
            model_start: 3,
            model_len: 5,
            firmware_version: 2,
            controller_version: 8,
            ups_mode: 68,
            work_mode: 150,
            master_slave_status: 70,
            temperature: 24,

            battery_voltage: 11,
            battery_charge_percentage: 50,
            battery_power: 61,
            battery_current: 12,
            battery_type: 37,
            battery_mode: 100,

            ac_output_voltage: 13,
            ac_output_power: 18,
            ac_output_frequency: 16,
            ac_output_apparent_power: 58,

            ac_input_voltage: 15,
            ac_input_power: 53,
            ac_input_frequency: 17,
            grid_power: 59,

            home_load: 67,

            pv1_voltage: 20,
            pv1_power: 22,
            pv2_voltage: 72,
            pv2_power: 74,

            beep_mode: 167,
            backlight_mode: 168,
        }
    }
}

impl Default for RegisterMap {
    fn default() -> Self {
        Self::lumentree()
    }
}
