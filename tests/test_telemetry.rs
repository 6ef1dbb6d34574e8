mod common;
use common::*;

use chrono::Utc;

use lumentree_bridge::lumentree::registers::RegisterMap;
use lumentree_bridge::lumentree::telemetry::{BatteryCellSnapshot, DeviceSnapshot};

fn decode_device(registers: &[u16]) -> DeviceSnapshot {
    DeviceSnapshot::from_table(
        &Factory::table(registers),
        &RegisterMap::lumentree(),
        DEVICE_ID,
        Utc::now(),
    )
}

#[test]
fn full_device_frame_decodes_every_section() {
    let frame = Factory::frame(&Factory::device_registers());
    let snap = DeviceSnapshot::decode(&frame, &RegisterMap::lumentree(), DEVICE_ID, Utc::now());

    assert_eq!(snap.device_id, DEVICE_ID);
    assert_eq!(snap.device_model_ascii.as_deref(), Some("LUMENTREE1"));
    assert_eq!(
        snap.device_model_hex.as_deref(),
        Some("4c554d454e5452454531")
    );
    assert_eq!(snap.firmware_version.as_deref(), Some("0105"));
    assert_eq!(snap.controller_version.as_deref(), Some("0203"));

    assert_eq!(snap.temperature_celsius, Some(21.5));
    assert_eq!(snap.temperature_fahrenheit, Some(70.7));

    assert_eq!(snap.battery_voltage, Some(52.5));
    assert_eq!(snap.battery_charge_percentage, Some(85));
    assert_eq!(snap.battery_power, Some(500));
    assert_eq!(snap.battery_status.as_deref(), Some("Charging"));
    assert_eq!(snap.battery_current, Some(2.5));
    assert_eq!(snap.battery_type.as_deref(), Some("Present"));

    assert_eq!(snap.ac_output_voltage, Some(230.2));
    assert_eq!(snap.ac_output_power, Some(1500));
    assert_eq!(snap.ac_output_frequency, Some(50.01));
    assert_eq!(snap.ac_output_apparent_power, Some(1600));

    assert_eq!(snap.ac_input_voltage, Some(231.5));
    assert_eq!(snap.ac_input_power, Some(200));
    assert_eq!(snap.ac_input_frequency, Some(49.99));
    assert_eq!(snap.grid_power, Some(-120));
    assert_eq!(snap.grid_status.as_deref(), Some("Exporting"));

    assert_eq!(snap.home_load, Some(350));
    assert_eq!(snap.ups_mode, Some(true));
    assert_eq!(snap.master_slave_status, Some(1));

    assert_eq!(snap.pv1_voltage, Some(320));
    assert_eq!(snap.pv1_power, Some(800));
    assert_eq!(snap.pv2_voltage, Some(310));
    assert_eq!(snap.pv2_power, Some(600));
    assert_eq!(snap.total_pv_power, Some(1400));

    // registers 100/150/167/168 are past a 95-register response
    assert_eq!(snap.battery_mode, None);
    assert_eq!(snap.work_mode, None);
    assert_eq!(snap.beep_mode, None);
    assert_eq!(snap.backlight_mode, None);
}

#[test]
fn short_frame_still_carries_identity_but_no_model() {
    // fewer than 8 registers: model is absent, firmware (offset 2) present
    let snap = decode_device(&[0, 0, 0x0105, 0x4c55, 0x4d45]);

    assert_eq!(snap.device_id, DEVICE_ID);
    assert_eq!(snap.device_model_hex, None);
    assert_eq!(snap.device_model_ascii, None);
    assert_eq!(snap.firmware_version.as_deref(), Some("0105"));
    assert_eq!(snap.controller_version, None);
    assert_eq!(snap.temperature_celsius, None);
    assert_eq!(snap.home_load, None);
    assert_eq!(snap.total_pv_power, None);
}

#[test]
fn empty_frame_decodes_to_identity_only() {
    let snap = decode_device(&[]);
    assert_eq!(snap.device_id, DEVICE_ID);
    assert_eq!(snap.firmware_version, None);
}

#[test]
fn grid_direction_follows_sign() {
    let mut registers = Factory::device_registers();

    registers[59] = 120;
    let snap = decode_device(&registers);
    assert_eq!(snap.grid_power, Some(120));
    assert_eq!(snap.grid_status.as_deref(), Some("Importing"));

    // zero is treated as exporting, matching the strict > 0 rule
    registers[59] = 0;
    let snap = decode_device(&registers);
    assert_eq!(snap.grid_power, Some(0));
    assert_eq!(snap.grid_status.as_deref(), Some("Exporting"));
}

#[test]
fn battery_direction_reports_magnitude() {
    let mut registers = Factory::device_registers();

    registers[61] = 450;
    let snap = decode_device(&registers);
    assert_eq!(snap.battery_power, Some(450));
    assert_eq!(snap.battery_status.as_deref(), Some("Discharging"));

    registers[61] = 65086; // signed -450
    let snap = decode_device(&registers);
    assert_eq!(snap.battery_power, Some(450));
    assert_eq!(snap.battery_status.as_deref(), Some("Charging"));
}

#[test]
fn total_pv_power_ignores_idle_second_string() {
    let mut registers = Factory::device_registers();

    registers[72] = 0; // PV2 voltage register reads zero
    let snap = decode_device(&registers);
    assert_eq!(snap.pv2_voltage, None);
    assert_eq!(snap.pv2_power, None);
    assert_eq!(snap.total_pv_power, Some(800));

    registers[72] = 310;
    let snap = decode_device(&registers);
    assert_eq!(snap.total_pv_power, Some(800 + 600));
}

#[test]
fn mode_labels_fall_back_on_out_of_range_indexes() {
    let mut registers = vec![0u16; 169];
    registers[100] = 1;
    registers[150] = 2;
    registers[167] = 9;
    registers[168] = 1;

    let snap = decode_device(&registers);
    assert_eq!(snap.battery_mode.as_deref(), Some("Special Battery Pack"));
    assert_eq!(snap.work_mode.as_deref(), Some("Sell Mode"));
    assert_eq!(snap.beep_mode.as_deref(), Some("Unknown (9)"));
    assert_eq!(snap.backlight_mode.as_deref(), Some("Always On"));

    registers[150] = 42;
    let snap = decode_device(&registers);
    assert_eq!(snap.work_mode.as_deref(), Some("Unknown mode (42)"));
}

#[test]
fn no_battery_type_when_register_reads_two() {
    let mut registers = Factory::device_registers();
    registers[37] = 2;
    let snap = decode_device(&registers);
    assert_eq!(snap.battery_type.as_deref(), Some("No Battery"));
}

#[test]
fn snapshot_serializes_camel_case_and_skips_absent_fields() {
    let snap = decode_device(&[0, 0, 0x0105]);
    let json = serde_json::to_value(&snap).expect("serializable");

    assert_eq!(json["deviceId"], DEVICE_ID);
    assert_eq!(json["firmwareVersion"], "0105");
    assert!(json.get("homeLoad").is_none());
    assert!(json.get("deviceModelHex").is_none());
}

#[test]
fn battery_cells_filter_band_is_exclusive() {
    let cases = [
        (10u16, false),
        (11, true),
        (3305, true),
        (49999, true),
        (50000, false),
        (0, false),
        (65535, false),
    ];

    for (raw, included) in cases {
        let snap = BatteryCellSnapshot::from_table(&Factory::table(&[raw]), DEVICE_ID, Utc::now());
        assert_eq!(snap.is_some(), included, "raw {}", raw);
    }
}

#[test]
fn battery_cells_keep_register_positions() {
    // registers 0 and 2 are noise; cells land at 1-based positions 2 and 4
    let snap = BatteryCellSnapshot::from_table(
        &Factory::table(&[0, 3305, 0, 3315]),
        DEVICE_ID,
        Utc::now(),
    )
    .expect("two plausible cells");

    assert_eq!(snap.number_of_cells, 2);
    assert_eq!(snap.cell_voltages.get(&2), Some(&3.305));
    assert_eq!(snap.cell_voltages.get(&4), Some(&3.315));
    assert_eq!(snap.cell_voltages.get(&1), None);

    assert_eq!(snap.minimum_voltage, 3.305);
    assert_eq!(snap.maximum_voltage, 3.315);
    assert_eq!(snap.average_voltage, 3.31);
    assert_eq!(snap.voltage_difference, 0.01);
}

#[test]
fn battery_statistics_are_consistent() {
    let frame = Factory::frame(&Factory::battery_registers());
    let snap = BatteryCellSnapshot::decode(&frame, DEVICE_ID, Utc::now()).expect("cells");

    assert_eq!(snap.number_of_cells, 16);
    assert_eq!(snap.cell_voltages.len(), snap.number_of_cells);

    let sum: f64 = snap.cell_voltages.values().sum();
    let reconstructed = snap.average_voltage * snap.number_of_cells as f64;
    assert!(
        (reconstructed - sum).abs() < 0.02,
        "avg*count {} vs sum {}",
        reconstructed,
        sum
    );

    assert!(snap.minimum_voltage <= snap.average_voltage);
    assert!(snap.average_voltage <= snap.maximum_voltage);
    assert_eq!(
        snap.voltage_difference,
        ((snap.maximum_voltage - snap.minimum_voltage) * 1000.0).round() / 1000.0
    );
}

#[test]
fn all_noise_registers_yield_no_snapshot() {
    let snap = BatteryCellSnapshot::from_table(
        &Factory::table(&[0, 0, 5, 65535, 50000, 10]),
        DEVICE_ID,
        Utc::now(),
    );
    assert!(snap.is_none());
}
