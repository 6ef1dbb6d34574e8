use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use lumentree_bridge::lumentree::packet::{Frame, RegisterTable};

pub const DEVICE_ID: &str = "H250326002";

pub struct Factory();
impl Factory {
    /// A response frame as lowercase hex: header, declared byte length, the
    /// register cells, and a trailing checksum (never validated on the
    /// inbound path, so a placeholder is fine).
    pub fn response_hex(registers: &[u16]) -> String {
        let mut hex = String::from("0103");
        hex.push_str(&format!("{:02x}", registers.len() * 2));
        for register in registers {
            hex.push_str(&format!("{:04x}", register));
        }
        hex.push_str("abcd");
        hex
    }

    pub fn frame(registers: &[u16]) -> Frame {
        Frame::from_hex(&Self::response_hex(registers)).expect("factory frame should extract")
    }

    pub fn table(registers: &[u16]) -> RegisterTable {
        let cells: String = registers.iter().map(|r| format!("{:04x}", r)).collect();
        RegisterTable::from_hex(&cells)
    }

    /// A realistic 95-register device-info response body.
    pub fn device_registers() -> Vec<u16> {
        let mut registers = vec![0u16; 95];

        // "LUMENTREE1" across the five model registers
        registers[3] = 0x4c55;
        registers[4] = 0x4d45;
        registers[5] = 0x4e54;
        registers[6] = 0x5245;
        registers[7] = 0x4531;

        registers[2] = 0x0105; // firmware version
        registers[8] = 0x0203; // controller version
        registers[11] = 5250; // battery 52.50 V
        registers[12] = 65286; // battery current, signed -250 -> 2.5 A
        registers[13] = 2302; // AC out 230.2 V
        registers[15] = 2315; // AC in 231.5 V
        registers[16] = 5001; // AC out 50.01 Hz
        registers[17] = 4999; // AC in 49.99 Hz
        registers[18] = 1500; // AC out power
        registers[20] = 320; // PV1 voltage
        registers[22] = 800; // PV1 power
        registers[24] = 1215; // temperature 21.5 C
        registers[37] = 0; // battery present
        registers[50] = 85; // charge percentage
        registers[53] = 200; // AC in power
        registers[58] = 1600; // apparent power
        registers[59] = 65416; // grid, signed -120 -> exporting
        registers[61] = 65036; // battery power, signed -500 -> charging
        registers[67] = 350; // home load
        registers[68] = 0; // UPS mode on
        registers[70] = 1; // master/slave status
        registers[72] = 310; // PV2 voltage
        registers[74] = 600; // PV2 power

        registers
    }

    /// A 50-register battery-cell response body: 16 plausible cells plus
    /// noise registers outside the accepted band.
    pub fn battery_registers() -> Vec<u16> {
        let mut registers = vec![0u16; 50];
        for (i, register) in registers.iter_mut().enumerate().take(16) {
            *register = 3300 + i as u16;
        }
        registers[20] = 5; // below the band, skipped
        registers[21] = 65535; // above the band, skipped
        registers
    }

    pub fn at(date: NaiveDate, h: u32, m: u32) -> DateTime<Utc> {
        Utc.from_utc_datetime(&date.and_hms_opt(h, m, 0).expect("valid time"))
    }

    pub fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid date")
    }
}
