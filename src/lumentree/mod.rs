// Lumentree inverter protocol: Modbus-style read commands over MQTT,
// hex-encoded register responses.
pub mod packet;
pub mod registers;
pub mod telemetry;
