use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use crate::aggregates::{self, Aggregate};
use crate::lumentree::packet::ReadCommand;
use crate::lumentree::telemetry::{BatteryCellSnapshot, DeviceSnapshot};

/// Shared snapshot state: the latest decode of each kind plus bounded
/// history. The decode path is the only writer; API readers get clones.
///
/// History is append-only from the decoder's point of view; the retention
/// cap just drops the oldest entries so a long-running process does not grow
/// without bound.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Mutex<Inner>>,
    retention: usize,
}

#[derive(Default)]
struct Inner {
    latest_device: Option<DeviceSnapshot>,
    latest_battery: Option<BatteryCellSnapshot>,
    device_history: VecDeque<DeviceSnapshot>,
    battery_history: VecDeque<BatteryCellSnapshot>,
}

impl Store {
    pub fn new(retention: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            retention,
        }
    }

    /// Install a freshly decoded device snapshot as latest and append it to
    /// history, in arrival order.
    pub fn record_device(&self, snapshot: DeviceSnapshot) {
        let mut inner = self.inner.lock().unwrap();
        inner.device_history.push_back(snapshot.clone());
        while inner.device_history.len() > self.retention {
            inner.device_history.pop_front();
        }
        inner.latest_device = Some(snapshot);
    }

    pub fn record_battery(&self, snapshot: BatteryCellSnapshot) {
        let mut inner = self.inner.lock().unwrap();
        inner.battery_history.push_back(snapshot.clone());
        while inner.battery_history.len() > self.retention {
            inner.battery_history.pop_front();
        }
        inner.latest_battery = Some(snapshot);
    }

    pub fn latest_device(&self) -> Option<DeviceSnapshot> {
        self.inner.lock().unwrap().latest_device.clone()
    }

    pub fn latest_battery(&self) -> Option<BatteryCellSnapshot> {
        self.inner.lock().unwrap().latest_battery.clone()
    }

    /// Device snapshots captured within the UTC day, in arrival order.
    pub fn device_history(&self, date: NaiveDate) -> Vec<DeviceSnapshot> {
        let inner = self.inner.lock().unwrap();
        inner
            .device_history
            .iter()
            .filter(|s| aggregates::in_day(*s, date))
            .cloned()
            .collect()
    }

    pub fn battery_history(&self, date: NaiveDate) -> Vec<BatteryCellSnapshot> {
        let inner = self.inner.lock().unwrap();
        inner
            .battery_history
            .iter()
            .filter(|s| aggregates::in_day(*s, date))
            .cloned()
            .collect()
    }

    /// Daily min/max/avg of the standard device telemetry fields.
    pub fn device_aggregates(&self, date: NaiveDate) -> BTreeMap<&'static str, Aggregate> {
        let inner = self.inner.lock().unwrap();
        aggregates::daily_aggregates(
            inner.device_history.iter(),
            DeviceSnapshot::AGGREGATE_FIELDS,
            date,
        )
    }

    pub fn battery_aggregates(&self, date: NaiveDate) -> BTreeMap<&'static str, Aggregate> {
        let inner = self.inner.lock().unwrap();
        aggregates::daily_aggregates(
            inner.battery_history.iter(),
            BatteryCellSnapshot::AGGREGATE_FIELDS,
            date,
        )
    }

    /// Home-load energy for the day in watt-hours, trapezoidal.
    pub fn daily_energy(&self, date: NaiveDate) -> f64 {
        let inner = self.inner.lock().unwrap();
        aggregates::daily_energy(
            inner.device_history.iter(),
            DeviceSnapshot::home_load_w as aggregates::FieldFn<DeviceSnapshot>,
            date,
        )
    }

    /// The two read commands a full refresh publishes: the device telemetry
    /// block and the battery cell block.
    pub fn refresh_commands(&self) -> [[u8; 8]; 2] {
        [
            ReadCommand::device_info().to_bytes(),
            ReadCommand::battery_cells().to_bytes(),
        ]
    }
}
