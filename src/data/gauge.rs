use crate::clock::Timestamp;

/// The most recently recorded value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LastValueData {
    pub value: f64,
    pub timestamp: Timestamp,
}

impl LastValueData {
    pub fn new(timestamp: Timestamp) -> LastValueData {
        LastValueData { value: 0.0, timestamp }
    }

    pub fn add_measurement(&mut self, value: f64, timestamp: Timestamp) {
        self.value = value;
        self.timestamp = timestamp;
    }
}
