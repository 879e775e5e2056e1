use crate::clock::Timestamp;

/// Running total of recorded values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SumData {
    pub value: f64,
    pub timestamp: Timestamp,
}

impl SumData {
    pub fn new(timestamp: Timestamp) -> SumData {
        SumData { value: 0.0, timestamp }
    }

    pub fn add_measurement(&mut self, value: f64, timestamp: Timestamp) {
        self.value += value;
        self.timestamp = timestamp;
    }
}

/// Number of recorded values, regardless of magnitude.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CountData {
    pub value: u64,
    pub timestamp: Timestamp,
}

impl CountData {
    pub fn new(timestamp: Timestamp) -> CountData {
        CountData { value: 0, timestamp }
    }

    pub fn add_measurement(&mut self, timestamp: Timestamp) {
        self.value += 1;
        self.timestamp = timestamp;
    }
}
