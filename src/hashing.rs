//! Series identity.
//!
//! Every series of a view or meter is stored under a string key derived from its label values.
//! The historical key sorts the values before joining them with commas, so two series whose
//! values form the same multiset share a key even if the values sit under different label keys.
//! `HashStrategy::Positional` keeps the values in column order and does not have that collision.
use crate::data::LabelValue;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashStrategy {
    /// Sort values, then join with `,`.  Compatible with existing exported series.
    SortedValues,
    /// Join values in column order.  Unset values are kept distinct from empty strings.
    Positional,
}

impl Default for HashStrategy {
    fn default() -> HashStrategy {
        HashStrategy::SortedValues
    }
}

impl HashStrategy {
    pub fn key(self, values: &[LabelValue]) -> String {
        match self {
            HashStrategy::SortedValues => hash_label_values(values),
            HashStrategy::Positional => positional_key(values),
        }
    }
}

/// Sorted-value key: unset values render as the empty string.
pub fn hash_label_values(values: &[LabelValue]) -> String {
    let mut rendered: Vec<&str> = values.iter().map(|v| v.value.as_deref().unwrap_or("")).collect();
    rendered.sort_unstable();
    rendered.join(",")
}

fn positional_key(values: &[LabelValue]) -> String {
    let mut key = String::new();
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            key.push(',');
        }
        match &v.value {
            // Length-prefixed so commas inside a value cannot forge a boundary.
            Some(s) => {
                key.push_str(&s.len().to_string());
                key.push(':');
                key.push_str(s);
            },
            None => key.push('-'),
        }
    }
    key
}
