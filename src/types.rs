//! Core record types shared by the fetcher, formatter and writer

use serde::Deserialize;
use std::collections::HashMap;

/// A raw attribute value as decoded from the feature service
///
/// The service only ever emits nulls, numbers, strings and booleans as attribute values.
/// Anything else (arrays, nested objects) is kept as its JSON text so that an unexpected
/// attribute never fails a whole page.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(from = "serde_json::Value")]
pub enum FieldValue {
    /// JSON `null`
    Null,
    /// Any JSON number; integers arrive here too
    Number(f64),
    /// A string, or the JSON text of a value outside the closed set
    Text(String),
    /// A boolean
    Bool(bool),
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Bool(b),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map_or_else(|| FieldValue::Text(n.to_string()), FieldValue::Number),
            serde_json::Value::String(s) => FieldValue::Text(s),
            other @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
                FieldValue::Text(other.to_string())
            }
        }
    }
}

/// One feature's attributes, keyed by field name
pub type Record = HashMap<String, FieldValue>;

/// One fetched page of records
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    /// Records in the order the service returned them
    pub records: Vec<Record>,
    /// The service reported more rows beyond this page
    pub exceeded_transfer_limit: bool,
}

impl Page {
    /// A page holding `records` with no transfer-limit flag
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            exceeded_transfer_limit: false,
        }
    }

    /// Number of records on the page
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the page holds no records (end of data)
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_each_value_shape() {
        let record: Record = serde_json::from_str(
            r#"{
                "Street_Name": "BARDSTOWN",
                "Zip": 40205,
                "Sale_Price": 1250.5,
                "Dir": null,
                "Flag": true,
                "Extra": [1, 2]
            }"#,
        )
        .unwrap();

        assert_eq!(record["Street_Name"], FieldValue::Text("BARDSTOWN".into()));
        assert_eq!(record["Zip"], FieldValue::Number(40205.0));
        assert_eq!(record["Sale_Price"], FieldValue::Number(1250.5));
        assert_eq!(record["Dir"], FieldValue::Null);
        assert_eq!(record["Flag"], FieldValue::Bool(true));
        assert_eq!(record["Extra"], FieldValue::Text("[1,2]".into()));
    }

    #[test]
    fn large_epoch_millis_survive_as_numbers() {
        let value: FieldValue = serde_json::from_str("1700000000000").unwrap();
        assert_eq!(value, FieldValue::Number(1_700_000_000_000.0));
    }
}
