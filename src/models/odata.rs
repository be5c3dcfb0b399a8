//! OData v2 response envelope

use crate::error::QueryError;
use serde_json::{Map, Value as JsonValue};

/// One returned record: field name to JSON value
pub type Record = Map<String, JsonValue>;

/// Outcome of a completed request
#[derive(Debug, Clone, PartialEq)]
pub enum ODataResult {
    /// Non-empty result set
    Rows(Vec<Record>),
    /// Non-200 response, status and body as received
    Failure { status: u16, body: String },
    /// 200 response without any records
    Empty,
}

impl ODataResult {
    /// Map a 200 body of the shape `{"d": {"results": [...]}}`
    ///
    /// Missing `d` or `results` means no records. The body itself must be JSON.
    pub fn from_success_body(body: &str) -> Result<Self, QueryError> {
        let json: JsonValue = serde_json::from_str(body)?;

        let results = match json.get("d").and_then(|d| d.get("results")) {
            Some(JsonValue::Array(arr)) => arr,
            _ => return Ok(Self::Empty),
        };

        if results.is_empty() {
            return Ok(Self::Empty);
        }

        let records = results
            .iter()
            .enumerate()
            .map(|(i, v)| match v {
                JsonValue::Object(obj) => Ok(obj.clone()),
                other => Err(QueryError::request(format!(
                    "record {} is not a JSON object: {}",
                    i, other
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::Rows(records))
    }

    /// Number of records (0 for anything but `Rows`)
    pub fn record_count(&self) -> usize {
        match self {
            Self::Rows(records) => records.len(),
            _ => 0,
        }
    }
}
