//! Tabular projection of returned records

use super::Record;
use serde_json::Value as JsonValue;

/// Field carrying OData v2 per-record metadata
const METADATA_FIELD: &str = "__metadata";

/// Query result flattened into columns and display rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Column headers
    pub columns: Vec<String>,
    /// Rows of data (each row is a vec of string values)
    pub rows: Vec<Vec<String>>,
    /// Pretty printed records for the raw JSON view
    pub raw_json: Option<String>,
}

impl QueryResult {
    /// Build the table from records
    pub fn from_records(records: &[Record]) -> Self {
        let mut result = QueryResult::default();

        if records.is_empty() {
            return result;
        }

        // Union of keys in first-seen order so a sparse first record does not hide columns
        for key in records.iter().flat_map(|obj| obj.keys()) {
            if key != METADATA_FIELD && !result.columns.contains(key) {
                result.columns.push(key.clone());
            }
        }

        for obj in records {
            let row: Vec<String> = result
                .columns
                .iter()
                .map(|col| {
                    obj.get(col)
                        .map(format_json_value)
                        .unwrap_or_else(|| "-".to_string())
                })
                .collect();
            result.rows.push(row);
        }

        result.raw_json = serde_json::to_string_pretty(records).ok();
        result
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Format a JSON value for display
fn format_json_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "-".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(arr) => format!("[{} items]", arr.len()),
        // Navigation properties come back as {"__deferred": {...}}
        JsonValue::Object(obj) if obj.contains_key("__deferred") => "(deferred)".to_string(),
        JsonValue::Object(_) => "{...}".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn records(value: JsonValue) -> Vec<Record> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    #[test]
    fn test_columns_follow_server_order_without_metadata() {
        let recs = records(json!([
            {"__metadata": {"uri": "x"}, "Product": "A", "ProductType": "FERT"},
            {"__metadata": {"uri": "y"}, "Product": "B", "Weight": 2}
        ]));
        let table = QueryResult::from_records(&recs);

        assert_eq!(table.columns, vec!["Product", "ProductType", "Weight"]);
        assert_eq!(
            table.rows,
            vec![
                vec!["A".to_string(), "FERT".to_string(), "-".to_string()],
                vec!["B".to_string(), "-".to_string(), "2".to_string()],
            ]
        );
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_nested_values_are_summarised() {
        let recs = records(json!([
            {"to_Plant": {"__deferred": {"uri": "z"}}, "Tags": [1, 2, 3], "Flag": true, "Obj": {"a": 1}}
        ]));
        let table = QueryResult::from_records(&recs);

        assert_eq!(table.columns, vec!["to_Plant", "Tags", "Flag", "Obj"]);
        assert_eq!(table.rows[0], vec!["(deferred)", "[3 items]", "true", "{...}"]);
    }

    #[test]
    fn test_key_product_column_stays_first() {
        let recs = records(json!([
            {"Product": "TG11", "ProductType": "FERT", "CrossPlantStatus": "", "BaseUnit": "PC"},
            {"Product": "TG12", "Weight": 2, "BaseUnit": "KG"}
        ]));
        let table = QueryResult::from_records(&recs);

        assert_eq!(
            table.columns,
            vec!["Product", "ProductType", "CrossPlantStatus", "BaseUnit", "Weight"]
        );
        let raw = table.raw_json.unwrap();
        assert!(raw.find("ProductType").unwrap() < raw.find("BaseUnit").unwrap());
    }

    #[test]
    fn test_raw_json_keeps_metadata() {
        let recs = records(json!([{"__metadata": {"type": "T"}, "Product": "A"}]));
        let table = QueryResult::from_records(&recs);
        assert!(table.raw_json.unwrap().contains("__metadata"));
    }

    #[test]
    fn test_no_records() {
        let table = QueryResult::from_records(&[]);
        assert!(table.is_empty());
        assert!(table.columns.is_empty());
        assert_eq!(table.raw_json, None);
    }
}
