use crate::flatten::error::RecordError;
use crate::flatten::timing::{parse_timestamp, rounded_seconds_between};
use crate::flatten::types::{InputRecord, OutputRecord, StateTransition};
use chrono::{DateTime, FixedOffset};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// Characters that may not appear in an output property key
static RESERVED_KEY_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[:.]").unwrap());

const RUNNING: &str = "RUNNING";

/// Replace every `:` and `.` in a property key with `_`
pub fn sanitize_key(key: &str) -> String {
    RESERVED_KEY_CHARS.replace_all(key, "_").into_owned()
}

/// Turns one decoded batch record into its flattened output form
#[derive(Debug, Default)]
pub struct BatchTransformer;

impl BatchTransformer {
    pub fn new() -> Self {
        BatchTransformer
    }

    /// Flatten a record.
    ///
    /// Returns `Ok(None)` when a required field is empty; such records are
    /// dropped without a diagnostic.
    pub fn transform(&self, record: InputRecord) -> Result<Option<OutputRecord>, RecordError> {
        if !Self::is_complete(&record) {
            return Ok(None);
        }

        let properties = Self::sanitize_properties(record.runtime_config.properties);

        let create_time = parse_field("createTime", &record.create_time)?;
        let state_time = parse_field("stateTime", &record.state_time)?;

        let elapsed = rounded_seconds_between(&create_time, &state_time);
        let run = Self::first_running_since(&record.state_history)
            .map(|started| rounded_seconds_between(&started, &state_time))
            .unwrap_or(0);

        let usage = record.runtime_info.approximate_usage;

        Ok(Some(OutputRecord {
            batch_type: record.batch_type,
            create_time: record.create_time,
            creator: record.creator,
            location: record.labels.location,
            properties,
            state: record.state,
            accelerator_type: usage.accelerator_type,
            milli_dcu_seconds: usage.milli_dcu_seconds,
            shuffle_storage_gb_seconds: usage.shuffle_storage_gb_seconds,
            elapsed_time: elapsed.to_string(),
            run_time: run.to_string(),
        }))
    }

    fn is_complete(record: &InputRecord) -> bool {
        [
            &record.batch_type,
            &record.create_time,
            &record.creator,
            &record.labels.location,
            &record.state,
        ]
        .iter()
        .all(|field| !field.is_empty())
    }

    /// Input keys are visited in lexicographic order, so when two keys
    /// sanitize to the same name the lexicographically greater one wins.
    fn sanitize_properties(properties: BTreeMap<String, String>) -> BTreeMap<String, String> {
        properties
            .into_iter()
            .map(|(key, value)| (sanitize_key(&key), value))
            .collect()
    }

    /// Start time of the first RUNNING transition whose timestamp parses
    fn first_running_since(history: &[StateTransition]) -> Option<DateTime<FixedOffset>> {
        history
            .iter()
            .filter(|transition| transition.state == RUNNING)
            .find_map(|transition| match parse_field("stateStartTime", &transition.state_start_time) {
                Ok(started) => Some(started),
                Err(e) => {
                    warn!("ignoring RUNNING transition: {}", e);
                    None
                }
            })
    }
}

fn parse_field(field: &'static str, value: &str) -> Result<DateTime<FixedOffset>, RecordError> {
    parse_timestamp(value).map_err(|source| RecordError::Timestamp {
        field,
        value: value.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn record(value: Value) -> InputRecord {
        serde_json::from_value(value).unwrap()
    }

    fn base() -> Value {
        json!({
            "batchType": "PYSPARK",
            "createTime": "2024-01-01T00:00:00Z",
            "creator": "etl@example.com",
            "labels": {"goog-dataproc-location": "us-central1"},
            "state": "SUCCEEDED",
            "stateTime": "2024-01-01T00:05:00Z",
            "stateHistory": [
                {"state": "PENDING", "stateStartTime": "2024-01-01T00:00:00Z"},
                {"state": "RUNNING", "stateStartTime": "2024-01-01T00:01:00Z"}
            ]
        })
    }

    fn transform(value: Value) -> Result<Option<OutputRecord>, RecordError> {
        BatchTransformer::new().transform(record(value))
    }

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("spark:executor.memory"), "spark_executor_memory");
        assert_eq!(sanitize_key("a.b:c"), "a_b_c");
        assert_eq!(sanitize_key("plain"), "plain");
        assert_eq!(sanitize_key("::.."), "____");
    }

    #[test]
    fn test_flattens_record() {
        let mut input = base();
        input["runtimeConfig"] = json!({"properties": {
            "spark:executor.memory": "4g",
            "a.b:c": "x"
        }});
        input["runtimeInfo"] = json!({"approximateUsage": {
            "acceleratorType": "nvidia-l4",
            "milliDcuSeconds": "1000",
            "shuffleStorageGbSeconds": "20"
        }});

        let output = transform(input).unwrap().unwrap();

        assert_eq!(output.batch_type, "PYSPARK");
        assert_eq!(output.location, "us-central1");
        assert_eq!(output.properties.get("spark_executor_memory").unwrap(), "4g");
        assert_eq!(output.properties.get("a_b_c").unwrap(), "x");
        assert_eq!(output.properties.len(), 2);
        assert_eq!(output.accelerator_type, "nvidia-l4");
        assert_eq!(output.milli_dcu_seconds, "1000");
        assert_eq!(output.shuffle_storage_gb_seconds, "20");
        assert_eq!(output.elapsed_time, "300");
        assert_eq!(output.run_time, "240");
    }

    #[test]
    fn test_elapsed_time() {
        let mut input = base();
        input["stateTime"] = json!("2024-01-01T00:05:30Z");

        let output = transform(input).unwrap().unwrap();
        assert_eq!(output.elapsed_time, "330");
    }

    #[test]
    fn test_negative_elapsed_time_is_not_clamped() {
        let mut input = base();
        input["createTime"] = json!("2024-01-01T00:05:30Z");

        let output = transform(input).unwrap().unwrap();
        assert_eq!(output.elapsed_time, "-30");
    }

    #[test]
    fn test_sub_second_negative_elapsed_time_is_zero() {
        let mut input = base();
        input["createTime"] = json!("2024-01-01T00:05:00.4Z");

        // Rounds to zero without a sign
        let output = transform(input).unwrap().unwrap();
        assert_eq!(output.elapsed_time, "0");
    }

    #[test]
    fn test_run_time_without_running_state() {
        let mut input = base();
        input["stateHistory"] = json!([]);
        assert_eq!(transform(input).unwrap().unwrap().run_time, "0");

        let mut input = base();
        input["stateHistory"] = json!([{"state": "PENDING", "stateStartTime": "2024-01-01T00:00:00Z"}]);
        assert_eq!(transform(input).unwrap().unwrap().run_time, "0");
    }

    #[test]
    fn test_run_time_uses_first_running_entry() {
        let mut input = base();
        input["stateHistory"] = json!([
            {"state": "RUNNING", "stateStartTime": "2024-01-01T00:02:00Z"},
            {"state": "RUNNING", "stateStartTime": "2024-01-01T00:04:00Z"}
        ]);

        assert_eq!(transform(input).unwrap().unwrap().run_time, "180");
    }

    #[test]
    fn test_unparseable_running_entry_keeps_scanning() {
        let mut input = base();
        input["stateHistory"] = json!([
            {"state": "RUNNING", "stateStartTime": "not a time"},
            {"state": "RUNNING", "stateStartTime": "2024-01-01T00:03:00Z"}
        ]);
        assert_eq!(transform(input).unwrap().unwrap().run_time, "120");

        let mut input = base();
        input["stateHistory"] = json!([{"state": "RUNNING", "stateStartTime": ""}]);
        assert_eq!(transform(input).unwrap().unwrap().run_time, "0");
    }

    #[test]
    fn test_missing_required_fields_are_skipped() {
        for field in ["batchType", "createTime", "creator", "state"] {
            let mut input = base();
            input.as_object_mut().unwrap().remove(field);
            assert!(transform(input).unwrap().is_none(), "missing {field}");

            let mut input = base();
            input[field] = json!("");
            assert!(transform(input).unwrap().is_none(), "empty {field}");
        }

        let mut input = base();
        input["labels"] = json!({"team": "data"});
        assert!(transform(input).unwrap().is_none());
    }

    #[test]
    fn test_invalid_timestamps_are_errors() {
        let mut input = base();
        input["createTime"] = json!("01/01/2024");
        let err = transform(input).unwrap_err();
        assert!(matches!(err, RecordError::Timestamp { field: "createTime", .. }));

        let mut input = base();
        input.as_object_mut().unwrap().remove("stateTime");
        let err = transform(input).unwrap_err();
        assert!(matches!(err, RecordError::Timestamp { field: "stateTime", .. }));
    }

    #[test]
    fn test_key_collisions_resolve_in_key_order() {
        let mut input = base();
        input["runtimeConfig"] = json!({"properties": {
            "a.b": "dot",
            "a:b": "colon",
            "a_b": "underscore"
        }});

        let output = transform(input).unwrap().unwrap();
        assert_eq!(output.properties.len(), 1);
        // "a.b" < "a:b" < "a_b"
        assert_eq!(output.properties.get("a_b").unwrap(), "underscore");
    }
}
