use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Treat an explicit JSON `null` the same as an absent field
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Like [`nullable`], and also reads `null` entries of the list as empty values
fn nullable_entries<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let entries: Vec<Option<T>> = nullable(deserializer)?;
    Ok(entries.into_iter().map(Option::unwrap_or_default).collect())
}

/// One element of the batch listing array
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputRecord {
    #[serde(default, deserialize_with = "nullable")]
    pub batch_type: String,

    #[serde(default, deserialize_with = "nullable")]
    pub create_time: String,

    #[serde(default, deserialize_with = "nullable")]
    pub creator: String,

    #[serde(default, deserialize_with = "nullable")]
    pub labels: Labels,

    #[serde(default, deserialize_with = "nullable")]
    pub runtime_config: RuntimeConfig,

    #[serde(default, deserialize_with = "nullable")]
    pub state: String,

    #[serde(default, deserialize_with = "nullable")]
    pub state_time: String,

    #[serde(default, deserialize_with = "nullable_entries")]
    pub state_history: Vec<StateTransition>,

    #[serde(default, deserialize_with = "nullable")]
    pub runtime_info: RuntimeInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Labels {
    /// Region the batch ran in
    #[serde(rename = "goog-dataproc-location", default, deserialize_with = "nullable")]
    pub location: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeConfig {
    /// Job properties keyed by their original (unsanitized) names.
    /// Ordered so that sanitized-key collisions resolve the same way every run.
    #[serde(default, deserialize_with = "nullable")]
    pub properties: BTreeMap<String, String>,
}

/// A single lifecycle transition from `stateHistory`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateTransition {
    #[serde(default, deserialize_with = "nullable")]
    pub state: String,

    #[serde(default, deserialize_with = "nullable")]
    pub state_start_time: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeInfo {
    #[serde(default, deserialize_with = "nullable")]
    pub approximate_usage: ApproximateUsage,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproximateUsage {
    #[serde(default, deserialize_with = "nullable")]
    pub accelerator_type: String,

    #[serde(default, deserialize_with = "nullable")]
    pub milli_dcu_seconds: String,

    #[serde(default, deserialize_with = "nullable")]
    pub shuffle_storage_gb_seconds: String,
}

/// The flattened record written as one output line.
///
/// Field order here is the key order of every emitted object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRecord {
    pub batch_type: String,
    pub create_time: String,
    pub creator: String,
    #[serde(rename = "goog-dataproc-location")]
    pub location: String,
    pub properties: BTreeMap<String, String>,
    pub state: String,
    pub accelerator_type: String,
    pub milli_dcu_seconds: String,
    pub shuffle_storage_gb_seconds: String,
    #[serde(rename = "elapsed_time")]
    pub elapsed_time: String,
    #[serde(rename = "run_time")]
    pub run_time: String,
}

/// Paths for a single conversion run
#[derive(Debug, Clone)]
pub struct Config {
    /// JSON array of batch records to read
    pub input: PathBuf,

    /// Newline-delimited JSON file to create
    pub output: PathBuf,
}

impl Config {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Config {
            input: input.into(),
            output: output.into(),
        }
    }
}

/// Counters collected over one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Elements decoded from the input array
    pub read: u64,

    /// Lines written to the output
    pub written: u64,

    /// Records dropped for a missing required field
    pub skipped_incomplete: u64,

    /// Records dropped after a reported error
    pub skipped_invalid: u64,
}
