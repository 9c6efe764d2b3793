//! Pretty JSON dumps of API objects at each step of the reply workflow.

use serde::Serialize;
use tracing::{info, warn};

/// Indented JSON rendering, or `None` if the value cannot be serialized.
pub fn pretty_json<T: Serialize + ?Sized>(value: &T) -> Option<String> {
    serde_json::to_string_pretty(value).ok()
}

/// Log a label followed by the pretty-printed value.
pub fn log_json<T: Serialize + ?Sized>(label: &str, value: &T) {
    match pretty_json(value) {
        Some(json) => info!("{}\n{}", label, json),
        None => warn!("{} <unserializable value>", label),
    }
}
