use serde::de::DeserializeOwned;
use serde::Serialize;

/// Reversible text encoding for message payloads.
///
/// The queue never looks inside a payload: publishers encode through the codec
/// and subscribers decode through the same one.
pub trait PayloadCodec: Send + Sync + 'static {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, String>;

    fn decode<T: DeserializeOwned>(&self, payload: &str) -> Result<T, String>;
}

/// JSON payloads via serde_json.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl PayloadCodec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, String> {
        serde_json::to_string(value).map_err(|e| e.to_string())
    }

    fn decode<T: DeserializeOwned>(&self, payload: &str) -> Result<T, String> {
        serde_json::from_str(payload).map_err(|e| e.to_string())
    }
}
