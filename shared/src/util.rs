//! Small shared utilities

use rand::RngCore;

/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate an opaque hex token of `len` characters (2 per random byte)
///
/// Used for the public order identifier handed to unauthenticated buyers.
pub fn generate_token(len: usize) -> String {
    let mut bytes = vec![0u8; len.div_ceil(2)];
    rand::thread_rng().fill_bytes(&mut bytes);
    let mut token = hex::encode(bytes);
    token.truncate(len);
    token
}

/// Serde helper: binary payloads travel as base64 strings in JSON
pub mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom)
    }
}
