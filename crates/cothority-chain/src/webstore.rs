//! The final sealed artifact (`spec.md` §3 "Webstore").

use chrono::{DateTime, Utc};
use cothority_core::time::format_wire_timestamp;
use serde::{Deserialize, Serialize};

/// One archived resource: the main page or one of its sub-resources.
/// Immutable once constructed; created by the root after Reconstruction &
/// collective signing succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Webstore {
    pub url: String,
    pub content_type: String,
    /// Collective Schnorr signature over the base64-decoded payload.
    pub signature: Vec<u8>,
    pub payload_base64: String,
    /// URLs of sub-resources bundled alongside this record.
    pub adds_url: Vec<String>,
    /// Wire-format timestamp (`YYYY/MM/DD HH:MM`, `spec.md` §6).
    pub timestamp: String,
}

impl Webstore {
    pub fn new(
        url: impl Into<String>,
        content_type: impl Into<String>,
        payload: &[u8],
        signature: Vec<u8>,
        adds_url: Vec<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        use base64::Engine;
        Self {
            url: url.into(),
            content_type: content_type.into(),
            signature,
            payload_base64: base64::engine::general_purpose::STANDARD.encode(payload),
            adds_url,
            timestamp: format_wire_timestamp(timestamp),
        }
    }

    pub fn payload(&self) -> cothority_core::Result<Vec<u8>> {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD
            .decode(&self.payload_base64)
            .map_err(|e| cothority_core::CothorityError::serialization(format!("bad payload base64: {e}")))
    }

    pub fn timestamp_utc(&self) -> cothority_core::Result<DateTime<Utc>> {
        cothority_core::time::parse_wire_timestamp(&self.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn payload_round_trips_through_base64() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 5, 12, 0, 0).unwrap();
        let record = Webstore::new("http://example.test/", "text/html", b"hello", vec![1, 2, 3], vec![], ts);
        assert_eq!(record.payload().unwrap(), b"hello");
        assert_eq!(record.timestamp_utc().unwrap(), ts);
    }
}
