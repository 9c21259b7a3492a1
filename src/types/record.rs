//! Raw traffic record as delivered by the transport

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One observed or synthesized network event.
///
/// Records arrive as flat JSON maps from heterogeneous producers, so every
/// field is lenient: a missing or wrong-typed numeric deserializes to `0.0`,
/// a missing or wrong-typed categorical to `"unknown"`. Only `packet_id` stays
/// optional; a record without a usable identity is skipped by the processor.
/// Unknown fields (the NSL-KDD rows carry dozens) are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficRecord {
    /// Unique record identity within a run; string or number on the wire
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub packet_id: Option<String>,

    /// Transport protocol class (e.g. "tcp")
    #[serde(default = "unknown", deserialize_with = "lenient_string")]
    pub protocol_type: String,

    /// Network service on the destination (e.g. "http")
    #[serde(default = "unknown", deserialize_with = "lenient_string")]
    pub service: String,

    /// Connection status flag (e.g. "SF", "S0", "REJ")
    #[serde(default = "unknown", deserialize_with = "lenient_string")]
    pub flag: String,

    /// Bytes from source to destination
    #[serde(default, deserialize_with = "lenient_f64")]
    pub src_bytes: f64,

    /// Bytes from destination to source
    #[serde(default, deserialize_with = "lenient_f64")]
    pub dst_bytes: f64,

    /// Connection duration in seconds
    #[serde(default, deserialize_with = "lenient_f64")]
    pub duration: f64,

    /// Connections to the same host (overwritten by the live counter downstream)
    #[serde(default, deserialize_with = "lenient_f64")]
    pub count: f64,

    /// Connections to the same service
    #[serde(default, deserialize_with = "lenient_f64")]
    pub srv_count: f64,

    /// Event timestamp as emitted by the producer; epoch float or ISO string
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub timestamp: Option<String>,
}

fn unknown() -> String {
    "unknown".to_string()
}

fn lenient_f64<'de, D: Deserializer<'de>>(de: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(de)?;
    Ok(coerce_f64(&value))
}

fn lenient_string<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    let value = Value::deserialize(de)?;
    Ok(coerce_string(&value).unwrap_or_else(unknown))
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(de)?;
    Ok(coerce_string(&value))
}

fn coerce_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl TrafficRecord {
    /// Key for the windowed rate counter: protocol and service concatenated
    /// as an approximate traffic-class identity.
    pub fn window_key(&self) -> String {
        format!("count:{}_{}", self.protocol_type, self.service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default() {
        let record: TrafficRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(record.packet_id, None);
        assert_eq!(record.protocol_type, "unknown");
        assert_eq!(record.service, "unknown");
        assert_eq!(record.flag, "unknown");
        assert_eq!(record.src_bytes, 0.0);
        assert_eq!(record.dst_bytes, 0.0);
        assert_eq!(record.duration, 0.0);
        assert_eq!(record.srv_count, 0.0);
    }

    #[test]
    fn test_wrong_typed_fields_default() {
        let json = r#"{"packet_id": "p1", "src_bytes": "not a number", "service": [1, 2]}"#;
        let record: TrafficRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.packet_id.as_deref(), Some("p1"));
        assert_eq!(record.src_bytes, 0.0);
        assert_eq!(record.service, "unknown");
    }

    #[test]
    fn test_numeric_packet_id_coerced_to_string() {
        let json = r#"{"packet_id": 42, "src_bytes": 491}"#;
        let record: TrafficRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.packet_id.as_deref(), Some("42"));
        assert_eq!(record.src_bytes, 491.0);
    }

    #[test]
    fn test_numeric_strings_parse() {
        let json = r#"{"packet_id": "p1", "duration": "0.25", "dst_bytes": "1024"}"#;
        let record: TrafficRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.duration, 0.25);
        assert_eq!(record.dst_bytes, 1024.0);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let json = r#"{"packet_id": "p1", "label": "normal", "dst_host_count": 9}"#;
        let record: TrafficRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.packet_id.as_deref(), Some("p1"));
    }

    #[test]
    fn test_window_key() {
        let json = r#"{"packet_id": "p1", "protocol_type": "tcp", "service": "http"}"#;
        let record: TrafficRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.window_key(), "count:tcp_http");
    }
}
