use crate::SensorRecord;
use std::collections::HashMap;

/// Decode one raw line from the stream into a record, or `None`.
///
/// Policy is best-effort, drop-malformed: telemetry arrives fast enough
/// that an occasional lost frame is immaterial, so nothing here ever
/// surfaces an error. A line is only attempted as a record if, after
/// trimming terminators and whitespace, it starts with `{` and ends with
/// `}` — a cheap structural filter before the full JSON parse.
pub fn decode_line(line: &str, timestamp: f64) -> Option<SensorRecord> {
    let trimmed = line.trim();
    if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
        return None;
    }

    let value: serde_json::Value = serde_json::from_str(trimmed).ok()?;
    let obj = value.as_object()?;

    let mut fields = HashMap::with_capacity(obj.len());
    for (key, val) in obj {
        // Numeric fields only; anything else in the payload is ignored
        if let Some(num) = val.as_f64() {
            fields.insert(key.clone(), num);
        }
    }

    Some(SensorRecord::new(timestamp, fields))
}

/// Raw-bytes variant. A frame that is not valid UTF-8 is malformed and
/// dropped outright rather than decoded lossily.
pub fn decode_bytes(bytes: &[u8], timestamp: f64) -> Option<SensorRecord> {
    let line = std::str::from_utf8(bytes).ok()?;
    decode_line(line, timestamp)
}
