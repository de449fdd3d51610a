//! Wire timestamp format used by Webstore records and the CLI's
//! `retrieve -t TIMESTAMP` flag: `YYYY/MM/DD HH:MM` (`spec.md` §6).

use crate::errors::{CothorityError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};

const WIRE_FORMAT: &str = "%Y/%m/%d %H:%M";

/// Parse a wire-format timestamp into UTC.
pub fn parse_wire_timestamp(input: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(input.trim(), WIRE_FORMAT)
        .map_err(|e| CothorityError::invalid(format!("bad timestamp '{input}': {e}")))?;
    Ok(DateTime::from_naive_utc_and_offset(naive, Utc))
}

/// Render a UTC timestamp in wire format.
pub fn format_wire_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(WIRE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn round_trips_through_wire_format() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 5, 14, 30, 0).unwrap();
        let encoded = format_wire_timestamp(ts);
        assert_eq!(encoded, "2026/03/05 14:30");
        let decoded = parse_wire_timestamp(&encoded).unwrap();
        assert_eq!(decoded, ts);
    }

    #[test]
    fn rejects_malformed_timestamp() {
        assert!(parse_wire_timestamp("not a date").is_err());
    }
}
