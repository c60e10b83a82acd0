//! Line protocol encoding shared by both backends.
//!
//! ```text
//! currency,id=1001,world=Twintania gil=500i,ventures=3i 1717228800
//! ```
//!
//! InfluxDB and QuestDB speak the same line format but disagree on booleans
//! and timestamp precision, which [`LineEncoder`] captures.

use std::fmt::Write as _;

use thiserror::Error;

use statwatch_types::Measurement;

/// A point that cannot be written as a line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("measurement '{0}' has no fields")]
    NoFields(String),

    #[error("measurement name is empty")]
    EmptyName,

    #[error("timestamp of '{0}' cannot be represented in nanoseconds")]
    TimestampOutOfRange(String),
}

/// Timestamp unit written at the end of each line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Seconds,
    Nanoseconds,
}

/// How boolean fields are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolEncoding {
    /// `1i` / `0i`
    Integer,
    /// `t` / `f`
    Literal,
}

/// Encoder for one backend dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEncoder {
    pub precision: Precision,
    pub bools: BoolEncoding,
    /// Drop tags whose value is empty instead of failing the write.
    pub skip_empty_tags: bool,
}

impl LineEncoder {
    /// InfluxDB v2 with `precision=s`.
    pub const INFLUXDB: LineEncoder = LineEncoder {
        precision: Precision::Seconds,
        bools: BoolEncoding::Integer,
        skip_empty_tags: true,
    };

    /// QuestDB ILP.
    pub const QUESTDB: LineEncoder = LineEncoder {
        precision: Precision::Nanoseconds,
        bools: BoolEncoding::Literal,
        skip_empty_tags: true,
    };

    /// Append one line for `point`, written to `table`.
    pub fn encode(
        &self,
        table: &str,
        point: &Measurement,
        out: &mut String,
    ) -> Result<(), EncodeError> {
        if table.is_empty() {
            return Err(EncodeError::EmptyName);
        }
        if point.field_count() == 0 {
            return Err(EncodeError::NoFields(point.name().to_string()));
        }

        let timestamp = match self.precision {
            Precision::Seconds => point.time().timestamp(),
            Precision::Nanoseconds => point
                .time()
                .timestamp_nanos_opt()
                .ok_or_else(|| EncodeError::TimestampOutOfRange(point.name().to_string()))?,
        };

        let mut line = escape_measurement(table);
        for (key, value) in point.tags() {
            if value.is_empty() && self.skip_empty_tags {
                continue;
            }
            let _ = write!(line, ",{}={}", escape_key(key), escape_key(value));
        }

        let mut fields: Vec<(&str, String)> = point
            .bool_fields()
            .map(|(k, v)| (k, self.encode_bool(v)))
            .chain(point.int_fields().map(|(k, v)| (k, format!("{}i", v))))
            // Unsigned values never exceed i64::MAX, so they are written as
            // signed integers.
            .chain(point.uint_fields().map(|(k, v)| (k, format!("{}i", v))))
            .collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));

        for (i, (key, value)) in fields.iter().enumerate() {
            let separator = if i == 0 { ' ' } else { ',' };
            let _ = write!(line, "{}{}={}", separator, escape_key(key), value);
        }

        let _ = writeln!(line, " {}", timestamp);
        out.push_str(&line);
        Ok(())
    }

    /// Encode a batch into one body.
    pub fn encode_all<'a>(
        &self,
        points: impl IntoIterator<Item = &'a Measurement>,
    ) -> Result<String, EncodeError> {
        let mut body = String::new();
        for point in points {
            self.encode(point.name(), point, &mut body)?;
        }
        Ok(body)
    }

    fn encode_bool(&self, value: bool) -> String {
        match (self.bools, value) {
            (BoolEncoding::Integer, true) => "1i".to_string(),
            (BoolEncoding::Integer, false) => "0i".to_string(),
            (BoolEncoding::Literal, true) => "t".to_string(),
            (BoolEncoding::Literal, false) => "f".to_string(),
        }
    }
}

/// Escape a measurement or table name. Line breaks cannot be escaped and
/// become spaces.
fn escape_measurement(s: &str) -> String {
    s.replace('\n', " ")
        .replace(',', "\\,")
        .replace(' ', "\\ ")
}

/// Escape a tag key, tag value or field key. Backslashes are sent as is.
fn escape_key(s: &str) -> String {
    s.replace('\n', " ")
        .replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn point() -> Measurement {
        Measurement::new("currency")
            .tag("world", "Twintania")
            .tag("id", "1001")
            .field("ventures", 3_i32)
            .field("gil", 500_i64)
            .field("enabled", true)
            .field("slots", 7_u16)
            .timestamp(Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap())
    }

    #[test]
    fn test_influx_line() {
        let mut out = String::new();
        LineEncoder::INFLUXDB.encode("currency", &point(), &mut out).unwrap();
        assert_eq!(
            out,
            "currency,id=1001,world=Twintania enabled=1i,gil=500i,slots=7i,ventures=3i 1717228800\n"
        );
    }

    #[test]
    fn test_quest_line() {
        let mut out = String::new();
        LineEncoder::QUESTDB
            .encode("stats_currency", &point(), &mut out)
            .unwrap();
        assert_eq!(
            out,
            "stats_currency,id=1001,world=Twintania enabled=t,gil=500i,slots=7i,ventures=3i 1717228800000000000\n"
        );
    }

    #[test]
    fn test_escaping() {
        let p = Measurement::new("items")
            .tag("item_name", "Fire Shard, HQ")
            .tag("filter_name", "a=b")
            .field("quantity", 1_i64)
            .timestamp(Utc.timestamp_opt(1, 0).unwrap());

        let mut out = String::new();
        LineEncoder::INFLUXDB.encode("my table", &p, &mut out).unwrap();
        assert_eq!(
            out,
            "my\\ table,filter_name=a\\=b,item_name=Fire\\ Shard\\,\\ HQ quantity=1i 1\n"
        );
    }

    #[test]
    fn test_backslashes_and_line_breaks_in_tags() {
        let p = Measurement::new("items")
            .tag("build", r"S\U")
            .tag("retainer_name", "Two\nLines")
            .field("quantity", 1_i64)
            .timestamp(Utc.timestamp_opt(1, 0).unwrap());

        let body = LineEncoder::INFLUXDB.encode_all([&p]).unwrap();
        assert_eq!(body, "items,build=S\\U,retainer_name=Two\\ Lines quantity=1i 1\n");
        assert_eq!(body.lines().count(), 1);
    }

    #[test]
    fn test_empty_tags_are_skipped() {
        let p = Measurement::new("x")
            .tag("msq_name", "")
            .field("v", false)
            .timestamp(Utc.timestamp_opt(5, 0).unwrap());
        let body = LineEncoder::INFLUXDB.encode_all([&p]).unwrap();
        assert_eq!(body, "x v=0i 5\n");
    }

    #[test]
    fn test_point_without_fields_is_rejected() {
        let p = Measurement::new("empty").tag("id", "1");
        let mut out = String::new();
        assert_eq!(
            LineEncoder::QUESTDB.encode("empty", &p, &mut out),
            Err(EncodeError::NoFields("empty".into()))
        );
        assert!(out.is_empty());
    }
}
