//! Measurement - one named, tagged, timestamped point ready for transmission.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// A typed field value.
///
/// Unsigned values are kept apart from signed ones so that backends can
/// decide how to encode them, but they must always fit into an `i64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    /// Boolean field.
    Bool(bool),
    /// Signed integer field.
    Int(i64),
    /// Unsigned integer field, at most `i64::MAX`.
    UInt(u64),
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

macro_rules! signed_field {
    ($($t:ty),*) => {
        $(impl From<$t> for FieldValue {
            fn from(value: $t) -> Self {
                FieldValue::Int(i64::from(value))
            }
        })*
    };
}

macro_rules! unsigned_field {
    ($($t:ty),*) => {
        $(impl From<$t> for FieldValue {
            fn from(value: $t) -> Self {
                FieldValue::UInt(u64::from(value))
            }
        })*
    };
}

signed_field!(i8, i16, i32, i64);
unsigned_field!(u8, u16, u32);

/// An unsigned field value that does not fit into a signed 64-bit integer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsigned field '{key}' has value {value}, which exceeds i64::MAX")]
pub struct FieldOutOfRange {
    /// Field key.
    pub key: String,
    /// Rejected value.
    pub value: u64,
}

/// An immutable point under construction.
///
/// Every mutator takes `&self` and returns a new `Measurement`; the maps it
/// did not touch are shared with the receiver. This makes it cheap to build a
/// tag template once and derive many finished points from it without tags
/// leaking between branches.
///
/// Tags and fields are kept in sorted maps, so iteration (and therefore any
/// encoding) is always ordered by key regardless of call order.
///
/// # Example
///
/// ```rust
/// use statwatch_types::Measurement;
///
/// let point = Measurement::new("items")
///     .tag("item_id", "5111")
///     .tag("filter_name", "crystals")
///     .optional_tag("fc_id", None::<String>)
///     .field("quantity", 9_999_i64);
///
/// let keys: Vec<_> = point.tags().map(|(k, _)| k).collect();
/// assert_eq!(keys, ["filter_name", "item_id"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measurement {
    name: Arc<str>,
    tags: Arc<BTreeMap<String, String>>,
    bool_fields: Arc<BTreeMap<String, bool>>,
    int_fields: Arc<BTreeMap<String, i64>>,
    uint_fields: Arc<BTreeMap<String, u64>>,
    time: DateTime<Utc>,
}

impl Measurement {
    /// Create an empty measurement stamped with the current time.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            tags: Arc::default(),
            bool_fields: Arc::default(),
            int_fields: Arc::default(),
            uint_fields: Arc::default(),
            time: Utc::now(),
        }
    }

    /// Measurement name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capture time.
    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// Set a tag, replacing any previous value for the key.
    #[must_use]
    pub fn tag(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        Arc::make_mut(&mut next.tags).insert(key.into(), value.into());
        next
    }

    /// Set a tag, or remove it entirely when `value` is `None`.
    ///
    /// Optional dimensions must be absent rather than empty, so a `None`
    /// never produces an empty-string tag.
    #[must_use]
    pub fn optional_tag(&self, key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.tag(key, value),
            None => self.without_tag(&key.into()),
        }
    }

    /// Remove a tag.
    #[must_use]
    pub fn without_tag(&self, key: &str) -> Self {
        let mut next = self.clone();
        if next.tags.contains_key(key) {
            Arc::make_mut(&mut next.tags).remove(key);
        }
        next
    }

    /// Set a field.
    ///
    /// Accepts `bool`, all signed integer widths and unsigned widths up to
    /// `u32`. Use [`Measurement::try_field`] for `u64`.
    ///
    /// # Panics
    ///
    /// Panics if given a [`FieldValue::UInt`] above `i64::MAX`, which is a
    /// programming error.
    #[must_use]
    pub fn field(&self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        let key = key.into();
        match value.into() {
            FieldValue::UInt(v) if v > i64::MAX as u64 => {
                panic!("{}", FieldOutOfRange { key, value: v })
            }
            value => self.with_field(key, value),
        }
    }

    /// Set an unsigned 64-bit field.
    ///
    /// Fails if the value does not fit into a signed 64-bit integer, since at
    /// least one backend cannot store true unsigned 64-bit values.
    pub fn try_field(&self, key: impl Into<String>, value: u64) -> Result<Self, FieldOutOfRange> {
        let key = key.into();
        if value > i64::MAX as u64 {
            return Err(FieldOutOfRange { key, value });
        }
        Ok(self.with_field(key, FieldValue::UInt(value)))
    }

    /// Override the capture time.
    #[must_use]
    pub fn timestamp(&self, time: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.time = time;
        next
    }

    /// Derive a measurement with another name from this one's tags, fields
    /// and time.
    #[must_use]
    pub fn named(&self, name: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.name = Arc::from(name.into());
        next
    }

    fn with_field(&self, key: String, value: FieldValue) -> Self {
        let mut next = self.clone();
        next.remove_field(&key);
        match value {
            FieldValue::Bool(v) => {
                Arc::make_mut(&mut next.bool_fields).insert(key, v);
            }
            FieldValue::Int(v) => {
                Arc::make_mut(&mut next.int_fields).insert(key, v);
            }
            FieldValue::UInt(v) => {
                Arc::make_mut(&mut next.uint_fields).insert(key, v);
            }
        }
        next
    }

    // A key lives in at most one typed map.
    fn remove_field(&mut self, key: &str) {
        if self.bool_fields.contains_key(key) {
            Arc::make_mut(&mut self.bool_fields).remove(key);
        }
        if self.int_fields.contains_key(key) {
            Arc::make_mut(&mut self.int_fields).remove(key);
        }
        if self.uint_fields.contains_key(key) {
            Arc::make_mut(&mut self.uint_fields).remove(key);
        }
    }

    /// Iterate over tags in key order.
    pub fn tags(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Get a tag value.
    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Iterate over boolean fields in key order.
    pub fn bool_fields(&self) -> impl Iterator<Item = (&str, bool)> {
        self.bool_fields.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Iterate over signed fields in key order.
    pub fn int_fields(&self) -> impl Iterator<Item = (&str, i64)> {
        self.int_fields.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Iterate over unsigned fields in key order.
    pub fn uint_fields(&self) -> impl Iterator<Item = (&str, u64)> {
        self.uint_fields.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Get a boolean field.
    pub fn bool_field(&self, key: &str) -> Option<bool> {
        self.bool_fields.get(key).copied()
    }

    /// Get a signed field.
    pub fn int_field(&self, key: &str) -> Option<i64> {
        self.int_fields.get(key).copied()
    }

    /// Get an unsigned field.
    pub fn uint_field(&self, key: &str) -> Option<u64> {
        self.uint_fields.get(key).copied()
    }

    /// Get any field as its typed value.
    pub fn field_value(&self, key: &str) -> Option<FieldValue> {
        self.bool_field(key)
            .map(FieldValue::Bool)
            .or_else(|| self.int_field(key).map(FieldValue::Int))
            .or_else(|| self.uint_field(key).map(FieldValue::UInt))
    }

    /// Total number of fields across all typed maps.
    pub fn field_count(&self) -> usize {
        self.bool_fields.len() + self.int_fields.len() + self.uint_fields.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn null_tag_removes_previous_value() {
        let m = Measurement::new("currency")
            .tag("fc_id", "42")
            .optional_tag("fc_id", None::<String>);

        assert_eq!(m.tag_value("fc_id"), None);
        assert_eq!(m.tags().count(), 0);
    }

    #[test]
    fn tags_iterate_sorted_regardless_of_call_order() {
        let m = Measurement::new("items")
            .tag("world", "a")
            .tag("id", "b")
            .tag("hq", "c")
            .tag("filter_name", "d");

        let keys: Vec<_> = m.tags().map(|(k, _)| k).collect();
        assert_eq!(keys, ["filter_name", "hq", "id", "world"]);
    }

    #[test]
    fn duplicate_tag_overwrites() {
        let m = Measurement::new("x").tag("k", "1").tag("k", "2");
        assert_eq!(m.tag_value("k"), Some("2"));
        assert_eq!(m.tags().count(), 1);
    }

    #[test]
    fn unsigned_boundary() {
        let m = Measurement::new("x");
        assert!(m.try_field("ok", i64::MAX as u64).is_ok());

        let err = m.try_field("bad", i64::MAX as u64 + 1).unwrap_err();
        assert_eq!(err.key, "bad");
        assert_eq!(err.value, 9_223_372_036_854_775_808);
        assert!(m.try_field("bad", u64::MAX).is_err());
    }

    #[test]
    #[should_panic(expected = "exceeds i64::MAX")]
    fn field_panics_on_oversized_unsigned_value() {
        let _ = Measurement::new("x").field("bad", FieldValue::UInt(u64::MAX));
    }

    #[test]
    fn mutators_are_idempotent() {
        let base = Measurement::new("x");
        let once = base.tag("k", "v").field("f", 1_i32);
        let twice = base
            .tag("k", "v")
            .tag("k", "v")
            .field("f", 1_i32)
            .field("f", 1_i32);

        assert_eq!(once, twice);
    }

    #[test]
    fn receiver_is_never_mutated() {
        let template = Measurement::new("stats").tag("id", "1");
        let a = template.tag("job", "WHM").field("level", 90_i16);
        let b = template.field("gil", 10_i64);

        assert_eq!(template.tags().count(), 1);
        assert_eq!(template.field_count(), 0);
        assert_eq!(a.tag_value("job"), Some("WHM"));
        assert_eq!(b.tag_value("job"), None);
        assert_eq!(b.int_field("level"), None);
    }

    #[test]
    fn unchanged_maps_are_shared() {
        let template = Measurement::new("stats").tag("id", "1");
        let point = template.field("gil", 10_i64);

        assert!(Arc::ptr_eq(&template.tags, &point.tags));
        assert!(!Arc::ptr_eq(&template.int_fields, &point.int_fields));
    }

    #[test]
    fn field_widths_map_to_typed_maps() {
        let m = Measurement::new("x")
            .field("flag", true)
            .field("byte", 7_u8)
            .field("short", -3_i16)
            .field("int", 100_000_i32)
            .field("uint", 90_000_u32);

        assert_eq!(m.bool_field("flag"), Some(true));
        assert_eq!(m.uint_field("byte"), Some(7));
        assert_eq!(m.int_field("short"), Some(-3));
        assert_eq!(m.int_field("int"), Some(100_000));
        assert_eq!(m.uint_field("uint"), Some(90_000));
        assert_eq!(m.field_count(), 5);
    }

    #[test]
    fn field_key_changes_type_on_rewrite() {
        let m = Measurement::new("x").field("v", 1_u32).field("v", -1_i64);

        assert_eq!(m.uint_field("v"), None);
        assert_eq!(m.field_value("v"), Some(FieldValue::Int(-1)));
        assert_eq!(m.field_count(), 1);
    }

    #[test]
    fn timestamp_overrides_capture_time() {
        let t = Utc.with_ymd_and_hms(2024, 7, 1, 12, 30, 0).unwrap();
        let m = Measurement::new("x").timestamp(t);
        assert_eq!(m.time(), t);
    }

    #[test]
    fn named_keeps_template_tags() {
        let template = Measurement::new("stats").tag("id", "1");
        let currency = template.named("currency").field("gil", 5_i64);

        assert_eq!(currency.name(), "currency");
        assert_eq!(currency.tag_value("id"), Some("1"));
        assert_eq!(template.name(), "stats");
        assert_eq!(template.field_count(), 0);
    }
}
