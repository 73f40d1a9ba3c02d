//! Value model and the primitive type registry.
//!
//! Every field value held by an [`Instance`] is a [`Value`]. Raw input
//! (usually parsed JSON or YAML) is converted into the same enum, so casting
//! always goes `Value -> Value`. An absent field is represented by `None`
//! wherever an `Option<Value>` appears; [`Value::Null`] is an explicit null.
//!
//! [`PrimitiveType`] is the fixed registry of primitive types. Each type has
//! a membership test ([`PrimitiveType::is`]) and a total coercion
//! ([`PrimitiveType::cast`]) that never fails: invalid input turns into a
//! type-appropriate sentinel (`NaN`, an empty sequence, an empty mapping or
//! an invalid date).

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc, Weekday};
use indexmap::IndexMap;
use regex::Regex;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};

use crate::instance::Instance;

/// Primitive field types.
///
/// # Examples
///
/// ```
/// use object_schema_core::{PrimitiveType, Value};
///
/// assert_eq!(PrimitiveType::from_name("Number"), Some(PrimitiveType::Number));
/// assert_eq!(PrimitiveType::Number.cast(Value::from("2.50")), Value::Number(2.5));
/// assert_eq!(PrimitiveType::Boolean.cast(Value::from("0")), Value::Bool(true));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PrimitiveType {
    /// Accepts anything, never coerces (the default).
    #[default]
    Any,
    /// `true` / `false`, coerced by truthiness.
    Boolean,
    /// A sequence of untyped values.
    Array,
    /// Text.
    String,
    /// A double-precision number, `NaN` included.
    Number,
    /// A plain key-value mapping, always deep-copied.
    Object,
    /// A point in time, possibly invalid.
    Date,
}

impl PrimitiveType {
    /// Every primitive type, in registry order.
    pub const ALL: [PrimitiveType; 7] = [
        PrimitiveType::Any,
        PrimitiveType::Boolean,
        PrimitiveType::Array,
        PrimitiveType::String,
        PrimitiveType::Number,
        PrimitiveType::Object,
        PrimitiveType::Date,
    ];

    /// Returns the declaration name of this type (e.g. `"Number"`).
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveType::Any => "Any",
            PrimitiveType::Boolean => "Boolean",
            PrimitiveType::Array => "Array",
            PrimitiveType::String => "String",
            PrimitiveType::Number => "Number",
            PrimitiveType::Object => "Object",
            PrimitiveType::Date => "Date",
        }
    }

    /// Looks up a primitive type by its declaration name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.name() == name)
    }

    /// Returns `true` when `value` already belongs to this type and needs no
    /// coercion.
    ///
    /// `Object` never matches, so object-typed values always go through
    /// [`cast`](Self::cast) and get deep-copied.
    pub fn is(&self, value: &Value) -> bool {
        match self {
            PrimitiveType::Any => true,
            PrimitiveType::Boolean => matches!(value, Value::Bool(_)),
            PrimitiveType::Array => matches!(value, Value::Array(_)),
            PrimitiveType::String => matches!(value, Value::String(_)),
            PrimitiveType::Number => matches!(value, Value::Number(_)),
            PrimitiveType::Object => false,
            PrimitiveType::Date => matches!(value, Value::Date(_)),
        }
    }

    /// Coerces `value` into this type. Never fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use object_schema_core::{PrimitiveType, Value};
    ///
    /// let chars = PrimitiveType::Array.cast(Value::from("123"));
    /// assert_eq!(chars.as_array().map(Vec::len), Some(3));
    ///
    /// let empty = PrimitiveType::Array.cast(Value::from(0));
    /// assert_eq!(empty, Value::Array(vec![]));
    ///
    /// assert!(PrimitiveType::Number.cast(Value::from("abc")).as_f64().unwrap().is_nan());
    /// ```
    pub fn cast(&self, value: Value) -> Value {
        match self {
            PrimitiveType::Any => value,
            PrimitiveType::Boolean => Value::Bool(value.is_truthy()),
            PrimitiveType::Array => match value {
                Value::Array(items) => Value::Array(items),
                Value::String(text) => Value::Array(
                    text.chars().map(|c| Value::String(c.to_string())).collect(),
                ),
                _ => Value::Array(Vec::new()),
            },
            PrimitiveType::String => {
                if value.is_truthy() {
                    Value::String(value.to_display_string())
                } else {
                    Value::String(String::new())
                }
            }
            PrimitiveType::Number => Value::Number(value.to_number()),
            PrimitiveType::Object => match value {
                Value::Object(_) => Value::from(value.to_json()),
                _ => Value::Object(ObjectMap::new()),
            },
            PrimitiveType::Date => match value {
                Value::Date(date) => Value::Date(date),
                Value::Number(millis) => Value::Date(DateValue::from_millis(millis)),
                Value::String(text) => Value::Date(DateValue::parse_iso(&text)),
                _ => Value::Date(DateValue::invalid()),
            },
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A date-time value that may be invalid.
///
/// Invalid dates come out of failed parses. They are still dates:
/// [`is_valid`](Self::is_valid) reports `false` and
/// [`to_iso_string`](Self::to_iso_string) returns `None`.
///
/// # Examples
///
/// ```
/// use object_schema_core::DateValue;
///
/// let date = DateValue::parse_iso("2017-11-13T19:16:51+01:00");
/// assert_eq!(date.to_iso_string().as_deref(), Some("2017-11-13T18:16:51.000Z"));
///
/// let bad = DateValue::parse_iso("bar");
/// assert!(!bad.is_valid());
/// assert_eq!(bad.to_iso_string(), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DateValue(Option<DateTime<Utc>>);

const OFFSET_DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y%m%dT%H%M%S%.f%z",
];

const NAIVE_DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y%m%dT%H%M%S%.f",
    "%Y%m%dT%H%M",
];

const NAIVE_DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y%m%d"];

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

// `2017` and `2017-11`.
static YEAR_MONTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})(?:-(\d{2}))?$").expect("static regex must compile"));

// `2017-11-13T19`, hour only.
static DATE_HOUR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2})[T ](\d{2})$").expect("static regex must compile")
});

// `2017-W46`, `2017-W46-3` and their basic forms.
static WEEK_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-?W(\d{2})(?:-?([1-7]))?$").expect("static regex must compile")
});

impl DateValue {
    /// The invalid date.
    pub fn invalid() -> Self {
        Self(None)
    }

    /// Wraps a valid date-time.
    pub fn from_datetime(datetime: DateTime<Utc>) -> Self {
        Self(Some(datetime))
    }

    /// Interprets `millis` as milliseconds since the Unix epoch.
    pub fn from_millis(millis: f64) -> Self {
        if !millis.is_finite() {
            return Self::invalid();
        }
        Self(Utc.timestamp_millis_opt(millis.trunc() as i64).single())
    }

    /// Parses ISO-8601 text.
    ///
    /// Extended and basic forms are accepted, as are reduced precision
    /// (`2017`, `2017-11`, `2017-11-13T19`) and week dates (`2017-W46-3`).
    /// Offsets are honoured; text without an offset is read as UTC. Anything
    /// that does not parse yields the invalid date.
    pub fn parse_iso(text: &str) -> Self {
        let text = text.trim();

        if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
            return Self(Some(parsed.with_timezone(&Utc)));
        }
        for format in OFFSET_DATETIME_FORMATS {
            if let Ok(parsed) = DateTime::parse_from_str(text, format) {
                return Self(Some(parsed.with_timezone(&Utc)));
            }
        }

        let text = text.strip_suffix(['Z', 'z']).unwrap_or(text);
        for format in NAIVE_DATETIME_FORMATS {
            if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
                return Self(Some(parsed.and_utc()));
            }
        }
        for format in NAIVE_DATE_FORMATS {
            if let Ok(parsed) = NaiveDate::parse_from_str(text, format) {
                return Self(parsed.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()));
            }
        }

        Self(parse_reduced(text).map(|dt| dt.and_utc()))
    }

    /// Returns `true` unless this is the invalid date.
    pub fn is_valid(&self) -> bool {
        self.0.is_some()
    }

    /// Returns the underlying date-time, if valid.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        self.0
    }

    /// Milliseconds since the Unix epoch, `NaN` when invalid.
    pub fn timestamp_millis(&self) -> f64 {
        self.0.map_or(f64::NAN, |dt| dt.timestamp_millis() as f64)
    }

    /// Formats as UTC ISO-8601 with millisecond precision
    /// (`2017-12-18T15:22:07.293Z`), `None` when invalid.
    pub fn to_iso_string(&self) -> Option<String> {
        self.0
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

/// Forms chrono's format strings cannot express: missing fields default to
/// their first value.
fn parse_reduced(text: &str) -> Option<NaiveDateTime> {
    if let Some(caps) = YEAR_MONTH.captures(text) {
        let year = caps[1].parse().ok()?;
        let month = caps.get(2).map_or(Some(1), |m| m.as_str().parse().ok())?;
        return NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0);
    }
    if let Some(caps) = DATE_HOUR.captures(text) {
        let date = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()?;
        let hour = caps[2].parse().ok()?;
        return date.and_hms_opt(hour, 0, 0);
    }
    if let Some(caps) = WEEK_DATE.captures(text) {
        let year = caps[1].parse().ok()?;
        let week = caps[2].parse().ok()?;
        let day: usize = caps.get(3).map_or(Some(1), |m| m.as_str().parse().ok())?;
        let weekday = *WEEKDAYS.get(day.checked_sub(1)?)?;
        return NaiveDate::from_isoywd_opt(year, week, weekday)?.and_hms_opt(0, 0, 0);
    }
    None
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(dt) => write!(f, "{}", dt.format("%a %b %d %Y %H:%M:%S GMT+0000")),
            None => f.write_str("Invalid date"),
        }
    }
}

impl From<DateTime<Utc>> for DateValue {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self::from_datetime(datetime)
    }
}

/// Mapping payload of [`Value::Object`], in insertion order.
pub type ObjectMap = IndexMap<String, Value>;

/// A field value, raw or cast.
///
/// `Object` keys keep their insertion order. `Instance` holds a nested schema instance,
/// which is exclusively owned by its parent.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Explicit null.
    #[default]
    Null,
    Bool(bool),
    /// A number; may be `NaN` or infinite.
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(ObjectMap),
    Date(DateValue),
    Instance(Box<Instance>),
}

impl Value {
    /// Returns a short name for the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Date(_) => "date",
            Value::Instance(_) => "instance",
        }
    }

    /// Truthiness: `null`, `false`, `0`, `NaN` and `""` are falsy, every
    /// other value is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Date(_) | Value::Instance(_) => true,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectMap> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateValue> {
        match self {
            Value::Date(date) => Some(date),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn as_instance_mut(&mut self) -> Option<&mut Instance> {
        match self {
            Value::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    /// Reads a key from a mapping, or a stored field from an instance.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(key),
            Value::Instance(instance) => instance.get(key),
            _ => None,
        }
    }

    /// Converts to JSON.
    ///
    /// Non-finite numbers and invalid dates become `null`, valid dates become
    /// ISO-8601 text and instances are exported first.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
            Value::Date(date) => date
                .to_iso_string()
                .map_or(serde_json::Value::Null, serde_json::Value::String),
            Value::Instance(instance) => instance.to_json(),
        }
    }

    /// String conversion used when coercing to `String`.
    ///
    /// Sequences join their elements with `,` (nulls render empty), mappings
    /// and instances render as `[object Object]`.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::Null => String::new(),
                    other => other.to_display_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) | Value::Instance(_) => "[object Object]".to_string(),
            Value::Date(date) => date.to_string(),
        }
    }

    /// Numeric conversion used when coercing to `Number`.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => parse_number(s),
            Value::Array(_) => parse_number(&self.to_display_string()),
            Value::Object(_) | Value::Instance(_) => f64::NAN,
            Value::Date(date) => date.timestamp_millis(),
        }
    }
}

/// Formats a number the way it reads in plain data: integers without a
/// fraction, exponent form outside `[1e-6, 1e21)`.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    let abs = n.abs();
    if (1e-6..1e21).contains(&abs) {
        if n.fract() == 0.0 {
            format!("{n:.0}")
        } else {
            format!("{n}")
        }
    } else {
        let formatted = format!("{n:e}");
        match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{mantissa}e+{exponent}")
            }
            _ => formatted,
        }
    }
}

/// Parses numeric text; blank text is `0`, anything unparsable is `NaN`.
fn parse_number(text: &str) -> f64 {
    let text = text.trim();
    if text.is_empty() {
        return 0.0;
    }

    match text {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = text.strip_prefix(prefix) {
            if digits.is_empty() {
                return f64::NAN;
            }
            return digits.chars().try_fold(0.0_f64, |acc, c| {
                c.to_digit(radix).map(|d| acc * f64::from(radix) + f64::from(d))
            })
            .unwrap_or(f64::NAN);
        }
    }

    let well_formed = text.chars().any(|c| c.is_ascii_digit())
        && text
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !well_formed {
        return f64::NAN;
    }
    text.parse::<f64>().unwrap_or(f64::NAN)
}

fn number_to_json(n: f64) -> serde_json::Value {
    if !n.is_finite() {
        return serde_json::Value::Null;
    }
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => {
                if !n.is_finite() {
                    serializer.serialize_unit()
                } else if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
                    serializer.serialize_i64(*n as i64)
                } else {
                    serializer.serialize_f64(*n)
                }
            }
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Value::Date(date) => match date.to_iso_string() {
                Some(iso) => serializer.serialize_str(&iso),
                None => serializer.serialize_unit(),
            },
            Value::Instance(instance) => instance.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        Value::from(json.clone())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<ObjectMap> for Value {
    fn from(map: ObjectMap) -> Self {
        Value::Object(map)
    }
}

impl From<DateValue> for Value {
    fn from(date: DateValue) -> Self {
        Value::Date(date)
    }
}

impl From<Instance> for Value {
    fn from(instance: Instance) -> Self {
        Value::Instance(Box::new(instance))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn raw(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    fn samples() -> Vec<Value> {
        vec![
            Value::Null,
            Value::Bool(false),
            Value::Bool(true),
            Value::Number(0.0),
            Value::Number(f64::NAN),
            Value::Number(2.5),
            Value::from(""),
            Value::from("0"),
            Value::from("123"),
            Value::from("2017-11-13T19:16:51+01:00"),
            raw(json!([1, "2", ["3"]])),
            raw(json!({"foo": 1})),
            Value::Date(DateValue::invalid()),
        ]
    }

    #[test]
    fn test_cast_output_satisfies_membership() {
        for ty in PrimitiveType::ALL {
            if ty == PrimitiveType::Object {
                continue;
            }
            for value in samples() {
                let cast = ty.cast(value.clone());
                assert!(ty.is(&cast), "{ty} cast of {value:?} produced {cast:?}");
            }
        }
    }

    #[test]
    fn test_object_cast_always_yields_mapping() {
        for value in samples() {
            assert!(matches!(PrimitiveType::Object.cast(value), Value::Object(_)));
        }
    }

    #[test]
    fn test_boolean_cast() {
        assert_eq!(PrimitiveType::Boolean.cast(Value::from(0)), Value::Bool(false));
        assert_eq!(PrimitiveType::Boolean.cast(Value::from("0")), Value::Bool(true));
        assert_eq!(PrimitiveType::Boolean.cast(Value::from("")), Value::Bool(false));
        assert_eq!(PrimitiveType::Boolean.cast(Value::Number(f64::NAN)), Value::Bool(false));
        assert_eq!(PrimitiveType::Boolean.cast(raw(json!([]))), Value::Bool(true));
        assert_eq!(PrimitiveType::Boolean.cast(Value::Null), Value::Bool(false));
    }

    #[test]
    fn test_array_cast() {
        assert_eq!(PrimitiveType::Array.cast(Value::from(0)), Value::Array(vec![]));
        assert_eq!(PrimitiveType::Array.cast(Value::from(5)), Value::Array(vec![]));
        assert_eq!(
            PrimitiveType::Array.cast(Value::from("123")),
            raw(json!(["1", "2", "3"]))
        );
        assert_eq!(PrimitiveType::Array.cast(raw(json!({"a": 1}))), Value::Array(vec![]));
    }

    #[test]
    fn test_string_cast() {
        assert_eq!(
            PrimitiveType::String.cast(raw(json!({"foo": 1}))),
            Value::from("[object Object]")
        );
        assert_eq!(PrimitiveType::String.cast(Value::from(2)), Value::from("2"));
        assert_eq!(PrimitiveType::String.cast(Value::from(2.5)), Value::from("2.5"));
        assert_eq!(PrimitiveType::String.cast(Value::from(0)), Value::from(""));
        assert_eq!(PrimitiveType::String.cast(Value::Null), Value::from(""));
        assert_eq!(PrimitiveType::String.cast(Value::Bool(true)), Value::from("true"));
        assert_eq!(
            PrimitiveType::String.cast(raw(json!([1, null, "a"]))),
            Value::from("1,,a")
        );
    }

    #[test]
    fn test_number_cast() {
        assert_eq!(PrimitiveType::Number.cast(Value::from("2")), Value::Number(2.0));
        assert_eq!(PrimitiveType::Number.cast(Value::from("2.50")), Value::Number(2.5));
        assert_eq!(PrimitiveType::Number.cast(Value::Null), Value::Number(0.0));
        assert_eq!(PrimitiveType::Number.cast(Value::from("  ")), Value::Number(0.0));
        assert_eq!(PrimitiveType::Number.cast(Value::from("0x1F")), Value::Number(31.0));
        assert_eq!(PrimitiveType::Number.cast(Value::from("1e3")), Value::Number(1000.0));
        assert_eq!(PrimitiveType::Number.cast(Value::Bool(true)), Value::Number(1.0));
        assert_eq!(PrimitiveType::Number.cast(raw(json!(["3"]))), Value::Number(3.0));
        assert_eq!(PrimitiveType::Number.cast(raw(json!([]))), Value::Number(0.0));

        for nan_input in [
            raw(json!({"foo": 1})),
            Value::from("abc"),
            Value::from("inf"),
            Value::from("NaN"),
            raw(json!([1, 2])),
            Value::Number(f64::NAN),
        ] {
            let cast = PrimitiveType::Number.cast(nan_input.clone());
            assert!(cast.as_f64().is_some_and(f64::is_nan), "{nan_input:?}");
        }
    }

    #[test]
    fn test_object_cast_deep_copies_plain_mappings() {
        let cast = PrimitiveType::Object.cast(raw(json!({"bar": 1, "nested": {"x": [1]}})));
        assert_eq!(cast, raw(json!({"bar": 1, "nested": {"x": [1]}})));

        assert_eq!(PrimitiveType::Object.cast(Value::Null), raw(json!({})));
        assert_eq!(PrimitiveType::Object.cast(Value::from("2")), raw(json!({})));
        assert_eq!(PrimitiveType::Object.cast(raw(json!([1, 2, 3]))), raw(json!({})));
    }

    #[test]
    fn test_object_cast_strips_non_plain_values() {
        let mut map = ObjectMap::new();
        map.insert("when".to_string(), Value::Date(DateValue::from_millis(0.0)));
        map.insert("ratio".to_string(), Value::Number(f64::NAN));

        let cast = PrimitiveType::Object.cast(Value::Object(map));
        assert_eq!(cast, raw(json!({"when": "1970-01-01T00:00:00.000Z", "ratio": null})));
    }

    #[test]
    fn test_object_cast_keeps_insertion_order() {
        let cast = PrimitiveType::Object.cast(raw(json!({"zeta": 1, "alpha": {"y": 1, "b": 2}})));
        let keys: Vec<&str> = cast.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
        assert_eq!(
            serde_json::to_string(&cast).unwrap(),
            r#"{"zeta":1,"alpha":{"y":1,"b":2}}"#
        );
    }

    #[test]
    fn test_date_cast() {
        let iso = PrimitiveType::Date.cast(Value::from("2017-11-13T19:16:51+01:00"));
        let date = iso.as_date().unwrap();
        assert!(date.is_valid());
        assert_eq!(date.to_iso_string().unwrap(), "2017-11-13T18:16:51.000Z");

        let ts = PrimitiveType::Date.cast(Value::from(1_513_610_527_293_i64));
        assert_eq!(
            ts.as_date().unwrap().to_iso_string().unwrap(),
            "2017-12-18T15:22:07.293Z"
        );

        let bad = PrimitiveType::Date.cast(Value::from("bar"));
        assert!(!bad.as_date().unwrap().is_valid());
        assert_eq!(bad.as_date().unwrap().to_iso_string(), None);

        assert!(!PrimitiveType::Date.cast(Value::Null).as_date().unwrap().is_valid());
    }

    #[test]
    fn test_date_parse_variants() {
        assert!(DateValue::parse_iso("2017-11-13").is_valid());
        assert!(DateValue::parse_iso("2017-11-13T19:16").is_valid());
        assert!(DateValue::parse_iso("2017-11-13T19:16:51.5").is_valid());
        assert!(DateValue::parse_iso("2017-11-13T19:16:51+0100").is_valid());
        assert!(!DateValue::parse_iso("13/11/2017").is_valid());

        let iso = |text: &str| DateValue::parse_iso(text).to_iso_string();

        assert_eq!(iso("2017").as_deref(), Some("2017-01-01T00:00:00.000Z"));
        assert_eq!(iso("2017-11").as_deref(), Some("2017-11-01T00:00:00.000Z"));
        assert_eq!(iso("2017-11-13T19").as_deref(), Some("2017-11-13T19:00:00.000Z"));
        assert_eq!(iso("20171113T191651Z").as_deref(), Some("2017-11-13T19:16:51.000Z"));
        assert_eq!(iso("20171113T191651+0100").as_deref(), Some("2017-11-13T18:16:51.000Z"));
        assert_eq!(iso("20171113T1916").as_deref(), Some("2017-11-13T19:16:00.000Z"));
        assert_eq!(iso("2017-W46").as_deref(), Some("2017-11-13T00:00:00.000Z"));
        assert_eq!(iso("2017-W46-3").as_deref(), Some("2017-11-15T00:00:00.000Z"));
        assert_eq!(iso("2017W463").as_deref(), Some("2017-11-15T00:00:00.000Z"));

        assert_eq!(iso("2017-13"), None);
        assert_eq!(iso("2017-11-13T25"), None);
        assert_eq!(iso("2017-W54"), None);
        assert_eq!(iso("17"), None);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(2.0), "2");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.1), "0.1");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(1e-7), "1e-7");
        assert_eq!(format_number(f64::NAN), "NaN");
    }

    #[test]
    fn test_json_conversion_of_special_values() {
        let value = Value::Array(vec![
            Value::Number(f64::NAN),
            Value::Number(2.0),
            Value::Number(2.5),
            Value::Date(DateValue::invalid()),
        ]);
        assert_eq!(value.to_json(), json!([null, 2, 2.5, null]));
        assert_eq!(serde_json::to_value(&value).unwrap(), json!([null, 2, 2.5, null]));
    }

    #[test]
    fn test_primitive_names_round_trip() {
        for ty in PrimitiveType::ALL {
            assert_eq!(PrimitiveType::from_name(ty.name()), Some(ty));
        }
        assert_eq!(PrimitiveType::from_name("number"), None);
    }
}
