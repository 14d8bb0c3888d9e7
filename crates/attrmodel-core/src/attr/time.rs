//! Timestamp kind.
//!
//! Values are parsed into timezone-aware instants. Text is accepted as
//! `now`, RFC 3339, the configured format, the default format, or a bare
//! `YYYY-MM-DD` date; naive input is interpreted in the configured timezone.
//! The storage form is text rendered with the configured format.

use std::fmt::Write as _;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

use super::{AttrCore, AttrOptions, PrimitiveKind};
use crate::error::{Error, Result};
use crate::value::Value;

/// Storage format used when none is configured.
pub const DEFAULT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Timezone used when none is configured.
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// Timestamp kind; defaults to the current instant.
#[derive(Debug, Clone)]
pub struct Time {
    format: String,
    offset: FixedOffset,
}

impl Time {
    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Parse text into an instant, or `None` if no accepted form matches.
    pub fn parse(&self, text: &str) -> Option<DateTime<FixedOffset>> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("now") {
            return Some(Utc::now().with_timezone(&self.offset));
        }
        if let Ok(t) = DateTime::parse_from_rfc3339(text) {
            return Some(t);
        }

        let midnight = |format: &str| {
            NaiveDate::parse_from_str(text, format)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        };
        let naive = NaiveDateTime::parse_from_str(text, &self.format)
            .ok()
            .or_else(|| midnight(self.format.as_str()))
            .or_else(|| NaiveDateTime::parse_from_str(text, DEFAULT_FORMAT).ok())
            .or_else(|| midnight("%Y-%m-%d"))?;
        self.offset.from_local_datetime(&naive).single()
    }

    /// Parse a timezone: `UTC`, `GMT`, `Z`, or `±HH`, `±HHMM`, `±HH:MM`.
    pub fn parse_timezone(tz: &str) -> Option<FixedOffset> {
        let tz = tz.trim();
        if ["UTC", "GMT", "Z"].iter().any(|z| tz.eq_ignore_ascii_case(z)) {
            return FixedOffset::east_opt(0);
        }

        let (sign, rest) = match tz.as_bytes().first()? {
            b'+' => (1, &tz[1..]),
            b'-' => (-1, &tz[1..]),
            _ => return None,
        };
        let digits: String = rest.chars().filter(|c| *c != ':').collect();
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let (hours, minutes) = match digits.len() {
            2 => (digits.parse::<i32>().ok()?, 0),
            4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
            _ => return None,
        };
        if minutes >= 60 {
            return None;
        }
        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
    }

    fn render(&self, core: &AttrCore, t: &DateTime<FixedOffset>) -> Result<String> {
        let mut out = String::new();
        write!(out, "{}", t.with_timezone(&self.offset).format(&self.format)).map_err(|_| {
            core.invalid_value(Self::TYPE_NAME, &Value::Time(*t), "format failed")
        })?;
        Ok(out)
    }
}

impl PrimitiveKind for Time {
    const TYPE_NAME: &'static str = "Time";

    fn from_options(name: &str, opts: &AttrOptions) -> Result<Self> {
        let format = opts
            .format
            .clone()
            .unwrap_or_else(|| DEFAULT_FORMAT.to_string());
        if StrftimeItems::new(&format).any(|item| matches!(item, Item::Error)) {
            return Err(Error::InvalidValue {
                attr: name.to_string(),
                type_name: Self::TYPE_NAME.to_string(),
                value: format,
                reason: "invalid format string".to_string(),
            });
        }

        let timezone = opts.timezone.as_deref().unwrap_or(DEFAULT_TIMEZONE);
        let offset = Self::parse_timezone(timezone).ok_or_else(|| Error::InvalidValue {
            attr: name.to_string(),
            type_name: Self::TYPE_NAME.to_string(),
            value: timezone.to_string(),
            reason: "unknown timezone".to_string(),
        })?;

        Ok(Self { format, offset })
    }

    fn default_value(&self) -> Value {
        Value::Text("now".to_string())
    }

    fn cast(&self, core: &AttrCore, value: Value) -> Result<Value> {
        let instant = match &value {
            Value::Time(t) => Some(*t),
            Value::Text(s) => self.parse(s),
            Value::Int(secs) => DateTime::from_timestamp(*secs, 0).map(|t| t.fixed_offset()),
            Value::Float(secs) => {
                let whole = secs.floor();
                let nanos = ((secs - whole) * 1e9) as u32;
                DateTime::from_timestamp(whole as i64, nanos).map(|t| t.fixed_offset())
            }
            _ => None,
        };

        match instant {
            Some(t) => Ok(Value::Time(t)),
            None => Err(core.invalid_value(Self::TYPE_NAME, &value, "not a recognizable time")),
        }
    }

    fn cast_to_native(&self, core: &AttrCore, value: Value) -> Result<Value> {
        match self.cast(core, value)? {
            Value::Time(t) => Ok(Value::Text(self.render(core, &t)?)),
            other => Ok(other),
        }
    }

    /// Text defaults are parsed when needed, so `"now"` is the time of the read.
    fn finish_default(&self, core: &AttrCore, value: Value) -> Result<Value> {
        match value {
            Value::Text(_) => self.cast(core, value),
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::primitive::primitive_contract_tests;
    use super::*;
    use crate::attr::{Attr, Primitive};

    primitive_contract_tests!(time_contract, super::Time, Value::from("now"));

    fn attr(opts: AttrOptions) -> Primitive<Time> {
        Primitive::<Time>::new("created", opts).unwrap()
    }

    #[test]
    fn test_read_parses_now() {
        let before = Utc::now();
        let value = attr(AttrOptions::default()).read(None, Value::from("now")).unwrap();
        let t = value.as_time().unwrap();
        assert!(t.with_timezone(&Utc) >= before - chrono::Duration::seconds(1));
    }

    #[test]
    fn test_default_now_is_resolved_at_read_time() {
        let a = attr(AttrOptions::default());
        let first = a.read(None, Value::Null).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = a.read(None, Value::Null).unwrap();
        assert!(second.as_time().unwrap() > first.as_time().unwrap());
    }

    #[test]
    fn test_parse_default_format_in_configured_timezone() {
        let a = attr(AttrOptions::default().timezone("+02:00"));
        let value = a.cast(Value::from("2024-01-15 10:30:00")).unwrap();
        let t = value.as_time().unwrap();
        assert_eq!(t.offset().local_minus_utc(), 7200);
        assert_eq!(t.with_timezone(&Utc).to_rfc3339(), "2024-01-15T08:30:00+00:00");
    }

    #[test]
    fn test_parse_custom_format_and_date_only() {
        let a = attr(AttrOptions::default().format("%d/%m/%Y %H:%M"));
        let t = a.cast(Value::from("15/01/2024 10:30")).unwrap();
        assert_eq!(
            t.as_time().unwrap().to_rfc3339(),
            "2024-01-15T10:30:00+00:00"
        );

        let d = a.cast(Value::from("2024-01-15")).unwrap();
        assert_eq!(
            d.as_time().unwrap().to_rfc3339(),
            "2024-01-15T00:00:00+00:00"
        );
    }

    #[test]
    fn test_date_only_format_reads_back_what_it_writes() {
        let a = Primitive::<Time>::new("born", AttrOptions::default().format("%d.%m.%Y")).unwrap();
        let stored = a
            .serialize(None, Value::Null, Value::from("2024-01-15T00:00:00Z"))
            .unwrap();
        assert_eq!(stored, Value::from("15.01.2024"));

        let back = a.deserialize(None, stored).unwrap();
        assert_eq!(
            back.as_time().unwrap().to_rfc3339(),
            "2024-01-15T00:00:00+00:00"
        );
    }

    #[test]
    fn test_rfc3339_keeps_its_offset() {
        let a = attr(AttrOptions::default());
        let t = a.cast(Value::from("2024-01-15T10:30:00-05:00")).unwrap();
        assert_eq!(t.as_time().unwrap().offset().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn test_unix_seconds() {
        let a = attr(AttrOptions::default());
        let t = a.cast(Value::Int(0)).unwrap();
        assert_eq!(t.as_time().unwrap().timestamp(), 0);
    }

    #[test]
    fn test_serialize_uses_format_and_timezone() {
        let a = attr(AttrOptions::default().timezone("+01:00"));
        let out = a
            .serialize(None, Value::Null, Value::from("2024-01-15T10:30:00Z"))
            .unwrap();
        assert_eq!(out, Value::from("2024-01-15 11:30:00"));
    }

    #[test]
    fn test_unparseable_text_is_invalid_value() {
        let a = attr(AttrOptions::default());
        let err = a.cast(Value::from("next tuesday-ish")).unwrap_err();
        assert!(matches!(err, Error::InvalidValue { ref type_name, .. } if type_name == "Time"));
    }

    #[test]
    fn test_bad_configuration_is_rejected() {
        let bad_timezone = AttrOptions::default().timezone("Mars/Olympus");
        assert!(Primitive::<Time>::new("t", bad_timezone).is_err());
        let bad_format = AttrOptions::default().format("%Y-%m-%");
        assert!(Primitive::<Time>::new("t", bad_format).is_err());
    }

    #[test]
    fn test_parse_timezone_forms() {
        assert_eq!(Time::parse_timezone("utc").unwrap().local_minus_utc(), 0);
        assert_eq!(Time::parse_timezone("+05:30").unwrap().local_minus_utc(), 19_800);
        assert_eq!(Time::parse_timezone("-0800").unwrap().local_minus_utc(), -28_800);
        assert_eq!(Time::parse_timezone("+02").unwrap().local_minus_utc(), 7200);
        assert!(Time::parse_timezone("+5").is_none());
        assert!(Time::parse_timezone("+02:75").is_none());
    }
}
