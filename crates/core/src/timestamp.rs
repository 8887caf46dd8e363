//! Canonical timestamp encoding.
//!
//! Records carry naive UTC date-times with microsecond precision. The textual
//! form always has six fractional digits (`2024-01-01T00:00:00.000000`), so a
//! timestamp survives a format/parse cycle unchanged.

use chrono::{NaiveDateTime, SubsecRound, Utc};

use crate::error::{StoreError, StoreResult};

/// `strftime` pattern of the canonical encoding.
pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Current UTC time, truncated to microseconds.
pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(6)
}

pub fn format(ts: &NaiveDateTime) -> String {
    ts.format(FORMAT).to_string()
}

/// Parse the canonical encoding. `field` names the offending key in errors.
pub fn parse(field: &str, text: &str) -> StoreResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, FORMAT).map_err(|e| {
        StoreError::format(format!(
            "{field}: '{text}' is not a canonical timestamp ({FORMAT}): {e}"
        ))
    })
}

/// `#[serde(with = "timestamp::serde_canonical")]` adapter.
pub mod serde_canonical {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&text, super::FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};
    use proptest::prelude::*;

    #[test]
    fn midnight_keeps_six_fractional_digits() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(format(&ts), "2024-01-01T00:00:00.000000");
    }

    #[test]
    fn now_has_microsecond_precision() {
        let ts = now();
        assert_eq!(ts.nanosecond() % 1_000, 0);
    }

    #[test]
    fn non_canonical_text_is_rejected() {
        assert!(matches!(parse("created_at", "2024-01-01"), Err(StoreError::Format(_))));
        assert!(matches!(
            parse("updated_at", "yesterday"),
            Err(StoreError::Format(msg)) if msg.starts_with("updated_at")
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: any microsecond-precision timestamp survives format + parse.
        #[test]
        fn format_parse_is_lossless(secs in 0i64..4_102_444_800i64, micros in 0u32..1_000_000u32) {
            let ts = chrono::DateTime::from_timestamp(secs, micros * 1_000)
                .unwrap()
                .naive_utc();
            prop_assert_eq!(parse("ts", &format(&ts)).unwrap(), ts);
        }
    }
}
