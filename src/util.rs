use serde::de::value::{Error as ValueError, StrDeserializer};
use serde::de::{Deserialize, IntoDeserializer};
use serde::Serialize;
use strum::IntoEnumIterator;

use crate::error::{ChoreoError, Result};

/// Wire names of every variant of a closed token enum, in declaration order.
pub fn token_names<T: IntoEnumIterator + Serialize>() -> Vec<String> {
    T::iter()
        .filter_map(|v| match serde_json::to_value(v) {
            Ok(serde_json::Value::String(s)) => Some(s),
            _ => None,
        })
        .collect()
}

/// Parse a wire token into a closed enumeration, failing with a lookup
/// error that names the unresolved token and every valid token.
pub fn parse_token<T>(kind: &'static str, token: &str) -> Result<T>
where
    T: IntoEnumIterator + Serialize + for<'de> Deserialize<'de>,
{
    let de: StrDeserializer<'_, ValueError> = token.into_deserializer();
    T::deserialize(de).map_err(|_| ChoreoError::not_found(kind, token, token_names::<T>()))
}

/// Linear interpolation between `a` and `b`.
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::model::ChannelKind;

    #[test]
    fn token_names_follow_serde() {
        let names = token_names::<ChannelKind>();
        assert_eq!(names.first().map(String::as_str), Some("pan"));
        assert!(names.iter().any(|n| n == "dimmer"));
    }

    #[test]
    fn parse_token_reports_valid_set() {
        let err = parse_token::<ChannelKind>("channel", "zoom").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'zoom'"));
        assert!(msg.contains("pan"));
        assert!(msg.contains("gobo"));
        assert_eq!(
            parse_token::<ChannelKind>("channel", "tilt").unwrap(),
            ChannelKind::Tilt
        );
    }
}
