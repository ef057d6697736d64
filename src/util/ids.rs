use serde::{Deserialize, Deserializer};

/// Parse an identifier from a path segment. Only positive integers are ids.
pub fn parse_id(s: &str) -> Option<i64> {
    s.trim().parse::<i64>().ok().filter(|id| *id > 0)
}

/// Accepts an id sent either as a JSON number or as a numeric string.
/// `null` and a missing field both come out as `None`.
pub fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Str(String),
    }

    let raw = Option::<Raw>::deserialize(deserializer)?;
    let id = match raw {
        None => None,
        Some(Raw::Int(n)) => Some(n),
        Some(Raw::Float(f)) if f.fract() == 0.0 => Some(f as i64),
        Some(Raw::Float(f)) => {
            return Err(serde::de::Error::custom(format!("invalid id: {}", f)));
        }
        Some(Raw::Str(s)) if s.trim().is_empty() => None,
        Some(Raw::Str(s)) => Some(
            s.trim()
                .parse::<i64>()
                .map_err(|_| serde::de::Error::custom(format!("invalid id: {:?}", s)))?,
        ),
    };
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Body {
        #[serde(default, deserialize_with = "lenient_id")]
        id: Option<i64>,
    }

    fn id_of(json: &str) -> Option<i64> {
        serde_json::from_str::<Body>(json).unwrap().id
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("12"), Some(12));
        assert_eq!(parse_id("0"), None);
        assert_eq!(parse_id("-3"), None);
        assert_eq!(parse_id("abc"), None);
    }

    #[test]
    fn test_lenient_id() {
        assert_eq!(id_of(r#"{"id": 42}"#), Some(42));
        assert_eq!(id_of(r#"{"id": "42"}"#), Some(42));
        assert_eq!(id_of(r#"{"id": null}"#), None);
        assert_eq!(id_of(r#"{}"#), None);
        assert_eq!(id_of(r#"{"id": ""}"#), None);
        assert!(serde_json::from_str::<Body>(r#"{"id": "x1"}"#).is_err());
    }
}
