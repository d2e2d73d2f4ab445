use crate::errors::BloomError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Filter scalars persisted next to the bitmap as `maxElements:hashSize:bitSize:total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub max_elements: u64,
    pub hash_size: u32,
    pub bit_size: u64,
    pub total: u64,
}

impl fmt::Display for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.max_elements, self.hash_size, self.bit_size, self.total)
    }
}

/// Parses one field, accepting ASCII digits only (`str::parse` alone would
/// let a leading `+` through).
fn field<T>(name: &'static str, raw: &str) -> Result<T, BloomError>
where
    T: FromStr<Err = std::num::ParseIntError>,
{
    // a lone non-digit never parses, so the error carries `InvalidDigit`
    let digits = match raw.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
        Some((i, c)) => &raw[i..i + c.len_utf8()],
        None => raw,
    };
    digits.parse().map_err(|source| BloomError::MetaField {
        field: name,
        value: raw.to_string(),
        source,
    })
}

impl FromStr for Meta {
    type Err = BloomError;

    /// Surrounding whitespace (a trailing newline from an editor) is ignored;
    /// whitespace inside a field is not.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 4 {
            return Err(BloomError::MetaFieldCount(parts.len()));
        }
        Ok(Self {
            max_elements: field("maxElements", parts[0])?,
            hash_size: field("hashSize", parts[1])?,
            bit_size: field("bitSize", parts[2])?,
            total: field("total", parts[3])?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_format() {
        let m = Meta { max_elements: 500, hash_size: 11, bit_size: 7911, total: 1 };
        assert_eq!(m.to_string(), "500:11:7911:1");
        assert_eq!("500:11:7911:1\n".parse::<Meta>().unwrap(), m);
    }

    #[test]
    fn wrong_field_count() {
        assert!(matches!("1:2:3".parse::<Meta>(), Err(BloomError::MetaFieldCount(3))));
        assert!(matches!("1:2:3:4:5".parse::<Meta>(), Err(BloomError::MetaFieldCount(5))));
        assert!(matches!("".parse::<Meta>(), Err(BloomError::MetaFieldCount(1))));
    }

    #[test]
    fn bad_field_is_named() {
        match "500:x:7911:0".parse::<Meta>() {
            Err(BloomError::MetaField { field, value, .. }) => {
                assert_eq!(field, "hashSize");
                assert_eq!(value, "x");
            }
            other => panic!("unexpected {other:?}"),
        }
        match "500:11:7911:-1".parse::<Meta>() {
            Err(e @ BloomError::MetaField { .. }) => assert!(e.to_string().contains("total")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn only_plain_digits_are_accepted() {
        match "+500:11:7911:+1".parse::<Meta>() {
            Err(BloomError::MetaField { field, value, source }) => {
                assert_eq!(field, "maxElements");
                assert_eq!(value, "+500");
                assert_eq!(*source.kind(), std::num::IntErrorKind::InvalidDigit);
            }
            other => panic!("unexpected {other:?}"),
        }
        for bad in ["500:+11:7911:1", "500:11: 7911:1", "500:11:7911:", "500:11:7911:1_0"] {
            assert!(matches!(bad.parse::<Meta>(), Err(BloomError::MetaField { .. })), "{bad}");
        }
        assert!(matches!("500:11:7911:ü".parse::<Meta>(), Err(BloomError::MetaField { .. })));
    }
}
