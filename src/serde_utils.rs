//! Shared serialization utilities.

/// Serialize `U256` base-unit amounts as decimal strings.
///
/// JSON consumers lose precision above 2^53, so amounts never travel as
/// numbers. Deserialization also accepts `0x`-prefixed hex.
pub mod u256_dec {
    use alloy::primitives::U256;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(val: &U256, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(&val.to_string())
    }

    pub fn deserialize<'de, D>(d: D) -> Result<U256, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(d)?;
        parse(&raw).map_err(D::Error::custom)
    }

    pub(crate) fn parse(raw: &str) -> Result<U256, String> {
        let raw = raw.trim();
        if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            if hex.is_empty() {
                return Ok(U256::ZERO);
            }
            return U256::from_str_radix(hex, 16).map_err(|e| format!("invalid hex amount: {e}"));
        }
        U256::from_str_radix(raw, 10).map_err(|e| format!("invalid decimal amount: {e}"))
    }
}

/// Same as [`u256_dec`] for optional amounts (`null` when absent).
pub mod u256_dec_opt {
    use alloy::primitives::U256;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(val: &Option<U256>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match val {
            Some(v) => s.serialize_str(&v.to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(d: D) -> Result<Option<U256>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(d)?;
        raw.map(|r| super::u256_dec::parse(&r).map_err(D::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::U256;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Wrapper {
        #[serde(with = "super::u256_dec")]
        amount: U256,
        #[serde(with = "super::u256_dec_opt", default)]
        value: Option<U256>,
    }

    #[test]
    fn test_amount_serializes_as_decimal_string() {
        let w = Wrapper {
            amount: U256::from(10u128.pow(24)),
            value: None,
        };
        let json = serde_json::to_string(&w).unwrap();
        assert_eq!(json, r#"{"amount":"1000000000000000000000000","value":null}"#);
    }

    #[test]
    fn test_hex_value_accepted() {
        let w: Wrapper = serde_json::from_str(r#"{"amount":"0x10","value":"0x0de0b6b3a7640000"}"#).unwrap();
        assert_eq!(w.amount, U256::from(16));
        assert_eq!(w.value, Some(U256::from(1_000_000_000_000_000_000u64)));

        let w: Wrapper = serde_json::from_str(r#"{"amount":"7"}"#).unwrap();
        assert_eq!(w.value, None);
    }
}
