//! Asset references and amount handling
//!
//! Assets are either the native lumen or a credit asset identified by
//! `CODE:ISSUER`. Amounts travel as decimal strings with at most seven
//! fractional digits, the ledger's fixed-point precision.

use crate::wallet::PublicKey;
use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Fractional digits of ledger amounts
pub const AMOUNT_DECIMALS: u32 = 7;

/// Smallest units per whole unit
pub const STROOPS_PER_UNIT: i64 = 10_000_000;

/// A reference to an asset on the ledger
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetRef {
    Native,
    Credit { code: String, issuer: PublicKey },
}

impl AssetRef {
    /// Credit asset with a validated code (1-12 alphanumeric characters)
    pub fn credit(code: &str, issuer: PublicKey) -> Result<Self> {
        if code.is_empty() || code.len() > 12 || !code.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(Error::InvalidArgument(format!("Invalid asset code: {}", code)));
        }
        Ok(AssetRef::Credit {
            code: code.to_string(),
            issuer,
        })
    }

    pub fn is_native(&self) -> bool {
        matches!(self, AssetRef::Native)
    }

    /// Horizon `asset_type` value
    pub fn asset_type(&self) -> &'static str {
        match self {
            AssetRef::Native => "native",
            AssetRef::Credit { code, .. } if code.len() <= 4 => "credit_alphanum4",
            AssetRef::Credit { .. } => "credit_alphanum12",
        }
    }

    /// Query parameters Horizon expects for an asset under `prefix`
    pub fn query_pairs(&self, prefix: &str) -> Vec<(String, String)> {
        let mut pairs = vec![(format!("{}_asset_type", prefix), self.asset_type().to_string())];
        if let AssetRef::Credit { code, issuer } = self {
            pairs.push((format!("{}_asset_code", prefix), code.clone()));
            pairs.push((format!("{}_asset_issuer", prefix), issuer.to_string()));
        }
        pairs
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetRef::Native => f.write_str("native"),
            AssetRef::Credit { code, issuer } => write!(f, "{}:{}", code, issuer),
        }
    }
}

impl FromStr for AssetRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("native") || s.eq_ignore_ascii_case("xlm") {
            return Ok(AssetRef::Native);
        }
        let (code, issuer) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidArgument(format!("Expected CODE:ISSUER, got {}", s)))?;
        AssetRef::credit(code, issuer.parse()?)
    }
}

impl Serialize for AssetRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AssetRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        encoded.parse().map_err(serde::de::Error::custom)
    }
}

/// Parse a positive decimal amount into stroops
pub fn parse_amount(amount: &str) -> Result<i64> {
    let invalid = || Error::InvalidArgument(format!("Invalid amount: {}", amount));
    let amount = amount.trim();
    let (whole, frac) = amount.split_once('.').unwrap_or((amount, ""));

    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().all(|c| c.is_ascii_digit())
        || !frac.chars().all(|c| c.is_ascii_digit())
        || frac.len() > AMOUNT_DECIMALS as usize
    {
        return Err(invalid());
    }

    let whole: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let frac_value: i64 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac, width = AMOUNT_DECIMALS as usize);
        padded.parse().map_err(|_| invalid())?
    };

    let stroops = whole
        .checked_mul(STROOPS_PER_UNIT)
        .and_then(|w| w.checked_add(frac_value))
        .ok_or_else(invalid)?;
    if stroops <= 0 {
        return Err(invalid());
    }
    Ok(stroops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::Keypair;

    #[test]
    fn test_native_parsing() {
        assert_eq!("native".parse::<AssetRef>().unwrap(), AssetRef::Native);
        assert_eq!("XLM".parse::<AssetRef>().unwrap(), AssetRef::Native);
        assert_eq!(AssetRef::Native.to_string(), "native");
    }

    #[test]
    fn test_credit_round_trip() {
        let issuer = Keypair::generate().unwrap().public_key();
        let text = format!("USDC:{}", issuer);
        let asset: AssetRef = text.parse().unwrap();

        assert_eq!(asset.to_string(), text);
        assert_eq!(asset.asset_type(), "credit_alphanum4");

        let json = serde_json::to_string(&asset).unwrap();
        assert_eq!(serde_json::from_str::<AssetRef>(&json).unwrap(), asset);
    }

    #[test]
    fn test_invalid_assets() {
        let issuer = Keypair::generate().unwrap().public_key();
        assert!("USDC".parse::<AssetRef>().is_err());
        assert!("USDC:notakey".parse::<AssetRef>().is_err());
        assert!(AssetRef::credit("TOOLONGASSETCODE", issuer).is_err());
        assert!(AssetRef::credit("US-D", issuer).is_err());
    }

    #[test]
    fn test_query_pairs() {
        assert_eq!(
            AssetRef::Native.query_pairs("source"),
            vec![("source_asset_type".to_string(), "native".to_string())]
        );
        let issuer = Keypair::generate().unwrap().public_key();
        let pairs = AssetRef::credit("LONGCODE", issuer).unwrap().query_pairs("destination");
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0].1, "credit_alphanum12");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1").unwrap(), 10_000_000);
        assert_eq!(parse_amount("0.0000001").unwrap(), 1);
        assert_eq!(parse_amount("12.5").unwrap(), 125_000_000);
        assert_eq!(parse_amount(".5").unwrap(), 5_000_000);

        for bad in ["", ".", "0", "-1", "1.00000001", "1e5", "abc", "1.2.3"] {
            assert!(parse_amount(bad).is_err(), "{bad}");
        }
    }
}
