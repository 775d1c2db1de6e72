//! Quote value types

use crate::assets::{parse_amount, AssetRef};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest slippage tolerance a caller may request
pub const MAX_SLIPPAGE_PERCENT: f64 = 50.0;

/// An externally supplied swap alternative; never mutated after receipt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Label of the route or venue that produced the quote
    pub source: String,
    pub source_asset: AssetRef,
    pub dest_asset: AssetRef,
    /// Decimal string, exactly as supplied
    pub source_amount: String,
    /// Decimal string, exactly as supplied
    pub dest_amount: String,
    /// Intermediate hops between source and destination asset
    pub path: Vec<AssetRef>,
    /// Percent; absent when the source does not report it
    #[serde(default)]
    pub price_impact: Option<f64>,
    #[serde(default)]
    pub fee: Option<String>,
    /// Destination units per source unit
    pub rate: f64,
}

impl Quote {
    /// Stable identifier over every field
    pub fn id(&self) -> QuoteId {
        // Struct field order is fixed, so the JSON form is canonical.
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        QuoteId(blake3::hash(&canonical))
    }

    /// Rate computed from the two amounts
    pub fn implied_rate(source_amount: &str, dest_amount: &str) -> Result<f64> {
        let source = parse_amount(source_amount)?;
        let dest = parse_amount(dest_amount)?;
        Ok(dest as f64 / source as f64)
    }
}

/// Content hash of a quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuoteId(blake3::Hash);

impl fmt::Display for QuoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex()[..16])
    }
}

/// Position of a quote in one generation of the quote list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuoteHandle {
    pub(crate) generation: u64,
    pub(crate) index: usize,
    pub(crate) id: QuoteId,
}

impl QuoteHandle {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn id(&self) -> QuoteId {
        self.id
    }
}

/// Caller-chosen slippage tolerance, in percent
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Slippage(f64);

impl Slippage {
    pub fn percent(value: f64) -> Result<Self> {
        if !value.is_finite() || value < 0.0 || value > MAX_SLIPPAGE_PERCENT {
            return Err(Error::InvalidArgument(format!(
                "Slippage must be between 0 and {}%, got {}",
                MAX_SLIPPAGE_PERCENT, value
            )));
        }
        Ok(Self(value))
    }

    pub fn as_percent(&self) -> f64 {
        self.0
    }
}

impl Default for Slippage {
    fn default() -> Self {
        Self(0.5)
    }
}

/// Parameters for a quote lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteQuery {
    pub source_asset: AssetRef,
    pub source_amount: String,
    pub dest_asset: AssetRef,
}

impl QuoteQuery {
    pub fn new(source_asset: AssetRef, source_amount: &str, dest_asset: AssetRef) -> Result<Self> {
        parse_amount(source_amount)?;
        if source_asset == dest_asset {
            return Err(Error::InvalidArgument(
                "Source and destination asset are the same".to_string(),
            ));
        }
        Ok(Self {
            source_asset,
            source_amount: source_amount.trim().to_string(),
            dest_asset,
        })
    }
}
