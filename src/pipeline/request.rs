//! Signing requests

use crate::assets::{parse_amount, AssetRef};
use crate::wallet::PublicKey;
use crate::Result;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use uuid::Uuid;

/// What the transaction should do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Payment,
    TrustlineAdd,
    TrustlineRemove,
    Swap,
}

impl IntentKind {
    pub fn name(&self) -> &'static str {
        match self {
            IntentKind::Payment => "payment",
            IntentKind::TrustlineAdd => "trustline_add",
            IntentKind::TrustlineRemove => "trustline_remove",
            IntentKind::Swap => "swap",
        }
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Opaque intent parameters forwarded to the builder
pub type IntentParams = Map<String, Value>;

/// A transient request to build, sign and submit one transaction
///
/// The PIN never leaves this struct except into `Session::unlock`; it is
/// not part of `params` and is not serialized.
#[derive(Debug)]
pub struct SigningRequest {
    /// Correlates audit entries and log lines
    pub id: Uuid,
    pub kind: IntentKind,
    pub params: IntentParams,
    pub pin: SecretString,
}

impl SigningRequest {
    pub fn new(kind: IntentKind, params: IntentParams, pin: SecretString) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            params,
            pin,
        }
    }

    /// Send `amount` of `asset` to `destination`
    pub fn payment(
        destination: &PublicKey,
        asset: &AssetRef,
        amount: &str,
        pin: SecretString,
    ) -> Result<Self> {
        parse_amount(amount)?;
        Ok(Self::new(
            IntentKind::Payment,
            object(json!({
                "destination": destination.to_string(),
                "asset": asset.to_string(),
                "amount": amount.trim(),
            })),
            pin,
        ))
    }

    /// Open (or raise the limit of) a trustline
    pub fn trustline_add(asset: &AssetRef, limit: Option<&str>, pin: SecretString) -> Result<Self> {
        let mut params = object(json!({ "asset": asset.to_string() }));
        if let Some(limit) = limit {
            parse_amount(limit)?;
            params.insert("limit".to_string(), Value::String(limit.trim().to_string()));
        }
        Ok(Self::new(IntentKind::TrustlineAdd, params, pin))
    }

    /// Remove a trustline
    pub fn trustline_remove(asset: &AssetRef, pin: SecretString) -> Self {
        Self::new(
            IntentKind::TrustlineRemove,
            object(json!({ "asset": asset.to_string() })),
            pin,
        )
    }

    /// Numeric parameter lookup
    pub fn param_f64(&self, key: &str) -> Option<f64> {
        self.params.get(key).and_then(|v| v.as_f64())
    }
}

fn object(value: Value) -> IntentParams {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::Keypair;

    fn pin() -> SecretString {
        SecretString::from("1234".to_string())
    }

    #[test]
    fn test_payment_params() {
        let destination = Keypair::generate().unwrap().public_key();
        let request = SigningRequest::payment(&destination, &AssetRef::Native, "10.5", pin()).unwrap();

        assert_eq!(request.kind, IntentKind::Payment);
        assert_eq!(request.params["destination"], destination.to_string());
        assert_eq!(request.params["asset"], "native");
        assert_eq!(request.params["amount"], "10.5");
        assert!(!request.params.contains_key("pin"));
    }

    #[test]
    fn test_payment_rejects_bad_amount() {
        let destination = Keypair::generate().unwrap().public_key();
        assert!(SigningRequest::payment(&destination, &AssetRef::Native, "-3", pin()).is_err());
    }

    #[test]
    fn test_trustline_params() {
        let issuer = Keypair::generate().unwrap().public_key();
        let asset = AssetRef::credit("USDC", issuer).unwrap();

        let add = SigningRequest::trustline_add(&asset, Some("1000"), pin()).unwrap();
        assert_eq!(add.kind, IntentKind::TrustlineAdd);
        assert_eq!(add.params["limit"], "1000");

        let remove = SigningRequest::trustline_remove(&asset, pin());
        assert_eq!(remove.kind, IntentKind::TrustlineRemove);
        assert!(remove.params.get("limit").is_none());
    }

    #[test]
    fn test_debug_redacts_pin() {
        let request = SigningRequest::new(IntentKind::Swap, Map::new(), pin());
        let debug = format!("{:?}", request);
        assert!(!debug.contains("1234"));
    }

    #[test]
    fn test_kind_serialization() {
        assert_eq!(
            serde_json::to_value(IntentKind::TrustlineAdd).unwrap(),
            "trustline_add"
        );
        assert_eq!(IntentKind::Swap.to_string(), "swap");
    }
}
