//! Account keys
//!
//! This module is the only place where decrypted seeds become signing keys.
//! Seeds are never serialized in plaintext and never logged.

mod keypair;

pub use keypair::{Keypair, PublicKey, UnlockedSecret, SEED_LEN};
