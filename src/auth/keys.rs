//! Public-key resolution by key identifier.

use jsonwebtoken::DecodingKey;

/// Resolves the public key that verifies tokens carrying a given `kid`.
///
/// Implementations must be cheap: lookup happens on every authenticated
/// request.
pub trait KeyLookup: Send + Sync + 'static {
    fn public_key(&self, kid: &str) -> Option<&DecodingKey>;
}

/// A lookup that knows exactly one key.
pub struct SimpleKeyLookup {
    kid: String,
    key: DecodingKey,
}

impl SimpleKeyLookup {
    pub fn new(kid: impl Into<String>, key: DecodingKey) -> Self {
        Self { kid: kid.into(), key }
    }
}

impl KeyLookup for SimpleKeyLookup {
    fn public_key(&self, kid: &str) -> Option<&DecodingKey> {
        (kid == self.kid).then_some(&self.key)
    }
}
