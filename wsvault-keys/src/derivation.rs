//! Off-thread key derivation.

use crate::error::{KeyError, KeyResult};
use wsvault_crypto::{
    CryptoError, DerivedKey, KdfParams, KeyFingerprint, Salt, derive_key, fingerprint,
};
use zeroize::Zeroizing;

/// Runs the (slow) KDF on the blocking pool and fingerprints the result.
///
/// Dropping the returned future abandons the result; nothing is written
/// anywhere until the caller acts on it.
pub(crate) async fn derive_with_fingerprint(
    passphrase: &str,
    salt: Salt,
    params: KdfParams,
) -> KeyResult<(DerivedKey, KeyFingerprint)> {
    let passphrase = Zeroizing::new(passphrase.to_owned());
    let joined = tokio::task::spawn_blocking(move || -> Result<_, CryptoError> {
        let key = derive_key(&passphrase, &salt, &params)?;
        let fp = fingerprint(&key)?;
        Ok((key, fp))
    })
    .await
    .map_err(|e| {
        KeyError::Crypto(CryptoError::KeyDerivation(format!(
            "derivation task failed: {e}"
        )))
    })?;
    joined.map_err(KeyError::from)
}
