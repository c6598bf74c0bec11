//! Signer resolution from caller-supplied key material

use solana_sdk::signature::Keypair;

use crate::errors::{TraderResult, ValidationError};

const KEYPAIR_LEN: usize = 64;

/// Decode a secret into a signing keypair.
///
/// Accepts a base58 string of the 64-byte secret or a JSON byte array (the
/// `solana-keygen` file format). Every decoding failure is a validation error.
pub fn resolve_signer(secret: &str) -> TraderResult<Keypair> {
    let secret = secret.trim();
    if secret.is_empty() {
        return Err(ValidationError::EmptySecret.into());
    }

    let bytes = if secret.starts_with('[') {
        serde_json::from_str::<Vec<u8>>(secret)
            .map_err(|e| ValidationError::InvalidSecret(format!("invalid JSON byte array: {e}")))?
    } else {
        bs58::decode(secret)
            .into_vec()
            .map_err(|e| ValidationError::InvalidSecret(format!("invalid base58: {e}")))?
    };

    if bytes.len() != KEYPAIR_LEN {
        return Err(ValidationError::InvalidSecret(format!(
            "expected {KEYPAIR_LEN} bytes, got {}",
            bytes.len()
        ))
        .into());
    }
    if bytes.iter().all(|&b| b == 0) {
        return Err(ValidationError::InvalidSecret("all-zero key rejected".to_string()).into());
    }

    Keypair::try_from(bytes.as_slice())
        .map_err(|e| ValidationError::InvalidSecret(format!("invalid keypair bytes: {e}")).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TraderError;
    use solana_sdk::signature::Signer;

    #[test]
    fn test_base58_round_trip() {
        let keypair = Keypair::new();
        let resolved = resolve_signer(&keypair.to_base58_string()).unwrap();
        assert_eq!(resolved.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_json_array_format() {
        let keypair = Keypair::new();
        let json = serde_json::to_string(&keypair.to_bytes().to_vec()).unwrap();
        let resolved = resolve_signer(&json).unwrap();
        assert_eq!(resolved.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_rejections() {
        assert!(matches!(
            resolve_signer("   "),
            Err(TraderError::Validation(ValidationError::EmptySecret))
        ));
        assert!(matches!(
            resolve_signer("not-base58-0OIl"),
            Err(TraderError::Validation(ValidationError::InvalidSecret(_)))
        ));
        assert!(matches!(
            resolve_signer(&bs58::encode([7u8; 32]).into_string()),
            Err(TraderError::Validation(ValidationError::InvalidSecret(_)))
        ));
        assert!(matches!(
            resolve_signer(&serde_json::to_string(&vec![0u8; 64]).unwrap()),
            Err(TraderError::Validation(ValidationError::InvalidSecret(_)))
        ));
    }
}
