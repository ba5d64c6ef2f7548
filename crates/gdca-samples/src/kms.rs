//! Cloud KMS samples.

use gdca_gcp::kms::{
    CryptoKey, CryptoKeyVersionTemplate, KmsClient, PURPOSE_ASYMMETRIC_DECRYPT,
    RSA_DECRYPT_OAEP_2048_SHA256,
};
use gdca_gcp::{GcpClient, GcpResult};
use std::io::Write;

fn asymmetric_decrypt_key() -> CryptoKey {
    CryptoKey {
        purpose: PURPOSE_ASYMMETRIC_DECRYPT.to_string(),
        version_template: Some(CryptoKeyVersionTemplate {
            algorithm: RSA_DECRYPT_OAEP_2048_SHA256.to_string(),
            protection_level: None,
        }),
        ..Default::default()
    }
}

/// Create an RSA-2048 OAEP decryption key in the key ring `parent`.
pub async fn create_key_asymmetric_decrypt(
    client: &mut GcpClient,
    w: &mut impl Write,
    parent: &str,
    id: &str,
) -> GcpResult<CryptoKey> {
    let key = KmsClient::create_crypto_key(client, parent, id, &asymmetric_decrypt_key())
        .await
        .map_err(|e| e.with_method("CreateCryptoKey"))?;
    writeln!(w, "Created key: {}", key.name)?;
    Ok(key)
}
