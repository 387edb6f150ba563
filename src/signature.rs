//! RSA PKCS#1 v1.5 signatures over SHA-256.
//!
//! The scheme is fixed by the receiving tax authority; do not change the digest or padding.

use crate::certificate_record::CertificateRecord;
use crate::error::Result;
use crate::key_store::PrivateKeyMaterial;
use openssl::hash::MessageDigest;
use openssl::rsa::Padding;
use openssl::sign::{Signer, Verifier};

/// Sign `data` with the filer's key.
pub fn sign(key: &PrivateKeyMaterial, data: &[u8]) -> Result<Vec<u8>> {
    key.with_pkey(|pkey| {
        let mut signer = Signer::new(MessageDigest::sha256(), pkey)?;
        signer.set_rsa_padding(Padding::PKCS1)?;
        Ok(signer.sign_oneshot_to_vec(data)?)
    })
}

/// Check a signature against the public key embedded in `certificate`.
pub fn verify(certificate: &CertificateRecord, data: &[u8], signature: &[u8]) -> Result<bool> {
    let public_key = certificate.to_x509()?.public_key()?;
    let mut verifier = Verifier::new(MessageDigest::sha256(), &public_key)?;
    verifier.set_rsa_padding(Padding::PKCS1)?;
    Ok(verifier.verify_oneshot(signature, data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{self_signed, ACME_NOT_AFTER, ACME_NOT_BEFORE};

    #[test]
    fn test_sign_and_verify() {
        let (key, cert) = self_signed("ACME LTDA", ACME_NOT_BEFORE, ACME_NOT_AFTER, 1);
        let material = PrivateKeyMaterial::from_pkey(&key).unwrap();
        let record = CertificateRecord::from_x509(&cert).unwrap();

        let signature = sign(&material, b"invoice-payload").unwrap();
        assert_eq!(signature.len(), 256);
        assert!(verify(&record, b"invoice-payload", &signature).unwrap());
        assert!(!verify(&record, b"tampered-payload", &signature).unwrap());
    }

    #[test]
    fn test_signature_is_deterministic() {
        let (key, _cert) = self_signed("ACME LTDA", ACME_NOT_BEFORE, ACME_NOT_AFTER, 1);
        let material = PrivateKeyMaterial::from_pkey(&key).unwrap();

        let first = sign(&material, b"invoice-payload").unwrap();
        let second = sign(&material, b"invoice-payload").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_matches_raw_rsa_pkcs1_sha256() {
        let (key, _cert) = self_signed("ACME LTDA", ACME_NOT_BEFORE, ACME_NOT_AFTER, 1);
        let material = PrivateKeyMaterial::from_pkey(&key).unwrap();

        let mut reference = Signer::new(MessageDigest::sha256(), &key).unwrap();
        reference.set_rsa_padding(Padding::PKCS1).unwrap();
        let expected = reference.sign_oneshot_to_vec(b"dps").unwrap();

        assert_eq!(sign(&material, b"dps").unwrap(), expected);
    }

    #[test]
    fn test_foreign_certificate_rejects_signature() {
        let (key, _cert) = self_signed("ACME LTDA", ACME_NOT_BEFORE, ACME_NOT_AFTER, 1);
        let (_other_key, other_cert) = self_signed("OUTRA LTDA", ACME_NOT_BEFORE, ACME_NOT_AFTER, 2);
        let material = PrivateKeyMaterial::from_pkey(&key).unwrap();
        let other = CertificateRecord::from_x509(&other_cert).unwrap();

        let signature = sign(&material, b"invoice-payload").unwrap();
        assert!(!verify(&other, b"invoice-payload", &signature).unwrap());
    }
}
