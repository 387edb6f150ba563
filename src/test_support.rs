//! Throwaway certificates and containers for unit tests.

use chrono::{DateTime, Utc};
use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::{X509Name, X509};
use std::path::{Path, PathBuf};

pub(crate) const ACME_NOT_BEFORE: i64 = 1_704_067_200; // 2024-01-01T00:00:00Z
pub(crate) const ACME_NOT_AFTER: i64 = 1_767_225_600; // 2026-01-01T00:00:00Z
pub(crate) const PASSWORD: &str = "test123";

pub(crate) fn utc(text: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(text)
        .unwrap()
        .with_timezone(&Utc)
}

pub(crate) fn rsa_key() -> PKey<Private> {
    PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap()
}

pub(crate) fn ec_key() -> PKey<Private> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
}

pub(crate) fn certificate_for(
    key: &PKey<Private>,
    cn: &str,
    not_before: i64,
    not_after: i64,
    serial: u32,
) -> X509 {
    let mut name = X509Name::builder().unwrap();
    name.append_entry_by_nid(Nid::COMMONNAME, cn).unwrap();
    name.append_entry_by_nid(Nid::ORGANIZATIONNAME, "ACME").unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(serial).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder
        .set_not_before(&Asn1Time::from_unix(not_before).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::from_unix(not_after).unwrap())
        .unwrap();
    builder.set_pubkey(key).unwrap();
    builder.sign(key, MessageDigest::sha256()).unwrap();
    builder.build()
}

pub(crate) fn self_signed(
    cn: &str,
    not_before: i64,
    not_after: i64,
    serial: u32,
) -> (PKey<Private>, X509) {
    let key = rsa_key();
    let cert = certificate_for(&key, cn, not_before, not_after, serial);
    (key, cert)
}

pub(crate) fn pkcs12_der(
    key: Option<&PKey<Private>>,
    cert: Option<&X509>,
    password: &str,
) -> Vec<u8> {
    let mut builder = Pkcs12::builder();
    builder.name("nfse");
    if let Some(key) = key {
        builder.pkey(key);
    }
    if let Some(cert) = cert {
        builder.cert(cert);
    }
    builder.build2(password).unwrap().to_der().unwrap()
}

pub(crate) fn write_pfx(
    dir: &Path,
    file_name: &str,
    key: &PKey<Private>,
    cert: &X509,
    password: &str,
) -> PathBuf {
    let path = dir.join(file_name);
    std::fs::write(&path, pkcs12_der(Some(key), Some(cert), password)).unwrap();
    path
}
