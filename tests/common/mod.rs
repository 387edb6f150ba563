//! Fixtures for the integration tests, on top of the unit-test certificate builders.

#![allow(dead_code)]

#[path = "../../src/test_support.rs"]
mod test_support;

pub(crate) use test_support::*;

use nfse_cert::validity::FixedClock;
use openssl::pkey::{PKey, Private};
use openssl::x509::X509;
use std::path::Path;
use std::sync::Arc;

pub fn clock_at(text: &str) -> Arc<FixedClock> {
    Arc::new(FixedClock::new(utc(text)))
}

/// The ACME LTDA certificate valid 2024-01-01 to 2026-01-01.
pub fn acme() -> (PKey<Private>, X509) {
    self_signed("ACME LTDA", ACME_NOT_BEFORE, ACME_NOT_AFTER, 1)
}

/// Replace `path` with `bytes` through a rename, so readers never see a partial file.
pub fn replace_atomically(path: &Path, bytes: &[u8]) {
    let staging = path.with_extension("staging");
    std::fs::write(&staging, bytes).unwrap();
    std::fs::rename(&staging, path).unwrap();
}
