//! Immutable view of a loaded leaf certificate.

use crate::error::{CertificateError, Result};
use chrono::{DateTime, Utc};
use openssl::asn1::{Asn1Time, Asn1TimeRef};
use openssl::nid::Nid;
use openssl::x509::{X509NameRef, X509Ref, X509};

const SECONDS_PER_DAY: i64 = 86_400;

/// Subject, issuer, serial and validity window of a leaf certificate,
/// together with its DER encoding.
///
/// Values are extracted once at load time; the record never changes afterwards
/// and can be cloned freely without touching key material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRecord {
    subject_name: String,
    subject: String,
    issuer_name: String,
    serial_number: String,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    der: Vec<u8>,
}

impl CertificateRecord {
    /// Extract a record from a parsed X.509 certificate.
    pub fn from_x509(certificate: &X509Ref) -> Result<Self> {
        let subject = render_name(certificate.subject_name());
        let subject_name = common_name(certificate.subject_name()).unwrap_or_else(|| subject.clone());
        let issuer_name = common_name(certificate.issuer_name())
            .unwrap_or_else(|| render_name(certificate.issuer_name()));

        let serial_number = certificate
            .serial_number()
            .to_bn()?
            .to_dec_str()?
            .to_string();

        Ok(Self {
            subject_name,
            subject,
            issuer_name,
            serial_number,
            not_before: asn1_to_utc(certificate.not_before())?,
            not_after: asn1_to_utc(certificate.not_after())?,
            der: certificate.to_der()?,
        })
    }

    /// Parse a DER-encoded certificate into a record.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let certificate = X509::from_der(der)
            .map_err(|e| CertificateError::MalformedCertificate(e.to_string()))?;
        Self::from_x509(&certificate)
    }

    /// Rebuild the OpenSSL certificate from the stored DER bytes.
    pub fn to_x509(&self) -> Result<X509> {
        Ok(X509::from_der(&self.der)?)
    }

    /// Subject common name, or the full subject when no CN is present.
    pub fn subject_name(&self) -> &str {
        &self.subject_name
    }

    /// Full subject distinguished name, e.g. `CN=ACME LTDA, O=ACME`.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Issuer common name, or the full issuer when no CN is present.
    pub fn issuer_name(&self) -> &str {
        &self.issuer_name
    }

    /// Serial number as decimal text.
    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    /// DER encoding of the public certificate.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// `not_before <= now <= not_after`
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.not_before <= now && now <= self.not_after
    }

    /// Whole days until `not_after`, floored so that any time past expiry is negative.
    pub fn days_until_expiration(&self, now: DateTime<Utc>) -> i64 {
        (self.not_after - now)
            .num_seconds()
            .div_euclid(SECONDS_PER_DAY)
    }
}

fn asn1_to_utc(time: &Asn1TimeRef) -> Result<DateTime<Utc>> {
    let epoch = Asn1Time::from_unix(0)?;
    let diff = epoch.diff(time)?;
    let seconds = i64::from(diff.days) * SECONDS_PER_DAY + i64::from(diff.secs);
    DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
        CertificateError::MalformedCertificate(format!("timestamp {} out of range", seconds))
    })
}

fn common_name(name: &X509NameRef) -> Option<String> {
    name.entries_by_nid(Nid::COMMONNAME)
        .next()
        .and_then(|entry| entry.data().to_string().ok())
}

fn render_name(name: &X509NameRef) -> String {
    name.entries()
        .filter_map(|entry| {
            let key = entry.object().nid().short_name().ok()?;
            let value = entry.data().to_string().ok()?;
            Some(format!("{}={}", key, value))
        })
        .collect::<Vec<_>>()
        .join(", ")
}
