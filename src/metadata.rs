use crate::certificate_record::CertificateRecord;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Diagnostic summary of the loaded certificate, as served to health checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateMetadata {
    pub subject: String,
    pub issuer: String,
    /// Decimal serial number.
    pub serial_number: String,
    /// ISO-8601 UTC, e.g. `2024-01-01T00:00:00Z`.
    pub valid_from: String,
    pub valid_until: String,
    pub is_valid: bool,
    /// Negative once expired.
    pub days_until_expiration: i64,
}

impl CertificateMetadata {
    pub fn from_record(record: &CertificateRecord, now: DateTime<Utc>) -> Self {
        Self {
            subject: record.subject_name().to_string(),
            issuer: record.issuer_name().to_string(),
            serial_number: record.serial_number().to_string(),
            valid_from: iso8601(record.not_before()),
            valid_until: iso8601(record.not_after()),
            is_valid: record.is_valid(now),
            days_until_expiration: record.days_until_expiration(now),
        }
    }
}

fn iso8601(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{self_signed, utc, ACME_NOT_AFTER, ACME_NOT_BEFORE};

    #[test]
    fn test_metadata_fields() {
        let (_key, cert) = self_signed("ACME LTDA", ACME_NOT_BEFORE, ACME_NOT_AFTER, 31337);
        let record = CertificateRecord::from_x509(&cert).unwrap();

        let metadata = CertificateMetadata::from_record(&record, utc("2025-01-01T00:00:00Z"));
        assert_eq!(metadata.subject, "ACME LTDA");
        assert_eq!(metadata.issuer, "ACME LTDA");
        assert_eq!(metadata.serial_number, "31337");
        assert_eq!(metadata.valid_from, "2024-01-01T00:00:00Z");
        assert_eq!(metadata.valid_until, "2026-01-01T00:00:00Z");
        assert!(metadata.is_valid);
        assert_eq!(metadata.days_until_expiration, 365);
    }

    #[test]
    fn test_serializes_to_json() {
        let (_key, cert) = self_signed("ACME LTDA", ACME_NOT_BEFORE, ACME_NOT_AFTER, 1);
        let record = CertificateRecord::from_x509(&cert).unwrap();

        let metadata = CertificateMetadata::from_record(&record, utc("2026-06-01T00:00:00Z"));
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["is_valid"], false);
        assert_eq!(json["days_until_expiration"], -151);
        assert_eq!(json["valid_until"], "2026-01-01T00:00:00Z");
    }
}
