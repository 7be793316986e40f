use crate::cert::{
    types::{CaRecord, KeyAlgorithm, OutputArtifacts},
    verification::CertificateSummary,
};
use std::fmt::Write;

/// What the final report knows about the operation.
pub struct IssuanceReport<'a> {
    pub ca: &'a CaRecord,
    pub artifacts: &'a OutputArtifacts,
    pub summary: Option<&'a CertificateSummary>,
    pub key_algorithm: Option<KeyAlgorithm>,
    pub verification: Result<(), String>,
}

pub fn render_report(report: &IssuanceReport<'_>) -> String {
    let mut out = String::new();
    let ca = report.ca;
    let artifacts = report.artifacts;

    // Writing to a String cannot fail.
    let _ = writeln!(out, "Certificate issued successfully.\n");
    let _ = writeln!(out, "Files:");
    let _ = writeln!(out, "  Private key:     {} (mode 0400)", artifacts.private_key.display());
    let _ = writeln!(out, "  Signing request: {}", artifacts.csr.display());
    let _ = writeln!(out, "  Certificate:     {}", artifacts.certificate.display());
    let _ = writeln!(out, "  CA certificate:  {}", ca.certificate.display());
    let _ = writeln!(out, "  CA private key:  {}", ca.private_key.display());
    let _ = writeln!(out, "  CA serial:       {}", ca.serial.display());

    if let Some(summary) = report.summary {
        let _ = writeln!(out, "\nDetails:");
        let _ = writeln!(out, "  Subject:     {}", summary.subject);
        let _ = writeln!(out, "  Issuer:      {}", summary.issuer);
        let _ = writeln!(out, "  Serial:      {}", summary.serial);
        let _ = writeln!(
            out,
            "  Valid:       {} -> {} ({} days)",
            summary.not_before.format("%Y-%m-%d %H:%M:%S UTC"),
            summary.not_after.format("%Y-%m-%d %H:%M:%S UTC"),
            summary.validity_days()
        );
        if let Some(algorithm) = report.key_algorithm {
            let _ = writeln!(out, "  Key:         {}", algorithm);
        }
        if !summary.extended_key_usage.is_empty() {
            let _ = writeln!(out, "  Usage:       {}", summary.extended_key_usage.join(", "));
        }
        if !summary.subject_alt_names.is_empty() {
            let _ = writeln!(out, "  Alt names:   {}", summary.subject_alt_names.join(", "));
        }
        let _ = writeln!(out, "  SHA-256:     {}", summary.fingerprint);
    }

    match &report.verification {
        Ok(()) => {
            let _ = writeln!(out, "\nChain verification against the CA: OK");
        }
        Err(e) => {
            let _ = writeln!(out, "\nChain verification against the CA FAILED: {}", e);
        }
    }

    let _ = writeln!(out, "\nVerify with:");
    let _ = writeln!(
        out,
        "  openssl x509 -in {} -noout -text",
        artifacts.certificate.display()
    );
    let _ = writeln!(
        out,
        "  openssl verify -CAfile {} {}",
        ca.certificate.display(),
        artifacts.certificate.display()
    );
    let _ = writeln!(out, "  openssl req -in {} -noout -text", artifacts.csr.display());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::path::Path;

    fn summary() -> CertificateSummary {
        let not_before = Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap();
        CertificateSummary {
            subject: "CN=api.example.com".to_string(),
            issuer: "CN=Test Root, O=Homelab, C=US".to_string(),
            serial: "1f".to_string(),
            not_before,
            not_after: not_before + Duration::days(730),
            subject_alt_names: vec!["DNS:api.example.com".to_string(), "IP:127.0.0.1".to_string()],
            extended_key_usage: vec!["serverAuth".to_string()],
            fingerprint: "ab".repeat(32),
            is_ca: false,
        }
    }

    #[test]
    fn report_lists_every_file_and_commands() {
        let ca = CaRecord::from_prefix(Path::new("ca"));
        let artifacts = OutputArtifacts::from_prefix(Path::new("api"));
        let summary = summary();
        let text = render_report(&IssuanceReport {
            ca: &ca,
            artifacts: &artifacts,
            summary: Some(&summary),
            key_algorithm: Some(KeyAlgorithm::Rsa2048),
            verification: Ok(()),
        });

        for file in ["api.key", "api.csr", "api.crt", "ca.crt", "ca.key", "ca.srl"] {
            assert!(text.contains(file), "missing {}", file);
        }
        assert!(text.contains("(730 days)"));
        assert!(text.contains("Key:         RSA 2048"));
        assert!(text.contains("Alt names:   DNS:api.example.com, IP:127.0.0.1"));
        assert!(text.contains("openssl verify -CAfile ca.crt api.crt"));
        assert!(text.contains("Chain verification against the CA: OK"));
    }

    #[test]
    fn report_shows_failed_verification() {
        let ca = CaRecord::from_prefix(Path::new("ca"));
        let artifacts = OutputArtifacts::from_prefix(Path::new("api"));
        let text = render_report(&IssuanceReport {
            ca: &ca,
            artifacts: &artifacts,
            summary: None,
            key_algorithm: None,
            verification: Err("unable to get local issuer certificate".to_string()),
        });
        assert!(text.contains("FAILED: unable to get local issuer certificate"));
        assert!(!text.contains("Details:"));
    }
}
