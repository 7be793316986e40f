// src/cert/operations.rs
use super::ca::scratch_dir;
use super::error::IssueError;
use super::openssl::{subject_argument, OpenSslTool};
use super::policy::render_leaf_policy;
use super::types::{CaRecord, LeafRequest, OutputArtifacts};
use crate::utils::{logging::Logger, scoped::ScopedFile};
use std::{fs, io};

/// Issues leaf certificates from one CA.
///
/// Every signature advances the CA serial file through `openssl`. Two
/// processes signing with the same serial file at once can reuse a serial;
/// this is not guarded against.
pub struct CertificateOperations<'a> {
    tool: &'a OpenSslTool,
    ca: &'a CaRecord,
}

impl<'a> CertificateOperations<'a> {
    pub fn new(tool: &'a OpenSslTool, ca: &'a CaRecord) -> Self {
        Self { tool, ca }
    }

    /// Removes artifacts from an earlier run the operator agreed to replace.
    /// The old key is owner-read-only, which `openssl` cannot overwrite.
    pub fn clear_previous_artifacts(
        &self,
        artifacts: &OutputArtifacts,
        logger: &mut dyn Logger,
    ) -> Result<(), IssueError> {
        for path in artifacts.existing() {
            logger.log(&format!("Replacing existing {}", path.display()));
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    pub fn generate_key(
        &self,
        request: &LeafRequest,
        logger: &mut dyn Logger,
    ) -> Result<(), IssueError> {
        let artifacts = request.artifacts();
        logger.log(&format!(
            "Generating {} private key: {}",
            request.key_algorithm,
            artifacts.private_key.display()
        ));
        self.tool
            .generate_private_key(&artifacts.private_key, request.key_algorithm, logger)
    }

    pub fn generate_csr(
        &self,
        request: &LeafRequest,
        logger: &mut dyn Logger,
    ) -> Result<(), IssueError> {
        let artifacts = request.artifacts();
        logger.log(&format!("Generating CSR: {}", artifacts.csr.display()));
        let subject = subject_argument(&request.common_name, request.email.as_deref());
        self.tool
            .generate_csr(&artifacts.private_key, &artifacts.csr, &subject, logger)
    }

    /// Writes the signing policy next to the output files. The returned guard
    /// deletes it when dropped.
    pub fn render_policy(
        &self,
        request: &LeafRequest,
        logger: &mut dyn Logger,
    ) -> Result<ScopedFile, IssueError> {
        let policy = render_leaf_policy(request);
        let file = ScopedFile::create(&scratch_dir(&request.output_prefix), "policy", &policy)?;
        logger.debug_log(&format!(
            "Rendered signing policy {}:\n{}",
            file.path().display(),
            policy
        ));
        Ok(file)
    }

    pub fn sign(
        &self,
        request: &LeafRequest,
        policy: &ScopedFile,
        logger: &mut dyn Logger,
    ) -> Result<OutputArtifacts, IssueError> {
        let artifacts = request.artifacts();
        logger.log(&format!(
            "Signing certificate with {}",
            self.ca.certificate.display()
        ));
        self.tool.sign_certificate(
            &artifacts.csr,
            &artifacts.certificate,
            &self.ca.certificate,
            &self.ca.private_key,
            &self.ca.serial,
            policy.path(),
            request.validity_days,
            logger,
        )?;
        Ok(artifacts)
    }

    pub fn verify(
        &self,
        artifacts: &OutputArtifacts,
        logger: &mut dyn Logger,
    ) -> Result<(), IssueError> {
        self.tool
            .verify_certificate(&artifacts.certificate, &self.ca.certificate, logger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::ca::generate_root_ca;
    use crate::cert::openssl::tests::available_tool;
    use crate::cert::types::{
        CaSubject, CertificatePurpose, ClientSubject, ExtendedKeyUsage, KeyAlgorithm,
    };
    use crate::cert::verification::{inspect_certificate, inspect_private_key};
    use crate::utils::logging::tests::MockLogger;
    use std::path::Path;

    fn test_ca(tool: &OpenSslTool, dir: &Path) -> CaRecord {
        let subject = CaSubject {
            common_name: "Test Root".to_string(),
            organization: "Homelab".to_string(),
            country_code: "US".to_string(),
            validity_days: 9125,
        };
        generate_root_ca(tool, &subject, &dir.join("ca"), &mut MockLogger::new()).unwrap()
    }

    fn server_request(dir: &Path, prefix: &str) -> LeafRequest {
        LeafRequest {
            purpose: CertificatePurpose::ServerAuth,
            client_subject: None,
            common_name: "api.example.com".to_string(),
            organization: None,
            email: None,
            dns_sans: vec!["api.example.com".to_string()],
            ip_sans: vec!["127.0.0.1".to_string()],
            extended_key_usage: vec![ExtendedKeyUsage::ServerAuth],
            key_algorithm: KeyAlgorithm::Rsa2048,
            validity_days: 730,
            output_prefix: dir.join(prefix),
        }
    }

    /// Key, CSR, policy and signature in the order the workflow runs them.
    fn issue(
        ops: &CertificateOperations<'_>,
        request: &LeafRequest,
        logger: &mut dyn Logger,
    ) -> Result<OutputArtifacts, IssueError> {
        ops.generate_key(request, logger)?;
        ops.generate_csr(request, logger)?;
        let policy = ops.render_policy(request, logger)?;
        ops.sign(request, &policy, logger)
    }

    fn leftover_policies(dir: &Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(".policy-"))
            .count()
    }

    #[test]
    fn server_certificate_end_to_end() {
        let Some(tool) = available_tool() else { return };
        let dir = tempfile::tempdir().unwrap();
        let ca = test_ca(&tool, dir.path());
        let ops = CertificateOperations::new(&tool, &ca);
        let mut logger = MockLogger::new();

        let request = server_request(dir.path(), "api");
        let artifacts = issue(&ops, &request, &mut logger).unwrap();
        ops.verify(&artifacts, &mut logger).unwrap();

        assert!(artifacts.csr.exists());
        assert!(ca.serial.exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&artifacts.private_key).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o400);
        }

        let summary = inspect_certificate(&artifacts.certificate).unwrap();
        assert_eq!(
            summary.subject_alt_names,
            vec!["DNS:api.example.com", "IP:127.0.0.1"]
        );
        assert_eq!(summary.extended_key_usage, vec!["serverAuth"]);
        assert!(!summary.is_ca);
        assert!((729..=731).contains(&summary.validity_days()));
        assert_eq!(leftover_policies(dir.path()), 0);
    }

    #[test]
    fn human_client_certificate_carries_email() {
        let Some(tool) = available_tool() else { return };
        let dir = tempfile::tempdir().unwrap();
        let ca = test_ca(&tool, dir.path());
        let ops = CertificateOperations::new(&tool, &ca);

        let request = LeafRequest {
            purpose: CertificatePurpose::ClientAuthOnly,
            client_subject: Some(ClientSubject::Human),
            common_name: "Jane Doe".to_string(),
            email: Some("jane@example.com".to_string()),
            dns_sans: vec![],
            ip_sans: vec![],
            extended_key_usage: vec![
                ExtendedKeyUsage::ClientAuth,
                ExtendedKeyUsage::EmailProtection,
            ],
            key_algorithm: KeyAlgorithm::EcP256,
            ..server_request(dir.path(), "jane")
        };
        let artifacts = issue(&ops, &request, &mut MockLogger::new()).unwrap();

        let summary = inspect_certificate(&artifacts.certificate).unwrap();
        assert!(summary.subject.contains("jane@example.com"));
        assert_eq!(summary.subject_alt_names, vec!["email:jane@example.com"]);
        assert_eq!(
            summary.extended_key_usage,
            vec!["clientAuth", "emailProtection"]
        );
        assert_eq!(
            inspect_private_key(&artifacts.private_key).unwrap(),
            Some(KeyAlgorithm::EcP256)
        );
    }

    #[test]
    fn apostrophe_email_matches_in_subject_and_san() {
        let Some(tool) = available_tool() else { return };
        let dir = tempfile::tempdir().unwrap();
        let ca = test_ca(&tool, dir.path());
        let ops = CertificateOperations::new(&tool, &ca);

        let request = LeafRequest {
            purpose: CertificatePurpose::ClientAuthOnly,
            client_subject: Some(ClientSubject::Human),
            common_name: "Pat O'Brien".to_string(),
            email: Some("pat.o'brien@example.com".to_string()),
            dns_sans: vec![],
            ip_sans: vec![],
            extended_key_usage: vec![
                ExtendedKeyUsage::ClientAuth,
                ExtendedKeyUsage::EmailProtection,
            ],
            key_algorithm: KeyAlgorithm::EcP256,
            ..server_request(dir.path(), "pat")
        };
        let artifacts = issue(&ops, &request, &mut MockLogger::new()).unwrap();

        let summary = inspect_certificate(&artifacts.certificate).unwrap();
        assert!(summary.subject.contains("pat.o'brien@example.com"));
        assert_eq!(summary.subject_alt_names, vec!["email:pat.o'brien@example.com"]);
    }

    #[test]
    fn organization_does_not_change_issued_subject() {
        let Some(tool) = available_tool() else { return };
        let dir = tempfile::tempdir().unwrap();
        let ca = test_ca(&tool, dir.path());
        let ops = CertificateOperations::new(&tool, &ca);

        let request = LeafRequest {
            organization: Some("Homelab Ops".to_string()),
            ..server_request(dir.path(), "api")
        };
        let artifacts = issue(&ops, &request, &mut MockLogger::new()).unwrap();

        let summary = inspect_certificate(&artifacts.certificate).unwrap();
        assert!(summary.subject.contains("api.example.com"));
        assert!(!summary.subject.contains("Homelab Ops"));
    }

    #[test]
    fn repeated_issuance_uses_distinct_serials() {
        let Some(tool) = available_tool() else { return };
        let dir = tempfile::tempdir().unwrap();
        let ca = test_ca(&tool, dir.path());
        let ops = CertificateOperations::new(&tool, &ca);
        let mut logger = MockLogger::new();

        let first = issue(&ops, &server_request(dir.path(), "one"), &mut logger).unwrap();
        let second = issue(&ops, &server_request(dir.path(), "two"), &mut logger).unwrap();

        let a = inspect_certificate(&first.certificate).unwrap();
        let b = inspect_certificate(&second.certificate).unwrap();
        assert_ne!(a.serial, b.serial);
    }

    #[test]
    fn failed_signing_keeps_artifacts_and_removes_policy() {
        let Some(tool) = available_tool() else { return };
        let dir = tempfile::tempdir().unwrap();
        let ca = test_ca(&tool, dir.path());
        // A CA key that does not match the certificate makes signing fail.
        let broken = CaRecord {
            private_key: dir.path().join("ca.crt"),
            ..ca.clone()
        };
        let ops = CertificateOperations::new(&tool, &broken);

        let request = server_request(dir.path(), "api");
        let err = issue(&ops, &request, &mut MockLogger::new()).unwrap_err();
        assert!(matches!(
            err,
            IssueError::ToolInvocation {
                step: crate::cert::error::IssueStep::Sign,
                ..
            }
        ));
        let artifacts = request.artifacts();
        assert!(artifacts.private_key.exists());
        assert!(artifacts.csr.exists());
        assert_eq!(leftover_policies(dir.path()), 0);
    }

    #[test]
    fn clearing_removes_only_existing_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let tool = OpenSslTool::new("openssl");
        let ca = CaRecord::from_prefix(&dir.path().join("ca"));
        let ops = CertificateOperations::new(&tool, &ca);

        let request = server_request(dir.path(), "api");
        let artifacts = request.artifacts();
        fs::write(&artifacts.csr, "old").unwrap();

        ops.clear_previous_artifacts(&artifacts, &mut MockLogger::new())
            .unwrap();
        assert!(artifacts.existing().is_empty());
    }
}
