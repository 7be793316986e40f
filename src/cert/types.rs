// cert/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

pub const LOOPBACK_IP: &str = "127.0.0.1";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CertificatePurpose {
    ServerAuth,
    MutualTLS,
    ClientAuthOnly,
}

impl CertificatePurpose {
    pub const ALL: [CertificatePurpose; 3] = [
        CertificatePurpose::ServerAuth,
        CertificatePurpose::MutualTLS,
        CertificatePurpose::ClientAuthOnly,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CertificatePurpose::ServerAuth => "Server authentication (TLS server)",
            CertificatePurpose::MutualTLS => "Mutual TLS (server + client)",
            CertificatePurpose::ClientAuthOnly => "Client authentication only",
        }
    }
}

/// Who a client-only certificate identifies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClientSubject {
    Machine,
    Human,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExtendedKeyUsage {
    ServerAuth,
    ClientAuth,
    EmailProtection,
}

impl ExtendedKeyUsage {
    pub fn openssl_name(&self) -> &'static str {
        match self {
            ExtendedKeyUsage::ServerAuth => "serverAuth",
            ExtendedKeyUsage::ClientAuth => "clientAuth",
            ExtendedKeyUsage::EmailProtection => "emailProtection",
        }
    }

    pub fn for_purpose(purpose: CertificatePurpose, subject: Option<ClientSubject>) -> Vec<Self> {
        match (purpose, subject) {
            (CertificatePurpose::ServerAuth, _) => vec![ExtendedKeyUsage::ServerAuth],
            (CertificatePurpose::MutualTLS, _) => {
                vec![ExtendedKeyUsage::ServerAuth, ExtendedKeyUsage::ClientAuth]
            }
            (CertificatePurpose::ClientAuthOnly, Some(ClientSubject::Human)) => vec![
                ExtendedKeyUsage::ClientAuth,
                ExtendedKeyUsage::EmailProtection,
            ],
            (CertificatePurpose::ClientAuthOnly, _) => vec![ExtendedKeyUsage::ClientAuth],
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Rsa2048,
    Rsa4096,
    EcP256,
    EcP384,
}

impl KeyAlgorithm {
    pub const ALL: [KeyAlgorithm; 4] = [
        KeyAlgorithm::Rsa2048,
        KeyAlgorithm::Rsa4096,
        KeyAlgorithm::EcP256,
        KeyAlgorithm::EcP384,
    ];

    /// Arguments handed to `openssl genpkey` after `-algorithm`.
    pub fn genpkey_args(&self) -> Vec<String> {
        match self {
            KeyAlgorithm::Rsa2048 | KeyAlgorithm::Rsa4096 => vec![
                "RSA".to_string(),
                "-pkeyopt".to_string(),
                format!("rsa_keygen_bits:{}", self.rsa_bits().unwrap_or(2048)),
            ],
            KeyAlgorithm::EcP256 | KeyAlgorithm::EcP384 => vec![
                "EC".to_string(),
                "-pkeyopt".to_string(),
                format!("ec_paramgen_curve:{}", self.curve_name().unwrap_or("P-256")),
                "-pkeyopt".to_string(),
                "ec_param_enc:named_curve".to_string(),
            ],
        }
    }

    pub fn rsa_bits(&self) -> Option<u32> {
        match self {
            KeyAlgorithm::Rsa2048 => Some(2048),
            KeyAlgorithm::Rsa4096 => Some(4096),
            _ => None,
        }
    }

    pub fn curve_name(&self) -> Option<&'static str> {
        match self {
            KeyAlgorithm::EcP256 => Some("P-256"),
            KeyAlgorithm::EcP384 => Some("P-384"),
            _ => None,
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyAlgorithm::Rsa2048 => write!(f, "RSA 2048"),
            KeyAlgorithm::Rsa4096 => write!(f, "RSA 4096"),
            KeyAlgorithm::EcP256 => write!(f, "EC P-256"),
            KeyAlgorithm::EcP384 => write!(f, "EC P-384"),
        }
    }
}

/// Paths of a certificate authority usable for signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaRecord {
    pub certificate: PathBuf,
    pub private_key: PathBuf,
    pub serial: PathBuf,
}

impl CaRecord {
    pub fn from_prefix(prefix: &Path) -> Self {
        Self {
            certificate: with_suffix(prefix, "crt"),
            private_key: with_suffix(prefix, "key"),
            serial: with_suffix(prefix, "srl"),
        }
    }

    pub fn existing(&self) -> Vec<&Path> {
        [&self.certificate, &self.private_key, &self.serial]
            .into_iter()
            .map(PathBuf::as_path)
            .filter(|p| p.exists())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct CaSubject {
    pub common_name: String,
    pub organization: String,
    pub country_code: String,
    pub validity_days: u32,
}

/// Everything needed to issue one leaf certificate. Built once by the
/// collector and only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafRequest {
    pub purpose: CertificatePurpose,
    pub client_subject: Option<ClientSubject>,
    pub common_name: String,
    pub organization: Option<String>,
    pub email: Option<String>,
    pub dns_sans: Vec<String>,
    pub ip_sans: Vec<String>,
    pub extended_key_usage: Vec<ExtendedKeyUsage>,
    pub key_algorithm: KeyAlgorithm,
    pub validity_days: u32,
    pub output_prefix: PathBuf,
}

impl LeafRequest {
    pub fn artifacts(&self) -> OutputArtifacts {
        OutputArtifacts::from_prefix(&self.output_prefix)
    }

    pub fn eku_string(&self) -> String {
        self.extended_key_usage
            .iter()
            .map(|eku| eku.openssl_name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifacts {
    pub private_key: PathBuf,
    pub csr: PathBuf,
    pub certificate: PathBuf,
}

impl OutputArtifacts {
    pub fn from_prefix(prefix: &Path) -> Self {
        Self {
            private_key: with_suffix(prefix, "key"),
            csr: with_suffix(prefix, "csr"),
            certificate: with_suffix(prefix, "crt"),
        }
    }

    pub fn existing(&self) -> Vec<&Path> {
        [&self.private_key, &self.csr, &self.certificate]
            .into_iter()
            .map(PathBuf::as_path)
            .filter(|p| p.exists())
            .collect()
    }
}

// Appends rather than replaces, so "api.example.com" keeps its dots.
fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = prefix.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purpose_maps_to_expected_eku() {
        assert_eq!(
            ExtendedKeyUsage::for_purpose(CertificatePurpose::ServerAuth, None),
            vec![ExtendedKeyUsage::ServerAuth]
        );
        assert_eq!(
            ExtendedKeyUsage::for_purpose(CertificatePurpose::MutualTLS, None),
            vec![ExtendedKeyUsage::ServerAuth, ExtendedKeyUsage::ClientAuth]
        );
        assert_eq!(
            ExtendedKeyUsage::for_purpose(
                CertificatePurpose::ClientAuthOnly,
                Some(ClientSubject::Machine)
            ),
            vec![ExtendedKeyUsage::ClientAuth]
        );
        assert_eq!(
            ExtendedKeyUsage::for_purpose(
                CertificatePurpose::ClientAuthOnly,
                Some(ClientSubject::Human)
            ),
            vec![
                ExtendedKeyUsage::ClientAuth,
                ExtendedKeyUsage::EmailProtection
            ]
        );
    }

    #[test]
    fn artifacts_keep_dotted_prefix() {
        let artifacts = OutputArtifacts::from_prefix(Path::new("out/api.example.com"));
        assert_eq!(artifacts.private_key, PathBuf::from("out/api.example.com.key"));
        assert_eq!(artifacts.csr, PathBuf::from("out/api.example.com.csr"));
        assert_eq!(artifacts.certificate, PathBuf::from("out/api.example.com.crt"));
    }

    #[test]
    fn genpkey_args_select_size_and_curve() {
        assert_eq!(
            KeyAlgorithm::Rsa4096.genpkey_args(),
            vec!["RSA", "-pkeyopt", "rsa_keygen_bits:4096"]
        );
        assert_eq!(
            KeyAlgorithm::EcP384.genpkey_args(),
            vec![
                "EC",
                "-pkeyopt",
                "ec_paramgen_curve:P-384",
                "-pkeyopt",
                "ec_param_enc:named_curve"
            ]
        );
    }
}
