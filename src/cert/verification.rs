// src/cert/verification.rs
use super::error::IssueError;
use super::types::KeyAlgorithm;
use chrono::{DateTime, TimeZone, Utc};
use openssl::{nid::Nid, pkey::Id, pkey::PKey};
use std::{
    fs, io,
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
    path::Path,
};
use x509_parser::prelude::{FromDer, GeneralName, ParsedExtension, X509Certificate};

#[derive(Debug, Clone)]
pub struct CertificateSummary {
    pub subject: String,
    pub issuer: String,
    pub serial: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub subject_alt_names: Vec<String>,
    pub extended_key_usage: Vec<String>,
    pub fingerprint: String,
    pub is_ca: bool,
}

impl CertificateSummary {
    pub fn validity_days(&self) -> i64 {
        (self.not_after - self.not_before).num_days()
    }
}

fn invalid_data(e: impl std::fmt::Display) -> IssueError {
    IssueError::Io(io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
}

pub fn inspect_certificate(path: &Path) -> Result<CertificateSummary, IssueError> {
    let cert_pem = fs::read(path)?;

    let cert_der = if cert_pem.starts_with(b"-----BEGIN CERTIFICATE-----") {
        openssl::x509::X509::from_pem(&cert_pem)
            .and_then(|cert| cert.to_der())
            .map_err(invalid_data)?
    } else {
        cert_pem
    };

    let (_remainder, cert) = X509Certificate::from_der(&cert_der).map_err(invalid_data)?;

    let not_before = Utc
        .timestamp_opt(cert.validity().not_before.timestamp(), 0)
        .single()
        .ok_or_else(|| invalid_data("Invalid not_before timestamp"))?;
    let not_after = Utc
        .timestamp_opt(cert.validity().not_after.timestamp(), 0)
        .single()
        .ok_or_else(|| invalid_data("Invalid not_after timestamp"))?;

    let mut subject_alt_names = Vec::new();
    let mut extended_key_usage = Vec::new();
    let mut is_ca = false;

    for ext in cert.extensions() {
        match ext.parsed_extension() {
            ParsedExtension::BasicConstraints(bc) => is_ca = bc.ca,
            ParsedExtension::SubjectAlternativeName(san) => {
                subject_alt_names.extend(san.general_names.iter().filter_map(describe_name));
            }
            ParsedExtension::ExtendedKeyUsage(eku) => {
                if eku.server_auth {
                    extended_key_usage.push("serverAuth".to_string());
                }
                if eku.client_auth {
                    extended_key_usage.push("clientAuth".to_string());
                }
                if eku.email_protection {
                    extended_key_usage.push("emailProtection".to_string());
                }
            }
            _ => {}
        }
    }

    Ok(CertificateSummary {
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        serial: hex::encode(cert.raw_serial()),
        not_before,
        not_after,
        subject_alt_names,
        extended_key_usage,
        fingerprint: hex::encode(
            openssl::hash::hash(openssl::hash::MessageDigest::sha256(), &cert_der)
                .map_err(invalid_data)?,
        ),
        is_ca,
    })
}

fn describe_name(name: &GeneralName) -> Option<String> {
    match name {
        GeneralName::DNSName(dns) => Some(format!("DNS:{}", dns)),
        GeneralName::RFC822Name(email) => Some(format!("email:{}", email)),
        GeneralName::IPAddress(bytes) => ip_from_bytes(bytes).map(|ip| format!("IP:{}", ip)),
        _ => None,
    }
}

fn ip_from_bytes(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => <[u8; 4]>::try_from(bytes).ok().map(|b| IpAddr::V4(Ipv4Addr::from(b))),
        16 => <[u8; 16]>::try_from(bytes).ok().map(|b| IpAddr::V6(Ipv6Addr::from(b))),
        _ => None,
    }
}

/// Reads a PEM private key and reports which of the supported algorithms it is.
pub fn inspect_private_key(path: &Path) -> Result<Option<KeyAlgorithm>, IssueError> {
    let pem = fs::read(path)?;
    let key = PKey::private_key_from_pem(&pem).map_err(invalid_data)?;

    let algorithm = match key.id() {
        Id::RSA => match key.bits() {
            2048 => Some(KeyAlgorithm::Rsa2048),
            4096 => Some(KeyAlgorithm::Rsa4096),
            _ => None,
        },
        Id::EC => {
            let ec = key.ec_key().map_err(invalid_data)?;
            match ec.group().curve_name() {
                Some(Nid::X9_62_PRIME256V1) => Some(KeyAlgorithm::EcP256),
                Some(Nid::SECP384R1) => Some(KeyAlgorithm::EcP384),
                _ => None,
            }
        }
        _ => None,
    };
    Ok(algorithm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::openssl::tests::available_tool;
    use crate::utils::logging::tests::MockLogger;

    #[test]
    fn ip_bytes_decode_both_families() {
        assert_eq!(
            ip_from_bytes(&[127, 0, 0, 1]),
            Some(IpAddr::V4(Ipv4Addr::LOCALHOST))
        );
        let mut v6 = [0u8; 16];
        v6[15] = 1;
        assert_eq!(ip_from_bytes(&v6), Some(IpAddr::V6(Ipv6Addr::LOCALHOST)));
        assert_eq!(ip_from_bytes(&[1, 2, 3]), None);
    }

    #[test]
    fn rejects_garbage_certificate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.crt");
        fs::write(&path, "-----BEGIN CERTIFICATE-----\nnope\n").unwrap();
        assert!(inspect_certificate(&path).is_err());
    }

    #[test]
    fn key_inspection_matches_every_algorithm() {
        let Some(tool) = available_tool() else { return };
        let dir = tempfile::tempdir().unwrap();
        for (i, algorithm) in KeyAlgorithm::ALL.into_iter().enumerate() {
            let path = dir.path().join(format!("key-{}.key", i));
            tool.generate_private_key(&path, algorithm, &mut MockLogger::new())
                .unwrap();
            assert_eq!(inspect_private_key(&path).unwrap(), Some(algorithm));
        }
    }
}
