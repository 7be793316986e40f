// config/types.rs
use crate::cert::types::KeyAlgorithm;
use serde::{Deserialize, Serialize};
use std::{fs, io};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CaDefaults {
    pub common_name: String,
    pub organization: String,
    pub country_code: String,
    pub validity_days: u32,
    pub file_prefix: String,
}

impl Default for CaDefaults {
    fn default() -> Self {
        Self {
            common_name: "Homelab Root CA".to_string(),
            organization: "Homelab".to_string(),
            country_code: "US".to_string(),
            validity_days: 9125,
            file_prefix: "ca".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LeafDefaults {
    pub validity_days: u32,
    pub key_algorithm: KeyAlgorithm,
    /// Recorded in the signing policy's subject section. The issued subject
    /// comes from the CSR and carries only CN and email.
    pub organization: Option<String>,
}

impl Default for LeafDefaults {
    fn default() -> Self {
        Self {
            validity_days: 730,
            key_algorithm: KeyAlgorithm::Rsa2048,
            organization: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IssuerConfig {
    pub openssl_path: String,
    pub log_file: String,
    pub ca: CaDefaults,
    pub leaf: LeafDefaults,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            openssl_path: "openssl".to_string(),
            log_file: default_log_file(),
            ca: CaDefaults::default(),
            leaf: LeafDefaults::default(),
        }
    }
}

fn default_log_file() -> String {
    dirs::data_local_dir()
        .map(|dir| dir.join("homelab-certs").join("issue.log"))
        .and_then(|path| path.to_str().map(str::to_string))
        .unwrap_or_else(|| "logs/issue.log".to_string())
}

impl IssuerConfig {
    pub fn load_from_file(path: &str) -> io::Result<Self> {
        let config_str = fs::read_to_string(shellexpand::tilde(path).to_string())?;
        serde_json::from_str(&config_str).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Falls back to defaults when the file does not exist; a file that exists
    /// but cannot be parsed is still an error.
    pub fn load_or_default(path: &str) -> io::Result<Self> {
        match Self::load_from_file(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            other => other,
        }
    }

    pub fn save_to_file(&self, path: &str) -> io::Result<()> {
        let config_str = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, config_str)
    }

    pub fn validate(&self) -> io::Result<()> {
        let invalid = |message: String| io::Error::new(io::ErrorKind::InvalidInput, message);

        if self.openssl_path.trim().is_empty() {
            return Err(invalid("openssl_path must not be empty".to_string()));
        }
        if self.ca.validity_days == 0 || self.leaf.validity_days == 0 {
            return Err(invalid("validity_days must be positive".to_string()));
        }
        let code = &self.ca.country_code;
        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid(format!("country_code must be two letters: {}", code)));
        }
        if self.ca.file_prefix.trim().is_empty() {
            return Err(invalid("ca.file_prefix must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn openssl_program(&self) -> String {
        shellexpand::tilde(&self.openssl_path).to_string()
    }

    pub fn log_file_path(&self) -> String {
        shellexpand::tilde(&self.log_file).to_string()
    }
}
