// src/cert/openssl.rs
use super::error::{IssueError, IssueStep};
use super::types::KeyAlgorithm;
use crate::utils::logging::Logger;
use std::{
    ffi::{OsStr, OsString},
    fs, io,
    path::{Path, PathBuf},
    process::{Command, Output},
};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{message}")]
pub struct OpenSSLError {
    pub message: String,
    pub stdout: String,
    pub stderr: String,
}

impl OpenSSLError {
    fn from_output(message: String, output: &Output) -> Self {
        Self {
            message,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

/// Thin wrapper around the `openssl` command-line tool.
#[derive(Debug, Clone)]
pub struct OpenSslTool {
    program: PathBuf,
}

impl OpenSslTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Confirms the binary can be executed and returns its version banner.
    pub fn probe(&self, logger: &mut dyn Logger) -> Result<String, IssueError> {
        let output = self.run(IssueStep::Preflight, ["version"], logger)?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// RSA key for a certificate authority, restricted to owner-read.
    pub fn generate_rsa_key(
        &self,
        path: &Path,
        key_size: u32,
        logger: &mut dyn Logger,
    ) -> Result<(), IssueError> {
        logger.debug_log(&format!("Generating RSA private key: {}", path.display()));
        ensure_parent(path)?;

        let bits = key_size.to_string();
        self.run(
            IssueStep::GenerateCaKey,
            [OsStr::new("genrsa"), OsStr::new("-out"), path.as_os_str(), OsStr::new(&bits)],
            logger,
        )?;

        restrict_to_owner_read(path)?;
        logger.debug_log(&format!("Successfully generated private key: {}", path.display()));
        Ok(())
    }

    /// Leaf key for the chosen algorithm, restricted to owner-read.
    pub fn generate_private_key(
        &self,
        path: &Path,
        algorithm: KeyAlgorithm,
        logger: &mut dyn Logger,
    ) -> Result<(), IssueError> {
        logger.debug_log(&format!(
            "Generating {} private key: {}",
            algorithm,
            path.display()
        ));
        ensure_parent(path)?;

        let mut args: Vec<OsString> = vec!["genpkey".into(), "-algorithm".into()];
        args.extend(algorithm.genpkey_args().into_iter().map(OsString::from));
        args.extend([OsString::from("-out"), path.as_os_str().to_os_string()]);
        self.run(IssueStep::GenerateKey, &args, logger)?;

        restrict_to_owner_read(path)?;
        logger.debug_log(&format!("Successfully generated private key: {}", path.display()));
        Ok(())
    }

    /// Self-signs a CA certificate using a rendered request config that
    /// carries the subject and the `v3_ca` extensions.
    pub fn self_sign_ca(
        &self,
        key_path: &Path,
        cert_path: &Path,
        config_path: &Path,
        validity_days: u32,
        logger: &mut dyn Logger,
    ) -> Result<(), IssueError> {
        logger.debug_log(&format!("Self-signing CA certificate: {}", cert_path.display()));

        let days = validity_days.to_string();
        self.run(
            IssueStep::SelfSignCa,
            [
                OsStr::new("req"),
                OsStr::new("-x509"),
                OsStr::new("-new"),
                OsStr::new("-sha256"),
                OsStr::new("-key"),
                key_path.as_os_str(),
                OsStr::new("-days"),
                OsStr::new(&days),
                OsStr::new("-config"),
                config_path.as_os_str(),
                OsStr::new("-out"),
                cert_path.as_os_str(),
            ],
            logger,
        )?;

        logger.debug_log(&format!("Successfully self-signed: {}", cert_path.display()));
        Ok(())
    }

    pub fn generate_csr(
        &self,
        key_path: &Path,
        csr_path: &Path,
        subject: &str,
        logger: &mut dyn Logger,
    ) -> Result<(), IssueError> {
        logger.debug_log(&format!("Generating CSR: {}", csr_path.display()));

        // Validate key exists
        if !key_path.exists() {
            return Err(IssueError::MissingFile(key_path.to_path_buf()));
        }

        self.run(
            IssueStep::GenerateCsr,
            [
                OsStr::new("req"),
                OsStr::new("-new"),
                OsStr::new("-key"),
                key_path.as_os_str(),
                OsStr::new("-out"),
                csr_path.as_os_str(),
                OsStr::new("-subj"),
                OsStr::new(subject),
                OsStr::new("-batch"),
            ],
            logger,
        )?;

        logger.debug_log(&format!("Successfully generated CSR: {}", csr_path.display()));
        Ok(())
    }

    /// Signs a CSR with the CA, advancing the CA serial file. The serial file
    /// is created on first use.
    #[allow(clippy::too_many_arguments)]
    pub fn sign_certificate(
        &self,
        csr_path: &Path,
        cert_path: &Path,
        ca_cert: &Path,
        ca_key: &Path,
        ca_serial: &Path,
        policy_path: &Path,
        validity_days: u32,
        logger: &mut dyn Logger,
    ) -> Result<(), IssueError> {
        for required in [ca_cert, ca_key] {
            if !required.exists() {
                return Err(IssueError::MissingFile(required.to_path_buf()));
            }
        }

        logger.debug_log(&format!("Signing certificate: {}", cert_path.display()));

        let days = validity_days.to_string();
        self.run(
            IssueStep::Sign,
            [
                OsStr::new("x509"),
                OsStr::new("-req"),
                OsStr::new("-in"),
                csr_path.as_os_str(),
                OsStr::new("-CA"),
                ca_cert.as_os_str(),
                OsStr::new("-CAkey"),
                ca_key.as_os_str(),
                OsStr::new("-CAserial"),
                ca_serial.as_os_str(),
                OsStr::new("-CAcreateserial"),
                OsStr::new("-out"),
                cert_path.as_os_str(),
                OsStr::new("-days"),
                OsStr::new(&days),
                OsStr::new("-sha256"),
                OsStr::new("-extfile"),
                policy_path.as_os_str(),
                OsStr::new("-extensions"),
                OsStr::new(super::policy::EXTENSIONS_SECTION),
            ],
            logger,
        )?;

        logger.debug_log(&format!("Successfully signed certificate: {}", cert_path.display()));
        Ok(())
    }

    /// Standard chain validation of `cert_path` against `ca_cert`.
    pub fn verify_certificate(
        &self,
        cert_path: &Path,
        ca_cert: &Path,
        logger: &mut dyn Logger,
    ) -> Result<(), IssueError> {
        logger.debug_log(&format!("Verifying against CA: {}", ca_cert.display()));
        self.run(
            IssueStep::Verify,
            [
                OsStr::new("verify"),
                OsStr::new("-CAfile"),
                ca_cert.as_os_str(),
                cert_path.as_os_str(),
            ],
            logger,
        )?;
        logger.debug_log(&format!("Certificate verified successfully: {}", cert_path.display()));
        Ok(())
    }

    fn run<I, S>(&self, step: IssueStep, args: I, logger: &mut dyn Logger) -> Result<Output, IssueError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        logger.debug_log(&format!("Executing OpenSSL command: {:?}", cmd));

        let output = cmd.output().map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                IssueError::MissingTool(self.program.display().to_string())
            } else {
                IssueError::Io(e)
            }
        })?;

        if !output.status.success() {
            let error = OpenSSLError::from_output(
                format!("openssl exited with {}", output.status),
                &output,
            );
            logger.debug_log(&format!(
                "stdout: {}\nstderr: {}",
                error.stdout, error.stderr
            ));
            return Err(IssueError::tool(step, error));
        }

        Ok(output)
    }
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

pub fn restrict_to_owner_read(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o400))?;
    }
    #[cfg(not(unix))]
    {
        let mut permissions = fs::metadata(path)?.permissions();
        permissions.set_readonly(true);
        fs::set_permissions(path, permissions)?;
    }
    Ok(())
}

/// Builds a `-subj` argument, escaping characters that `openssl req` treats as
/// separators.
pub fn subject_argument(common_name: &str, email: Option<&str>) -> String {
    let mut subject = format!("/CN={}", escape_subject_value(common_name));
    if let Some(email) = email {
        subject.push_str(&format!("/emailAddress={}", escape_subject_value(email)));
    }
    subject
}

fn escape_subject_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '/' | '+') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
