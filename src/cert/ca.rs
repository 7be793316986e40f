use super::{
    error::IssueError,
    openssl::OpenSslTool,
    policy::render_ca_config,
    types::{CaRecord, CaSubject},
};
use crate::utils::{logging::Logger, scoped::ScopedFile};
use glob::glob;
use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};

pub const CA_KEY_SIZE: u32 = 4096;

/// Creates a self-signed root CA at `<prefix>.crt` / `<prefix>.key`. The
/// serial file path is reserved but left for the first signature to create.
///
/// Never replaces an existing CA: any of the three files already present is
/// `ExistingFile`. Callers clear them with [`remove_ca_files`] first.
pub fn generate_root_ca(
    tool: &OpenSslTool,
    subject: &CaSubject,
    prefix: &Path,
    logger: &mut dyn Logger,
) -> Result<CaRecord, IssueError> {
    logger.log(&format!(
        "Generating root CA '{}' ({} days)...",
        subject.common_name, subject.validity_days
    ));

    let record = CaRecord::from_prefix(prefix);
    if let Some(existing) = record.existing().first() {
        return Err(IssueError::ExistingFile(existing.to_path_buf()));
    }

    tool.generate_rsa_key(&record.private_key, CA_KEY_SIZE, logger)?;

    let work_dir = scratch_dir(prefix);
    let config = ScopedFile::create(&work_dir, "ca-request", &render_ca_config(subject))?;
    tool.self_sign_ca(
        &record.private_key,
        &record.certificate,
        config.path(),
        subject.validity_days,
        logger,
    )?;

    logger.log(&format!(
        "Root CA certificate generated: {}",
        record.certificate.display()
    ));
    Ok(record)
}

/// Deletes the files of a CA the operator agreed to replace, including its
/// serial file so the new CA does not continue the old counter.
pub fn remove_ca_files(record: &CaRecord, logger: &mut dyn Logger) -> Result<(), IssueError> {
    for path in record.existing() {
        logger.log(&format!("Removing previous CA file {}", path.display()));
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Checks that `path` is a regular file this process can open for reading.
pub fn validate_ca_file(path: &Path) -> Result<PathBuf, IssueError> {
    let missing = || IssueError::MissingFile(path.to_path_buf());

    let metadata = fs::metadata(path).map_err(|_| missing())?;
    if !metadata.is_file() {
        return Err(missing());
    }
    File::open(path).map_err(|_| missing())?;
    Ok(path.to_path_buf())
}

pub fn validate_existing_ca(
    certificate: &Path,
    private_key: &Path,
    serial: &Path,
) -> Result<CaRecord, IssueError> {
    Ok(CaRecord {
        certificate: validate_ca_file(certificate)?,
        private_key: validate_ca_file(private_key)?,
        serial: validate_ca_file(serial)?,
    })
}

/// `*.crt` files in `dir`, offered as hints when picking an existing CA.
pub fn find_candidate_certificates(dir: &Path) -> Vec<PathBuf> {
    let pattern = dir.join("*.crt");
    let Some(pattern) = pattern.to_str() else {
        return Vec::new();
    };

    let mut found: Vec<PathBuf> = glob(pattern)
        .map(|entries| entries.filter_map(Result::ok).filter(|p| p.is_file()).collect())
        .unwrap_or_default();
    found.sort();
    found
}

/// Default key/serial paths that sit next to a CA certificate.
pub fn sibling_paths(certificate: &Path) -> (PathBuf, PathBuf) {
    (
        certificate.with_extension("key"),
        certificate.with_extension("srl"),
    )
}

pub(crate) fn scratch_dir(prefix: &Path) -> PathBuf {
    match prefix.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
