// src/ui/collector.rs
use super::prompt::{parse_email, parse_ip_list, parse_list, Prompter};
use crate::cert::{
    ca::{find_candidate_certificates, sibling_paths, validate_ca_file},
    error::IssueError,
    types::{
        CaRecord, CaSubject, CertificatePurpose, ClientSubject, ExtendedKeyUsage, KeyAlgorithm,
        LeafRequest, OutputArtifacts, LOOPBACK_IP,
    },
};
use crate::config::{CaDefaults, LeafDefaults};
use std::{
    io::{BufRead, Write},
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaChoice {
    UseExisting,
    GenerateNew,
}

pub fn collect_ca_choice<R: BufRead, W: Write>(
    p: &mut Prompter<R, W>,
) -> Result<CaChoice, IssueError> {
    p.heading("Certificate Authority")?;
    p.choose(
        "Which CA should sign the certificate?",
        &[
            (CaChoice::UseExisting, "Use an existing CA"),
            (CaChoice::GenerateNew, "Generate a new root CA"),
        ],
        0,
    )
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

/// Asks for a path until it names a readable regular file.
fn ask_existing_file<R: BufRead, W: Write>(
    p: &mut Prompter<R, W>,
    label: &str,
    default: Option<&Path>,
) -> Result<PathBuf, IssueError> {
    let default = default.map(|d| d.display().to_string());
    loop {
        let answer = p.ask_required(label, default.as_deref())?;
        match validate_ca_file(&expand(&answer)) {
            Ok(path) => return Ok(path),
            Err(e) if e.is_recoverable() => p.warn(&e.to_string())?,
            Err(e) => return Err(e),
        }
    }
}

pub fn collect_existing_ca<R: BufRead, W: Write>(
    p: &mut Prompter<R, W>,
    search_dir: &Path,
) -> Result<CaRecord, IssueError> {
    let candidates = find_candidate_certificates(search_dir);
    if !candidates.is_empty() {
        p.say("Certificates found in the working directory:")?;
        for candidate in &candidates {
            p.say(&format!("  {}", candidate.display()))?;
        }
    }

    let first = candidates.first().map(PathBuf::as_path);
    let certificate = ask_existing_file(p, "CA certificate path", first)?;
    let (key_default, serial_default) = sibling_paths(&certificate);
    let private_key = ask_existing_file(p, "CA private key path", Some(key_default.as_path()))?;
    let serial = ask_existing_file(p, "CA serial file path", Some(serial_default.as_path()))?;

    Ok(CaRecord {
        certificate,
        private_key,
        serial,
    })
}

/// Subject of a new root CA and the prefix its files are written under.
pub fn collect_ca_subject<R: BufRead, W: Write>(
    p: &mut Prompter<R, W>,
    defaults: &CaDefaults,
) -> Result<(CaSubject, PathBuf), IssueError> {
    let common_name = p.ask_required("CA Common Name", Some(defaults.common_name.as_str()))?;
    let organization = p.ask_required("CA Organization", Some(defaults.organization.as_str()))?;
    let country_code = p.ask_until("CA Country code", Some(defaults.country_code.as_str()), |answer| {
        let code = answer.trim().to_ascii_uppercase();
        if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(code)
        } else {
            Err(super::prompt::InputError::InvalidChoice(answer.to_string()))
        }
    })?;
    let prefix = collect_ca_prefix(p, &defaults.file_prefix)?;

    Ok((
        CaSubject {
            common_name,
            organization,
            country_code,
            validity_days: defaults.validity_days,
        },
        prefix,
    ))
}

/// Like [`collect_output_prefix`], but for the CA files. Replacing a CA
/// leaves every certificate it signed without a verifiable issuer.
fn collect_ca_prefix<R: BufRead, W: Write>(
    p: &mut Prompter<R, W>,
    default: &str,
) -> Result<PathBuf, IssueError> {
    loop {
        let prefix = expand(&p.ask_required("CA file prefix", Some(default))?);
        let existing = CaRecord::from_prefix(&prefix)
            .existing()
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>();
        if existing.is_empty() {
            return Ok(prefix);
        }
        p.warn(&format!(
            "a CA already exists: {}; certificates it issued will no longer verify",
            existing.join(", ")
        ))?;
        if p.confirm("Replace the existing CA?", false)? {
            return Ok(prefix);
        }
    }
}

pub fn collect_purpose<R: BufRead, W: Write>(
    p: &mut Prompter<R, W>,
) -> Result<(CertificatePurpose, Option<ClientSubject>), IssueError> {
    p.heading("Certificate Purpose")?;
    let options: Vec<(CertificatePurpose, &str)> = CertificatePurpose::ALL
        .iter()
        .map(|purpose| (*purpose, purpose.label()))
        .collect();
    let purpose = p.choose("What will the certificate be used for?", &options, 0)?;

    let subject = match purpose {
        CertificatePurpose::ClientAuthOnly => Some(p.choose(
            "Who is the client?",
            &[
                (ClientSubject::Machine, "A machine or service"),
                (ClientSubject::Human, "A person (adds email protection)"),
            ],
            0,
        )?),
        _ => None,
    };
    Ok((purpose, subject))
}

/// Subject, SAN, output and key parameters; everything except validity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectDetails {
    pub common_name: String,
    pub email: Option<String>,
    pub dns_sans: Vec<String>,
    pub ip_sans: Vec<String>,
    pub output_prefix: PathBuf,
    pub key_algorithm: KeyAlgorithm,
}

pub fn collect_subject_and_sans<R: BufRead, W: Write>(
    p: &mut Prompter<R, W>,
    purpose: CertificatePurpose,
    client: Option<ClientSubject>,
    defaults: &LeafDefaults,
) -> Result<SubjectDetails, IssueError> {
    p.heading("Subject")?;
    let common_name = p.ask_required("Common Name (CN)", None)?;

    let (email, dns_sans, ip_sans) = match (purpose, client) {
        (CertificatePurpose::ClientAuthOnly, Some(ClientSubject::Human)) => {
            let email = p.ask_until("Email address (optional)", None, parse_email)?;
            (email, Vec::new(), Vec::new())
        }
        (CertificatePurpose::ClientAuthOnly, _) => {
            let dns = parse_list(&p.ask("DNS names, comma separated (optional)", None)?);
            let ips = p.ask_until("IP addresses, comma separated (optional)", None, parse_ip_list)?;
            (None, dns, with_loopback(ips))
        }
        _ => {
            let dns = parse_list(&p.ask("DNS names, comma separated", Some(common_name.as_str()))?);
            let ips = p.ask_until("IP addresses, comma separated (optional)", None, parse_ip_list)?;
            (None, dns, with_loopback(ips))
        }
    };

    p.heading("Output")?;
    let output_prefix = collect_output_prefix(p)?;

    let options: Vec<(KeyAlgorithm, String)> = KeyAlgorithm::ALL
        .iter()
        .map(|algorithm| (*algorithm, algorithm.to_string()))
        .collect();
    let labels: Vec<(KeyAlgorithm, &str)> =
        options.iter().map(|(a, label)| (*a, label.as_str())).collect();
    let default_index = KeyAlgorithm::ALL
        .iter()
        .position(|a| *a == defaults.key_algorithm)
        .unwrap_or(0);
    let key_algorithm = p.choose("Key algorithm", &labels, default_index)?;

    Ok(SubjectDetails {
        common_name,
        email,
        dns_sans,
        ip_sans,
        output_prefix,
        key_algorithm,
    })
}

/// Re-prompts until the prefix is non-empty and, if its files already exist,
/// the operator agrees to replace them.
fn collect_output_prefix<R: BufRead, W: Write>(
    p: &mut Prompter<R, W>,
) -> Result<PathBuf, IssueError> {
    loop {
        let prefix = expand(&p.ask_required("Output file prefix", None)?);
        let existing = OutputArtifacts::from_prefix(&prefix)
            .existing()
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>();
        if existing.is_empty() {
            return Ok(prefix);
        }
        p.warn(&format!("already present: {}", existing.join(", ")))?;
        if p.confirm("Replace the existing files?", false)? {
            return Ok(prefix);
        }
    }
}

pub fn collect_validity<R: BufRead, W: Write>(
    p: &mut Prompter<R, W>,
    defaults: &LeafDefaults,
) -> Result<u32, IssueError> {
    p.ask_days("Validity period in days", defaults.validity_days)
}

/// Puts `127.0.0.1` first and drops repeats, keeping first-seen order.
pub fn with_loopback(ips: Vec<String>) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(ips.len() + 1);
    for ip in std::iter::once(LOOPBACK_IP.to_string()).chain(ips) {
        if !merged.contains(&ip) {
            merged.push(ip);
        }
    }
    merged
}

pub fn build_request(
    purpose: CertificatePurpose,
    client_subject: Option<ClientSubject>,
    details: SubjectDetails,
    validity_days: u32,
    defaults: &LeafDefaults,
) -> LeafRequest {
    LeafRequest {
        purpose,
        client_subject,
        common_name: details.common_name,
        organization: defaults.organization.clone(),
        email: details.email,
        dns_sans: details.dns_sans,
        ip_sans: details.ip_sans,
        extended_key_usage: ExtendedKeyUsage::for_purpose(purpose, client_subject),
        key_algorithm: details.key_algorithm,
        validity_days,
        output_prefix: details.output_prefix,
    }
}
