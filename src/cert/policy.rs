// src/cert/policy.rs
use super::types::{CaSubject, LeafRequest};

pub const EXTENSIONS_SECTION: &str = "v3_ext";
pub const CA_EXTENSIONS_SECTION: &str = "v3_ca";

/// One typed entry of the `[alt_names]` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SanEntry {
    Dns(String),
    Ip(String),
    Email(String),
}

impl SanEntry {
    fn tag(&self) -> &'static str {
        match self {
            SanEntry::Dns(_) => "DNS",
            SanEntry::Ip(_) => "IP",
            SanEntry::Email(_) => "email",
        }
    }

    fn value(&self) -> &str {
        match self {
            SanEntry::Dns(v) | SanEntry::Ip(v) | SanEntry::Email(v) => v,
        }
    }
}

/// DNS names first, then IP addresses, then the email address. Blank entries
/// are dropped here so they never take an index.
pub fn san_entries(request: &LeafRequest) -> Vec<SanEntry> {
    let dns = request.dns_sans.iter().filter_map(|v| trimmed(v)).map(SanEntry::Dns);
    let ips = request.ip_sans.iter().filter_map(|v| trimmed(v)).map(SanEntry::Ip);
    let email = request.email.as_deref().and_then(trimmed).map(SanEntry::Email);

    dns.chain(ips).chain(email).collect()
}

fn trimmed(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Renders the `[alt_names]` lines with one counter shared across all
/// categories, e.g. `DNS.1`, `DNS.2`, `IP.3`, `email.4`.
pub fn render_alt_names(entries: &[SanEntry]) -> String {
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            format!(
                "{}.{} = {}\n",
                entry.tag(),
                i + 1,
                escape_conf_value(entry.value())
            )
        })
        .collect()
}

/// Signing policy for a leaf certificate: the subject section followed by the
/// extensions `openssl x509 -req` applies via `-extensions v3_ext`.
///
/// Only the extensions section reaches the certificate. The subject section
/// (including `O`) records the request; the issued subject is the CSR's.
pub fn render_leaf_policy(request: &LeafRequest) -> String {
    let mut content = String::from(
        "[req]\ndistinguished_name = req_distinguished_name\nprompt = no\n\n[req_distinguished_name]\n",
    );
    content.push_str(&format!("CN = {}\n", escape_conf_value(&request.common_name)));
    if let Some(organization) = non_blank(request.organization.as_deref()) {
        content.push_str(&format!("O = {}\n", escape_conf_value(organization)));
    }
    if let Some(email) = non_blank(request.email.as_deref()) {
        content.push_str(&format!("emailAddress = {}\n", escape_conf_value(email)));
    }

    content.push_str(&format!("\n[{}]\n", EXTENSIONS_SECTION));
    content.push_str("basicConstraints = CA:FALSE\n");
    content.push_str("keyUsage = nonRepudiation, digitalSignature, keyEncipherment\n");
    if !request.extended_key_usage.is_empty() {
        content.push_str(&format!("extendedKeyUsage = {}\n", request.eku_string()));
    }

    let entries = san_entries(request);
    // An empty @alt_names section is rejected by openssl.
    if !entries.is_empty() {
        content.push_str("subjectAltName = @alt_names\n\n[alt_names]\n");
        content.push_str(&render_alt_names(&entries));
    }

    content
}

/// Request config used to self-sign a root CA.
pub fn render_ca_config(subject: &CaSubject) -> String {
    format!(
        r#"[req]
distinguished_name = req_distinguished_name
x509_extensions = {section}
prompt = no

[req_distinguished_name]
CN = {cn}
O = {o}
C = {c}

[{section}]
basicConstraints = critical, CA:TRUE, pathlen:0
keyUsage = critical, keyCertSign, cRLSign
subjectKeyIdentifier = hash
authorityKeyIdentifier = keyid:always, issuer
"#,
        section = CA_EXTENSIONS_SECTION,
        cn = escape_conf_value(&subject.common_name),
        o = escape_conf_value(&subject.organization),
        c = escape_conf_value(&subject.country_code),
    )
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// `$` expands variables, `#` starts a comment and quotes are stripped in
// openssl config files.
fn escape_conf_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '$' | '#' | '\'' | '"') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
