//! Kubernetes naming and value rules used by schema validators
//!
//! Each check returns the list of problems found; an empty list means valid.

/// Maximum length of a label value or the name part of a qualified name
pub const LABEL_VALUE_MAX_LEN: usize = 63;

/// Maximum length of a DNS-1123 subdomain
pub const DNS1123_SUBDOMAIN_MAX_LEN: usize = 253;

const BINARY_SUFFIXES: &[&str] = &["Ki", "Mi", "Gi", "Ti", "Pi", "Ei"];
const DECIMAL_SUFFIXES: &[&str] = &["n", "u", "m", "k", "M", "G", "T", "P", "E"];

/// Annotation and label hosts the cluster manages itself
const INTERNAL_HOST_SUFFIX: &str = "kubernetes.io";

/// Annotation written by kubectl for server-side bookkeeping
const INTERNAL_KEYS: &[&str] = &["deprecated.daemonset.template.generation"];

fn is_alnum(c: char) -> bool {
    c.is_ascii_alphanumeric()
}

/// Validate the name part of a qualified name (`[A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?`)
fn name_part(s: &str) -> Option<String> {
    if s.is_empty() {
        return Some("name part must be non-empty".to_string());
    }
    if s.len() > LABEL_VALUE_MAX_LEN {
        return Some(format!(
            "name part must be no more than {} characters",
            LABEL_VALUE_MAX_LEN
        ));
    }
    let first = s.chars().next().is_some_and(is_alnum);
    let last = s.chars().last().is_some_and(is_alnum);
    let body = s.chars().all(|c| is_alnum(c) || matches!(c, '-' | '_' | '.'));
    if first && last && body {
        None
    } else {
        Some(
            "name part must consist of alphanumeric characters, '-', '_' or '.', \
             and must start and end with an alphanumeric character"
                .to_string(),
        )
    }
}

/// Validate a qualified name such as a label or annotation key
///
/// A qualified name is an optional DNS subdomain prefix and a slash followed
/// by a name part.
pub fn qualified_name(s: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let (prefix, name) = match s.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, s),
    };
    if let Some(prefix) = prefix {
        if prefix.is_empty() {
            errors.push("prefix part must be non-empty".to_string());
        } else {
            errors.extend(
                dns1123_subdomain(prefix)
                    .into_iter()
                    .map(|e| format!("prefix part {}", e)),
            );
        }
    }
    if name.contains('/') {
        errors.push("a qualified name may contain at most one '/'".to_string());
    } else {
        errors.extend(name_part(name));
    }
    errors
}

/// Validate a label value; empty is allowed
pub fn label_value(s: &str) -> Vec<String> {
    if s.is_empty() {
        return Vec::new();
    }
    name_part(s)
        .map(|e| vec![e.replacen("name part", "label value", 1)])
        .unwrap_or_default()
}

/// Validate a DNS-1123 subdomain (lowercase, dot separated labels)
pub fn dns1123_subdomain(s: &str) -> Vec<String> {
    if s.len() > DNS1123_SUBDOMAIN_MAX_LEN {
        return vec![format!(
            "must be no more than {} characters",
            DNS1123_SUBDOMAIN_MAX_LEN
        )];
    }
    let valid_label = |label: &str| {
        !label.is_empty()
            && label
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            && !label.starts_with('-')
            && !label.ends_with('-')
    };
    if s.split('.').all(valid_label) {
        Vec::new()
    } else {
        vec![format!(
            "{:?} must consist of lower case alphanumeric characters, '-' or '.', \
             and must start and end with an alphanumeric character",
            s
        )]
    }
}

/// Whether a string parses as a Kubernetes resource quantity
///
/// Accepts a signed decimal number followed by an optional binary suffix
/// (`Ki`..`Ei`), decimal suffix (`n`..`E`) or decimal exponent (`e3`, `E-2`).
pub fn is_quantity(s: &str) -> bool {
    let unsigned = s.strip_prefix(['+', '-']).unwrap_or(s);
    let number_len = unsigned
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(unsigned.len());
    let (number, suffix) = unsigned.split_at(number_len);

    let digits = number.chars().filter(char::is_ascii_digit).count();
    let dots = number.chars().filter(|c| *c == '.').count();
    if digits == 0 || dots > 1 {
        return false;
    }

    if suffix.is_empty() || BINARY_SUFFIXES.contains(&suffix) || DECIMAL_SUFFIXES.contains(&suffix)
    {
        return true;
    }
    match suffix.strip_prefix(['e', 'E']) {
        Some(exp) => {
            let exp = exp.strip_prefix(['+', '-']).unwrap_or(exp);
            !exp.is_empty() && exp.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

/// Parse octal file mode bits such as `0644`; `None` when invalid or above `0777`
pub fn parse_mode_bits(s: &str) -> Option<i32> {
    if s.is_empty() || !s.chars().all(|c| ('0'..='7').contains(&c)) {
        return None;
    }
    i32::from_str_radix(s, 8).ok().filter(|m| *m <= 0o777)
}

/// Render file mode bits the way [`parse_mode_bits`] reads them
pub fn format_mode_bits(mode: i32) -> String {
    format!("0{:o}", mode)
}

/// Whether a label or annotation key is managed by Kubernetes itself
///
/// Keys whose prefix host is `kubernetes.io` or one of its subdomains, and
/// a few well known bookkeeping keys, are internal.
pub fn is_internal_key(key: &str) -> bool {
    if INTERNAL_KEYS.contains(&key) {
        return true;
    }
    match key.split_once('/') {
        Some((host, _)) => {
            host == INTERNAL_HOST_SUFFIX || host.ends_with(&format!(".{}", INTERNAL_HOST_SUFFIX))
        }
        None => false,
    }
}
