//! Email syntax validation and canonicalization for teacher identifiers.

use regex::Regex;

const MAX_ADDRESS_LEN: usize = 254;
const MAX_LOCAL_LEN: usize = 64;
const MAX_LABEL_LEN: usize = 63;
const ATEXT_SPECIALS: &str = "!#$%&'*+/=?^_`{|}~.-";

/// Validate an email address and return its canonical form.
///
/// The canonical form has surrounding whitespace removed and a lowercase domain.
/// The local part is kept as typed since mailbox names may be case-sensitive.
///
/// # Errors
/// Returns a human-readable diagnostic describing the first problem found.
pub fn validate_email(input: &str) -> Result<String, String> {
    let address = input.trim();

    if address.is_empty() {
        return Err("The email address is empty.".to_string());
    }

    if address.len() > MAX_ADDRESS_LEN {
        return Err(format!(
            "The email address is too long ({} characters, at most {MAX_ADDRESS_LEN} allowed).",
            address.len()
        ));
    }

    let Some((local, domain)) = address.split_once('@') else {
        return Err("The email address is not valid. It must have exactly one @-sign.".to_string());
    };

    if domain.contains('@') {
        return Err("The email address is not valid. It must have exactly one @-sign.".to_string());
    }

    validate_local_part(local)?;
    let domain = validate_domain(domain)?;

    Ok(format!("{local}@{domain}"))
}

fn validate_local_part(local: &str) -> Result<(), String> {
    if local.is_empty() {
        return Err("There must be something before the @-sign.".to_string());
    }

    if local.len() > MAX_LOCAL_LEN {
        return Err(format!(
            "The part before the @-sign is too long ({} characters, at most {MAX_LOCAL_LEN} allowed).",
            local.len()
        ));
    }

    if local.starts_with('.') {
        return Err("An email address cannot start with a period.".to_string());
    }

    if local.ends_with('.') {
        return Err("An email address cannot have a period immediately before the @-sign.".to_string());
    }

    if local.contains("..") {
        return Err("An email address cannot have two periods in a row.".to_string());
    }

    let invalid: String = local.chars().filter(|c| !is_local_char(*c)).collect();
    if !invalid.is_empty() {
        return Err(format!(
            "The email address contains invalid characters before the @-sign: {invalid}."
        ));
    }

    Ok(())
}

// ASCII is limited to RFC 5322 atext; other characters are allowed for
// internationalized mailboxes unless they are whitespace or controls.
fn is_local_char(c: char) -> bool {
    if c.is_ascii() {
        c.is_ascii_alphanumeric() || ATEXT_SPECIALS.contains(c)
    } else {
        !c.is_whitespace() && !c.is_control()
    }
}

fn validate_domain(domain: &str) -> Result<String, String> {
    if domain.is_empty() {
        return Err("There must be something after the @-sign.".to_string());
    }

    let domain = domain.to_lowercase();

    if domain.starts_with('.') {
        return Err("An email address cannot have a period immediately after the @-sign.".to_string());
    }

    if domain.ends_with('.') {
        return Err("An email address cannot end with a period.".to_string());
    }

    if domain.contains("..") {
        return Err("An email address cannot have two periods in a row.".to_string());
    }

    if !domain.contains('.') {
        return Err("The part after the @-sign is not valid. It should have a period.".to_string());
    }

    // Internationalized labels are accepted in their Unicode form.
    let label = Regex::new(r"^[\p{L}\p{N}\p{M}](?:[\p{L}\p{N}\p{M}-]*[\p{L}\p{N}\p{M}])?$")
        .map_err(|e| format!("email validator unavailable: {e}"))?;
    for part in domain.split('.') {
        if part.len() > MAX_LABEL_LEN {
            return Err(format!(
                "After the @-sign, periods cannot be separated by more than {MAX_LABEL_LEN} characters."
            ));
        }
        if !label.is_match(part) {
            return Err(format!(
                "The part after the @-sign contains an invalid label: {part}."
            ));
        }
    }

    if domain
        .rsplit('.')
        .next()
        .is_some_and(|tld| tld.chars().all(|c| c.is_ascii_digit()))
    {
        return Err(
            "The part after the @-sign is not valid. It is not within a valid top-level domain."
                .to_string(),
        );
    }

    Ok(domain)
}
