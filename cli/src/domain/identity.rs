//! Application uuid derivation.
//!
//! Pure logic, no I/O.

use crate::domain::error::UploadError;

/// Longest accepted explicit application name.
pub const MAX_APP_NAME_LEN: usize = 128;

/// Derive the registry uuid for an upload.
///
/// An explicit name is used verbatim after trimming and must match
/// `[A-Za-z0-9._-]{1,128}`. Otherwise the uuid is `"{name}.{username}_{ref}"`
/// with each component trimmed, so repeated uploads of the same
/// app/owner/revision land on the same key.
///
/// # Errors
///
/// Returns [`UploadError::InvalidName`] for an explicit name outside the
/// allowed alphabet, or a derived uuid with an empty component or one
/// containing inner whitespace.
pub fn derive_uuid(
    explicit: Option<&str>,
    app_name: &str,
    username: &str,
    reference: &str,
) -> Result<String, UploadError> {
    if let Some(name) = explicit.map(str::trim).filter(|n| !n.is_empty()) {
        validate_app_name(name)?;
        return Ok(name.to_string());
    }

    let [name, user, reference] = [app_name, username, reference].map(str::trim);
    let derived = format!("{name}.{user}_{reference}");
    for (part, which) in [(name, "app name"), (user, "username"), (reference, "reference")] {
        let reason = if part.is_empty() {
            format!("{which} must not be empty")
        } else if part.contains(char::is_whitespace) {
            format!("{which} must not contain whitespace")
        } else {
            continue;
        };
        return Err(UploadError::InvalidName {
            name: derived,
            reason,
        });
    }
    Ok(derived)
}

/// Validate an explicit application name.
///
/// # Errors
///
/// Returns [`UploadError::InvalidName`] describing the violation.
pub fn validate_app_name(name: &str) -> Result<(), UploadError> {
    let invalid = |reason: &str| UploadError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    if name.is_empty() || name.len() > MAX_APP_NAME_LEN {
        return Err(invalid("must be 1-128 characters"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(invalid("only letters, digits, '.', '_' and '-' are allowed"));
    }
    Ok(())
}
