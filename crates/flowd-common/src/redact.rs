//! Literal secret-value redaction shared by the event pipeline and the
//! per-step I/O writer.
//!
//! Redaction is over raw secret *values* only, never over argument
//! names — a value that happens to equal another argument's name is not
//! special-cased.

const REDACTED_TOKEN: &str = "[secret]";

/// Replace every literal occurrence of each non-empty secret value in
/// `text` with `[secret]`.
pub fn redact_line(text: &str, secret_values: &[String]) -> String {
    let mut out = text.to_string();
    for secret in secret_values {
        if secret.is_empty() {
            continue;
        }
        out = out.replace(secret.as_str(), REDACTED_TOKEN);
    }
    out
}

/// The literal token substituted for a redacted value (used by the plan
/// builder for `resolved_args`).
pub fn redacted_token() -> &'static str {
    REDACTED_TOKEN
}
