//! Step ID sanitisation: lowercase, `[a-z0-9_-]` only, runs collapse to
//! a single `-`, trimmed, clamped to 63 characters, empty becomes `step`.

pub fn sanitize_step_id(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_dash = false;
    for ch in raw.chars() {
        let lower = ch.to_ascii_lowercase();
        if lower.is_ascii_alphanumeric() || lower == '_' || lower == '-' {
            out.push(lower);
            last_was_dash = lower == '-';
        } else if !last_was_dash {
            out.push('-');
            last_was_dash = true;
        }
    }
    let trimmed = out.trim_matches('-');
    let clamped: String = trimmed.chars().take(63).collect();
    if clamped.is_empty() {
        "step".to_string()
    } else {
        clamped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_collapses_runs() {
        assert_eq!(sanitize_step_id("Build Release!!Step"), "build-release-step");
    }

    #[test]
    fn trims_leading_and_trailing_dashes() {
        assert_eq!(sanitize_step_id("--weird--"), "weird");
    }

    #[test]
    fn empty_input_becomes_step() {
        assert_eq!(sanitize_step_id("###"), "step");
        assert_eq!(sanitize_step_id(""), "step");
    }

    #[test]
    fn clamps_to_63_characters() {
        let long = "a".repeat(100);
        assert_eq!(sanitize_step_id(&long).len(), 63);
    }
}
