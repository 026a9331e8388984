//! Container image signature verification strictness.

use crate::ceiling::PolicyError;
use crate::profile::SecurityProfile;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyMode {
    Required,
    Permissive,
    Disabled,
}

/// Resolve the effective verify mode for a profile: the bundle's
/// explicit override wins; otherwise `secure→required`,
/// `permissive→permissive`, `disabled→disabled`. Any other profile value
/// returns `required` alongside an `unknown profile` error so callers can
/// choose to fail closed or proceed with the safe default.
pub fn verify_mode_for_profile(
    override_mode: Option<VerifyMode>,
    profile: &SecurityProfile,
) -> (VerifyMode, Option<PolicyError>) {
    if let Some(mode) = override_mode {
        return (mode, None);
    }
    match profile {
        SecurityProfile::Secure => (VerifyMode::Required, None),
        SecurityProfile::Permissive => (VerifyMode::Permissive, None),
        SecurityProfile::Disabled => (VerifyMode::Disabled, None),
        SecurityProfile::Unknown(s) => (
            VerifyMode::Required,
            Some(PolicyError::UnknownProfile(s.clone())),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_requires_verification() {
        let (mode, err) = verify_mode_for_profile(None, &SecurityProfile::Secure);
        assert_eq!(mode, VerifyMode::Required);
        assert!(err.is_none());
    }

    #[test]
    fn permissive_profile() {
        let (mode, err) = verify_mode_for_profile(None, &SecurityProfile::Permissive);
        assert_eq!(mode, VerifyMode::Permissive);
        assert!(err.is_none());
    }

    #[test]
    fn disabled_profile() {
        let (mode, err) = verify_mode_for_profile(None, &SecurityProfile::Disabled);
        assert_eq!(mode, VerifyMode::Disabled);
        assert!(err.is_none());
    }

    #[test]
    fn unknown_profile_defaults_to_required_with_error() {
        let (mode, err) =
            verify_mode_for_profile(None, &SecurityProfile::Unknown("yolo".to_string()));
        assert_eq!(mode, VerifyMode::Required);
        assert!(matches!(err, Some(PolicyError::UnknownProfile(_))));
    }

    #[test]
    fn bundle_override_wins_regardless_of_profile() {
        let (mode, err) =
            verify_mode_for_profile(Some(VerifyMode::Disabled), &SecurityProfile::Secure);
        assert_eq!(mode, VerifyMode::Disabled);
        assert!(err.is_none());
    }
}
