//! Security profile resolution (`secure|permissive|disabled`).

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The security profile governing container signature verification and,
/// together with a [`crate::ceiling::PolicyBundle`], resource ceilings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityProfile {
    Secure,
    Permissive,
    Disabled,
    /// Any value other than the three known profiles; carried so callers
    /// can still produce a useful error message.
    Unknown(String),
}

impl Serialize for SecurityProfile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SecurityProfile {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(s.parse().unwrap())
    }
}

impl SecurityProfile {
    pub fn as_str(&self) -> &str {
        match self {
            SecurityProfile::Secure => "secure",
            SecurityProfile::Permissive => "permissive",
            SecurityProfile::Disabled => "disabled",
            SecurityProfile::Unknown(s) => s.as_str(),
        }
    }
}

impl std::str::FromStr for SecurityProfile {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "secure" => SecurityProfile::Secure,
            "permissive" => SecurityProfile::Permissive,
            "disabled" => SecurityProfile::Disabled,
            other => SecurityProfile::Unknown(other.to_string()),
        })
    }
}

/// Resolve the effective security profile: an explicit override wins,
/// otherwise `FLWD_PROFILE`, defaulting to `secure`.
pub fn resolve_profile(explicit: Option<&str>) -> SecurityProfile {
    if let Some(explicit) = explicit {
        return explicit.parse().unwrap();
    }
    match std::env::var("FLWD_PROFILE") {
        Ok(v) if !v.is_empty() => v.parse().unwrap(),
        _ => SecurityProfile::Secure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_profiles() {
        assert_eq!("secure".parse::<SecurityProfile>().unwrap(), SecurityProfile::Secure);
        assert_eq!(
            "permissive".parse::<SecurityProfile>().unwrap(),
            SecurityProfile::Permissive
        );
        assert_eq!(
            "disabled".parse::<SecurityProfile>().unwrap(),
            SecurityProfile::Disabled
        );
    }

    #[test]
    fn unknown_profile_is_preserved() {
        let p: SecurityProfile = "yolo".parse().unwrap();
        assert_eq!(p, SecurityProfile::Unknown("yolo".to_string()));
        assert_eq!(p.as_str(), "yolo");
    }

    #[test]
    fn explicit_beats_env_default() {
        assert_eq!(resolve_profile(Some("permissive")), SecurityProfile::Permissive);
    }
}
