//! The policy bundle: allowed registries, resource ceilings, and a verify
//! mode override, loaded from `FLWD_POLICY_FILE`.

use crate::ceiling::{parse_cpu_millicores, parse_memory_bytes, PolicyError, ResourceCeiling};
use crate::profile::SecurityProfile;
use crate::verify_mode::{verify_mode_for_profile, VerifyMode};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyBundleRaw {
    #[serde(default)]
    pub verify_signatures: Option<String>,
    #[serde(default)]
    pub allowed_registries: Vec<String>,
    #[serde(default)]
    pub cpu_ceiling: Option<String>,
    #[serde(default)]
    pub memory_ceiling: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PolicyBundle {
    pub verify_mode_override: Option<VerifyMode>,
    pub allowed_registries: Vec<String>,
    pub ceiling: ResourceCeiling,
}

impl PolicyBundle {
    /// An empty bundle: no override, no registry restriction, no
    /// ceilings.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_raw(raw: PolicyBundleRaw) -> Result<Self, PolicyError> {
        let verify_mode_override = match raw.verify_signatures.as_deref() {
            None => None,
            Some("required") => Some(VerifyMode::Required),
            Some("permissive") => Some(VerifyMode::Permissive),
            Some("disabled") => Some(VerifyMode::Disabled),
            Some(other) => return Err(PolicyError::UnknownProfile(other.to_string())),
        };
        let cpu_millicores = raw
            .cpu_ceiling
            .as_deref()
            .map(parse_cpu_millicores)
            .transpose()?;
        let memory_bytes = raw
            .memory_ceiling
            .as_deref()
            .map(parse_memory_bytes)
            .transpose()?;
        Ok(Self {
            verify_mode_override,
            allowed_registries: raw.allowed_registries,
            ceiling: ResourceCeiling {
                cpu_millicores,
                memory_bytes,
            },
        })
    }

    /// Load from `FLWD_POLICY_FILE` if set and present; otherwise an
    /// empty bundle.
    pub fn load_from_env() -> Result<Self, PolicyError> {
        match std::env::var("FLWD_POLICY_FILE") {
            Ok(path) if !path.is_empty() => Self::load(Path::new(&path)),
            _ => Ok(Self::empty()),
        }
    }

    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PolicyError::InvalidCpu(format!("read {}: {e}", path.display())))?;
        let raw: PolicyBundleRaw = serde_yaml::from_str(&contents)
            .map_err(|e| PolicyError::InvalidCpu(format!("decode {}: {e}", path.display())))?;
        Self::from_raw(raw)
    }

    pub fn registry_allowed(&self, registry: &str) -> bool {
        self.allowed_registries.is_empty()
            || self.allowed_registries.iter().any(|r| r == registry)
    }

    pub fn verify_mode_for(&self, profile: &SecurityProfile) -> (VerifyMode, Option<PolicyError>) {
        verify_mode_for_profile(self.verify_mode_override, profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bundle_allows_any_registry() {
        let bundle = PolicyBundle::empty();
        assert!(bundle.registry_allowed("docker.io"));
    }

    #[test]
    fn restricted_bundle_rejects_unknown_registry() {
        let bundle = PolicyBundle {
            allowed_registries: vec!["ghcr.io".to_string()],
            ..Default::default()
        };
        assert!(bundle.registry_allowed("ghcr.io"));
        assert!(!bundle.registry_allowed("docker.io"));
    }

    #[test]
    fn from_raw_parses_ceilings_and_override() {
        let raw = PolicyBundleRaw {
            verify_signatures: Some("permissive".to_string()),
            allowed_registries: vec!["ghcr.io".to_string()],
            cpu_ceiling: Some("500m".to_string()),
            memory_ceiling: Some("1Gi".to_string()),
        };
        let bundle = PolicyBundle::from_raw(raw).unwrap();
        assert_eq!(bundle.verify_mode_override, Some(VerifyMode::Permissive));
        assert_eq!(bundle.ceiling.cpu_millicores, Some(500));
        assert_eq!(bundle.ceiling.memory_bytes, Some(1024 * 1024 * 1024));
    }

    #[test]
    fn from_raw_rejects_unknown_verify_mode() {
        let raw = PolicyBundleRaw {
            verify_signatures: Some("sometimes".to_string()),
            ..Default::default()
        };
        assert!(PolicyBundle::from_raw(raw).is_err());
    }
}
