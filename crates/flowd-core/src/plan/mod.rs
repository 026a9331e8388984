//! Plan builder (C7): a deterministic, never-mutated transform from a
//! job's config, schema, and binding into an execution preview.

use std::collections::BTreeMap;

use flowd_common::redact::redacted_token;
use flowd_common::Value;
use serde::Serialize;

use crate::args::{ArgSchema, Binding};
use crate::config::Config;
use crate::engine::process::split_interpreter;
use flowd_policy::{parse_cpu_millicores, parse_memory_bytes, PolicyBundle, SecurityProfile, VerifyMode};

#[derive(Debug, Clone, Serialize)]
pub struct ExecutorPreview {
    pub interpreter: String,
    pub executor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepPreview {
    pub id: String,
    pub executor: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageTrustPreview {
    pub registry: String,
    pub verify_mode: String,
    pub registry_allowed: bool,
}

fn verify_mode_label(mode: VerifyMode) -> &'static str {
    match mode {
        VerifyMode::Required => "required",
        VerifyMode::Permissive => "permissive",
        VerifyMode::Disabled => "disabled",
    }
}

/// The registry host a container image reference pulls from, defaulting
/// to `docker.io` when the image has no dotted/ported/`localhost` host
/// segment (`alpine:3.19`, `ghcr.io/org/img:tag`, `localhost:5000/img`).
fn registry_of(image: &str) -> &str {
    let without_digest = image.split('@').next().unwrap_or(image);
    let first_segment = without_digest.split('/').next().unwrap_or(without_digest);
    if first_segment == "localhost" || first_segment.contains('.') || first_segment.contains(':') {
        first_segment
    } else {
        "docker.io"
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub job_id: String,
    pub argspec: ArgSchema,
    pub executor_preview: ExecutorPreview,
    pub tool_requirements: Vec<String>,
    pub resolved_args: BTreeMap<String, Value>,
    pub security_profile: String,
    pub policy_findings: Vec<String>,
    pub image_trust_preview: Option<ImageTrustPreview>,
    pub step_previews: Vec<StepPreview>,
    pub provenance: BTreeMap<String, String>,
}

pub fn build_plan(
    job_id: &str,
    config: &Config,
    schema: &ArgSchema,
    binding: &Binding,
    profile: &SecurityProfile,
    policy: &PolicyBundle,
) -> Plan {
    let container_image = config
        .interpreter
        .strip_prefix("container:")
        .map(str::to_string);

    let executor_preview = ExecutorPreview {
        interpreter: config.interpreter.clone(),
        executor: if container_image.is_some() {
            "container".to_string()
        } else {
            "proc".to_string()
        },
        container_image: container_image.clone(),
    };

    let tool_requirements = if container_image.is_some() {
        Vec::new()
    } else {
        let (program, _) = split_interpreter(&config.interpreter);
        if program.is_empty() {
            Vec::new()
        } else {
            vec![program]
        }
    };

    let (verify_mode, verify_err) = policy.verify_mode_for(profile);
    let mut policy_findings: Vec<String> = verify_err.iter().map(|e| e.to_string()).collect();

    let image_trust_preview = container_image.as_ref().map(|image| {
        let registry = registry_of(image).to_string();
        let registry_allowed = policy.registry_allowed(&registry);
        if !registry_allowed {
            policy_findings.push(format!("registry {registry:?} is not in the allowed list"));
        }
        ImageTrustPreview {
            registry,
            verify_mode: verify_mode_label(verify_mode).to_string(),
            registry_allowed,
        }
    });

    if let Some(container) = &config.container {
        if let (Some(cpu), Some(ceiling)) = (&container.resources.cpu, policy.ceiling.cpu_millicores) {
            if let Ok(requested) = parse_cpu_millicores(cpu) {
                if requested > ceiling {
                    policy_findings.push(format!("requested cpu {cpu} exceeds ceiling of {ceiling}m"));
                }
            }
        }
        if let (Some(memory), Some(ceiling)) = (&container.resources.memory, policy.ceiling.memory_bytes) {
            if let Ok(requested) = parse_memory_bytes(memory) {
                if requested > ceiling {
                    policy_findings.push(format!("requested memory {memory} exceeds ceiling of {ceiling} bytes"));
                }
            }
        }
    }

    let schema_names: std::collections::BTreeSet<&str> =
        schema.iter().map(|s| s.name.as_str()).collect();
    let resolved_args = binding
        .values
        .iter()
        .filter(|(name, _)| schema_names.contains(name.as_str()))
        .map(|(name, value)| {
            let redacted = if binding.secret_names.contains(name) {
                Value::String(redacted_token().to_string())
            } else {
                value.clone()
            };
            (name.clone(), redacted)
        })
        .collect();

    let step_previews = config
        .steps
        .iter()
        .map(|step| StepPreview {
            id: step.id.clone(),
            executor: step
                .container
                .as_ref()
                .map(|_| "container".to_string())
                .or_else(|| step.executor.clone())
                .unwrap_or_else(|| "proc".to_string()),
        })
        .collect();

    Plan {
        job_id: job_id.to_string(),
        argspec: schema.clone(),
        executor_preview,
        tool_requirements,
        resolved_args,
        security_profile: profile.as_str().to_string(),
        policy_findings,
        image_trust_preview,
        step_previews,
        provenance: BTreeMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{bind, ArgSpec, ArgType, MapFlagBag};
    use crate::config::{ContainerBlock, ContainerResources};
    use flowd_policy::ResourceCeiling;

    #[test]
    fn container_interpreter_exposes_image_and_executor() {
        let mut config = Config::default();
        config.interpreter = "container:alpine:3.19".to_string();
        let schema = Vec::new();
        let binding = Binding::default();
        let profile = SecurityProfile::Secure;
        let policy = PolicyBundle::empty();
        let plan = build_plan("job1", &config, &schema, &binding, &profile, &policy);
        assert_eq!(plan.executor_preview.executor, "container");
        assert_eq!(
            plan.executor_preview.container_image.as_deref(),
            Some("alpine:3.19")
        );
        assert!(plan.tool_requirements.is_empty());
    }

    #[test]
    fn process_interpreter_reports_its_program_as_a_tool_requirement() {
        let mut config = Config::default();
        config.interpreter = "bash -euo pipefail".to_string();
        let schema = Vec::new();
        let binding = Binding::default();
        let profile = SecurityProfile::Secure;
        let policy = PolicyBundle::empty();
        let plan = build_plan("job1", &config, &schema, &binding, &profile, &policy);
        assert_eq!(plan.tool_requirements, vec!["bash".to_string()]);
    }

    #[test]
    fn resolved_args_redacts_secret_values() {
        let schema = vec![ArgSpec {
            name: "token".to_string(),
            arg_type: Some(ArgType::String),
            secret: true,
            ..Default::default()
        }];
        let flags = MapFlagBag::new().with_string("token", "hunter2");
        let binding = bind(&flags, &schema).unwrap();
        let config = Config::default();
        let profile = SecurityProfile::Secure;
        let policy = PolicyBundle::empty();
        let plan = build_plan("job1", &config, &schema, &binding, &profile, &policy);
        assert_eq!(
            plan.resolved_args.get("token").unwrap(),
            &Value::String("[secret]".to_string())
        );
    }

    #[test]
    fn resolved_args_excludes_names_outside_schema() {
        let schema: ArgSchema = Vec::new();
        let mut binding = Binding::default();
        binding
            .values
            .insert("stray".to_string(), Value::String("x".to_string()));
        let config = Config::default();
        let profile = SecurityProfile::Secure;
        let policy = PolicyBundle::empty();
        let plan = build_plan("job1", &config, &schema, &binding, &profile, &policy);
        assert!(plan.resolved_args.is_empty());
    }

    #[test]
    fn image_trust_preview_flags_disallowed_registry() {
        let mut config = Config::default();
        config.interpreter = "container:ghcr.io/acme/tool:1.0".to_string();
        let schema = Vec::new();
        let binding = Binding::default();
        let profile = SecurityProfile::Secure;
        let policy = PolicyBundle {
            allowed_registries: vec!["docker.io".to_string()],
            ..Default::default()
        };
        let plan = build_plan("job1", &config, &schema, &binding, &profile, &policy);
        let preview = plan.image_trust_preview.unwrap();
        assert_eq!(preview.registry, "ghcr.io");
        assert_eq!(preview.verify_mode, "required");
        assert!(!preview.registry_allowed);
        assert!(plan
            .policy_findings
            .iter()
            .any(|f| f.contains("ghcr.io")));
    }

    #[test]
    fn bare_image_defaults_to_docker_io_registry() {
        let mut config = Config::default();
        config.interpreter = "container:alpine:3.19".to_string();
        let schema = Vec::new();
        let binding = Binding::default();
        let profile = SecurityProfile::Secure;
        let policy = PolicyBundle::empty();
        let plan = build_plan("job1", &config, &schema, &binding, &profile, &policy);
        assert_eq!(plan.image_trust_preview.unwrap().registry, "docker.io");
    }

    #[test]
    fn cpu_ceiling_violation_is_reported_as_a_policy_finding() {
        let mut config = Config::default();
        config.interpreter = "container:alpine:3.19".to_string();
        config.container = Some(ContainerBlock {
            resources: ContainerResources {
                cpu: Some("2000m".to_string()),
                memory: None,
            },
            ..Default::default()
        });
        let schema = Vec::new();
        let binding = Binding::default();
        let profile = SecurityProfile::Secure;
        let policy = PolicyBundle {
            ceiling: ResourceCeiling {
                cpu_millicores: Some(500),
                memory_bytes: None,
            },
            ..Default::default()
        };
        let plan = build_plan("job1", &config, &schema, &binding, &profile, &policy);
        assert!(plan.policy_findings.iter().any(|f| f.contains("cpu")));
    }
}
