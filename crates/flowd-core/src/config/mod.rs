//! Config loader (C2). Reads `<jobDir>/config.d/config.yaml`, normalises
//! aliases, resolves the data directory, and synthesises an argument
//! schema from a legacy `arguments` map when no `argspec` is present.

use std::collections::BTreeMap;
use std::path::Path;

use flowd_common::paths;
use serde::{Deserialize, Serialize};

use crate::args::schema::{ArgFormat, ArgSchema, ArgSpec, ArgType};
use crate::errors::ConfigError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorHandling {
    pub policy: String,
    pub retries: u32,
    pub retry_backoff: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerResources {
    pub cpu: Option<String>,
    pub memory: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerBlock {
    pub image: Option<String>,
    pub resources: ContainerResources,
    pub network: Option<String>,
    pub rootfs_writable: bool,
    pub capabilities: Vec<String>,
    pub extra_args: Vec<String>,
    pub entrypoint: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StepSpec {
    pub id: String,
    pub script: String,
    pub executor: Option<String>,
    pub needs: Vec<String>,
    pub container: Option<ContainerBlock>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Alias {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct LegacyArgSpec {
    #[serde(rename = "type")]
    arg_type: Option<String>,
    secret: bool,
    required: bool,
    default: Option<serde_json::Value>,
    description: Option<String>,
    choices: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub interpreter: String,
    pub env: BTreeMap<String, String>,
    pub timeout: Option<u64>,
    pub error_handling: ErrorHandling,
    pub executor: Option<String>,
    pub container: Option<ContainerBlock>,
    pub env_inherit: bool,
    pub composition: Option<String>,
    pub steps: Vec<StepSpec>,
    pub arguments: BTreeMap<String, LegacyArgSpec>,
    pub argspec: Option<ArgSchema>,
    pub aliases: Vec<Alias>,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub interpreter: String,
    pub env: BTreeMap<String, String>,
    pub timeout: Option<u64>,
    pub error_handling: ErrorHandling,
    pub executor: Option<String>,
    pub container: Option<ContainerBlock>,
    pub env_inherit: bool,
    pub composition: Option<String>,
    pub steps: Vec<StepSpec>,
    pub argspec: ArgSchema,
    pub aliases: Vec<Alias>,
}

impl Config {
    pub fn is_dag_mode(&self) -> bool {
        self.composition.as_deref() == Some("steps") && !self.steps.is_empty()
    }
}

/// Reads and normalises `<job_dir>/config.d/config.yaml`.
pub fn load_config(job_dir: &Path) -> Result<Config, ConfigError> {
    let config_path = job_dir.join("config.d").join("config.yaml");
    let raw_text = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Open {
        path: config_path.display().to_string(),
        source,
    })?;
    let raw: RawConfig =
        serde_yaml::from_str(&raw_text).map_err(|source| ConfigError::Decode {
            path: config_path.display().to_string(),
            source,
        })?;

    let aliases = normalize_aliases(raw.aliases)?;
    let argspec = match raw.argspec {
        Some(schema) if !schema.is_empty() => schema,
        _ => synthesize_schema(raw.arguments),
    };

    let mut env = raw.env;
    let data_dir = paths::resolve_data_dir(env.get("DATA_DIR").map(String::as_str));
    env.insert("DATA_DIR".to_string(), data_dir.display().to_string());
    paths::install_override(data_dir);

    Ok(Config {
        interpreter: raw.interpreter,
        env,
        timeout: raw.timeout,
        error_handling: raw.error_handling,
        executor: raw.executor,
        container: raw.container,
        env_inherit: raw.env_inherit,
        composition: raw.composition,
        steps: raw.steps,
        argspec,
        aliases,
    })
}

fn normalize_aliases(raw: Vec<Alias>) -> Result<Vec<Alias>, ConfigError> {
    let mut out = Vec::new();
    for alias in raw {
        let from = alias.from.trim().to_string();
        let to = alias.to.trim().to_string();
        if from.is_empty() || to.is_empty() {
            continue;
        }
        if to.contains('/') {
            return Err(ConfigError::InvalidAlias {
                from,
                to,
                reason: "to must be a single path segment".to_string(),
            });
        }
        out.push(Alias {
            from,
            to,
            description: alias.description,
        });
    }
    Ok(out)
}

fn synthesize_schema(arguments: BTreeMap<String, LegacyArgSpec>) -> ArgSchema {
    arguments
        .into_iter()
        .map(|(name, legacy)| {
            let arg_type = match legacy.arg_type.as_deref() {
                Some("bool") => ArgType::Boolean,
                Some("int") => ArgType::Integer,
                Some("array") => ArgType::Array,
                Some("object") => ArgType::Object,
                _ => ArgType::String,
            };
            ArgSpec {
                name,
                arg_type: Some(arg_type),
                format: if legacy.secret {
                    Some(ArgFormat::Secret)
                } else {
                    None
                },
                secret: legacy.secret,
                required: legacy.required,
                default: legacy.default,
                description: legacy.description,
                enum_values: legacy.choices,
                items_type: None,
                items_enum: Vec::new(),
                value_type: None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_job(dir: &Path, yaml: &str) {
        let config_dir = dir.join("config.d");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("config.yaml"), yaml).unwrap();
    }

    #[test]
    fn aliases_are_trimmed_and_empty_entries_dropped() {
        let aliases = normalize_aliases(vec![
            Alias {
                from: "  jobs/build  ".to_string(),
                to: " build ".to_string(),
                description: None,
            },
            Alias {
                from: String::new(),
                to: "x".to_string(),
                description: None,
            },
        ])
        .unwrap();
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases[0].from, "jobs/build");
        assert_eq!(aliases[0].to, "build");
    }

    #[test]
    fn alias_to_containing_slash_is_rejected() {
        let err = normalize_aliases(vec![Alias {
            from: "jobs/build".to_string(),
            to: "nested/alias".to_string(),
            description: None,
        }])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAlias { .. }));
    }

    #[test]
    fn legacy_arguments_map_synthesises_schema() {
        let mut arguments = BTreeMap::new();
        arguments.insert(
            "mode".to_string(),
            LegacyArgSpec {
                arg_type: Some("string".to_string()),
                choices: vec!["quick".to_string(), "full".to_string()],
                ..Default::default()
            },
        );
        arguments.insert(
            "verbose".to_string(),
            LegacyArgSpec {
                arg_type: Some("bool".to_string()),
                ..Default::default()
            },
        );
        let schema = synthesize_schema(arguments);
        let mode = schema.iter().find(|s| s.name == "mode").unwrap();
        assert_eq!(mode.arg_type(), ArgType::String);
        assert_eq!(mode.enum_values, vec!["quick", "full"]);
        let verbose = schema.iter().find(|s| s.name == "verbose").unwrap();
        assert_eq!(verbose.arg_type(), ArgType::Boolean);
    }

    #[test]
    #[serial_test::serial]
    fn load_config_reads_yaml_and_installs_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        write_job(
            dir.path(),
            "interpreter: bash\nenv:\n  FOO: bar\ntimeout: 30\n",
        );
        let cfg = load_config(dir.path()).unwrap();
        assert_eq!(cfg.interpreter, "bash");
        assert_eq!(cfg.env.get("FOO").unwrap(), "bar");
        assert!(cfg.env.contains_key("DATA_DIR"));
        paths::clear_override();
    }

    #[test]
    fn missing_config_file_is_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Open { .. }));
    }

    #[test]
    fn malformed_yaml_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        write_job(dir.path(), "interpreter: [this is not, valid");
        let err = load_config(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Decode { .. }));
    }
}
