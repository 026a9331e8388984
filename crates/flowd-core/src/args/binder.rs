//! Argument binder (C6). Validates a flag-bag against a schema and
//! produces a `Binding`.

use std::collections::{BTreeMap, BTreeSet};

use flowd_common::{env_key_for_arg, Value};
use serde_json::Value as JsonValue;

use crate::args::flagbag::FlagBag;
use crate::args::schema::{ArgSchema, ArgType};
use crate::errors::ArgError;

/// Result of binding a flag-bag against a schema.
#[derive(Debug, Clone, Default)]
pub struct Binding {
    pub values: BTreeMap<String, Value>,
    pub args_json: String,
    pub scalar_env: BTreeMap<String, String>,
    pub secret_names: BTreeSet<String>,
    pub secret_values: Vec<String>,
}

pub fn bind(flags: &dyn FlagBag, schema: &ArgSchema) -> Result<Binding, ArgError> {
    let mut binding = Binding::default();

    for spec in schema {
        if spec.is_secret() && spec.default.is_some() {
            return Err(ArgError::new(
                &spec.name,
                "secret arguments cannot declare a default",
            ));
        }

        match spec.arg_type() {
            ArgType::String => bind_string(spec, flags, &mut binding)?,
            ArgType::Boolean => bind_bool(spec, flags, &mut binding)?,
            ArgType::Integer => bind_int(spec, flags, &mut binding)?,
            ArgType::Array => bind_array(spec, flags, &mut binding)?,
            ArgType::Object => bind_object(spec, flags, &mut binding)?,
        }
    }

    binding.args_json =
        serde_json::to_string(&binding.values).unwrap_or_else(|_| "{}".to_string());

    Ok(binding)
}

fn bind_string(
    spec: &crate::args::schema::ArgSpec,
    flags: &dyn FlagBag,
    binding: &mut Binding,
) -> Result<(), ArgError> {
    let value = if flags.provided(&spec.name) {
        flags.get_string(&spec.name).unwrap_or_default()
    } else {
        spec.default
            .as_ref()
            .and_then(|d| d.as_str().map(str::to_string))
            .unwrap_or_default()
    };

    if spec.required && value.is_empty() {
        return Err(ArgError::new(&spec.name, "required"));
    }

    if !spec.enum_values.is_empty() && !value.is_empty() && !spec.enum_values.contains(&value) {
        return Err(ArgError::new(
            &spec.name,
            format!("value {value:?} not in enum"),
        ));
    }

    if spec.is_secret() {
        if !value.is_empty() {
            binding.secret_names.insert(spec.name.clone());
            binding.secret_values.push(value.clone());
        }
    } else {
        binding
            .scalar_env
            .insert(env_key_for_arg(&spec.name), value.clone());
    }

    binding.values.insert(spec.name.clone(), Value::String(value));
    Ok(())
}

fn bind_bool(
    spec: &crate::args::schema::ArgSpec,
    flags: &dyn FlagBag,
    binding: &mut Binding,
) -> Result<(), ArgError> {
    let value = if flags.provided(&spec.name) {
        flags.get_bool(&spec.name).unwrap_or(false)
    } else if let Some(default) = spec.default.as_ref().and_then(JsonValue::as_bool) {
        default
    } else if spec.required {
        return Err(ArgError::new(&spec.name, "required"));
    } else {
        false
    };

    binding
        .scalar_env
        .insert(env_key_for_arg(&spec.name), value.to_string());
    binding.values.insert(spec.name.clone(), Value::Boolean(value));
    Ok(())
}

fn bind_int(
    spec: &crate::args::schema::ArgSpec,
    flags: &dyn FlagBag,
    binding: &mut Binding,
) -> Result<(), ArgError> {
    let value = if flags.provided(&spec.name) {
        flags.get_int(&spec.name).unwrap_or(0)
    } else if let Some(default) = spec.default.as_ref().and_then(JsonValue::as_i64) {
        default
    } else if spec.required {
        return Err(ArgError::new(&spec.name, "required"));
    } else {
        0
    };

    binding
        .scalar_env
        .insert(env_key_for_arg(&spec.name), value.to_string());
    binding.values.insert(spec.name.clone(), Value::Integer(value));
    Ok(())
}

fn bind_array(
    spec: &crate::args::schema::ArgSpec,
    flags: &dyn FlagBag,
    binding: &mut Binding,
) -> Result<(), ArgError> {
    if let Some(items_type) = spec.items_type.as_deref() {
        if items_type != "string" {
            return Err(ArgError::new(
                &spec.name,
                format!("items_type {items_type:?} not supported"),
            ));
        }
    }

    let items = if flags.provided(&spec.name) {
        flags.get_string_array(&spec.name).unwrap_or_default()
    } else {
        match spec.default.as_ref() {
            Some(JsonValue::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(JsonValue::String(s)) => s.split(',').map(str::to_string).collect(),
            _ => {
                if spec.required {
                    return Err(ArgError::new(&spec.name, "required"));
                }
                Vec::new()
            }
        }
    };

    if !spec.items_enum.is_empty() {
        for item in &items {
            if !spec.items_enum.contains(item) {
                return Err(ArgError::new(
                    &spec.name,
                    format!("value {item:?} not in enum"),
                ));
            }
        }
    }

    binding
        .values
        .insert(spec.name.clone(), Value::StringList(items));
    Ok(())
}

fn bind_object(
    spec: &crate::args::schema::ArgSpec,
    flags: &dyn FlagBag,
    binding: &mut Binding,
) -> Result<(), ArgError> {
    if let Some(value_type) = spec.value_type.as_deref() {
        if value_type != "string" {
            return Err(ArgError::new(
                &spec.name,
                format!("value_type {value_type:?} not supported"),
            ));
        }
    }

    let pairs = if flags.provided(&spec.name) {
        flags.get_string_array(&spec.name).unwrap_or_default()
    } else if spec.required {
        return Err(ArgError::new(&spec.name, "required"));
    } else {
        Vec::new()
    };

    let mut map = BTreeMap::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(ArgError::new(
                &spec.name,
                format!("invalid pair {pair:?}, expected k=v"),
            ));
        };
        if key.is_empty() {
            return Err(ArgError::new(&spec.name, format!("invalid pair {pair:?}, expected k=v")));
        }
        map.insert(key.to_string(), value.to_string());
    }

    binding
        .values
        .insert(spec.name.clone(), Value::StringMap(map));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::flagbag::MapFlagBag;
    use crate::args::schema::{ArgFormat, ArgSpec};

    fn spec(name: &str, arg_type: ArgType) -> ArgSpec {
        ArgSpec {
            name: name.to_string(),
            arg_type: Some(arg_type),
            ..Default::default()
        }
    }

    #[test]
    fn string_enum_binding_produces_scalar_env_and_args_json() {
        let schema = vec![ArgSpec {
            enum_values: vec!["quick".to_string(), "full".to_string()],
            ..spec("mode", ArgType::String)
        }];
        let flags = MapFlagBag::new().with_string("mode", "quick");
        let binding = bind(&flags, &schema).unwrap();
        assert_eq!(binding.scalar_env.get("ARG_MODE").unwrap(), "quick");
        assert_eq!(binding.args_json, r#"{"mode":"quick"}"#);
    }

    #[test]
    fn string_enum_rejects_unknown_value() {
        let schema = vec![ArgSpec {
            enum_values: vec!["quick".to_string()],
            ..spec("mode", ArgType::String)
        }];
        let flags = MapFlagBag::new().with_string("mode", "slow");
        let err = bind(&flags, &schema).unwrap_err();
        assert!(err.msg.contains("not in enum"));
    }

    #[test]
    fn secret_with_default_is_rejected() {
        let schema = vec![ArgSpec {
            secret: true,
            default: Some(JsonValue::String("x".to_string())),
            ..spec("token", ArgType::String)
        }];
        let flags = MapFlagBag::new();
        let err = bind(&flags, &schema).unwrap_err();
        assert!(err.msg.contains("secret"));
    }

    #[test]
    fn secret_value_is_withheld_from_scalar_env() {
        let schema = vec![ArgSpec {
            secret: true,
            ..spec("token", ArgType::String)
        }];
        let flags = MapFlagBag::new().with_string("token", "hunter2");
        let binding = bind(&flags, &schema).unwrap();
        assert!(binding.scalar_env.is_empty());
        assert_eq!(binding.secret_values, vec!["hunter2".to_string()]);
        assert!(binding.secret_names.contains("token"));
    }

    #[test]
    fn format_secret_without_secret_flag_still_withheld() {
        let schema = vec![ArgSpec {
            format: Some(ArgFormat::Secret),
            ..spec("key", ArgType::String)
        }];
        let flags = MapFlagBag::new().with_string("key", "abc");
        let binding = bind(&flags, &schema).unwrap();
        assert!(binding.scalar_env.is_empty());
    }

    #[test]
    fn required_string_missing_is_error() {
        let schema = vec![ArgSpec {
            required: true,
            ..spec("name", ArgType::String)
        }];
        let flags = MapFlagBag::new();
        let err = bind(&flags, &schema).unwrap_err();
        assert_eq!(err.msg, "required");
    }

    #[test]
    fn boolean_encodes_true_false() {
        let schema = vec![spec("verbose", ArgType::Boolean)];
        let flags = MapFlagBag::new().with_bool("verbose", true);
        let binding = bind(&flags, &schema).unwrap();
        assert_eq!(binding.scalar_env.get("ARG_VERBOSE").unwrap(), "true");
    }

    #[test]
    fn integer_encodes_decimal() {
        let schema = vec![spec("retries", ArgType::Integer)];
        let flags = MapFlagBag::new().with_int("retries", 3);
        let binding = bind(&flags, &schema).unwrap();
        assert_eq!(binding.scalar_env.get("ARG_RETRIES").unwrap(), "3");
    }

    #[test]
    fn array_rejects_unsupported_items_type() {
        let schema = vec![ArgSpec {
            items_type: Some("integer".to_string()),
            ..spec("ids", ArgType::Array)
        }];
        let flags = MapFlagBag::new().with_array("ids", vec!["1".to_string()]);
        let err = bind(&flags, &schema).unwrap_err();
        assert!(err.msg.contains("items_type"));
    }

    #[test]
    fn array_items_enum_rejects_unknown_item() {
        let schema = vec![ArgSpec {
            items_type: Some("string".to_string()),
            items_enum: vec!["a".to_string(), "b".to_string()],
            ..spec("tags", ArgType::Array)
        }];
        let flags = MapFlagBag::new().with_array("tags", vec!["a".to_string(), "z".to_string()]);
        let err = bind(&flags, &schema).unwrap_err();
        assert!(err.msg.contains("not in enum"));
    }

    #[test]
    fn array_default_accepts_comma_separated_string() {
        let schema = vec![ArgSpec {
            items_type: Some("string".to_string()),
            default: Some(JsonValue::String("a,b,c".to_string())),
            ..spec("tags", ArgType::Array)
        }];
        let flags = MapFlagBag::new();
        let binding = bind(&flags, &schema).unwrap();
        assert_eq!(
            binding.values.get("tags").unwrap(),
            &Value::StringList(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn object_parses_repeated_kv_pairs() {
        let schema = vec![spec("labels", ArgType::Object)];
        let flags =
            MapFlagBag::new().with_array("labels", vec!["env=prod".to_string(), "tier=1".to_string()]);
        let binding = bind(&flags, &schema).unwrap();
        let Value::StringMap(map) = binding.values.get("labels").unwrap() else {
            panic!("expected string map");
        };
        assert_eq!(map.get("env").unwrap(), "prod");
        assert_eq!(map.get("tier").unwrap(), "1");
    }

    #[test]
    fn object_rejects_pair_without_equals() {
        let schema = vec![spec("labels", ArgType::Object)];
        let flags = MapFlagBag::new().with_array("labels", vec!["oops".to_string()]);
        let err = bind(&flags, &schema).unwrap_err();
        assert!(err.msg.contains("expected k=v"));
    }

    #[test]
    fn object_rejects_empty_key() {
        let schema = vec![spec("labels", ArgType::Object)];
        let flags = MapFlagBag::new().with_array("labels", vec!["=value".to_string()]);
        let err = bind(&flags, &schema).unwrap_err();
        assert!(err.msg.contains("expected k=v"));
    }
}
