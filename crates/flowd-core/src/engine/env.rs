//! Secure environment composition (§4.6). The host's environment is
//! otherwise NOT inherited — this is the isolation floor.

use std::collections::BTreeMap;

use crate::config::Config;

pub fn build_secure_env(config: &Config, scalar_env: &BTreeMap<String, String>, args_json: &str, inherit_requested: bool) -> BTreeMap<String, String> {
    let mut env = config.env.clone();

    if !env.contains_key("PATH") {
        if let Ok(path) = std::env::var("PATH") {
            env.insert("PATH".to_string(), path);
        }
    }

    for (key, value) in scalar_env {
        env.insert(key.clone(), value.clone());
    }

    if !args_json.is_empty() {
        env.insert("FLWD_ARGS_JSON".to_string(), args_json.to_string());
    }

    if config.env_inherit || inherit_requested {
        for (key, value) in std::env::vars() {
            env.entry(key).or_insert(value);
        }
    }

    env
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_is_inherited_when_absent_from_config() {
        let config = Config::default();
        let env = build_secure_env(&config, &BTreeMap::new(), "", false);
        if std::env::var("PATH").is_ok() {
            assert!(env.contains_key("PATH"));
        }
    }

    #[test]
    fn config_env_path_wins_over_process_path() {
        let mut config = Config::default();
        config.env.insert("PATH".to_string(), "/custom/bin".to_string());
        let env = build_secure_env(&config, &BTreeMap::new(), "", false);
        assert_eq!(env.get("PATH").unwrap(), "/custom/bin");
    }

    #[test]
    fn args_json_added_only_when_non_empty() {
        let config = Config::default();
        let env = build_secure_env(&config, &BTreeMap::new(), "", false);
        assert!(!env.contains_key("FLWD_ARGS_JSON"));
        let env = build_secure_env(&config, &BTreeMap::new(), "{}", false);
        assert_eq!(env.get("FLWD_ARGS_JSON").unwrap(), "{}");
    }

    #[test]
    fn process_env_not_inherited_unless_requested() {
        std::env::set_var("FLOWD_TEST_MARKER_VAR", "present");
        let config = Config::default();
        let env = build_secure_env(&config, &BTreeMap::new(), "", false);
        assert!(!env.contains_key("FLOWD_TEST_MARKER_VAR"));
        let env = build_secure_env(&config, &BTreeMap::new(), "", true);
        assert_eq!(env.get("FLOWD_TEST_MARKER_VAR").unwrap(), "present");
        std::env::remove_var("FLOWD_TEST_MARKER_VAR");
    }
}
