//! Loader for Lookout configuration with YAML + environment overlays.
//!
//! Sources are merged in the order they are added; `LOOKOUT__`-prefixed
//! environment variables (`__` separates nesting levels, e.g.
//! `LOOKOUT__SEARCH__API_KEY`) always win. After merging, every string value
//! is run through `${VAR}` expansion so secrets can stay out of the file.
//!
//! ```yaml
//! version: "1"
//! search:
//!   api_key: "${SERPER_API_KEY}"
//!   search_type: search
//! llm:
//!   provider: ollama
//!   model: llama3.2:3b
//! model:
//!   language: English
//! logging:
//!   format: json
//! ```
use config::{Config, ConfigError, Environment, File};
use lookout_common::{LlmConfig, LogSettings, ModelSettings, SearchConfig};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "LOOKOUT";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LookoutConfig {
    pub version: Option<String>,
    pub search: SearchConfig,
    pub llm: LlmConfig,
    pub model: ModelSettings,
    pub logging: LogSettings,
}

/// `<config dir>/lookout/lookout.yaml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("lookout").join("lookout.yaml"))
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct LookoutConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for LookoutConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl LookoutConfigLoader {
    /// Start with no files; only `LOOKOUT__` env overrides.
    ///
    /// ```
    /// use lookout_config::LookoutConfigLoader;
    ///
    /// let config = LookoutConfigLoader::new()
    ///     .with_yaml_str("version: '1'")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert_eq!(config.search.search_type, "search");
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; the `config` crate infers
    /// format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is silently skipped when missing, so headless
    /// deployments can rely purely on environment variables.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet (tests, CLI defaults).
    ///
    /// ```
    /// use lookout_common::LlmConfig;
    /// use lookout_config::LookoutConfigLoader;
    ///
    /// let cfg = LookoutConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// search:
    ///   api_key: "abc"
    ///   search_type: news
    /// llm:
    ///   provider: ollama
    ///   model: "llama3.2:3b"
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.search.credential(), Some("abc"));
    /// assert_eq!(cfg.search.search_type, "news");
    /// assert!(matches!(cfg.llm, LlmConfig::Ollama { .. }));
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into
    /// [`LookoutConfig`].
    ///
    /// Environment overrides are layered over all added sources. `${VAR}`
    /// placeholders are expanded before the typed structs are built; unknown
    /// variables are left untouched.
    ///
    /// ```
    /// use lookout_common::LlmConfig;
    /// use lookout_config::LookoutConfigLoader;
    ///
    /// temp_env::with_var("API_TOKEN", Some("injected-from-env"), || {
    ///     let config = LookoutConfigLoader::new()
    ///         .with_yaml_str(r#"
    /// llm:
    ///   provider: "openai"
    ///   model: "gpt-4o-mini"
    ///   auth_token: "${API_TOKEN}"
    /// "#)
    ///         .load()
    ///         .expect("valid configuration");
    ///
    ///     match &config.llm {
    ///         LlmConfig::Openai { model, auth_token, endpoint } => {
    ///             assert_eq!(model, "gpt-4o-mini");
    ///             assert_eq!(auth_token, "injected-from-env");
    ///             assert_eq!(endpoint, "https://api.openai.com/v1");
    ///         }
    ///         _ => panic!("expected OpenAI configuration"),
    ///     }
    /// });
    /// ```
    pub fn load(self) -> Result<LookoutConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: LookoutConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("FOO", Some("bar"), || {
            let mut v = json!("prefix-${FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars([("CITY", Some("Winston")), ("STATE", Some("NC"))], || {
            let mut v = json!([
                "hello-$CITY",
                { "loc": "${CITY}-${STATE}" },
                42,
                true,
                null
            ]);
            expand_env_in_value(&mut v);
            assert_eq!(
                v,
                json!(["hello-Winston", { "loc": "Winston-NC" }, 42, true, null])
            );
        });
    }

    #[test]
    fn expands_recursively_across_env_values() {
        temp_env::with_vars(
            [
                ("BAZ", Some("qux")),
                ("BAR", Some("mid-${BAZ}")),
                ("FOO", Some("start-${BAR}-end")),
            ],
            || {
                let mut v = json!("X=${FOO}");
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("X=start-mid-qux-end"));
            },
        );
    }

    #[test]
    fn stops_on_cycles() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("x=${A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${LOOKOUT_DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${LOOKOUT_DOES_NOT_EXIST}"));
    }

    #[test]
    fn default_path_ends_with_lookout_yaml() {
        if let Some(p) = default_config_path() {
            assert!(p.ends_with("lookout/lookout.yaml"));
        }
    }
}
