//! Loader for workspace configuration with YAML + environment overlays.
//!
//! Precedence: `OPTIC`-prefixed environment variables override file values,
//! and `${VAR}` placeholders inside any string value are expanded (recursively,
//! up to a fixed depth) after all sources are merged. Every section defaults,
//! so an empty file, or no file at all, yields a runnable configuration.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct OpticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub vision: VisionConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub scrape: ScrapeConfig,
}

impl Default for OpticConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            vision: VisionConfig::default(),
            browser: BrowserConfig::default(),
            scrape: ScrapeConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisionConfig {
    /// Base URL of the image-annotation service. Tests point this at a local
    /// mock server.
    #[serde(default = "default_vision_endpoint")]
    pub endpoint: String,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_vision_endpoint(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    /// WebDriver endpoint managing the headless browser (chromedriver).
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// User agent presented by every page the session opens.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            headless: default_headless(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeConfig {
    /// Query used when classification yields no labels.
    #[serde(default = "default_fallback_query")]
    pub fallback_query: String,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            fallback_query: default_fallback_query(),
        }
    }
}

fn default_port() -> u16 {
    3000
}
fn default_vision_endpoint() -> String {
    "https://vision.googleapis.com".into()
}
fn default_webdriver_url() -> String {
    "http://localhost:9515".into()
}
fn default_headless() -> bool {
    true
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0.0.0 Safari/537.36"
        .into()
}
fn default_fallback_query() -> String {
    "nature".into()
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

/// Builder hiding the `config` crate wiring (YAML + env overrides).
pub struct OpticConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for OpticConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl OpticConfigLoader {
    /// Start with sensible defaults: `OPTIC`-prefixed env overrides and
    /// nothing else.
    ///
    /// ```
    /// use optic_config::OpticConfigLoader;
    ///
    /// let config = OpticConfigLoader::new().load().expect("defaults load");
    /// assert_eq!(config.server.port, 3000);
    /// assert!(config.browser.headless);
    /// ```
    pub fn new() -> Self {
        let builder =
            Config::builder().add_source(Environment::with_prefix("OPTIC").separator("__"));
        Self { builder }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by
    /// suffix. Missing files are tolerated so deployments can rely purely on
    /// environment variables.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use optic_config::OpticConfigLoader;
    ///
    /// let cfg = OpticConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// server:
    ///   port: 8123
    /// scrape:
    ///   fallback_query: "sunset"
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.server.port, 8123);
    /// assert_eq!(cfg.scrape.fallback_query, "sunset");
    /// assert_eq!(cfg.vision.endpoint, "https://vision.googleapis.com");
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly
    /// typed config.
    ///
    /// The loader combines YAML sources with `OPTIC`-prefixed environment
    /// variables and expands `${VAR}` placeholders before materialising the
    /// typed structs.
    pub fn load(self) -> Result<OpticConfig, ConfigError> {
        let cfg = self.builder.build()?;

        // Convert to serde_json::Value first so placeholder expansion can
        // walk arbitrary nesting.
        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: OpticConfig =
            serde_json::from_value(v).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}
