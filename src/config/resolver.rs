use once_cell::sync::OnceCell;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::environment::Environment;
use super::ConfigError;
use crate::error::{ApiError, ErrorBody};
use crate::util::object;

const SECURE_INSTANCE: &str = "secure";

/// Layered configuration for one environment.
///
/// The candidate files are merged on first access and the result is kept in
/// this instance; later edits to the files are not observed.
#[derive(Debug)]
pub struct Config {
    env: Environment,
    root: PathBuf,
    mapping: OnceCell<Value>,
}

impl Config {
    pub fn new(env: Environment, root: impl Into<PathBuf>) -> Self {
        Self {
            env,
            root: root.into(),
            mapping: OnceCell::new(),
        }
    }

    /// Config rooted at `CAULDRON_CONFIG_DIR` (default `config/`).
    pub fn from_env(env: Environment) -> Self {
        let root = std::env::var("CAULDRON_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
        Self::new(env, root)
    }

    pub fn environment(&self) -> Environment {
        self.env
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Candidate files in merge order, later entries winning.
    pub fn file_order(&self) -> Vec<PathBuf> {
        let env = self.env.name.as_str();
        let is_test = self.env.is_test;
        let base = &self.root;
        let env_dir = base.join(env);

        let default = base.join("default.json");
        let default_secure = base.join(format!("default-{SECURE_INSTANCE}.json"));
        let local = base.join("local.json");
        let local_secure = base.join(format!("local-{SECURE_INSTANCE}.json"));

        let env_file = env_dir.join(format!("{env}.json"));
        let env_secure = env_dir.join(format!("{env}-{SECURE_INSTANCE}.json"));
        let env_test = env_dir.join(format!("{env}-test.json"));
        let env_test_secure = env_dir.join(format!("{env}-test-{SECURE_INSTANCE}.json"));
        let env_local = env_dir.join(format!("{env}-local.json"));
        let env_local_secure = env_dir.join(format!("{env}-local-{SECURE_INSTANCE}.json"));
        let env_test_local = env_dir.join(format!("{env}-test-local.json"));
        let env_test_local_secure =
            env_dir.join(format!("{env}-test-local-{SECURE_INSTANCE}.json"));

        let mut order = vec![default, default_secure];

        if self.env.is_local() {
            order.extend([local, local_secure, env_file]);
            if is_test {
                order.push(env_test);
            }
            order.push(env_secure);
            if is_test {
                order.push(env_test_secure);
            }
        } else {
            // {env}-secure is listed twice; the second copy re-asserts it over {env}-test.
            order.extend([env_file, env_secure.clone()]);
            if is_test {
                order.push(env_test);
            }
            order.push(env_secure);
            if is_test {
                order.push(env_test_secure);
            }
            order.extend([local, local_secure, env_local, env_local_secure]);
            if is_test {
                order.extend([env_test_local, env_test_local_secure]);
            }
        }

        order
    }

    fn resolve(&self) -> Value {
        let files = self.file_order();
        debug!(env = %self.env, files = files.len(), "Resolving configuration");
        object::merge_all(files.iter().map(|path| load_file(path)))
    }

    /// The whole merged mapping.
    pub fn all(&self) -> &Value {
        self.mapping.get_or_init(|| self.resolve())
    }

    /// Value at a dotted path, `None` when any segment is missing or lands
    /// on a non-object.
    pub fn get(&self, path: &str) -> Result<Option<&Value>, ConfigError> {
        check_path(path)?;
        Ok(object::lookup(self.all(), path))
    }

    pub fn get_or(&self, path: &str, default: Value) -> Result<Value, ConfigError> {
        Ok(self.get(path)?.cloned().unwrap_or(default))
    }

    pub fn has(&self, path: &str) -> Result<bool, ConfigError> {
        Ok(self.get(path)?.is_some())
    }

    /// Write a value at a dotted path in this instance only.
    pub fn set(&mut self, path: &str, value: Value) -> Result<(), ConfigError> {
        check_path(path)?;
        if self.mapping.get().is_none() {
            let resolved = self.resolve();
            let _ = self.mapping.set(resolved);
        }
        if let Some(mapping) = self.mapping.get_mut() {
            object::assign(mapping, path, value);
        }
        Ok(())
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).ok().flatten().and_then(Value::as_str)
    }

    pub fn get_bool(&self, path: &str) -> bool {
        self.get(path)
            .ok()
            .flatten()
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Configured `{responseCode, errorMessage}` object at `path`.
    pub fn error_body(&self, path: &str) -> Option<ErrorBody> {
        let value = self.get(path).ok().flatten()?;
        serde_json::from_value(object::deep_copy(value)).ok()
    }

    /// Structured error for `path`, or an internal error naming the path
    /// when nothing usable is configured there.
    pub fn error(&self, path: &str) -> ApiError {
        match self.error_body(path) {
            Some(body) => ApiError::Structured(body),
            None => {
                warn!("No error configured at {}", path);
                ApiError::internal(path)
            }
        }
    }

    /// Like [`Config::error`], substituting `placeholder` in the message.
    pub fn error_with(&self, path: &str, placeholder: &str, replacement: &str) -> ApiError {
        let Some(value) = self.get(path).ok().flatten() else {
            warn!("No error configured at {}", path);
            return ApiError::internal(path);
        };

        let mut copy = object::deep_copy(value);
        object::replace_in_strings(&mut copy, placeholder, replacement);
        match serde_json::from_value(copy) {
            Ok(body) => ApiError::Structured(body),
            Err(_) => ApiError::internal(path),
        }
    }

    pub fn message(&self, path: &str) -> Option<String> {
        self.get_str(path).map(str::to_string)
    }
}

fn check_path(path: &str) -> Result<(), ConfigError> {
    if path.is_empty() {
        return Err(ConfigError::EmptyKey);
    }
    Ok(())
}

fn load_file(path: &Path) -> Value {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(_) => return Value::Object(Map::new()),
    };

    match serde_json::from_str::<Value>(&contents) {
        Ok(value) => {
            debug!("Loaded config overlay {}", path.display());
            value
        }
        Err(e) => {
            warn!("Ignoring unparsable config file {}: {}", path.display(), e);
            Value::Object(Map::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvName;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, relative: &str, value: Value) {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, serde_json::to_string(&value).unwrap()).unwrap();
    }

    fn names(config: &Config) -> Vec<String> {
        config
            .file_order()
            .iter()
            .map(|p| p.strip_prefix(config.root()).unwrap().display().to_string())
            .collect()
    }

    #[test]
    fn devlocal_test_order() {
        let config = Config::new(Environment::new(EnvName::Devlocal, true), "cfg");
        assert_eq!(
            names(&config),
            vec![
                "default.json",
                "default-secure.json",
                "local.json",
                "local-secure.json",
                "devlocal/devlocal.json",
                "devlocal/devlocal-test.json",
                "devlocal/devlocal-secure.json",
                "devlocal/devlocal-test-secure.json",
            ]
        );
    }

    #[test]
    fn remote_order_keeps_duplicate_secure_entry() {
        let config = Config::new(Environment::new(EnvName::Qa, false), "cfg");
        assert_eq!(
            names(&config),
            vec![
                "default.json",
                "default-secure.json",
                "qa/qa.json",
                "qa/qa-secure.json",
                "qa/qa-secure.json",
                "local.json",
                "local-secure.json",
                "qa/qa-local.json",
                "qa/qa-local-secure.json",
            ]
        );
    }

    #[test]
    fn remote_test_order() {
        let config = Config::new(Environment::new(EnvName::Qa, true), "cfg");
        assert_eq!(
            names(&config),
            vec![
                "default.json",
                "default-secure.json",
                "qa/qa.json",
                "qa/qa-secure.json",
                "qa/qa-test.json",
                "qa/qa-secure.json",
                "qa/qa-test-secure.json",
                "local.json",
                "local-secure.json",
                "qa/qa-local.json",
                "qa/qa-local-secure.json",
                "qa/qa-test-local.json",
                "qa/qa-test-local-secure.json",
            ]
        );
    }

    #[test]
    fn remote_test_precedence() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "default.json", json!({"secret": "default", "top": "default"}));
        write(dir.path(), "qa/qa-test.json", json!({"secret": "test", "top": "test"}));
        write(dir.path(), "qa/qa-secure.json", json!({"secret": "secure"}));
        write(dir.path(), "local.json", json!({"top": "local"}));
        write(dir.path(), "qa/qa-test-local-secure.json", json!({"top": "test-local-secure"}));

        let config = Config::new(Environment::new(EnvName::Qa, true), dir.path());
        assert_eq!(config.get_str("secret"), Some("secure"));
        assert_eq!(config.get_str("top"), Some("test-local-secure"));
    }

    #[test]
    fn later_sources_win() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "default.json", json!({"a": 1, "keep": true}));
        write(dir.path(), "devlocal/devlocal-secure.json", json!({"a": 2}));

        let config = Config::new(Environment::new(EnvName::Devlocal, false), dir.path());
        assert_eq!(config.get("a").unwrap(), Some(&json!(2)));
        assert_eq!(config.get("keep").unwrap(), Some(&json!(true)));
    }

    #[test]
    fn missing_and_broken_files_contribute_nothing() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "default.json", json!({"a": 1}));
        fs::write(dir.path().join("local.json"), "{ not json").unwrap();

        let config = Config::new(Environment::new(EnvName::Devlocal, true), dir.path());
        assert_eq!(config.all(), &json!({"a": 1}));
    }

    #[test]
    fn mapping_is_memoised_per_instance() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "default.json", json!({"a": 1}));

        let config = Config::new(Environment::new(EnvName::Devlocal, false), dir.path());
        assert_eq!(config.get("a").unwrap(), Some(&json!(1)));

        write(dir.path(), "default.json", json!({"a": 99}));
        assert_eq!(config.get("a").unwrap(), Some(&json!(1)));

        let fresh = Config::new(Environment::new(EnvName::Devlocal, false), dir.path());
        assert_eq!(fresh.get("a").unwrap(), Some(&json!(99)));
    }

    #[test]
    fn set_then_get_round_trips() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "default.json", json!({"x": 5}));

        let mut config = Config::new(Environment::new(EnvName::Devlocal, false), dir.path());
        config.set("x.y.z", json!("deep")).unwrap();
        assert_eq!(config.get("x.y.z").unwrap(), Some(&json!("deep")));
        assert!(config.has("x.y").unwrap());
        assert!(!config.has("x.q").unwrap());
    }

    #[test]
    fn get_through_scalar_is_absent() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "default.json", json!({"a": {"b": 5}}));

        let config = Config::new(Environment::new(EnvName::Devlocal, false), dir.path());
        assert_eq!(config.get("a.b.c").unwrap(), None);
        assert_eq!(config.get_or("a.b.c", json!("fallback")).unwrap(), json!("fallback"));
    }

    #[test]
    fn empty_path_is_rejected() {
        let mut config = Config::new(Environment::new(EnvName::Devlocal, false), "nowhere");
        assert!(matches!(config.get(""), Err(ConfigError::EmptyKey)));
        assert!(matches!(config.has(""), Err(ConfigError::EmptyKey)));
        assert!(matches!(config.set("", json!(1)), Err(ConfigError::EmptyKey)));
    }

    #[test]
    fn errors_resolve_to_structured_bodies() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "default.json",
            json!({"errors": {"generic": {"badField": {
                "responseCode": 400,
                "errorMessage": "Unknown field %FIELDNAME%"
            }}}}),
        );

        let config = Config::new(Environment::new(EnvName::Devlocal, false), dir.path());
        let err = config.error_with("errors.generic.badField", "%FIELDNAME%", "Colour");
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.message(), "Unknown field Colour");

        let missing = config.error("errors.nothing.here");
        assert_eq!(missing.status_code(), 500);
    }
}
