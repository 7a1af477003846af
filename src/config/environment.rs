use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ConfigError;

/// Deployment stage names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvName {
    Devlocal,
    Devint,
    Qa,
    Uat,
    Prod,
}

impl EnvName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvName::Devlocal => "devlocal",
            EnvName::Devint => "devint",
            EnvName::Qa => "qa",
            EnvName::Uat => "uat",
            EnvName::Prod => "prod",
        }
    }
}

impl fmt::Display for EnvName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnvName {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "devlocal" => Ok(EnvName::Devlocal),
            "devint" => Ok(EnvName::Devint),
            "qa" => Ok(EnvName::Qa),
            "uat" => Ok(EnvName::Uat),
            "prod" => Ok(EnvName::Prod),
            other => Err(ConfigError::UnknownEnvironment(other.to_string())),
        }
    }
}

/// The stage a request runs in, plus whether it targets the test data set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Environment {
    pub name: EnvName,
    pub is_test: bool,
}

impl Environment {
    pub fn new(name: EnvName, is_test: bool) -> Self {
        Self { name, is_test }
    }

    /// Resolve the stage from `CAULDRON_ENV`, then `SERVERLESS_STAGE`,
    /// falling back to `devlocal`.
    pub fn from_env(is_test: bool) -> Result<Self, ConfigError> {
        let name = std::env::var("CAULDRON_ENV")
            .or_else(|_| std::env::var("SERVERLESS_STAGE"))
            .ok()
            .filter(|s| !s.is_empty())
            .map(|s| s.parse())
            .transpose()?
            .unwrap_or(EnvName::Devlocal);

        Ok(Self::new(name, is_test))
    }

    /// True when this environment's name is one of `names`.
    pub fn is(&self, names: &[EnvName]) -> bool {
        names.contains(&self.name)
    }

    pub fn is_local(&self) -> bool {
        self.name == EnvName::Devlocal
    }

    /// The same stage pointed at the other data set.
    pub fn with_test(&self, is_test: bool) -> Self {
        Self::new(self.name, is_test)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_test {
            write!(f, "{}-test", self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}
