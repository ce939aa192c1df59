//! # Declarative Configuration
//!
//! Loads services, configuration parameters and routes from YAML:
//!
//! ```yaml
//! parameters:
//!   baseUrl: /home
//! services:
//!   serviceSub: { class: ServiceSub }
//! routes:
//!   blubb: { path: "/blubb/{id}", controller: Controller::someAction, defaults: { id: 1 } }
//! ```
//!
//! Service order is preserved; it decides type-directed service matches.
//! Class names are mapped to code through
//! [`ServiceClasses`](crate::registry::ServiceClasses).
//!
//! [`AppConfig::load_dir`] reads an application directory holding
//! `services.yml` and optionally `routes.yml`, and records the directory as
//! the `configDir` parameter.

use rivet_core::{BuildError, InvocationTarget, RawParameters, Value};
use serde::Deserialize;
use serde_yaml::{Mapping, Value as Yaml};
use std::{collections::BTreeMap, path::Path};

/// Required file of a configuration directory.
pub const SERVICES_FILE: &str = "services.yml";

/// Optional file of a configuration directory.
pub const ROUTES_FILE: &str = "routes.yml";

/// Parameter holding the directory a configuration was loaded from.
pub const CONFIG_DIR_PARAMETER: &str = "configDir";
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read configuration from {path}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid YAML, or has the wrong shape.
    #[error("invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A value has no counterpart in [`Value`].
    #[error("unsupported value for `{key}`: {reason}")]
    UnsupportedValue {
        /// Key the value was found under.
        key: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A route or service entry was rejected.
    #[error(transparent)]
    Build(#[from] BuildError),
}

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    parameters: Mapping,
    services: Mapping,
    routes: Mapping,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawService {
    class: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRoute {
    path: String,
    controller: String,
    #[serde(default)]
    defaults: Mapping,
}

/// A configured service: a name and the class to build it from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Service name.
    pub name: String,
    /// Class name, looked up in `ServiceClasses`.
    pub class: String,
}

/// A configured route.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteConfig {
    /// Route name.
    pub name: String,
    /// Path or pattern.
    pub path: String,
    /// Handler to invoke.
    pub target: InvocationTarget,
    /// Default route parameters.
    pub defaults: RawParameters,
}

/// Validated application configuration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppConfig {
    /// Configuration parameters in file order.
    pub parameters: Vec<(String, Value)>,
    /// Services in file order.
    pub services: Vec<ServiceConfig>,
    /// Routes in file order.
    pub routes: Vec<RouteConfig>,
}

impl AppConfig {
    /// Parse a YAML document.
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(source)?;

        let parameters = raw
            .parameters
            .into_iter()
            .map(|(key, value)| {
                let key = key_string(key, "parameters")?;
                let value = to_value(&key, value)?;
                Ok((key, value))
            })
            .collect::<Result<_, ConfigError>>()?;

        let services = raw
            .services
            .into_iter()
            .map(|(key, value)| {
                let name = key_string(key, "services")?;
                let service: RawService = serde_yaml::from_value(value)?;
                Ok(ServiceConfig {
                    name,
                    class: service.class,
                })
            })
            .collect::<Result<_, ConfigError>>()?;

        let routes = raw
            .routes
            .into_iter()
            .map(|(key, value)| {
                let name = key_string(key, "routes")?;
                let route: RawRoute = serde_yaml::from_value(value)?;
                let defaults = route
                    .defaults
                    .into_iter()
                    .map(|(key, value)| {
                        let key = key_string(key, &name)?;
                        let value = to_value(&key, value)?;
                        Ok((key, value))
                    })
                    .collect::<Result<RawParameters, ConfigError>>()?;
                Ok(RouteConfig {
                    name,
                    path: route.path,
                    target: InvocationTarget::parse(&route.controller)?,
                    defaults,
                })
            })
            .collect::<Result<_, ConfigError>>()?;

        let config = Self {
            parameters,
            services,
            routes,
        };
        tracing::debug!(
            parameters = config.parameters.len(),
            services = config.services.len(),
            routes = config.routes.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Read and parse a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&source)
    }

    /// Load an application directory.
    ///
    /// `services.yml` must exist; `routes.yml` is read when present. Both
    /// accept every section and are concatenated in that order. The
    /// directory itself is seeded as the `configDir` parameter, which the
    /// files may override.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();
        let mut config = Self {
            parameters: vec![(
                CONFIG_DIR_PARAMETER.to_string(),
                Value::from(dir.display().to_string()),
            )],
            ..Self::default()
        };
        config.extend(Self::load(dir.join(SERVICES_FILE))?);

        let routes = dir.join(ROUTES_FILE);
        if routes.is_file() {
            config.extend(Self::load(routes)?);
        }
        Ok(config)
    }

    /// Append the sections of another configuration.
    pub fn extend(&mut self, other: AppConfig) {
        self.parameters.extend(other.parameters);
        self.services.extend(other.services);
        self.routes.extend(other.routes);
    }
}

fn key_string(key: Yaml, section: &str) -> Result<String, ConfigError> {
    match key {
        Yaml::String(s) => Ok(s),
        other => Err(ConfigError::UnsupportedValue {
            key: section.to_string(),
            reason: format!("keys must be strings, found {other:?}"),
        }),
    }
}

fn to_value(key: &str, yaml: Yaml) -> Result<Value, ConfigError> {
    let unsupported = |reason: &str| ConfigError::UnsupportedValue {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    Ok(match yaml {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Value::Int(i),
            (None, Some(f)) => Value::Float(f),
            (None, None) => return Err(unsupported("number out of range")),
        },
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::List(
            items
                .into_iter()
                .map(|item| to_value(key, item))
                .collect::<Result<_, _>>()?,
        ),
        Yaml::Mapping(map) => Value::Map(
            map.into_iter()
                .map(|(k, v)| {
                    let k = key_string(k, key)?;
                    let v = to_value(&k, v)?;
                    Ok((k, v))
                })
                .collect::<Result<BTreeMap<_, _>, ConfigError>>()?,
        ),
        Yaml::Tagged(_) => return Err(unsupported("tagged values are not supported")),
    })
}
