//! The plugin type and its registry.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::defaults::default_plugins;
use crate::error::{PluginError, Result};

/// The behavior category a plugin slots into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PluginKind {
    /// Loss estimation for training-facing callers.
    Loss,
    /// Generation guidance.
    Guidance,
    /// Input preparation before generation.
    Preprocessor,
    /// Image post-processing after generation.
    Postprocessor,
    /// Attention augmentation.
    Attention,
    /// Optimizer hyperparameter adjustment.
    Optimizer,
}

type ExecFn = Box<dyn FnMut(&[f32], &Value) -> std::result::Result<Vec<f32>, String> + Send>;
type ValidateFn = Box<dyn Fn(&[f32]) -> bool + Send>;

/// A named, versioned unit of pluggable behavior.
pub struct Plugin {
    /// Unique registry key.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Behavior category.
    pub kind: PluginKind,
    /// Version string.
    pub version: String,
    /// Default configuration, passed to `execute` unless overridden.
    pub config: Value,
    exec: ExecFn,
    validate: Option<ValidateFn>,
}

impl Plugin {
    /// Creates a plugin with an empty config and no validation predicate.
    pub fn new<F>(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: PluginKind,
        version: impl Into<String>,
        exec: F,
    ) -> Self
    where
        F: FnMut(&[f32], &Value) -> std::result::Result<Vec<f32>, String> + Send + 'static,
    {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            version: version.into(),
            config: Value::Null,
            exec: Box::new(exec),
            validate: None,
        }
    }

    /// Attaches a validation predicate, checked before every execution.
    pub fn with_validate<F>(mut self, validate: F) -> Self
    where
        F: Fn(&[f32]) -> bool + Send + 'static,
    {
        self.validate = Some(Box::new(validate));
        self
    }

    /// Sets the default configuration.
    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("version", &self.version)
            .field("has_validate", &self.validate.is_some())
            .finish()
    }
}

/// Holds plugins by unique id and executes the active ones.
///
/// Iteration orders are deterministic: registration order for the registry,
/// activation order for the active set. Unordered execution would be a
/// correctness hazard for stateful chains.
#[derive(Debug)]
pub struct PluginRegistry {
    plugins: IndexMap<String, Plugin>,
    active: IndexSet<String>,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginRegistry {
    /// Creates a registry with the five default plugins pre-registered
    /// (none active).
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for plugin in default_plugins() {
            registry.register(plugin);
        }
        registry
    }

    /// Creates a registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            plugins: IndexMap::new(),
            active: IndexSet::new(),
        }
    }

    /// Registers a plugin under its id.
    ///
    /// An existing plugin under the same id is overwritten; the overwrite is
    /// reported back as `true` and logged.
    pub fn register(&mut self, plugin: Plugin) -> bool {
        let overwrote = self.plugins.contains_key(&plugin.id);
        if overwrote {
            warn!(id = plugin.id.as_str(), "overwriting registered plugin");
        }
        self.plugins.insert(plugin.id.clone(), plugin);
        overwrote
    }

    /// Adds the id to the activation set. Idempotent for active ids; fails
    /// for unregistered ones.
    pub fn activate(&mut self, id: &str) -> Result<()> {
        if !self.plugins.contains_key(id) {
            return Err(PluginError::NotRegistered { id: id.to_string() });
        }
        self.active.insert(id.to_string());
        Ok(())
    }

    /// Removes the id from the activation set.
    ///
    /// Deactivating a registered-but-inactive id is a warning no-op;
    /// deactivating an unregistered id is an error.
    pub fn deactivate(&mut self, id: &str) -> Result<()> {
        if !self.plugins.contains_key(id) {
            return Err(PluginError::NotRegistered { id: id.to_string() });
        }
        if !self.active.shift_remove(id) {
            warn!(id, "deactivating a plugin that was not active");
        }
        Ok(())
    }

    /// Whether the id is in the activation set.
    #[must_use]
    pub fn is_active(&self, id: &str) -> bool {
        self.active.contains(id)
    }

    /// Active ids, in activation order.
    #[must_use]
    pub fn list_active(&self) -> Vec<&str> {
        self.active.iter().map(String::as_str).collect()
    }

    /// Registered ids, in registration order.
    #[must_use]
    pub fn list_registered(&self) -> Vec<&str> {
        self.plugins.keys().map(String::as_str).collect()
    }

    /// Looks up a registered plugin.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Plugin> {
        self.plugins.get(id)
    }

    /// Executes one active plugin over the input.
    ///
    /// Fails for unregistered or inactive ids, for inputs rejected by the
    /// plugin's validation predicate, and for failures of the plugin body
    /// (which propagate, not get swallowed). `config` overrides the
    /// plugin's stored default config for this call only.
    pub fn execute(&mut self, id: &str, input: &[f32], config: Option<&Value>) -> Result<Vec<f32>> {
        let active = self.active.contains(id);
        let Some(plugin) = self.plugins.get_mut(id) else {
            return Err(PluginError::NotRegistered { id: id.to_string() });
        };
        if !active {
            return Err(PluginError::NotActive { id: id.to_string() });
        }

        if let Some(validate) = &plugin.validate {
            if !validate(input) {
                return Err(PluginError::Validation { id: id.to_string() });
            }
        }

        let config = config.unwrap_or(&plugin.config);
        (plugin.exec)(input, config).map_err(|message| PluginError::Execution {
            id: id.to_string(),
            message,
        })
    }

    /// Folds every active plugin of `kind` over the input, in activation
    /// order. Any single plugin failure aborts the fold.
    pub fn execute_by_kind(&mut self, kind: PluginKind, input: Vec<f32>) -> Result<Vec<f32>> {
        let ids: Vec<String> = self
            .active
            .iter()
            .filter(|id| self.plugins.get(*id).map(|p| p.kind) == Some(kind))
            .cloned()
            .collect();

        let mut data = input;
        for id in ids {
            data = self.execute(&id, &data, None)?;
        }
        Ok(data)
    }
}
