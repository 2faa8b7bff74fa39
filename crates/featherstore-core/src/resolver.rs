//! Plugin resolution by qualified name
//!
//! Deployments substitute backends by identifier string. Two forms are
//! accepted:
//!
//! - A short built-in alias (no dot), resolved through a fixed table.
//! - A fully qualified `module.ClassName`, resolved through modules the
//!   calling process registered ahead of time. The split happens on the
//!   final dot, so `foo.provider.FooProvider` is class `FooProvider` in
//!   module `foo.provider`.
//!
//! The two-stage lookup failure reporting (module stage vs class stage) and
//! the not-implemented message for unknown aliases are observable contract:
//! external tooling parses those strings.
//!
//! Registry store identifiers additionally must end with `RegistryStore`;
//! that check fires before any lookup is attempted.

use crate::config::RepoConfig;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Constructor for a resolved plugin instance
pub type Constructor<T> = Arc<dyn Fn(&RepoConfig) -> Result<T> + Send + Sync>;

/// The plugin families resolved by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginKind {
    Provider,
    RegistryStore,
}

impl PluginKind {
    /// Human-readable kind used in the not-implemented message
    fn display(&self) -> &'static str {
        match self {
            Self::Provider => "Provider",
            Self::RegistryStore => "Registry store",
        }
    }

    /// Naming convention enforced on the class portion of the identifier
    fn required_suffix(&self) -> Option<&'static str> {
        match self {
            Self::Provider => None,
            Self::RegistryStore => Some("RegistryStore"),
        }
    }
}

/// Typed registry of plugin constructors keyed by canonical name
///
/// Built-in aliases live in a fixed table; out-of-tree implementations are
/// registered per module, standing in for dynamic import. `T` is the boxed
/// trait object the constructors produce.
///
/// # Example
///
/// ```
/// use featherstore_core::resolver::{PluginKind, PluginResolver};
/// use featherstore_core::RepoConfig;
/// use std::sync::Arc;
///
/// let mut resolver: PluginResolver<&'static str> = PluginResolver::new(PluginKind::Provider);
/// resolver.register_builtin("local", Arc::new(|_| Ok("local provider")));
/// resolver.register_class("foo.provider", "FooProvider", Arc::new(|_| Ok("foo provider")));
///
/// let config = RepoConfig::new("demo");
/// assert_eq!(resolver.resolve("local", &config).unwrap(), "local provider");
/// assert_eq!(
///     resolver.resolve("foo.provider.FooProvider", &config).unwrap(),
///     "foo provider"
/// );
/// ```
pub struct PluginResolver<T> {
    kind: PluginKind,
    builtins: HashMap<String, Constructor<T>>,
    modules: HashMap<String, HashMap<String, Constructor<T>>>,
}

impl<T> PluginResolver<T> {
    pub fn new(kind: PluginKind) -> Self {
        Self {
            kind,
            builtins: HashMap::new(),
            modules: HashMap::new(),
        }
    }

    /// Register a built-in alias (no dots)
    pub fn register_builtin(&mut self, alias: impl Into<String>, ctor: Constructor<T>) {
        self.builtins.insert(alias.into(), ctor);
    }

    /// Register an out-of-tree class under a module namespace
    pub fn register_class(
        &mut self,
        module: impl Into<String>,
        class: impl Into<String>,
        ctor: Constructor<T>,
    ) {
        self.modules
            .entry(module.into())
            .or_default()
            .insert(class.into(), ctor);
    }

    /// Locate and instantiate the implementation named by `identifier`
    ///
    /// Validation and error reporting follow the observable contract:
    /// naming-convention check first, then alias table or module/class
    /// lookup with a distinct error per failed stage.
    pub fn resolve(&self, identifier: &str, config: &RepoConfig) -> Result<T> {
        if let Some(suffix) = self.kind.required_suffix() {
            let class = identifier.rsplit('.').next().unwrap_or(identifier);
            if !class.ends_with(suffix) {
                return Err(Error::RegistryStoreNaming);
            }
        }

        match identifier.rsplit_once('.') {
            None => {
                let ctor = self.builtins.get(identifier).ok_or_else(|| {
                    Error::NotImplemented {
                        kind: self.kind.display(),
                        name: identifier.to_string(),
                    }
                })?;
                ctor(config)
            }
            Some((module, class)) => {
                let classes = self.modules.get(module).ok_or_else(|| Error::ModuleImport {
                    module: module.to_string(),
                    class: class.to_string(),
                })?;
                let ctor = classes.get(class).ok_or_else(|| Error::ClassImport {
                    module: module.to_string(),
                    class: class.to_string(),
                })?;
                ctor(config)
            }
        }
    }
}
