//! Command bundles that can be loaded into a running shell.
//!
//! A plugin is anything implementing [`Plugin`]: it has a name the shell can
//! resolve, and an export-declaration entry point listing the commands it
//! contributes. Plugins are resolved through a [`PluginRegistry`] that the
//! host fills before (or while) the shell runs.

use crate::command::Handler;
use crate::error::{Result, ShellError};
use crate::shell::Shell;
use log::{info, warn};
use regex::Regex;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::LazyLock;

static MODULE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
        .expect("module name pattern is valid")
});

/// One command exported by a plugin.
#[derive(Debug, Clone)]
pub struct Export {
    /// Name of the module declaring the export.
    pub owner: String,
    /// Keyword the handler will be bound to.
    pub keyword: String,
    pub handler: Handler,
}

impl Export {
    pub fn new(owner: &str, keyword: &str, handler: Handler) -> Self {
        Self {
            owner: owner.to_string(),
            keyword: keyword.to_string(),
            handler,
        }
    }
}

/// A loadable command bundle.
pub trait Plugin {
    /// Name the plugin is resolved by.
    fn name(&self) -> &str;

    /// The export-declaration entry point.
    ///
    /// `None` means the module has no such entry point and cannot be loaded.
    fn exports(&self) -> Option<Vec<Export>>;
}

/// A plugin assembled from closures, for hosts and tests that don't need a
/// dedicated type.
pub struct PluginModule {
    name: String,
    exports: Option<Vec<(String, Handler)>>,
}

impl PluginModule {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            exports: Some(Vec::new()),
        }
    }

    /// A module that resolves but declares no exports.
    pub fn opaque(name: &str) -> Self {
        Self {
            name: name.to_string(),
            exports: None,
        }
    }

    /// Add an export.
    pub fn export(mut self, keyword: &str, handler: Handler) -> Self {
        self.exports
            .get_or_insert_with(Vec::new)
            .push((keyword.to_string(), handler));
        self
    }
}

impl Plugin for PluginModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn exports(&self) -> Option<Vec<Export>> {
        self.exports.as_ref().map(|exports| {
            exports
                .iter()
                .map(|(keyword, handler)| Export::new(&self.name, keyword, handler.clone()))
                .collect()
        })
    }
}

/// Name → plugin lookup used by `@load`.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: RefCell<BTreeMap<String, Rc<dyn Plugin>>>,
}

impl PluginRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the bundled demo plugins.
    pub fn with_bundled() -> Self {
        let registry = Self::new();
        for plugin in crate::plugins::bundled() {
            registry.register_rc(plugin);
        }
        registry
    }

    /// Make `plugin` resolvable under its name, replacing any previous one.
    pub fn register(&self, plugin: impl Plugin + 'static) {
        self.register_rc(Rc::new(plugin));
    }

    fn register_rc(&self, plugin: Rc<dyn Plugin>) {
        self.plugins
            .borrow_mut()
            .insert(plugin.name().to_string(), plugin);
    }

    pub fn resolve(&self, name: &str) -> Result<Rc<dyn Plugin>> {
        if !MODULE_NAME.is_match(name) {
            return Err(ShellError::Resolution(name.to_string()));
        }
        self.plugins
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| ShellError::Resolution(name.to_string()))
    }

    /// Names of all registered plugins, sorted.
    pub fn names(&self) -> Vec<String> {
        self.plugins.borrow().keys().cloned().collect()
    }
}

/// Resolve `name` and merge its exports into `shell`'s command table.
///
/// Always returns a message for the user. Exports are registered one by one;
/// an export that cannot be registered is skipped and the ones before it stay
/// registered.
pub fn load(shell: &mut Shell, name: &str) -> String {
    let plugin = match shell.context().plugins().resolve(name) {
        Ok(plugin) => plugin,
        Err(e) => {
            warn!("plugin load failed: {e}");
            return format!("Load failed, couldn't import {name}");
        }
    };

    let Some(exports) = plugin.exports() else {
        warn!("plugin {name} has no export declaration");
        return format!("Could not enumerate module exports in {}", plugin.name());
    };

    let mut imported = Vec::new();
    for export in exports {
        if shell
            .commands_mut()
            .register(&export.keyword, export.handler, None)
        {
            imported.push(export.keyword);
        } else {
            warn!("{}: skipping export with empty keyword", export.owner);
        }
    }

    info!("loaded {} commands from {}", imported.len(), plugin.name());
    format!(
        "{} new commands imported from {} ({})",
        imported.len(),
        plugin.name(),
        imported.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ShellContext;

    fn double() -> Handler {
        Handler::new(|tail| {
            let n: i64 = tail.unwrap_or_default().trim().parse()?;
            Ok(Some((n * 2).to_string()))
        })
    }

    fn shell_with(plugin: PluginModule) -> Shell {
        let shell = Shell::new();
        shell.context().plugins().register(plugin);
        shell
    }

    #[test]
    fn test_load_registers_exports() {
        let mut shell = shell_with(PluginModule::new("mathx").export("double", double()));

        let msg = load(&mut shell, "mathx");

        assert_eq!(msg, "1 new commands imported from mathx (double)");
        assert!(shell.commands().contains("double"));
        assert_eq!(shell.handle("double 21"), Some("42".to_string()));
    }

    #[test]
    fn test_unknown_module() {
        let mut shell = Shell::new();
        let before = shell.commands().len();

        assert_eq!(load(&mut shell, "nosuch"), "Load failed, couldn't import nosuch");
        assert_eq!(load(&mut shell, "../evil"), "Load failed, couldn't import ../evil");
        assert_eq!(shell.commands().len(), before);
    }

    #[test]
    fn test_module_without_exports() {
        let mut shell = shell_with(PluginModule::opaque("blank"));
        assert_eq!(
            load(&mut shell, "blank"),
            "Could not enumerate module exports in blank"
        );
    }

    #[test]
    fn test_partial_load_keeps_earlier_exports() {
        let plugin = PluginModule::new("partial")
            .export("first", double())
            .export("", double())
            .export("last", double());
        let mut shell = shell_with(plugin);

        let msg = load(&mut shell, "partial");

        assert_eq!(msg, "2 new commands imported from partial (first, last)");
        assert!(shell.commands().contains("first"));
        assert!(shell.commands().contains("last"));
    }

    #[test]
    fn test_collision_last_registered_wins() {
        let winner = Handler::new(|_| Ok(Some("second".to_string())));
        let plugin = PluginModule::new("dup")
            .export("same", Handler::new(|_| Ok(Some("first".to_string()))))
            .export("same", winner.clone());
        let mut shell = shell_with(plugin);

        load(&mut shell, "dup");
        assert!(shell.commands().resolve("same").unwrap().ptr_eq(&winner));
    }

    #[test]
    fn test_registry_lookup() {
        let registry = PluginRegistry::new();
        registry.register(PluginModule::new("a.b"));

        assert!(registry.resolve("a.b").is_ok());
        assert!(matches!(registry.resolve("a"), Err(ShellError::Resolution(_))));
        assert!(matches!(registry.resolve("1abc"), Err(ShellError::Resolution(_))));
        assert_eq!(registry.names(), vec!["a.b"]);

        let bundled = PluginRegistry::with_bundled();
        assert!(bundled.resolve("calc").is_ok());
        assert!(bundled.resolve("numbers").is_ok());
    }

    #[test]
    fn test_nested_shell_sees_registered_plugins() {
        let root = ShellContext::new();
        root.plugins().register(PluginModule::new("mathx").export("double", double()));

        let mut child = Shell::nested(&root);
        assert_eq!(
            load(&mut child, "mathx"),
            "1 new commands imported from mathx (double)"
        );
    }
}
