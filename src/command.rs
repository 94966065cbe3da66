use crate::shell::Shell;
use log::debug;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// What a handler produces: an optional line of output, or a failure the
/// dispatcher will trap and report.
pub type CommandResult = anyhow::Result<Option<String>>;

type HandlerFn = dyn Fn(&mut Shell, Option<&str>) -> CommandResult;

/// A callable bound to a command keyword.
///
/// Handlers receive the argument tail (everything after the keyword and the
/// whitespace following it, `None` if there is nothing) and parse it
/// themselves. Handlers built with [`Handler::with_shell`] also receive the
/// shell instance that dispatched them.
#[derive(Clone)]
pub struct Handler(Rc<HandlerFn>);

impl Handler {
    /// Wrap a function that only needs the argument tail.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Option<&str>) -> CommandResult + 'static,
    {
        Self(Rc::new(move |_: &mut Shell, tail: Option<&str>| f(tail)))
    }

    /// Wrap a function that also wants the dispatching shell.
    pub fn with_shell<F>(f: F) -> Self
    where
        F: Fn(&mut Shell, Option<&str>) -> CommandResult + 'static,
    {
        Self(Rc::new(f))
    }

    /// Invoke the handler.
    pub fn call(&self, shell: &mut Shell, tail: Option<&str>) -> CommandResult {
        (self.0)(shell, tail)
    }

    /// Whether both handles refer to the same function.
    pub fn ptr_eq(&self, other: &Handler) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler(..)")
    }
}

/// A handler together with its help text.
#[derive(Debug, Clone)]
pub struct CommandEntry {
    pub handler: Handler,
    pub help: Option<String>,
}

/// Keyword → command mapping of one shell instance.
///
/// Keywords are case-sensitive and matched exactly; prefix matching is only
/// used for completion. Iteration order is lexicographic.
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    entries: BTreeMap<String, CommandEntry>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `keyword`, replacing any previous binding.
    ///
    /// Passing no handler removes a known keyword and does nothing for an
    /// unknown one. Empty keywords are rejected. Returns whether a binding was
    /// added or replaced.
    pub fn register(
        &mut self,
        keyword: &str,
        handler: impl Into<Option<Handler>>,
        help: Option<&str>,
    ) -> bool {
        if keyword.is_empty() {
            return false;
        }
        match handler.into() {
            Some(handler) => {
                debug!("binding command '{keyword}'");
                let entry = CommandEntry {
                    handler,
                    help: help.map(str::to_string),
                };
                self.entries.insert(keyword.to_string(), entry);
                true
            }
            None => {
                self.unregister(keyword);
                false
            }
        }
    }

    /// Remove `keyword` and its help. Returns whether it was bound.
    pub fn unregister(&mut self, keyword: &str) -> bool {
        self.entries.remove(keyword).is_some()
    }

    pub fn resolve(&self, keyword: &str) -> Option<Handler> {
        self.entries.get(keyword).map(|e| e.handler.clone())
    }

    pub fn entry(&self, keyword: &str) -> Option<&CommandEntry> {
        self.entries.get(keyword)
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.entries.contains_key(keyword)
    }

    /// Help text of a bound keyword; `None` if the keyword is unbound.
    pub fn help(&self, keyword: &str) -> Option<Option<&str>> {
        self.entries.get(keyword).map(|e| e.help.as_deref())
    }

    /// All keywords, sorted.
    pub fn keywords(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Keywords starting with `prefix`, sorted.
    pub fn complete(&self, prefix: &str) -> Vec<String> {
        self.entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
