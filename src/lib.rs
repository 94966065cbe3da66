//! An embeddable interactive command shell.
//!
//! A [`Shell`] reads lines through pluggable input endpoints, dispatches the
//! first word of each line to a handler bound in its [`CommandTable`], and
//! sends results to pluggable output endpoints. Failing handlers never take
//! the loop down: their errors are trapped, summarized for the user and kept
//! on a bounded trace stack for inspection with `$!`.
//!
//! Commands can be added at runtime by loading a [`plugin::Plugin`] with
//! `@load`, bound from the REPL itself with `@bind`, or registered directly by
//! the host. A handler may start a nested shell with [`Shell::nested`]; the
//! nested shell shares the parent's [`SharedState`] and I/O endpoints.
//!
//! ```
//! use spys::{Handler, Shell};
//!
//! let mut sh = Shell::new();
//! sh.commands_mut().register(
//!     "greet",
//!     Handler::new(|who| Ok(Some(format!("hello, {}", who.unwrap_or("world"))))),
//!     Some("[name] - Say hello"),
//! );
//! assert_eq!(sh.handle("greet spys"), Some("hello, spys".to_string()));
//! assert_eq!(sh.handle("? greet"), Some("greet [name] - Say hello".to_string()));
//! ```

mod builtin;
pub mod command;
pub mod config;
pub mod error;
pub mod expr;
pub mod gateway;
pub mod history;
pub mod io_adapters;
pub mod plugin;
pub mod plugins;
pub mod readline;
pub mod shell;
pub mod state;

pub use command::{CommandResult, CommandTable, Handler};
pub use config::ShellConfig;
pub use error::{Failure, FailureKind, ShellError};
pub use gateway::{Endpoint, IoGateway};
pub use plugin::{Plugin, PluginModule, PluginRegistry};
pub use shell::{ReplState, Shell};
pub use state::{SharedState, ShellContext};
