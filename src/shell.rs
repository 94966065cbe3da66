use crate::builtin;
use crate::command::{CommandResult, CommandTable, Handler};
use crate::config::ShellConfig;
use crate::error::{Failure, FailureKind, ShellError};
use crate::gateway::{Endpoint, IoGateway};
use crate::history::FixedStack;
use crate::state::{SharedState, ShellContext};
use anyhow::anyhow;
use log::{debug, warn};
use std::any::Any;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::rc::Rc;

mod repl;

/// Whether a shell's loop is accepting lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplState {
    Running,
    Stopped,
}

type InputHook = Box<dyn FnMut(&str)>;

/// How many `@script` runs may be active at once in one shell.
pub const MAX_SCRIPT_DEPTH: usize = 32;

/// One interactive shell instance.
///
/// A shell owns its command table, prompt and history buffers. Its shared
/// state, I/O endpoints and plugin registry come from a [`ShellContext`]: a
/// root shell creates a fresh one, a nested shell borrows its parent's, so
/// everything a nested shell stores or prints goes where the parent's does.
///
/// ```
/// use spys::Shell;
///
/// let mut sh = Shell::new();
/// assert_eq!(sh.handle("` hello"), Some("hello".to_string()));
/// assert_eq!(sh.handle(""), None);
/// ```
pub struct Shell {
    ctx: ShellContext,
    config: ShellConfig,
    commands: CommandTable,
    prompt: String,
    last_input: FixedStack<String>,
    last_output: FixedStack<String>,
    trace: FixedStack<Failure>,
    state: ReplState,
    default_hook: Option<Handler>,
    on_input: Option<InputHook>,
    script_depth: usize,
}

impl Shell {
    /// A root shell with default settings, console endpoints and the bundled plugins.
    pub fn new() -> Self {
        Self::with_config(ShellConfig::default(), None)
    }

    /// A shell sharing `parent`'s state, endpoints and plugins.
    pub fn nested(parent: &ShellContext) -> Self {
        Self::with_config(ShellConfig::default(), Some(parent))
    }

    /// A shell built from `config`, nested in `parent` if one is given.
    pub fn with_config(config: ShellConfig, parent: Option<&ShellContext>) -> Self {
        let ctx = parent.cloned().unwrap_or_default();
        Self::with_context(config, ctx)
    }

    /// A shell running inside an explicitly assembled context.
    pub fn with_context(config: ShellConfig, ctx: ShellContext) -> Self {
        let capacity = config.history_capacity;
        let mut commands = CommandTable::new();
        builtin::install(&mut commands);

        Self {
            ctx,
            prompt: config.prompt.clone(),
            config,
            commands,
            last_input: FixedStack::new(capacity),
            last_output: FixedStack::new(capacity),
            trace: FixedStack::new(capacity),
            state: ReplState::Running,
            default_hook: None,
            on_input: None,
            script_depth: 0,
        }
    }

    /// The context this shell shares with the shells nested in it.
    pub fn context(&self) -> &ShellContext {
        &self.ctx
    }

    pub fn shared(&self) -> &SharedState {
        self.ctx.shared()
    }

    pub fn io(&self) -> &Rc<IoGateway> {
        self.ctx.io()
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    pub fn commands_mut(&mut self) -> &mut CommandTable {
        &mut self.commands
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Change the prompt; `None` or an empty string restores the configured one.
    pub fn set_prompt(&mut self, prompt: Option<&str>) {
        self.prompt = match prompt {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => self.config.prompt.clone(),
        };
    }

    /// Install the handler that receives every line whose keyword is unbound.
    ///
    /// The handler is passed the whole line as its argument.
    pub fn set_default(&mut self, handler: Handler) {
        self.default_hook = Some(handler);
    }

    /// Observe every line read by the loop, before it is recorded or dispatched.
    pub fn set_on_input(&mut self, hook: impl FnMut(&str) + 'static) {
        self.on_input = Some(Box::new(hook));
    }

    pub fn output(&self, data: &str, endpoint: impl Into<Endpoint>) -> io::Result<()> {
        self.ctx.io().output(data, endpoint)
    }

    pub fn input(&self, prompt: &str, endpoint: impl Into<Endpoint>) -> io::Result<String> {
        self.ctx.io().input(prompt, endpoint)
    }

    /// Dispatch one line and return what it produced.
    ///
    /// Failures of the invoked handler, panics included, never escape: they
    /// are recorded on the trace stack and turned into a one-line message.
    pub fn handle<'a>(&mut self, line: impl Into<Option<&'a str>>) -> Option<String> {
        let line = line.into().filter(|l| !l.is_empty())?;
        let (keyword, tail) = split_command(line);

        let (handler, arg) = match self.commands.resolve(keyword) {
            Some(handler) => {
                debug!("dispatching '{keyword}'");
                (handler, tail)
            }
            None => {
                debug!("'{keyword}' is unbound, passing line to the default hook");
                (self.default_hook.clone()?, Some(line))
            }
        };

        match invoke(&handler, self, arg) {
            Ok(result) => result,
            Err(err) => Some(self.trap(Failure::new(keyword, tail, err))),
        }
    }

    /// Push a failure onto the trace stack.
    pub fn record_failure(&mut self, failure: Failure) {
        warn!("{failure}");
        self.trace.append(failure);
    }

    fn trap(&mut self, failure: Failure) -> String {
        if failure.kind == FailureKind::Unhandled {
            if let Err(e) = self.output(&format!("{:#}", failure.error), Endpoint::DEFAULT) {
                warn!("could not report failure of '{}': {e}", failure.command);
            }
        }
        let summary = failure.summary();
        self.record_failure(failure);
        summary
    }

    pub fn pop_input(&mut self) -> Option<String> {
        self.last_input.pop()
    }

    pub fn pop_output(&mut self) -> Option<String> {
        self.last_output.pop()
    }

    pub fn pop_trace(&mut self) -> Option<Failure> {
        self.trace.pop()
    }

    /// Help for `topic`, or the list of commands when there is none.
    pub fn help(&self, topic: Option<&str>) -> String {
        let Some(topic) = topic.filter(|t| !t.is_empty()) else {
            return format!(
                "? <command> - Displays command help, if available\nAvailable commands: {}",
                self.commands.keywords().join(", ")
            );
        };
        match self.commands.help(topic) {
            Some(Some(help)) if !help.is_empty() => format!("{topic} {help}"),
            Some(_) => format!("No help for {topic}"),
            None => format!("{topic} is unbound"),
        }
    }

    /// Dispatch every line of the file at `path`, emitting non-empty results.
    ///
    /// Blank lines and lines starting with `#` are skipped. A file that cannot
    /// be opened or read yields a message rather than an error; only a failing
    /// output endpoint is reported as `Err`. Scripts may run other scripts, up
    /// to [`MAX_SCRIPT_DEPTH`] levels; a script past that is not read.
    pub fn run_script(&mut self, path: impl AsRef<Path>) -> io::Result<Option<String>> {
        let path = path.as_ref();
        if self.script_depth >= MAX_SCRIPT_DEPTH {
            warn!("not running {}: scripts nested {MAX_SCRIPT_DEPTH} deep", path.display());
            return Ok(Some("Error reading input file".to_string()));
        }

        self.script_depth += 1;
        let result = self.run_script_lines(path);
        self.script_depth -= 1;
        result
    }

    fn run_script_lines(&mut self, path: &Path) -> io::Result<Option<String>> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                warn!("cannot open script {}: {e}", path.display());
                return Ok(Some("Could not open input file".to_string()));
            }
        };

        for line in BufReader::new(file).lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("cannot read script {}: {e}", path.display());
                    return Ok(Some("Error reading input file".to_string()));
                }
            };
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(result) = self.handle(line).filter(|r| !r.is_empty()) {
                self.output(&result, Endpoint::DEFAULT)?;
            }
        }
        Ok(None)
    }

    /// Dispatch `line`, then dispatch `keyword` with what `line` produced.
    pub fn call(&mut self, keyword: &str, line: &str) -> Option<String> {
        let command = match self.handle(line) {
            Some(result) => format!("{keyword} {result}"),
            None => keyword.to_string(),
        };
        if let Err(e) = self.output(&command, Endpoint::DEFAULT) {
            warn!("could not echo '{command}': {e}");
        }
        self.handle(command.as_str())
    }

    /// Ask the loop to finish after the current line.
    pub fn stop(&mut self) {
        self.state = ReplState::Stopped;
    }

    pub fn state(&self) -> ReplState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ReplState::Running
    }
}

impl Default for Shell {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a line into its keyword and the tail following the first whitespace run.
fn split_command(line: &str) -> (&str, Option<&str>) {
    match line.split_once(char::is_whitespace) {
        Some((keyword, rest)) => {
            let tail = rest.trim_start();
            (keyword, (!tail.is_empty()).then_some(tail))
        }
        None => (line, None),
    }
}

fn invoke(handler: &Handler, shell: &mut Shell, arg: Option<&str>) -> CommandResult {
    panic::catch_unwind(AssertUnwindSafe(|| handler.call(shell, arg)))
        .unwrap_or_else(|payload| Err(anyhow!(ShellError::Unhandled(panic_message(&*payload)))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("handler panicked: {s}")
    } else {
        "handler panicked".to_string()
    }
}
