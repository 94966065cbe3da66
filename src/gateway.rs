//! Pluggable input/output routing for shell instances.
//!
//! A shell never touches the terminal directly: every prompt goes through an
//! input endpoint and every result through an output endpoint. Endpoint `0` is
//! always present and is backed by the process console until a host replaces it.
//! Requests for an endpoint nobody registered are routed to endpoint `0`.

use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

/// Identifier of an I/O channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Id(i64),
    Tag(String),
}

impl Endpoint {
    /// The always-present default endpoint.
    pub const DEFAULT: Endpoint = Endpoint::Id(0);
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<i64> for Endpoint {
    fn from(id: i64) -> Self {
        Endpoint::Id(id)
    }
}

impl From<i32> for Endpoint {
    fn from(id: i32) -> Self {
        Endpoint::Id(i64::from(id))
    }
}

impl From<&str> for Endpoint {
    fn from(tag: &str) -> Self {
        Endpoint::Tag(tag.to_string())
    }
}

impl From<String> for Endpoint {
    fn from(tag: String) -> Self {
        Endpoint::Tag(tag)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Id(id) => write!(f, "{id}"),
            Endpoint::Tag(tag) => f.write_str(tag),
        }
    }
}

/// Function that shows `prompt` and returns one line of input.
///
/// End of input is reported as [`io::ErrorKind::UnexpectedEof`], a user
/// interrupt as [`io::ErrorKind::Interrupted`].
pub type InputFn = dyn FnMut(&str) -> io::Result<String>;

/// Function that emits one chunk of output.
pub type OutputFn = dyn FnMut(&str) -> io::Result<()>;

type SharedInput = Rc<RefCell<Box<InputFn>>>;
type SharedOutput = Rc<RefCell<Box<OutputFn>>>;

/// Registry of input and output endpoints.
///
/// Lives behind an `Rc` so nested shells can route through the very same
/// endpoints as the shell that created them; all methods take `&self`.
pub struct IoGateway {
    inputs: RefCell<HashMap<Endpoint, SharedInput>>,
    outputs: RefCell<HashMap<Endpoint, SharedOutput>>,
    candidates: Rc<RefCell<Vec<String>>>,
}

impl IoGateway {
    /// A gateway whose default endpoints read from stdin and print to stdout.
    pub fn console() -> Self {
        let gateway = Self {
            inputs: RefCell::new(HashMap::new()),
            outputs: RefCell::new(HashMap::new()),
            candidates: Rc::new(RefCell::new(Vec::new())),
        };
        gateway.bind_default_input(Endpoint::DEFAULT);
        gateway.bind_default_output(Endpoint::DEFAULT);
        gateway
    }

    /// Send `data` to `endpoint`, or to the default endpoint if it is unknown.
    pub fn output(&self, data: &str, endpoint: impl Into<Endpoint>) -> io::Result<()> {
        let endpoint = endpoint.into();
        let target = lookup(&self.outputs, &endpoint);
        let mut f = target.borrow_mut();
        (*f)(data)
    }

    /// Acquire a line from `endpoint`, or from the default endpoint if it is unknown.
    pub fn input(&self, prompt: &str, endpoint: impl Into<Endpoint>) -> io::Result<String> {
        let endpoint = endpoint.into();
        let source = lookup(&self.inputs, &endpoint);
        let mut f = source.borrow_mut();
        (*f)(prompt)
    }

    /// Install or replace an output endpoint.
    ///
    /// Passing `None` returns `false` and binds the default behaviour for `id`
    /// instead: the console for endpoint `0`, fallback to endpoint `0` otherwise.
    pub fn register_output(&self, id: impl Into<Endpoint>, f: Option<Box<OutputFn>>) -> bool {
        let id = id.into();
        match f {
            Some(f) => {
                debug!("registered output endpoint {id}");
                self.outputs.borrow_mut().insert(id, Rc::new(RefCell::new(f)));
                true
            }
            None => {
                self.bind_default_output(id);
                false
            }
        }
    }

    /// Install or replace an input endpoint. See [`IoGateway::register_output`].
    pub fn register_input(&self, id: impl Into<Endpoint>, f: Option<Box<InputFn>>) -> bool {
        let id = id.into();
        match f {
            Some(f) => {
                debug!("registered input endpoint {id}");
                self.inputs.borrow_mut().insert(id, Rc::new(RefCell::new(f)));
                true
            }
            None => {
                self.bind_default_input(id);
                false
            }
        }
    }

    pub fn has_output(&self, id: &Endpoint) -> bool {
        self.outputs.borrow().contains_key(id)
    }

    pub fn has_input(&self, id: &Endpoint) -> bool {
        self.inputs.borrow().contains_key(id)
    }

    /// Replace the completion candidates offered to line readers.
    pub fn offer_candidates(&self, candidates: Vec<String>) {
        *self.candidates.borrow_mut() = candidates;
    }

    /// Handle to the completion candidates, for line readers that complete keywords.
    pub fn candidates(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.candidates)
    }

    fn bind_default_output(&self, id: Endpoint) {
        let mut outputs = self.outputs.borrow_mut();
        if id == Endpoint::DEFAULT {
            let f: Box<OutputFn> = Box::new(console_output);
            outputs.insert(id, Rc::new(RefCell::new(f)));
        } else {
            outputs.remove(&id);
        }
    }

    fn bind_default_input(&self, id: Endpoint) {
        let mut inputs = self.inputs.borrow_mut();
        if id == Endpoint::DEFAULT {
            let f: Box<InputFn> = Box::new(console_input);
            inputs.insert(id, Rc::new(RefCell::new(f)));
        } else {
            inputs.remove(&id);
        }
    }
}

impl Default for IoGateway {
    fn default() -> Self {
        Self::console()
    }
}

fn lookup<F: ?Sized>(
    table: &RefCell<HashMap<Endpoint, Rc<RefCell<Box<F>>>>>,
    endpoint: &Endpoint,
) -> Rc<RefCell<Box<F>>> {
    let table = table.borrow();
    match table.get(endpoint) {
        Some(f) => Rc::clone(f),
        None => {
            debug!("endpoint {endpoint} not registered, using default");
            // Endpoint 0 is installed at construction and can only be replaced.
            Rc::clone(&table[&Endpoint::DEFAULT])
        }
    }
}

fn console_output(data: &str) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{data}")?;
    stdout.flush()
}

fn console_input(prompt: &str) -> io::Result<String> {
    {
        let mut stdout = io::stdout().lock();
        write!(stdout, "{prompt}")?;
        stdout.flush()?;
    }
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "end of input"));
    }
    let trimmed = line.trim_end_matches(['\n', '\r']).len();
    line.truncate(trimmed);
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io_adapters::{CapturedOutput, ScriptedInput};

    #[test]
    fn test_unregistered_output_falls_back_to_default() {
        let gateway = IoGateway::console();
        let (out, lines) = CapturedOutput::with_handle();
        assert!(gateway.register_output(0, Some(out.into_endpoint())));

        gateway.output("hello", 7).unwrap();
        gateway.output("tagged", "status").unwrap();

        assert_eq!(*lines.borrow(), vec!["hello", "tagged"]);
    }

    #[test]
    fn test_registered_endpoint_is_used() {
        let gateway = IoGateway::console();
        let (main, main_lines) = CapturedOutput::with_handle();
        let (side, side_lines) = CapturedOutput::with_handle();
        gateway.register_output(0, Some(main.into_endpoint()));
        gateway.register_output("side", Some(side.into_endpoint()));

        gateway.output("a", Endpoint::DEFAULT).unwrap();
        gateway.output("b", "side").unwrap();

        assert_eq!(*main_lines.borrow(), vec!["a"]);
        assert_eq!(*side_lines.borrow(), vec!["b"]);
    }

    #[test]
    fn test_input_routes_prompt_and_falls_back() {
        let gateway = IoGateway::console();
        let input = ScriptedInput::new(["first", "second"]);
        let prompts = input.prompts();
        gateway.register_input(0, Some(input.into_endpoint()));

        assert_eq!(gateway.input("> ", 0).unwrap(), "first");
        assert_eq!(gateway.input("? ", 3).unwrap(), "second");
        let err = gateway.input("> ", 0).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(*prompts.borrow(), vec!["> ", "? ", "> "]);
    }

    #[test]
    fn test_registering_none_reports_failure_and_binds_default() {
        let gateway = IoGateway::console();
        let (main, main_lines) = CapturedOutput::with_handle();
        let (side, side_lines) = CapturedOutput::with_handle();
        gateway.register_output(0, Some(main.into_endpoint()));
        gateway.register_output(2, Some(side.into_endpoint()));

        assert!(!gateway.register_output(2, None));
        assert!(!gateway.has_output(&Endpoint::Id(2)));

        gateway.output("after", 2).unwrap();
        assert_eq!(*main_lines.borrow(), vec!["after"]);
        assert!(side_lines.borrow().is_empty());
    }

    #[test]
    fn test_default_endpoints_always_present() {
        let gateway = IoGateway::console();
        assert!(gateway.has_input(&Endpoint::DEFAULT));
        assert!(gateway.has_output(&Endpoint::DEFAULT));
        assert!(!gateway.register_input(0, None));
        assert!(gateway.has_input(&Endpoint::DEFAULT));
    }

    #[test]
    fn test_candidates_are_shared() {
        let gateway = IoGateway::console();
        let handle = gateway.candidates();
        gateway.offer_candidates(vec!["?".into(), "@load".into()]);
        assert_eq!(handle.borrow().len(), 2);
    }
}
