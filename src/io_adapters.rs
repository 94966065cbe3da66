use crate::gateway::{InputFn, OutputFn};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{Error, ErrorKind, Result as IoResult};
use std::rc::Rc;

/// Memory-backed input endpoint.
///
/// Hands out queued lines one per request and reports end of input once the
/// queue is drained. Useful for tests and for hosts that feed the shell
/// programmatically.
pub struct ScriptedInput {
    lines: VecDeque<String>,
    prompts: Rc<RefCell<Vec<String>>>,
}

impl ScriptedInput {
    /// Create an input that will return `lines` in order.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            prompts: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Handle to every prompt this input has been asked with.
    pub fn prompts(&self) -> Rc<RefCell<Vec<String>>> {
        self.prompts.clone()
    }

    fn next_line(&mut self, prompt: &str) -> IoResult<String> {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.lines
            .pop_front()
            .ok_or_else(|| Error::new(ErrorKind::UnexpectedEof, "scripted input exhausted"))
    }

    /// Convert into a function suitable for [`crate::IoGateway::register_input`].
    pub fn into_endpoint(mut self) -> Box<InputFn> {
        Box::new(move |prompt| self.next_line(prompt))
    }
}

/// Memory-backed output endpoint capturing every emitted chunk.
pub struct CapturedOutput {
    buf: Rc<RefCell<Vec<String>>>,
}

impl CapturedOutput {
    pub fn new() -> Self {
        Self {
            buf: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Return inner Rc so caller can read collected output after the shell ran.
    pub fn into_inner(self) -> Rc<RefCell<Vec<String>>> {
        self.buf
    }

    /// Convenience: create the capture and return (capture, rc_handle).
    pub fn with_handle() -> (Self, Rc<RefCell<Vec<String>>>) {
        let capture = CapturedOutput::new();
        let rc = capture.buf.clone();
        (capture, rc)
    }

    /// Convert into a function suitable for [`crate::IoGateway::register_output`].
    pub fn into_endpoint(self) -> Box<OutputFn> {
        let buf = self.into_inner();
        Box::new(move |data| {
            buf.borrow_mut().push(data.to_string());
            Ok(())
        })
    }
}

impl Default for CapturedOutput {
    fn default() -> Self {
        Self::new()
    }
}
