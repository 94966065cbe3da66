//! Line-editor input endpoint backed by `rustyline`.

use crate::gateway::InputFn;
use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use std::cell::RefCell;
use std::io;
use std::rc::Rc;

/// Completes the first word of a line against the keywords the shell offered.
pub struct KeywordHelper {
    candidates: Rc<RefCell<Vec<String>>>,
}

impl KeywordHelper {
    pub fn new(candidates: Rc<RefCell<Vec<String>>>) -> Self {
        Self { candidates }
    }
}

/// Start offset and matches for completing `line` at `pos`.
///
/// Only the keyword is completed: once the cursor is past the first
/// whitespace there is nothing to offer.
fn complete_keyword(candidates: &[String], line: &str, pos: usize) -> (usize, Vec<String>) {
    let word = &line[..pos];
    if word.contains(char::is_whitespace) {
        return (pos, Vec::new());
    }
    let matches = candidates
        .iter()
        .filter(|c| c.starts_with(word))
        .cloned()
        .collect();
    (0, matches)
}

impl Completer for KeywordHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        Ok(complete_keyword(&self.candidates.borrow(), line, pos))
    }
}

impl Hinter for KeywordHelper {
    type Hint = String;
}

impl Highlighter for KeywordHelper {}

impl Validator for KeywordHelper {}

impl Helper for KeywordHelper {}

fn read_line(editor: &mut Editor<KeywordHelper, DefaultHistory>, prompt: &str) -> io::Result<String> {
    match editor.readline(prompt) {
        Ok(line) => {
            if !line.trim().is_empty() {
                editor.add_history_entry(line.as_str()).map_err(io::Error::other)?;
            }
            Ok(line)
        }
        Err(ReadlineError::Eof) => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "end of input")),
        Err(ReadlineError::Interrupted) => Err(io::Error::new(io::ErrorKind::Interrupted, "interrupted")),
        Err(ReadlineError::Io(e)) => Err(e),
        Err(e) => Err(io::Error::other(e)),
    }
}

/// Build an input endpoint reading from the terminal with line editing,
/// history and keyword completion fed from `candidates`.
pub fn endpoint(candidates: Rc<RefCell<Vec<String>>>) -> rustyline::Result<Box<InputFn>> {
    let mut editor = Editor::<KeywordHelper, DefaultHistory>::new()?;
    editor.set_helper(Some(KeywordHelper::new(candidates)));
    Ok(Box::new(move |prompt: &str| read_line(&mut editor, prompt)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords() -> Vec<String> {
        ["$!", "?", "@bind", "@exec", "@load", "double"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_completes_first_word() {
        let (start, matches) = complete_keyword(&keywords(), "@", 1);
        assert_eq!(start, 0);
        assert_eq!(matches, vec!["@bind", "@exec", "@load"]);

        let (_, matches) = complete_keyword(&keywords(), "dou", 3);
        assert_eq!(matches, vec!["double"]);
    }

    #[test]
    fn test_empty_prefix_offers_everything() {
        let (_, matches) = complete_keyword(&keywords(), "", 0);
        assert_eq!(matches.len(), 6);
    }

    #[test]
    fn test_arguments_are_not_completed() {
        let (start, matches) = complete_keyword(&keywords(), "@load d", 7);
        assert_eq!(start, 7);
        assert!(matches.is_empty());
    }

    #[test]
    fn test_cursor_inside_keyword() {
        let (_, matches) = complete_keyword(&keywords(), "@ex 1 + 2", 2);
        assert_eq!(matches, vec!["@exec"]);
    }
}
