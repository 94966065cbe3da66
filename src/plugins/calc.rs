use crate::command::{CommandResult, Handler};
use crate::plugin::{Export, Plugin};
use crate::shell::Shell;
use crate::state::ShellContext;
use anyhow::bail;
use std::cell::RefCell;
use std::rc::Rc;

const NAME: &str = "calc";

/// The `calc` bundle: an RPN calculator sub-shell plus two small demos.
///
/// The calculator is a nested shell with its own prompt that overrides the
/// default hook, so every line that isn't a command is read as RPN:
///
/// ```text
/// rpn> 1 1 2 3 5 8 + - * / =
/// 0: -0.05
/// ```
///
/// `x` clears the stack, `^` pops and returns the top, `$` shows the whole
/// stack, `=` shows the top, and `+ - * /` replace the top two elements
/// `a b` with `a op b`.
pub struct Calc;

impl Plugin for Calc {
    fn name(&self) -> &str {
        NAME
    }

    fn exports(&self) -> Option<Vec<Export>> {
        Some(vec![
            Export::new(NAME, "calc", Handler::with_shell(run_calculator)),
            Export::new(NAME, "ponies", Handler::new(|_| Ok(Some("OMG PONIES!".to_string())))),
            Export::new(NAME, "instancedemo", Handler::with_shell(describe)),
        ])
    }
}

/// Build a calculator shell sharing `parent`'s state and endpoints.
pub fn calculator(parent: &ShellContext) -> Shell {
    let mut calc = Shell::nested(parent);
    let stack = Rc::new(RefCell::new(Vec::new()));
    calc.set_prompt(Some("rpn> "));
    calc.set_default(Handler::with_shell(move |shell, line| {
        let mut stack = stack.borrow_mut();
        evaluate(shell, &mut stack, line.unwrap_or_default())
    }));
    calc
}

fn run_calculator(shell: &mut Shell, _tail: Option<&str>) -> CommandResult {
    let mut calc = calculator(shell.context());
    calc.start();
    Ok(None)
}

/// Describe the shell instance that invoked the command.
fn describe(shell: &mut Shell, _tail: Option<&str>) -> CommandResult {
    Ok(Some(format!(
        "prompt: {:?}\ncommands: {}\nshared: {}",
        shell.prompt(),
        shell.commands().keywords().join(", "),
        shell.shared().keys().join(", ")
    )))
}

/// Pretty-print the stack top first, with indexes.
fn dump(stack: &[f64], limit: Option<usize>) -> String {
    if stack.is_empty() {
        return "Empty stack".to_string();
    }
    stack
        .iter()
        .rev()
        .take(limit.unwrap_or(usize::MAX))
        .enumerate()
        .map(|(i, v)| format!("{i}: {v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn evaluate(shell: &mut Shell, stack: &mut Vec<f64>, line: &str) -> CommandResult {
    let mut buffer = Vec::new();

    for word in line.split(' ').filter(|w| !w.is_empty()) {
        match word {
            "x" => {
                stack.clear();
                buffer.push(dump(stack, None));
            }
            "^" => {
                return Ok(Some(match stack.pop() {
                    Some(top) => top.to_string(),
                    None => dump(stack, None),
                }));
            }
            "$" => buffer.push(dump(stack, None)),
            "=" => buffer.push(dump(stack, Some(1))),
            "+" | "-" | "*" | "/" if stack.len() >= 2 => {
                let (Some(b), Some(a)) = (stack.pop(), stack.pop()) else {
                    unreachable!("length checked above");
                };
                let result = match word {
                    "+" => a + b,
                    "-" => a - b,
                    "*" => a * b,
                    _ if b == 0.0 => {
                        stack.extend([a, b]);
                        bail!("Bad mojo: division by zero");
                    }
                    _ => a / b,
                };
                stack.push(result);
                shell.output(&format!("{} <-- top of stack", dump(stack, Some(1))), 1)?;
            }
            other => match other.parse::<f64>() {
                Ok(v) => stack.push(v),
                Err(_) => {
                    return Ok(Some(
                        "Input must be an operator or a parseable number".to_string(),
                    ));
                }
            },
        }
    }

    if buffer.is_empty() {
        Ok(None)
    } else {
        Ok(Some(buffer.join("\n\n")))
    }
}
