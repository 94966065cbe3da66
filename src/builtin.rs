//! Reserved commands every shell starts with.

use crate::command::{CommandResult, CommandTable, Handler};
use crate::error::{Failure, ShellError};
use crate::expr::{self, Program, Value};
use crate::plugin;
use crate::shell::Shell;
use log::debug;

type BuiltinFn = fn(&mut Shell, Option<&str>) -> CommandResult;

/// Keyword, help text and implementation of each reserved command.
const BUILTINS: &[(&str, &str, BuiltinFn)] = &[
    ("$!", "- Pops last exception off trace stack", pop_trace),
    ("$i", "- Pops last input off of input stack", pop_input),
    ("$o", "- Pops last object off of output stack", pop_output),
    ("@load", "<module> - Imports an extension", load),
    ("load", "<module> - Imports an extension", load),
    ("@>", "[string] - Sets interactive prompt to string, default if blank", set_prompt),
    ("?", "- Displays help message", help),
    ("@exec", "<statement> - Execute a statement against the shared state", exec),
    ("@bind", "<keyword> <body> - Bind <keyword> to a command or an expression over x", bind),
    ("@run", "<keyword> <line> - Call <keyword> with the result of <line>", run),
    ("@script", "<filename> - Executes <filename> in shell", script),
    ("`", "<string> - Returns <string> literal", literal),
];

/// Register the reserved commands in `table`.
pub(crate) fn install(table: &mut CommandTable) {
    for &(keyword, help, f) in BUILTINS {
        table.register(keyword, Handler::with_shell(f), Some(help));
    }
}

fn required<'a>(tail: Option<&'a str>, what: &str) -> anyhow::Result<&'a str> {
    tail.map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ShellError::BadArgument(format!("expected {what}")).into())
}

fn pop_trace(shell: &mut Shell, _tail: Option<&str>) -> CommandResult {
    Ok(Some(match shell.pop_trace() {
        Some(failure) => failure.to_string(),
        None => "No exceptions on trace stack".to_string(),
    }))
}

fn pop_input(shell: &mut Shell, _tail: Option<&str>) -> CommandResult {
    // The newest entry is this very `$i`.
    shell.pop_input();
    Ok(shell.pop_input())
}

fn pop_output(shell: &mut Shell, _tail: Option<&str>) -> CommandResult {
    Ok(shell.pop_output())
}

fn load(shell: &mut Shell, tail: Option<&str>) -> CommandResult {
    let name = required(tail, "a module name")?;
    Ok(Some(plugin::load(shell, name)))
}

fn set_prompt(shell: &mut Shell, tail: Option<&str>) -> CommandResult {
    shell.set_prompt(tail);
    Ok(None)
}

fn help(shell: &mut Shell, tail: Option<&str>) -> CommandResult {
    Ok(Some(shell.help(tail.map(str::trim))))
}

fn exec(shell: &mut Shell, tail: Option<&str>) -> CommandResult {
    let statement = tail.unwrap_or_default();
    let outcome = expr::compile(statement)
        .map_err(anyhow::Error::from)
        .and_then(|program| program.run(shell.shared(), None));

    match outcome {
        Ok(value) => Ok(value.map(|v| v.to_string())),
        Err(e) => {
            shell.record_failure(Failure::new("exec", tail, e));
            Ok(Some("Execution failed".to_string()))
        }
    }
}

/// A command evaluating `program` with its argument bound to `x`.
fn expression_command(program: Program) -> Handler {
    Handler::with_shell(move |shell, tail| {
        debug!("evaluating <<{}>> with x = {tail:?}", program.source());
        let result = program.run(shell.shared(), tail.map(Value::from_arg))?;
        Ok(result.map(|v| v.to_string()))
    })
}

fn bind(shell: &mut Shell, tail: Option<&str>) -> CommandResult {
    let (keyword, body) = tail
        .and_then(|t| t.split_once(char::is_whitespace))
        .map(|(k, b)| (k, b.trim()))
        .filter(|(_, b)| !b.is_empty())
        .ok_or_else(|| ShellError::BadArgument("expected <keyword> <body>".to_string()))?;

    let handler = match shell.commands().resolve(body) {
        Some(existing) => existing,
        None => match expr::compile(body) {
            Ok(program) => expression_command(program),
            Err(e) => {
                shell.record_failure(Failure::new("bindfn", tail, e.into()));
                return Ok(Some("Bind failed".to_string()));
            }
        },
    };

    let help = format!("(bound function <<{body}>>)");
    shell.commands_mut().register(keyword, handler, Some(&help));
    Ok(Some(format!("<<{body}>> bound to '{keyword}'")))
}

fn run(shell: &mut Shell, tail: Option<&str>) -> CommandResult {
    let (keyword, line) = required(tail, "<keyword> <line>")?
        .split_once(char::is_whitespace)
        .ok_or_else(|| ShellError::BadArgument("expected <keyword> <line>".to_string()))?;
    Ok(shell.call(keyword, line.trim_start()))
}

fn script(shell: &mut Shell, tail: Option<&str>) -> CommandResult {
    let path = required(tail, "a file name")?;
    Ok(shell.run_script(path)?)
}

fn literal(_shell: &mut Shell, tail: Option<&str>) -> CommandResult {
    Ok(tail.map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::io_adapters::CapturedOutput;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn shell() -> (Shell, Rc<RefCell<Vec<String>>>) {
        let shell = Shell::new();
        let (out, lines) = CapturedOutput::with_handle();
        shell.io().register_output(0, Some(out.into_endpoint()));
        (shell, lines)
    }

    fn text(shell: &mut Shell, line: &str) -> String {
        shell.handle(line).unwrap_or_default()
    }

    #[test]
    fn test_all_reserved_commands_have_help() {
        let shell = Shell::new();
        for (keyword, _, _) in BUILTINS {
            assert!(shell.commands().contains(keyword));
            assert!(!shell.help(Some(*keyword)).starts_with("No help"));
        }
        assert_eq!(shell.help(Some("`")), "` <string> - Returns <string> literal");
    }

    #[test]
    fn test_literal() {
        let (mut shell, _) = shell();
        assert_eq!(text(&mut shell, "`   spaced  words"), "spaced  words");
        assert_eq!(shell.handle("`"), None);
    }

    #[test]
    fn test_prompt_command() {
        let (mut shell, _) = shell();
        shell.handle("@> >>> ");
        assert_eq!(shell.prompt(), ">>> ");
        shell.handle("@>");
        assert_eq!(shell.prompt(), "spys> ");
    }

    #[test]
    fn test_trace_pop() {
        let (mut shell, _) = shell();
        assert_eq!(text(&mut shell, "$!"), "No exceptions on trace stack");

        shell.handle("@load");
        assert_eq!(text(&mut shell, "$!"), "(@load, None, bad argument: expected a module name)");
        assert_eq!(text(&mut shell, "$!"), "No exceptions on trace stack");
    }

    #[test]
    fn test_load_reports_result() {
        let (mut shell, _) = shell();
        assert_eq!(
            text(&mut shell, "@load numbers"),
            "3 new commands imported from numbers (double, square, hex)"
        );
        assert_eq!(text(&mut shell, "square 9"), "81");
        assert_eq!(text(&mut shell, "load no.such.mod"), "Load failed, couldn't import no.such.mod");
    }

    #[test]
    fn test_exec_statements() {
        let (mut shell, _) = shell();
        assert_eq!(shell.handle("@exec total = 6 * 7"), None);
        assert_eq!(shell.shared().get::<Value>("total"), Some(Value::Int(42)));
        assert_eq!(text(&mut shell, "@exec total + 1"), "43");

        assert_eq!(text(&mut shell, "@exec 1 +"), "Execution failed");
        assert_eq!(text(&mut shell, "@exec missing * 2"), "Execution failed");
        let failure = shell.pop_trace().unwrap();
        assert_eq!(failure.command, "exec");
        assert_eq!(failure.tail.as_deref(), Some("missing * 2"));
        assert_eq!(failure.kind, FailureKind::UnboundReference);
    }

    #[test]
    fn test_exec_rejects_oversized_strings() {
        let (mut shell, _) = shell();
        assert_eq!(text(&mut shell, "@exec 'ab' * 1000000000000"), "Execution failed");
        assert_eq!(shell.pop_trace().unwrap().kind, FailureKind::BadArgument);
        assert_eq!(text(&mut shell, "` alive"), "alive");

        text(&mut shell, "@bind flood x * 1000000000000");
        assert_eq!(text(&mut shell, "flood ab"), "Bad argument 'ab' for 'flood'");
        assert_eq!(text(&mut shell, "flood 2"), "2000000000000");
    }

    #[test]
    fn test_exec_rejects_deep_nesting() {
        let (mut shell, _) = shell();
        let negations = format!("@exec {}1", "-".repeat(200_000));
        assert_eq!(text(&mut shell, &negations), "Execution failed");
        assert!(shell.pop_trace().unwrap().to_string().contains("nested too deeply"));

        let parens = format!("@exec {}", "(".repeat(200_000));
        assert_eq!(text(&mut shell, &parens), "Execution failed");

        let nested = format!("@bind deep {}x", "-".repeat(200_000));
        assert_eq!(text(&mut shell, &nested), "Bind failed");
        assert!(!shell.commands().contains("deep"));
        assert_eq!(text(&mut shell, "` alive"), "alive");
    }

    #[test]
    fn test_bind_expression() {
        let (mut shell, _) = shell();
        assert_eq!(text(&mut shell, "@bind hex hex(x)"), "<<hex(x)>> bound to 'hex'");
        assert_eq!(text(&mut shell, "hex 255"), "ff");
        assert_eq!(text(&mut shell, "? hex"), "hex (bound function <<hex(x)>>)");

        text(&mut shell, "@bind twice x * 2");
        assert_eq!(text(&mut shell, "twice 21"), "42");
        assert_eq!(text(&mut shell, "twice ab"), "abab");
    }

    #[test]
    fn test_bind_reads_shared_state() {
        let (mut shell, _) = shell();
        shell.handle("@exec rate = 3");
        shell.handle("@bind scale x * rate");
        assert_eq!(text(&mut shell, "scale 5"), "15");
    }

    #[test]
    fn test_bind_alias() {
        let (mut shell, _) = shell();
        assert_eq!(text(&mut shell, "@bind say `"), "<<`>> bound to 'say'");
        assert_eq!(text(&mut shell, "say hi there"), "hi there");
    }

    #[test]
    fn test_bind_failures() {
        let (mut shell, _) = shell();
        assert_eq!(text(&mut shell, "@bind broken (x"), "Bind failed");
        assert_eq!(shell.pop_trace().unwrap().command, "bindfn");
        assert!(!shell.commands().contains("broken"));

        assert_eq!(text(&mut shell, "@bind lonely"), "Bad argument 'lonely' for '@bind'");
    }

    #[test]
    fn test_run_chains() {
        let (mut shell, lines) = shell();
        shell.handle("@bind inc x + 1");
        assert_eq!(text(&mut shell, "@run inc inc 1"), "3");
        assert_eq!(*lines.borrow(), vec!["inc 2"]);
    }

    #[test]
    fn test_pop_output_and_input_are_empty_outside_loop() {
        let (mut shell, _) = shell();
        assert_eq!(shell.handle("$o"), None);
        assert_eq!(shell.handle("$i"), None);
    }
}
