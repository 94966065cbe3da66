use crate::command::{CommandResult, Handler};
use crate::error::ShellError;
use crate::plugin::{Export, Plugin};
use anyhow::anyhow;

const NAME: &str = "numbers";

/// Integer helpers: `double`, `square` and a decimal to hex converter.
pub struct Numbers;

impl Plugin for Numbers {
    fn name(&self) -> &str {
        NAME
    }

    fn exports(&self) -> Option<Vec<Export>> {
        Some(vec![
            Export::new(NAME, "double", Handler::new(double)),
            Export::new(NAME, "square", Handler::new(square)),
            Export::new(NAME, "hex", Handler::new(hex)),
        ])
    }
}

fn integer(tail: Option<&str>) -> anyhow::Result<i64> {
    let arg = tail.ok_or_else(|| ShellError::BadArgument("expected an integer".to_string()))?;
    Ok(arg.trim().parse()?)
}

fn double(tail: Option<&str>) -> CommandResult {
    let n = integer(tail)?;
    let doubled = n.checked_mul(2).ok_or_else(|| anyhow!("{n} * 2 overflows"))?;
    Ok(Some(doubled.to_string()))
}

fn square(tail: Option<&str>) -> CommandResult {
    let n = integer(tail)?;
    let squared = n.checked_mul(n).ok_or_else(|| anyhow!("{n}^2 overflows"))?;
    Ok(Some(squared.to_string()))
}

fn hex(tail: Option<&str>) -> CommandResult {
    Ok(Some(format!("{:x}", integer(tail)?)))
}
