//! Demo command bundles shipped with the shell.
//!
//! Neither is part of the engine; they load through `@load` exactly like a
//! host-provided plugin would.

mod calc;
mod numbers;

pub use calc::{Calc, calculator};
pub use numbers::Numbers;

use crate::plugin::Plugin;
use std::rc::Rc;

/// Every bundled plugin, ready to be registered.
pub(crate) fn bundled() -> Vec<Rc<dyn Plugin>> {
    vec![Rc::new(Calc), Rc::new(Numbers)]
}
