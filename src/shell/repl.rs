use super::{ReplState, Shell};
use crate::error::{Result, ShellError};
use crate::gateway::Endpoint;
use log::{info, warn};
use std::io::ErrorKind;

impl Shell {
    /// Run the read-eval-print loop until it is stopped.
    ///
    /// The loop ends on an exit keyword, on [`Shell::stop`], at end of input
    /// or on an interrupt. Other I/O failures are reported and retried until
    /// `max_io_failures` of them happen in a row.
    pub fn start(&mut self) {
        self.state = ReplState::Running;
        info!("shell loop started");

        let mut failures = 0;
        while self.is_running() {
            match self.step() {
                Ok(()) => failures = 0,
                Err(ShellError::Io(e))
                    if matches!(e.kind(), ErrorKind::UnexpectedEof | ErrorKind::Interrupted) =>
                {
                    info!("input closed: {e}");
                    self.stop();
                }
                Err(e) => {
                    failures += 1;
                    warn!("I/O failure {failures}/{}: {e}", self.config.max_io_failures);
                    if failures >= self.config.max_io_failures {
                        self.stop();
                    } else if let Err(e) = self.output(&e.to_string(), Endpoint::DEFAULT) {
                        warn!("could not report I/O failure: {e}");
                    }
                }
            }
        }
        info!("shell loop stopped");
    }

    /// Read, dispatch and print a single line.
    pub fn step(&mut self) -> Result<()> {
        self.io().offer_candidates(self.commands.keywords());
        let line = self.input(&self.prompt, Endpoint::DEFAULT)?;

        if let Some(hook) = self.on_input.as_mut() {
            hook(&line);
        }
        self.last_input.append(line.clone());

        if self.config.is_exit_keyword(&line) {
            self.stop();
            return Ok(());
        }

        let result = self.handle(line.as_str());
        self.last_output.append(result.clone());
        match result {
            Some(text) if !text.is_empty() => Ok(self.output(&text, Endpoint::DEFAULT)?),
            _ => Ok(()),
        }
    }
}
