//! Interactive prompt provider.
//!
//! Resolvers never talk to the terminal directly; they go through the
//! [`Prompter`] trait so the whole pipeline can run against a scripted fake
//! in tests. The production implementation wraps dialoguer. Escaping out of
//! a selection or confirmation maps to [`ResolveError::Cancelled`], which the
//! caller treats as a graceful exit.

use std::io::ErrorKind;

use anyhow::Result;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};

use crate::errors::ResolveError;

/// Ctrl-C inside a dialoguer prompt surfaces as an interrupted I/O error
/// because the terminal is in raw mode; that is a user cancellation, not a
/// fault.
fn map_prompt_err(err: dialoguer::Error) -> anyhow::Error {
    match err {
        dialoguer::Error::IO(io) if io.kind() == ErrorKind::Interrupted => {
            ResolveError::Cancelled.into()
        }
        dialoguer::Error::IO(io) => io.into(),
    }
}

/// Terminal interaction needed by the resolvers.
pub trait Prompter {
    /// Single choice from a labeled list; returns the selected index.
    fn select(&self, prompt: &str, items: &[String]) -> Result<usize>;

    /// Yes/no confirmation.
    fn confirm(&self, prompt: &str) -> Result<bool>;

    /// Required free-text input.
    fn input(&self, prompt: &str) -> Result<String>;

    /// Numeric port input.
    fn port(&self, prompt: &str) -> Result<u16>;
}

/// Prompter backed by dialoguer, used in the real CLI.
#[derive(Default)]
pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl Prompter for TerminalPrompter {
    fn select(&self, prompt: &str, items: &[String]) -> Result<usize> {
        let choice = Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .default(0)
            .interact_opt()
            .map_err(map_prompt_err)?;
        choice.ok_or_else(|| ResolveError::Cancelled.into())
    }

    fn confirm(&self, prompt: &str) -> Result<bool> {
        let answer = Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .interact_opt()
            .map_err(map_prompt_err)?;
        answer.ok_or_else(|| ResolveError::Cancelled.into())
    }

    fn input(&self, prompt: &str) -> Result<String> {
        let value: String = Input::with_theme(&self.theme)
            .with_prompt(prompt)
            .interact_text()
            .map_err(map_prompt_err)?;
        Ok(value)
    }

    fn port(&self, prompt: &str) -> Result<u16> {
        let value: u16 = Input::with_theme(&self.theme)
            .with_prompt(prompt)
            .interact_text()
            .map_err(map_prompt_err)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn test_interrupted_io_maps_to_cancelled() {
        let err = map_prompt_err(dialoguer::Error::IO(io::Error::new(
            io::ErrorKind::Interrupted,
            "read interrupted",
        )));
        assert_eq!(
            *err.downcast_ref::<ResolveError>().unwrap(),
            ResolveError::Cancelled
        );
    }

    #[test]
    fn test_other_io_errors_stay_errors() {
        let err = map_prompt_err(dialoguer::Error::IO(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "broken pipe",
        )));
        assert!(err.downcast_ref::<ResolveError>().is_none());
        assert!(err.downcast_ref::<io::Error>().is_some());
    }
}
