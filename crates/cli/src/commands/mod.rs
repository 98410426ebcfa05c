//! Command implementations.

pub mod admin;
pub mod shop;

use std::io::{self, BufRead, Write};

use aries_mall_admin::pages::Confirm;
use aries_mall_admin::{AdminError, MediaError};
use aries_mall_storefront::AppError;
use aries_mall_storefront::config::ConfigError;
use aries_mall_storefront::storage::StorageError;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    Storefront(#[from] AppError),

    #[error("{0}")]
    Admin(#[from] AdminError),

    #[error("{0}")]
    Media(#[from] MediaError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A command-line value was rejected.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The command needs a signed-in administrator.
    #[error("Not signed in as the administrator. Run `aries admin login` first.")]
    NotAdmin,

    /// Sign-in did not produce a session.
    #[error("Sign-in failed")]
    SignInFailed,
}

/// Asks on the terminal; anything but `y`/`yes` is a no.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        match ask(&format!("{prompt} [y/N] ")) {
            Ok(answer) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read confirmation");
                false
            }
        }
    }
}

/// Prints `prompt` to stderr and reads one line from stdin.
fn ask(prompt: &str) -> io::Result<String> {
    let mut stderr = io::stderr().lock();
    stderr.write_all(prompt.as_bytes())?;
    stderr.flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

/// The given password, or one read from stdin.
fn password_or_prompt(password: Option<String>) -> io::Result<String> {
    match password {
        Some(password) => Ok(password),
        None => ask("Password: "),
    }
}
