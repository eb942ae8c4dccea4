//! Config file inspection.

use std::io::Write;
use std::path::PathBuf;

use kubewatch_config::Config;

use crate::cli::ConfigCommands;
use crate::error::Result;

/// Config command executor.
#[derive(Debug, Clone)]
pub struct ConfigCommand {
    path: Option<PathBuf>,
}

impl ConfigCommand {
    /// Creates a command for `path`, or the default location if `None`.
    #[must_use]
    pub const fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// Returns the config file location.
    ///
    /// # Errors
    ///
    /// Returns an error if no path was given and the home directory is
    /// unknown.
    pub fn path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => Ok(Config::default_path()?),
        }
    }

    /// Executes the config command.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or output fails.
    pub fn execute<W: Write>(&self, writer: &mut W, command: ConfigCommands) -> Result<()> {
        let path = self.path()?;
        match command {
            ConfigCommands::Path => writeln!(writer, "{}", path.display())?,
            ConfigCommands::View => {
                let config = Config::load_from(&path)?;
                write!(writer, "{}", config.to_yaml()?)?;
            }
        }
        Ok(())
    }
}
