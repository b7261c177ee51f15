//! Immutable configuration handed to the application context at startup.
//!
//! The file lives at the platform config directory (`config.toml`) unless a
//! path is given on the command line. It is read once before the dispatch
//! loop starts and never re-read afterward.

pub mod data;
pub mod io;


pub use data::{path_display, Config, WorkspaceConfig};
pub use io::ConfigError;

/// A workspace chosen for this session, validated and ready to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedWorkspace {
    pub name: String,
    pub settings: WorkspaceConfig,
}

impl Config {
    /// Picks the workspace named on the command line, or the configured default.
    ///
    /// A sole configured workspace is used when neither is given.
    pub fn resolve_workspace(
        &self,
        requested: Option<&str>,
    ) -> Result<ResolvedWorkspace, ConfigError> {
        let name = match requested.filter(|name| !name.trim().is_empty()) {
            Some(name) => name.trim().to_string(),
            None => match &self.default_workspace {
                Some(name) => name.clone(),
                None if self.workspaces.len() == 1 => self
                    .workspaces
                    .keys()
                    .next()
                    .cloned()
                    .ok_or(ConfigError::NoWorkspace)?,
                None => return Err(ConfigError::NoWorkspace),
            },
        };

        let settings = self
            .workspaces
            .get(&name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownWorkspace {
                name: name.clone(),
                available: self.workspaces.keys().cloned().collect(),
            })?;

        if settings.token.trim().is_empty() && settings.replay.is_none() {
            return Err(ConfigError::MissingToken { workspace: name });
        }

        Ok(ResolvedWorkspace { name, settings })
    }
}
