use std::path::PathBuf;

use crate::editor::commands::DEFAULT_COMMAND_USER;

/// Runtime settings of the editor host (not the edited document).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorSettings {
    /// Directory holding durable editor state (snapshot, theme).
    pub state_dir: PathBuf,
    /// Where to fetch the example document from, if anywhere.
    pub example_url: Option<String>,
    /// Default username for generated commands.
    pub command_user: String,
    /// Default remote base path for generated commands; empty means
    /// `/Users/<user>/.openclaw/`.
    pub command_base_path: String,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            example_url: None,
            command_user: DEFAULT_COMMAND_USER.to_string(),
            command_base_path: String::new(),
        }
    }
}

impl EditorSettings {
    /// Defaults overlaid with `OPENCLAW_EDITOR_*` environment variables.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        settings.apply_overrides(|key| std::env::var(key).ok());
        settings
    }

    /// Apply overrides from a variable lookup. Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = var("OPENCLAW_EDITOR_STATE_DIR") {
            self.state_dir = PathBuf::from(dir);
        }

        if let Some(url) = var("OPENCLAW_EDITOR_EXAMPLE_URL") {
            self.example_url = Some(url);
        }

        if let Some(user) = var("OPENCLAW_EDITOR_USER") {
            self.command_user = user;
        }

        if let Some(path) = var("OPENCLAW_EDITOR_BASE_PATH") {
            self.command_base_path = path;
        }
    }
}

fn default_state_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".openclaw-editor"))
        .unwrap_or_else(|| PathBuf::from(".openclaw-editor"))
}
