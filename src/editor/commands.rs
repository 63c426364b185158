//! Shell command snippets for managing a remote gateway host.
//!
//! The commands are text only. They are rebuilt from the live document on
//! every call and never executed here.

use crate::codec;
use crate::config::{ConfigDocument, CONFIG_FILE_NAME};
use crate::error::Result;
use serde::Serialize;

/// User assumed when the host leaves the username empty.
pub const DEFAULT_COMMAND_USER: &str = "root";

/// Heredoc terminator used by the write command.
pub const HEREDOC_MARKER: &str = "EOFCONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShellCommand {
    pub id: &'static str,
    pub title: &'static str,
    pub command: String,
    pub description: &'static str,
}

/// `/Users/<username>/.openclaw/`
pub fn default_base_path(username: &str) -> String {
    format!("/Users/{username}/.openclaw/")
}

/// Replace every `'` with `'\''` so text can sit inside single quotes.
pub fn escape_single_quotes(text: &str) -> String {
    text.replace('\'', r"'\''")
}

/// Build the fixed command catalogue for `doc`.
///
/// `base_path` is used as a plain prefix and is expected to end with a
/// separator. Empty arguments fall back to `root` and
/// [`default_base_path`].
pub fn generate_commands(
    doc: &ConfigDocument,
    username: &str,
    base_path: &str,
) -> Result<Vec<ShellCommand>> {
    let username = match username.trim() {
        "" => DEFAULT_COMMAND_USER,
        name => name,
    };
    let base_path = match base_path.trim() {
        "" => default_base_path(username),
        path => path.to_string(),
    };
    let config_path = format!("{base_path}{CONFIG_FILE_NAME}");
    let body = escape_single_quotes(&codec::serialize(doc)?);

    Ok(vec![
        ShellCommand {
            id: "stop-gateway",
            title: "Stop gateway",
            command: "openclaw gateway stop".to_string(),
            description: "Stop the OpenClaw gateway service",
        },
        ShellCommand {
            id: "start-gateway",
            title: "Start gateway",
            command: "openclaw gateway start".to_string(),
            description: "Start the OpenClaw gateway service",
        },
        ShellCommand {
            id: "restart-gateway",
            title: "Restart gateway",
            command: "openclaw gateway restart".to_string(),
            description: "Restart the OpenClaw gateway service",
        },
        ShellCommand {
            id: "delete-config",
            title: "Delete config file",
            command: format!("rm -f {config_path} && rm -f {base_path}.{CONFIG_FILE_NAME}.swp"),
            description: "Delete the config file and its vim swap file",
        },
        ShellCommand {
            id: "view-config",
            title: "View config file",
            command: format!("cat {config_path}"),
            description: "Print the current config file",
        },
        ShellCommand {
            id: "backup-config",
            title: "Back up config file",
            command: format!("cp {config_path} {config_path}.backup.$(date +%Y%m%d_%H%M%S)"),
            description: "Copy the config file to a timestamped backup",
        },
        ShellCommand {
            id: "write-config",
            title: "Write config file",
            command: format!(
                "cat > {config_path} << '{HEREDOC_MARKER}'\n{body}\n{HEREDOC_MARKER}"
            ),
            description: "Write the current configuration to the server with a heredoc",
        },
    ])
}
