//! System prompt loading
//!
//! The prompt comes from an explicitly configured file, else from the agent
//! definition shipped next to the working directory, else a built-in default.

use std::path::Path;

/// Agent definition looked up relative to the working directory
const AGENT_PROMPT_FILE: &str = "agents/reachy/reachy.system.md";

/// Prompt used when no prompt file exists
pub const DEFAULT_PROMPT: &str = "You are a helpful assistant controlling a Reachy Mini robot.";

/// Load the system prompt.
///
/// A configured path that cannot be read is an error. The implicit agent
/// file is optional. Empty files fall back to the default.
pub fn load_system_prompt(
    configured: Option<&Path>,
    working_dir: &Path,
) -> std::io::Result<String> {
    let content = match configured {
        Some(path) => Some((path.to_path_buf(), std::fs::read_to_string(path)?)),
        None => {
            let path = working_dir.join(AGENT_PROMPT_FILE);
            read_optional(&path)?.map(|content| (path, content))
        }
    };

    match content {
        Some((path, content)) if !content.trim().is_empty() => {
            tracing::info!(path = %path.display(), bytes = content.len(), "Loaded system prompt");
            Ok(content)
        }
        Some((path, _)) => {
            tracing::warn!(path = %path.display(), "System prompt file is empty, using default");
            Ok(DEFAULT_PROMPT.to_string())
        }
        None => Ok(DEFAULT_PROMPT.to_string()),
    }
}

fn read_optional(path: &Path) -> std::io::Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
