//! Wire the hook commands into the assistant's settings file.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use crate::config::Config;
use crate::error::{Result, TraybridgeError};

/// Merge the hook configuration into `settings.json`. Hook events we own are
/// overwritten; every other setting in the file is preserved as-is.
pub async fn run_install_hooks(config: &Config, settings_flag: Option<&Path>) -> Result<()> {
    let settings_path = settings_flag
        .map(Path::to_path_buf)
        .unwrap_or_else(default_settings_path);
    let exe = std::env::current_exe()?;

    let mut settings = read_settings(&settings_path)?;
    merge_hooks(&mut settings, &hooks_config(&exe, config));

    if let Some(parent) = settings_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&settings_path, serde_json::to_string_pretty(&settings)?)?;

    eprintln!(
        "traybridge: hooks merged into {} (existing settings preserved)",
        settings_path.display()
    );
    Ok(())
}

fn default_settings_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".claude")
        .join("settings.json")
}

/// Existing settings, or an empty object when the file is missing. A file
/// that exists but cannot be parsed is an error: overwriting it would throw
/// away settings we cannot see.
fn read_settings(path: &Path) -> Result<Value> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            serde_json::from_str(&contents).map_err(|e| TraybridgeError::ConfigParse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(json!({})),
        Err(e) => Err(e.into()),
    }
}

fn merge_hooks(settings: &mut Value, hooks_config: &Value) {
    if !settings.is_object() {
        *settings = json!({});
    }
    if !settings["hooks"].is_object() {
        settings["hooks"] = json!({});
    }
    if let Some(table) = hooks_config.as_object() {
        for (event, entries) in table {
            settings["hooks"][event] = entries.clone();
        }
    }
}

/// The hook table: one entry per event this binary handles. The
/// PermissionRequest timeout exceeds the request timeout so the assistant
/// never kills the hook while it is still counting down.
fn hooks_config(exe: &Path, config: &Config) -> Value {
    let entry = |matcher: &str, subcommand: &str| {
        json!({
            "matcher": matcher,
            "hooks": [{
                "type": "command",
                "command": format!("{} hook {}", exe.display(), subcommand),
            }]
        })
    };
    let permission_timeout = config.request_timeout.as_secs() + 10;

    json!({
        "SessionStart": [entry("startup|resume", "session-start")],
        "SessionEnd": [entry("", "session-end")],
        "UserPromptSubmit": [entry("", "prompt")],
        "PreToolUse": [entry("AskUserQuestion", "elicitation")],
        "PostToolUse": [
            entry("AskUserQuestion", "elicitation-cleanup"),
            entry("", "activity"),
        ],
        "PermissionRequest": [{
            "matcher": "",
            "hooks": [{
                "type": "command",
                "command": format!("{} hook permission", exe.display()),
                "timeout": permission_timeout,
            }]
        }],
        "Notification": [entry("", "notification")],
        "Stop": [entry("", "stop")],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overwrites_owned_events_and_keeps_the_rest() {
        let mut settings = json!({
            "model": "opus",
            "hooks": {
                "Stop": [{"matcher": "", "hooks": [{"type": "command", "command": "old"}]}],
                "PreCompact": [{"matcher": "", "hooks": []}]
            }
        });
        let config = hooks_config(Path::new("/usr/bin/traybridge"), &Config::with_root("/tmp".into()));
        merge_hooks(&mut settings, &config);

        assert_eq!(settings["model"], "opus");
        // Foreign hook events survive; ours are replaced.
        assert!(settings["hooks"]["PreCompact"].is_array());
        let stop_cmd = settings["hooks"]["Stop"][0]["hooks"][0]["command"]
            .as_str()
            .unwrap();
        assert_eq!(stop_cmd, "/usr/bin/traybridge hook stop");
    }

    #[test]
    fn permission_hook_outlives_the_request_timeout() {
        let config = Config::with_root("/tmp".into());
        let table = hooks_config(Path::new("/usr/bin/traybridge"), &config);
        let timeout = table["PermissionRequest"][0]["hooks"][0]["timeout"]
            .as_u64()
            .unwrap();
        assert!(timeout > config.request_timeout.as_secs());
    }

    #[test]
    fn malformed_settings_refuse_to_merge() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        std::fs::write(&path, "{broken").unwrap();
        assert!(read_settings(&path).is_err());
    }

    #[test]
    fn missing_settings_start_empty() {
        let tmp = tempfile::TempDir::new().unwrap();
        let settings = read_settings(&tmp.path().join("settings.json")).unwrap();
        assert_eq!(settings, json!({}));
    }
}
