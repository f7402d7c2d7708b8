use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info, warn};

use super::model::ServerConfiguration;
use crate::core::error::{PanelError, PanelResult};

/// Parse the flat `key=value` properties format.
///
/// Blank lines and lines starting with `#` are skipped, as are lines
/// without an `=`. The first `=` splits key from value; the value keeps
/// any further `=` characters. A repeated key keeps its last value.
pub fn parse_properties(text: &str) -> HashMap<String, String> {
    let mut properties = HashMap::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            debug!("Skipping malformed property line: {:?}", line);
            continue;
        };
        properties.insert(key.to_string(), value.to_string());
    }

    properties
}

/// Render the canonical field set, one `key=value` line per field.
pub fn render_properties(config: &ServerConfiguration) -> String {
    let mut out = String::new();
    for (key, value) in config.to_properties() {
        out.push_str(key);
        out.push('=');
        out.push_str(&value);
        out.push('\n');
    }
    out
}

/// Load the configuration at `path`. Never fails: a missing or unreadable
/// file yields the defaults.
pub async fn load(path: &Path) -> ServerConfiguration {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => ServerConfiguration::from_properties(&parse_properties(&text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No properties file at {:?}, using defaults", path);
            ServerConfiguration::default()
        }
        Err(e) => {
            warn!("Cannot read {:?}: {}; using defaults", path, e);
            ServerConfiguration::default()
        }
    }
}

/// Overwrite `path` with the canonical field set and return what was
/// written. Numbers are clamped into range; text containing a line break
/// is rejected before the file is touched. Anything else that was in the
/// file is discarded. The parent directory must already exist.
pub async fn save(path: &Path, config: &ServerConfiguration) -> PanelResult<ServerConfiguration> {
    config.validate()?;
    let config = config.clamped();

    tokio::fs::write(path, render_properties(&config))
        .await
        .map_err(|e| PanelError::io(path, e))?;

    info!("Saved server properties to {:?}", path);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::TempDir;
    use crate::core::config::model::{ChatRestriction, Difficulty, GameMode, PermissionLevel};

    #[test]
    fn parse_splits_on_first_equals_only() {
        let props = parse_properties("level-seed=a=b=c\n");
        assert_eq!(props.get("level-seed").map(String::as_str), Some("a=b=c"));
    }

    #[test]
    fn parse_skips_comments_blanks_and_malformed_lines() {
        let text = "# comment\n\n   \nmalformed_no_equals\nserver-name=My Server\n  max-players=20  \n";
        let props = parse_properties(text);

        assert_eq!(props.len(), 2);
        assert_eq!(props.get("server-name").map(String::as_str), Some("My Server"));
        assert_eq!(props.get("max-players").map(String::as_str), Some("20"));
    }

    #[test]
    fn parse_keeps_empty_values() {
        let props = parse_properties("level-seed=\n");
        assert_eq!(props.get("level-seed").map(String::as_str), Some(""));
    }

    #[test]
    fn render_emits_eighteen_lines() {
        let text = render_properties(&ServerConfiguration::default());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 18);
        assert_eq!(lines[0], "server-name=Dedicated Server");
        assert_eq!(lines[13], "level-seed=");
        assert!(text.ends_with('\n'));
    }

    #[tokio::test]
    async fn load_missing_file_returns_defaults() {
        let dir = TempDir::new("config");
        let config = load(&dir.join("server.properties")).await;
        assert_eq!(config, ServerConfiguration::default());
    }

    #[tokio::test]
    async fn save_then_load_round_trips_every_field() {
        let dir = TempDir::new("config");
        let path = dir.join("server.properties");
        let config = ServerConfiguration {
            server_name: "Friday Night Build".into(),
            gamemode: GameMode::Creative,
            force_gamemode: true,
            difficulty: Difficulty::Hard,
            allow_cheats: true,
            max_players: 100,
            online_mode: false,
            allow_list: true,
            server_port: 65535,
            view_distance: 64,
            tick_distance: 12,
            player_idle_timeout: 0,
            level_name: "World = One".into(),
            level_seed: "-12345".into(),
            default_player_permission_level: PermissionLevel::Operator,
            texturepack_required: true,
            max_threads: 32,
            chat_restriction: ChatRestriction::Disabled,
        };

        save(&path, &config).await.unwrap();
        assert_eq!(load(&path).await, config);
    }

    #[tokio::test]
    async fn missing_keys_and_malformed_lines_use_defaults() {
        let dir = TempDir::new("config");
        let path = dir.join("server.properties");
        std::fs::write(&path, "malformed_no_equals\ngamemode=adventure\ntick-distance=9\n").unwrap();

        let config = load(&path).await;
        let expected = ServerConfiguration {
            gamemode: GameMode::Adventure,
            tick_distance: 9,
            ..ServerConfiguration::default()
        };
        assert_eq!(config, expected);
    }

    #[tokio::test]
    async fn save_drops_out_of_schema_keys() {
        let dir = TempDir::new("config");
        let path = dir.join("server.properties");
        std::fs::write(&path, "# header\ncontent-log-file-enabled=true\nserver-name=Kept\n").unwrap();

        let config = load(&path).await;
        save(&path, &config).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(!written.contains("content-log-file-enabled"));
        assert!(!written.contains("# header"));
        assert!(written.contains("server-name=Kept\n"));
    }

    #[tokio::test]
    async fn save_clamps_out_of_range_numbers() {
        let dir = TempDir::new("config");
        let path = dir.join("server.properties");
        let config = ServerConfiguration {
            max_players: 500,
            server_port: 0,
            ..ServerConfiguration::default()
        };

        let written = save(&path, &config).await.unwrap();
        assert_eq!(written.max_players, 100);
        assert_eq!(written.server_port, 1);
        assert_eq!(load(&path).await, written);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("max-players=100\n"));
        assert!(text.contains("server-port=1\n"));
    }

    #[tokio::test]
    async fn save_rejects_multi_line_text_and_leaves_file_alone() {
        let dir = TempDir::new("config");
        let path = dir.join("server.properties");
        std::fs::write(&path, "server-name=Before\n").unwrap();
        let config = ServerConfiguration {
            server_name: "X\ngamemode=creative".into(),
            ..ServerConfiguration::default()
        };

        let err = save(&path, &config).await.unwrap_err();
        assert!(matches!(err, PanelError::InvalidProperty { key: "server-name", .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "server-name=Before\n");
    }

    #[tokio::test]
    async fn save_into_missing_directory_is_an_io_error() {
        let dir = TempDir::new("config");
        let path = dir.join("missing").join("server.properties");

        let err = save(&path, &ServerConfiguration::default()).await.unwrap_err();
        assert!(matches!(err, PanelError::Io { .. }));
    }
}
