use std::collections::HashMap;
use std::num::IntErrorKind;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::{PanelError, PanelResult};

/// Declares a protocol enum whose variants serialize to the exact strings
/// the server executable reads from `server.properties`.
macro_rules! protocol_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $value)] $variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok($name::$variant),)+
                    _ => Err(format!("Unknown {}: {}", stringify!($name), s)),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

protocol_enum!(GameMode {
    Survival => "survival",
    Creative => "creative",
    Adventure => "adventure",
});

protocol_enum!(Difficulty {
    Peaceful => "peaceful",
    Easy => "easy",
    Normal => "normal",
    Hard => "hard",
});

protocol_enum!(
    /// Permission level granted to players joining for the first time.
    PermissionLevel {
        Visitor => "visitor",
        Member => "member",
        Operator => "operator",
    }
);

protocol_enum!(ChatRestriction {
    None => "None",
    Dropped => "Dropped",
    Disabled => "Disabled",
});

pub const MAX_PLAYERS_RANGE: RangeInclusive<u32> = 1..=100;
pub const SERVER_PORT_RANGE: RangeInclusive<u32> = 1..=65535;
pub const VIEW_DISTANCE_RANGE: RangeInclusive<u32> = 5..=64;
pub const TICK_DISTANCE_RANGE: RangeInclusive<u32> = 4..=12;
pub const PLAYER_IDLE_TIMEOUT_RANGE: RangeInclusive<u32> = 0..=120;
pub const MAX_THREADS_RANGE: RangeInclusive<u32> = 1..=32;

/// Keys written by `save`, in the order they are written.
pub const PROPERTY_KEYS: [&str; 18] = [
    "server-name",
    "gamemode",
    "force-gamemode",
    "difficulty",
    "allow-cheats",
    "max-players",
    "online-mode",
    "allow-list",
    "server-port",
    "view-distance",
    "tick-distance",
    "player-idle-timeout",
    "level-name",
    "level-seed",
    "default-player-permission-level",
    "texturepack-required",
    "max-threads",
    "chat-restriction",
];

/// The editable subset of `server.properties` for one installed version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfiguration {
    pub server_name: String,
    pub gamemode: GameMode,
    pub force_gamemode: bool,
    pub difficulty: Difficulty,
    pub allow_cheats: bool,
    pub max_players: u32,
    pub online_mode: bool,
    pub allow_list: bool,
    pub server_port: u32,
    pub view_distance: u32,
    pub tick_distance: u32,
    pub player_idle_timeout: u32,
    pub level_name: String,
    pub level_seed: String,
    pub default_player_permission_level: PermissionLevel,
    pub texturepack_required: bool,
    pub max_threads: u32,
    pub chat_restriction: ChatRestriction,
}

impl Default for ServerConfiguration {
    fn default() -> Self {
        Self {
            server_name: "Dedicated Server".into(),
            gamemode: GameMode::Survival,
            force_gamemode: false,
            difficulty: Difficulty::Easy,
            allow_cheats: false,
            max_players: 10,
            online_mode: true,
            allow_list: false,
            server_port: 19132,
            view_distance: 32,
            tick_distance: 4,
            player_idle_timeout: 30,
            level_name: "Bedrock level".into(),
            level_seed: String::new(),
            default_player_permission_level: PermissionLevel::Member,
            texturepack_required: false,
            max_threads: 8,
            chat_restriction: ChatRestriction::None,
        }
    }
}

impl ServerConfiguration {
    /// Build a configuration from raw properties. Every key that is missing
    /// or does not parse keeps its default; unknown keys are ignored.
    pub fn from_properties(props: &HashMap<String, String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str, default: String| props.get(key).cloned().unwrap_or(default);
        let flag = |key: &str, default: bool| match props.get(key).map(String::as_str) {
            Some("true") => true,
            Some("false") => false,
            _ => default,
        };
        let number = |key: &str, default: u32, range: RangeInclusive<u32>| {
            props
                .get(key)
                .and_then(|raw| parse_saturating(raw.trim()))
                .map(|value| clamp_to(value, &range))
                .unwrap_or(default)
        };
        fn choice<T: FromStr>(props: &HashMap<String, String>, key: &str, default: T) -> T {
            props
                .get(key)
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(default)
        }

        Self {
            server_name: text("server-name", defaults.server_name),
            gamemode: choice(props, "gamemode", defaults.gamemode),
            force_gamemode: flag("force-gamemode", defaults.force_gamemode),
            difficulty: choice(props, "difficulty", defaults.difficulty),
            allow_cheats: flag("allow-cheats", defaults.allow_cheats),
            max_players: number("max-players", defaults.max_players, MAX_PLAYERS_RANGE),
            online_mode: flag("online-mode", defaults.online_mode),
            allow_list: flag("allow-list", defaults.allow_list),
            server_port: number("server-port", defaults.server_port, SERVER_PORT_RANGE),
            view_distance: number("view-distance", defaults.view_distance, VIEW_DISTANCE_RANGE),
            tick_distance: number("tick-distance", defaults.tick_distance, TICK_DISTANCE_RANGE),
            player_idle_timeout: number(
                "player-idle-timeout",
                defaults.player_idle_timeout,
                PLAYER_IDLE_TIMEOUT_RANGE,
            ),
            level_name: text("level-name", defaults.level_name),
            level_seed: text("level-seed", defaults.level_seed),
            default_player_permission_level: choice(
                props,
                "default-player-permission-level",
                defaults.default_player_permission_level,
            ),
            texturepack_required: flag("texturepack-required", defaults.texturepack_required),
            max_threads: number("max-threads", defaults.max_threads, MAX_THREADS_RANGE),
            chat_restriction: choice(props, "chat-restriction", defaults.chat_restriction),
        }
    }

    /// Copy with every numeric field pulled into its allowed range.
    pub fn clamped(&self) -> Self {
        let clamp = |value: u32, range: RangeInclusive<u32>| clamp_to(i64::from(value), &range);
        Self {
            max_players: clamp(self.max_players, MAX_PLAYERS_RANGE),
            server_port: clamp(self.server_port, SERVER_PORT_RANGE),
            view_distance: clamp(self.view_distance, VIEW_DISTANCE_RANGE),
            tick_distance: clamp(self.tick_distance, TICK_DISTANCE_RANGE),
            player_idle_timeout: clamp(self.player_idle_timeout, PLAYER_IDLE_TIMEOUT_RANGE),
            max_threads: clamp(self.max_threads, MAX_THREADS_RANGE),
            ..self.clone()
        }
    }

    /// Text fields must fit on one properties line.
    pub fn validate(&self) -> PanelResult<()> {
        let texts = [
            ("server-name", &self.server_name),
            ("level-name", &self.level_name),
            ("level-seed", &self.level_seed),
        ];
        for (key, value) in texts {
            if value.contains(['\r', '\n']) {
                return Err(PanelError::InvalidProperty {
                    key,
                    reason: "line breaks are not allowed".into(),
                });
            }
        }
        Ok(())
    }

    /// The canonical `(key, value)` pairs, in `PROPERTY_KEYS` order.
    pub fn to_properties(&self) -> Vec<(&'static str, String)> {
        let values = [
            self.server_name.clone(),
            self.gamemode.to_string(),
            self.force_gamemode.to_string(),
            self.difficulty.to_string(),
            self.allow_cheats.to_string(),
            self.max_players.to_string(),
            self.online_mode.to_string(),
            self.allow_list.to_string(),
            self.server_port.to_string(),
            self.view_distance.to_string(),
            self.tick_distance.to_string(),
            self.player_idle_timeout.to_string(),
            self.level_name.clone(),
            self.level_seed.clone(),
            self.default_player_permission_level.to_string(),
            self.texturepack_required.to_string(),
            self.max_threads.to_string(),
            self.chat_restriction.to_string(),
        ];

        PROPERTY_KEYS.into_iter().zip(values).collect()
    }
}

fn clamp_to(value: i64, range: &RangeInclusive<u32>) -> u32 {
    value.clamp(i64::from(*range.start()), i64::from(*range.end())) as u32
}

/// Integer parse where overflow saturates instead of failing, so huge
/// values still clamp to the range maximum.
fn parse_saturating(raw: &str) -> Option<i64> {
    match raw.parse::<i64>() {
        Ok(value) => Some(value),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Some(i64::MAX),
            IntErrorKind::NegOverflow => Some(i64::MIN),
            _ => None,
        },
    }
}
