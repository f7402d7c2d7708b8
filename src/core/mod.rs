// ─── BedrockPanel Core ───
// Backend for a Bedrock dedicated server control panel.
//
// Architecture:
//   core/
//     config/     — server.properties model + load/save
//     version/    — Installed server versions + selection
//     downloader/ — Archive download, retry, verify + extract
//     process/    — Server process lifecycle + console relay
//     net.rs      — Public address lookup
//     events.rs   — Events delivered to the UI
//     state/      — Global application state + panel settings

pub mod config;
pub mod downloader;
pub mod error;
pub mod events;
pub mod http;
pub mod net;
pub mod process;
pub mod state;
pub mod version;

#[cfg(test)]
mod test_support;
