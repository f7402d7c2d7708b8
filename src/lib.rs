#[cfg(feature = "desktop")]
mod commands;
mod core;

pub use crate::core::config::{self as config, ServerConfiguration};
pub use crate::core::downloader::{DownloadOutcome, DownloadTask, ServerDownloader};
pub use crate::core::error::{ErrorCategory, PanelError, PanelResult};
pub use crate::core::events::{self as events, EventReceiver, EventSender, PanelEvent};
pub use crate::core::net::PublicAddressProbe;
pub use crate::core::process::{ProcessSupervisor, ServerStatus};
pub use crate::core::state::{AppState, PanelSettings};
pub use crate::core::version::{ServerVersion, VersionRegistry};

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the default
/// filter. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,bedrock_panel_lib=debug")),
        )
        .try_init();
}

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use std::sync::Arc;
    use tauri::{Emitter, Manager};
    use tokio::sync::Mutex;

    init_tracing();
    tracing::info!("BedrockPanel starting...");

    let result = tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let (tx, mut rx) = events::channel();
            let state = tauri::async_runtime::block_on(AppState::new(tx))?;
            app.manage(Arc::new(Mutex::new(state)));

            // Single listener: every panel event is forwarded to the webview.
            let handle = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                while let Some(event) = rx.recv().await {
                    if let Err(e) = handle.emit("panel-event", &event) {
                        tracing::warn!("Failed to forward panel event: {}", e);
                    }
                }
            });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::list_versions,
            commands::refresh_versions,
            commands::select_version,
            commands::get_config,
            commands::save_config,
            commands::start_server,
            commands::stop_server,
            commands::send_command,
            commands::get_server_status,
            commands::download_version,
            commands::get_public_address,
            commands::get_settings,
            commands::update_settings,
        ])
        .run(tauri::generate_context!());

    if let Err(e) = result {
        tracing::error!("Error while running tauri application: {}", e);
    }
}
