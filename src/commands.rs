use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::core::config::ServerConfiguration;
use crate::core::error::PanelError;
use crate::core::process::ServerStatus;
use crate::core::state::{AppState, PanelSettings};
use crate::core::version::ServerVersion;

type PanelState<'a> = tauri::State<'a, Arc<Mutex<AppState>>>;

#[derive(Debug, Serialize)]
pub struct VersionList {
    pub versions: Vec<ServerVersion>,
    pub selected: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusInfo {
    pub status: ServerStatus,
    pub running_version: Option<String>,
    pub pid: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct DownloadStarted {
    pub task_id: String,
    pub version: String,
}

fn version_list(state: &AppState) -> VersionList {
    VersionList {
        versions: state.registry.versions().to_vec(),
        selected: state.selected_version().map(|v| v.id.clone()),
    }
}

#[tauri::command]
pub async fn list_versions(state: PanelState<'_>) -> Result<VersionList, PanelError> {
    let state = state.lock().await;
    Ok(version_list(&state))
}

#[tauri::command]
pub async fn refresh_versions(state: PanelState<'_>) -> Result<VersionList, PanelError> {
    let mut state = state.lock().await;
    state.refresh_versions().await?;
    Ok(version_list(&state))
}

#[tauri::command]
pub async fn select_version(
    state: PanelState<'_>,
    id: String,
) -> Result<ServerConfiguration, PanelError> {
    let mut state = state.lock().await;
    state.select_version(&id).await
}

#[tauri::command]
pub async fn get_config(state: PanelState<'_>) -> Result<ServerConfiguration, PanelError> {
    let state = state.lock().await;
    Ok(state.config().clone())
}

#[tauri::command]
pub async fn save_config(
    state: PanelState<'_>,
    config: ServerConfiguration,
) -> Result<ServerConfiguration, PanelError> {
    let mut state = state.lock().await;
    state.save_config(config).await
}

#[tauri::command]
pub async fn start_server(state: PanelState<'_>) -> Result<(), PanelError> {
    let state = state.lock().await;
    state.start_server().await
}

#[tauri::command]
pub async fn stop_server(state: PanelState<'_>) -> Result<(), PanelError> {
    // Stopping can take the whole grace period; don't hold the state lock.
    let supervisor = state.lock().await.supervisor.clone();
    supervisor.stop().await
}

#[tauri::command]
pub async fn send_command(state: PanelState<'_>, command: String) -> Result<(), PanelError> {
    let state = state.lock().await;
    state.send_command(&command).await
}

#[tauri::command]
pub async fn get_server_status(state: PanelState<'_>) -> Result<StatusInfo, PanelError> {
    let supervisor = state.lock().await.supervisor.clone();
    Ok(StatusInfo {
        status: supervisor.status().await,
        running_version: supervisor.running_version().await,
        pid: supervisor.pid().await,
    })
}

/// Progress and the final outcome arrive as `panel-event`s.
#[tauri::command]
pub async fn download_version(
    state: PanelState<'_>,
    version: String,
) -> Result<DownloadStarted, PanelError> {
    let state = state.lock().await;
    let task = state.download_version(version.trim())?;
    Ok(DownloadStarted {
        task_id: task.id.clone(),
        version: task.version.clone(),
    })
}

#[tauri::command]
pub async fn get_public_address(state: PanelState<'_>) -> Result<String, PanelError> {
    // The lookup may take seconds; probe with a copy outside the lock.
    let probe = state.lock().await.address_probe.clone();
    Ok(probe.probe().await)
}

#[tauri::command]
pub async fn get_settings(state: PanelState<'_>) -> Result<PanelSettings, PanelError> {
    let state = state.lock().await;
    Ok(state.settings.clone())
}

#[tauri::command]
pub async fn update_settings(
    state: PanelState<'_>,
    settings: PanelSettings,
) -> Result<PanelSettings, PanelError> {
    let mut state = state.lock().await;
    state.update_settings(settings).await?;
    Ok(state.settings.clone())
}
