use std::path::PathBuf;

use reqwest::Client;
use tracing::info;

use super::settings::{default_data_dir, PanelSettings};
use crate::core::config::{self, ServerConfiguration};
use crate::core::downloader::{DownloadTask, ServerDownloader};
use crate::core::error::{PanelError, PanelResult};
use crate::core::events::{self, EventSender, PanelEvent};
use crate::core::http::build_http_client;
use crate::core::net::PublicAddressProbe;
use crate::core::process::{ProcessSupervisor, ServerStatus};
use crate::core::version::{ServerVersion, VersionRegistry};

/// Everything the panel knows: the selected version and its configuration,
/// the server process and the background services.
///
/// The selected version and the running process are independent: selecting
/// another version never stops a running server.
pub struct AppState {
    pub data_dir: PathBuf,
    pub settings: PanelSettings,
    pub registry: VersionRegistry,
    pub supervisor: ProcessSupervisor,
    pub downloader: ServerDownloader,
    pub address_probe: PublicAddressProbe,
    pub http_client: Client,
    config: ServerConfiguration,
    events: EventSender,
}

impl AppState {
    pub async fn new(events: EventSender) -> PanelResult<Self> {
        Self::with_data_dir(default_data_dir(), events).await
    }

    pub async fn with_data_dir(data_dir: PathBuf, events: EventSender) -> PanelResult<Self> {
        let settings = PanelSettings::load(&data_dir);
        let http_client = build_http_client()
            .map_err(|e| PanelError::Other(format!("Failed to build HTTP client: {e}")))?;

        let registry = VersionRegistry::new(settings.install_root.clone()).await?;
        let config = match registry.selected() {
            Some(version) => config::load(&version.config_path).await,
            None => ServerConfiguration::default(),
        };

        let downloader =
            ServerDownloader::new(http_client.clone(), settings.download_host.clone(), events.clone());
        let address_probe =
            PublicAddressProbe::new(http_client.clone(), settings.address_endpoint.clone());

        info!(
            "Panel state ready: data dir {:?}, install root {:?}",
            data_dir, settings.install_root
        );

        Ok(Self {
            data_dir,
            settings,
            registry,
            supervisor: ProcessSupervisor::new(events.clone()),
            downloader,
            address_probe,
            http_client,
            config,
            events,
        })
    }

    pub fn selected_version(&self) -> Option<&ServerVersion> {
        self.registry.selected()
    }

    /// Configuration of the selected version as last loaded or saved.
    pub fn config(&self) -> &ServerConfiguration {
        &self.config
    }

    async fn reload_config(&mut self) {
        self.config = match self.registry.selected() {
            Some(version) => config::load(&version.config_path).await,
            None => ServerConfiguration::default(),
        };
    }

    /// Re-scan installed versions, reloading the configuration if the
    /// selection changed.
    pub async fn refresh_versions(&mut self) -> PanelResult<Vec<ServerVersion>> {
        let before = self.registry.selected().map(|v| v.id.clone());
        let versions = self.registry.refresh().await?.to_vec();
        let after = self.registry.selected().map(|v| v.id.clone());
        if before != after {
            self.reload_config().await;
        }
        Ok(versions)
    }

    /// Select `id` and load its configuration. A running server keeps
    /// running, whichever version it was started from.
    pub async fn select_version(&mut self, id: &str) -> PanelResult<ServerConfiguration> {
        self.registry.select_version(id)?;
        self.reload_config().await;
        Ok(self.config.clone())
    }

    /// Persist `config` to the selected version's properties file and
    /// return it as written, with numbers clamped into range.
    pub async fn save_config(
        &mut self,
        config: ServerConfiguration,
    ) -> PanelResult<ServerConfiguration> {
        let version = self
            .registry
            .selected()
            .ok_or(PanelError::NoVersionSelected)?;
        self.config = config::save(&version.config_path, &config).await?;
        events::emit(&self.events, PanelEvent::console("Configuration saved"));
        Ok(self.config.clone())
    }

    /// Start the selected version's executable in its install directory.
    pub async fn start_server(&self) -> PanelResult<()> {
        let version = self
            .registry
            .selected()
            .ok_or(PanelError::NoVersionSelected)?;
        self.supervisor
            .start(&version.executable_path(), &version.install_dir, &version.id)
            .await
    }

    pub async fn stop_server(&self) -> PanelResult<()> {
        self.supervisor.stop().await
    }

    pub async fn send_command(&self, text: &str) -> PanelResult<()> {
        self.supervisor.send_command(text).await
    }

    pub async fn server_status(&self) -> ServerStatus {
        self.supervisor.status().await
    }

    /// Start downloading `version` into the install root.
    pub fn download_version(&self, version: &str) -> PanelResult<DownloadTask> {
        self.downloader
            .download(version, self.registry.install_root())
    }

    pub async fn public_address(&self) -> String {
        self.address_probe.probe().await
    }

    /// Persist new settings and rebuild whatever depends on them.
    pub async fn update_settings(&mut self, settings: PanelSettings) -> PanelResult<()> {
        settings.save(&self.data_dir)?;

        if settings.install_root != self.settings.install_root {
            self.registry = VersionRegistry::new(settings.install_root.clone()).await?;
            self.reload_config().await;
        }
        if settings.download_host != self.settings.download_host {
            self.downloader = ServerDownloader::new(
                self.http_client.clone(),
                settings.download_host.clone(),
                self.events.clone(),
            );
        }
        if settings.address_endpoint != self.settings.address_endpoint {
            self.address_probe =
                PublicAddressProbe::new(self.http_client.clone(), settings.address_endpoint.clone());
        }

        self.settings = settings;
        Ok(())
    }
}
