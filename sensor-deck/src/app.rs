//! Application state: one devices session plus an optional readings session
//! for the currently selected device.

use std::sync::Arc;

use ratatui::widgets::TableState;
use sync_client::{
    EventClient, HttpClient, ResourceFamily, ResourceKey, ResourceValue, SyncConfig, SyncSession,
};

pub struct App {
    config: SyncConfig,
    source: Arc<HttpClient>,
    client: EventClient,
    /// Device list session; lives for the whole program run
    pub devices: SyncSession,
    /// Readings session for the selected device, if any
    pub sensors: Option<SyncSession>,
    pub selected_device: Option<(i64, String)>,
    pub device_table: TableState,
}

impl App {
    pub async fn new(config: SyncConfig, client: EventClient) -> Self {
        let source = Arc::new(HttpClient::new(&config));

        let devices = SyncSession::new(
            ResourceFamily::Devices,
            config.clone(),
            source.clone(),
            client.clone(),
        );
        devices.activate().await;

        let mut device_table = TableState::default();
        device_table.select(Some(0));

        Self {
            config,
            source,
            client,
            devices,
            sensors: None,
            selected_device: None,
            device_table,
        }
    }

    /// Device rows for display, active devices first
    pub fn device_rows(&self) -> Vec<ResourceValue> {
        let mut rows = self.devices.store().snapshot();
        rows.sort_by_key(|row| (!row.has_data(), row.key.id()));
        rows
    }

    /// Reading rows for the selected device
    pub fn sensor_rows(&self) -> Vec<ResourceValue> {
        self.sensors
            .as_ref()
            .map(|session| session.store().snapshot())
            .unwrap_or_default()
    }

    pub fn select_next(&mut self) {
        let len = self.device_rows().len();
        if len == 0 {
            return;
        }
        let next = match self.device_table.selected() {
            Some(current) => (current + 1) % len,
            None => 0,
        };
        self.device_table.select(Some(next));
    }

    pub fn select_previous(&mut self) {
        let len = self.device_rows().len();
        if len == 0 {
            return;
        }
        let previous = match self.device_table.selected() {
            Some(0) | None => len - 1,
            Some(current) => current - 1,
        };
        self.device_table.select(Some(previous));
    }

    /// Track the device under the cursor.
    ///
    /// 切换设备：先完整拆除旧会话，再启动新会话，两个身份的会话绝不重叠。
    pub async fn track_selected_device(&mut self) {
        let rows = self.device_rows();
        let Some(row) = self.device_table.selected().and_then(|i| rows.get(i)) else {
            return;
        };
        let ResourceKey::Device(device_id) = row.key else {
            return;
        };

        if self.selected_device.as_ref().map(|(id, _)| *id) == Some(device_id) {
            return;
        }

        if let Some(previous) = self.sensors.take() {
            previous.deactivate().await;
        }

        let session = SyncSession::new(
            ResourceFamily::DeviceSensors(device_id),
            self.config.clone(),
            self.source.clone(),
            self.client.clone(),
        );
        session.activate().await;

        let name = row.attributes.name.clone().unwrap_or_default();
        tracing::info!(device = %name, "Tracking device");
        self.selected_device = Some((device_id, name));
        self.sensors = Some(session);
    }

    /// Drop the sensor view back to "select a device"
    pub async fn clear_selection(&mut self) {
        if let Some(previous) = self.sensors.take() {
            previous.deactivate().await;
        }
        self.selected_device = None;
    }

    /// Manual refresh of everything on screen
    pub async fn refresh(&self) {
        self.devices.refresh().await;
        if let Some(session) = &self.sensors {
            session.refresh().await;
        }
    }

    /// Whether the push channel is still attached
    pub fn push_connected(&self) -> bool {
        self.client.is_connected()
    }

    pub async fn shutdown(&mut self) {
        self.clear_selection().await;
        self.devices.deactivate().await;
        let _ = self.client.close().await;
    }
}
