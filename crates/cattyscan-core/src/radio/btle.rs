//! btleplug 射频后端
//!
//! 跨平台备选后端：manager → 第一个 adapter，`start_scan`/`stop_scan`
//! 加 `events()` 事件流。btleplug 不暴露适配器电源状态，上电查询和
//! 上电请求在这里是尽力而为的空实现。

use std::sync::{Arc, Mutex};

use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral, ScanFilter};
use btleplug::platform::{Adapter, Manager};
use futures_util::StreamExt;
use log::{debug, info};
use tokio::task::JoinHandle;

use super::{DiscoveredDevice, RadioControl, RadioError, ScanObserver};

pub struct BtleRadio {
    adapter: Adapter,
    events_task: Mutex<Option<JoinHandle<()>>>,
}

impl BtleRadio {
    pub async fn new() -> Result<Self, RadioError> {
        let manager = Manager::new().await?;
        let adapters = manager.adapters().await?;
        let adapter = adapters.into_iter().next().ok_or(RadioError::NoAdapter)?;

        Ok(Self {
            adapter,
            events_task: Mutex::new(None),
        })
    }
}

#[async_trait::async_trait]
impl RadioControl for BtleRadio {
    async fn is_powered(&self) -> Result<bool, RadioError> {
        // Note: btleplug 不暴露电源状态，能拿到适配器就视为可用
        Ok(true)
    }

    async fn request_power_on(&self) -> Result<(), RadioError> {
        // Note: btleplug 无法切换适配器电源，依赖平台侧状态
        debug!("btleplug backend cannot toggle adapter power, skipping");
        Ok(())
    }

    async fn start_discovery(
        &self,
        observer: Arc<dyn ScanObserver>,
    ) -> Result<(), RadioError> {
        // 先订阅事件流再启动扫描，避免漏掉最早的发现事件
        let mut events = self.adapter.events().await?;
        self.adapter.start_scan(ScanFilter::default()).await?;

        info!("BLE scan started (btleplug)");

        let adapter = self.adapter.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let CentralEvent::DeviceDiscovered(id) = event else {
                    continue;
                };

                let Ok(peripheral) = adapter.peripheral(&id).await else {
                    continue;
                };
                let props = match peripheral.properties().await {
                    Ok(Some(props)) => props,
                    Ok(None) => continue,
                    Err(e) => {
                        debug!("Failed to read properties of {:?}: {}", id, e);
                        continue;
                    }
                };

                let device = DiscoveredDevice {
                    name: props
                        .local_name
                        .unwrap_or_else(|| "<unknown>".to_string()),
                    address: props.address.to_string(),
                    rssi: props.rssi,
                };

                debug!(
                    "Device found: addr={}, name='{}', rssi={:?}",
                    device.address, device.name, device.rssi
                );
                observer.on_device_found(device).await;
            }
        });

        if let Some(old) = self.events_task.lock().unwrap().replace(task) {
            old.abort();
        }

        Ok(())
    }

    async fn stop_discovery(&self) -> Result<(), RadioError> {
        let task = self.events_task.lock().unwrap().take();
        if let Some(task) = task {
            self.adapter.stop_scan().await?;
            task.abort();
            info!("BLE scan stopped (btleplug)");
        }
        Ok(())
    }
}
