//! bluer (BlueZ D-Bus) 射频后端
//!
//! Linux 默认后端：session → adapter → `discover_devices()` 事件流。
//! 发现事件由一个后台任务消费；丢弃事件流即结束 BlueZ 的发现会话，
//! 所以停止扫描就是终止这个任务。

use std::sync::{Arc, Mutex};

use bluer::AdapterEvent;
use futures_util::StreamExt;
use log::{debug, info};
use tokio::task::JoinHandle;

use super::{DiscoveredDevice, RadioControl, RadioError, ScanObserver};

pub struct BluezRadio {
    adapter: bluer::Adapter,
    // 发现事件的消费任务；Some 表示正在扫描
    discovery: Mutex<Option<JoinHandle<()>>>,
}

impl BluezRadio {
    /// 打开 BlueZ 会话并选择适配器
    ///
    /// `adapter_name` 为 None 时使用默认适配器。
    pub async fn new(adapter_name: Option<&str>) -> Result<Self, RadioError> {
        let session = bluer::Session::new().await?;
        let adapter = match adapter_name {
            Some(name) => session.adapter(name)?,
            None => session.default_adapter().await?,
        };

        debug!("Using BlueZ adapter '{}'", adapter.name());

        Ok(Self {
            adapter,
            discovery: Mutex::new(None),
        })
    }

    async fn read_device(
        adapter: &bluer::Adapter,
        addr: bluer::Address,
    ) -> Result<DiscoveredDevice, RadioError> {
        let device = adapter.device(addr)?;
        let name = device
            .name()
            .await?
            .unwrap_or_else(|| "<unknown>".to_string());
        let rssi = device.rssi().await?;

        Ok(DiscoveredDevice {
            name,
            address: addr.to_string(),
            rssi,
        })
    }
}

#[async_trait::async_trait]
impl RadioControl for BluezRadio {
    async fn is_powered(&self) -> Result<bool, RadioError> {
        Ok(self.adapter.is_powered().await?)
    }

    async fn request_power_on(&self) -> Result<(), RadioError> {
        info!("Requesting power on for adapter '{}'", self.adapter.name());
        self.adapter.set_powered(true).await?;
        Ok(())
    }

    async fn start_discovery(
        &self,
        observer: Arc<dyn ScanObserver>,
    ) -> Result<(), RadioError> {
        let mut discoverer = self.adapter.discover_devices().await?;
        let adapter = self.adapter.clone();

        info!("BLE discovery started on '{}'", adapter.name());

        let task = tokio::spawn(async move {
            while let Some(event) = discoverer.next().await {
                match event {
                    AdapterEvent::DeviceAdded(addr) => {
                        match Self::read_device(&adapter, addr).await {
                            Ok(device) => {
                                debug!(
                                    "Device found: addr={}, name='{}', rssi={:?}",
                                    device.address, device.name, device.rssi
                                );
                                observer.on_device_found(device).await;
                            }
                            Err(e) => {
                                debug!("Failed to read device {}: {}", addr, e);
                            }
                        }
                    }
                    _ => {}
                }
            }
        });

        // 同一后端重复启动时，旧的发现会话被替换
        if let Some(old) = self.discovery.lock().unwrap().replace(task) {
            old.abort();
        }

        Ok(())
    }

    async fn stop_discovery(&self) -> Result<(), RadioError> {
        if let Some(task) = self.discovery.lock().unwrap().take() {
            task.abort();
            info!("BLE discovery stopped on '{}'", self.adapter.name());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 注意: 这些测试需要系统 D-Bus 和 bluetoothd 运行
    // 在 CI 环境中应该被跳过

    #[tokio::test]
    #[ignore = "requires system D-Bus and bluetoothd"]
    async fn test_open_default_adapter() {
        let radio = BluezRadio::new(None).await.unwrap();
        let powered = radio.is_powered().await.unwrap();
        println!("adapter powered: {}", powered);
    }

    #[tokio::test]
    #[ignore = "requires system D-Bus and bluetoothd"]
    async fn test_stop_without_start_is_noop() {
        let radio = BluezRadio::new(None).await.unwrap();
        radio.stop_discovery().await.unwrap();
    }
}
