//! 射频能力抽象
//!
//! 把环境里的蓝牙适配器包装成可注入的能力对象，调用方（扫描控制器、
//! 守护进程）只依赖 [`RadioControl`]，测试时可以用记录调用的替身代替
//! 真实适配器。
//!
//! # 后端
//!
//! - [`BluezRadio`]: 通过 bluer (BlueZ D-Bus) 实现，Linux 默认后端
//! - [`BtleRadio`]: 通过 btleplug 实现，跨平台备选后端

pub mod bluez;
pub mod btle;

pub use bluez::BluezRadio;
pub use btle::BtleRadio;

use serde::{Deserialize, Serialize};

/// 射频操作错误
#[derive(Debug, thiserror::Error)]
pub enum RadioError {
    #[error("No Bluetooth adapters found")]
    NoAdapter,

    #[error("BlueZ error: {0}")]
    Bluez(#[from] bluer::Error),

    #[error("btleplug error: {0}")]
    Btleplug(#[from] btleplug::Error),

    #[error("Radio backend error: {0}")]
    Backend(String),
}

/// 扫描期间上报的设备通知
///
/// 控制器不对通知做任何过滤、去重或存储，原样转发给观察者。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    pub name: String,
    pub address: String,
    pub rssi: Option<i16>,
}

/// 扫描观察者，接收发现的设备通知
#[async_trait::async_trait]
pub trait ScanObserver: Send + Sync {
    async fn on_device_found(&self, device: DiscoveredDevice);
}

/// 射频控制能力
///
/// 对应平台的适配器控制面：上电状态查询、上电请求（不等待也不解释
/// 用户/平台的响应）、带观察者的发现启动与停止。
#[async_trait::async_trait]
pub trait RadioControl: Send + Sync + 'static {
    /// 适配器是否已上电
    async fn is_powered(&self) -> Result<bool, RadioError>;

    /// 请求适配器上电
    ///
    /// 只发出请求；未上电的适配器之后会以发现失败的形式暴露出来。
    async fn request_power_on(&self) -> Result<(), RadioError>;

    /// 启动发现，设备通知交给 `observer`
    async fn start_discovery(
        &self,
        observer: std::sync::Arc<dyn ScanObserver>,
    ) -> Result<(), RadioError>;

    /// 停止发现。没有活动扫描时是空操作。
    async fn stop_discovery(&self) -> Result<(), RadioError>;
}
