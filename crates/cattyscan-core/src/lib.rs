//! Cattyscan Core Library
//!
//! BLE 扫描开关的核心实现库：对"开始/停止扫描"做一层可注入的抽象，
//! 并带有固定时长的自动停止定时器。
//!
//! # 模块
//!
//! - **radio**: 射频能力抽象（上电查询/请求、发现的启动与停止）及
//!   bluer / btleplug 两个后端
//! - **scan**: 扫描开关控制器（含 10 秒自动停止）
//! - **indexing**: "已浏览内容" 登记能力（可见性生命周期）
//! - **config**: 应用设置的存储和读取
//! - **logging**: 跨进程统一的日志级别定义
//!
//! # 使用示例
//!
//! ```ignore
//! use cattyscan_core::{BluezRadio, ScanController, SCAN_PERIOD};
//!
//! // 1. 构造射频后端并确保适配器上电
//! let radio = Arc::new(BluezRadio::new(None).await?);
//! if !radio.is_powered().await? {
//!     radio.request_power_on().await?;
//! }
//!
//! // 2. 开始扫描，SCAN_PERIOD 后自动停止
//! let controller = ScanController::new(radio, SCAN_PERIOD);
//! controller.set_scanning(true).await?;
//!
//! // 3. 或者在定时器触发前手动停止（挂起的自动停止会被取消）
//! controller.set_scanning(false).await?;
//! ```

pub mod config;
pub mod indexing;
pub mod logging;
pub mod radio;
pub mod scan;

// Radio re-exports
pub use radio::{BluezRadio, BtleRadio, DiscoveredDevice, RadioControl, RadioError, ScanObserver};

// Scan re-exports
pub use scan::{SCAN_PERIOD, ScanController, ScanEvent, StopReason};

// Indexing re-exports
pub use indexing::{IndexingApi, LogIndexer, ViewAction, VisibilitySession};

// Config re-exports
pub use config::{AppSettings, RadioBackend};
