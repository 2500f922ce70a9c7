//! Core Service - 射频后端与扫描开关的管理
//!
//! 服务启动时构造配置的射频后端、执行上电流程、打开索引可见性会话，
//! 然后在命令循环里驱动 [`ScanController`]，直到收到退出信号。

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc, oneshot};

use cattyscan_core::config::{AppSettings, RadioBackend};
use cattyscan_core::indexing::{LogIndexer, ViewAction, VisibilitySession};
use cattyscan_core::radio::{BluezRadio, BtleRadio, RadioControl, RadioError};
use cattyscan_core::scan::{SCAN_PERIOD, ScanController, ScanEvent};

/// 当前服务状态快照
#[derive(Debug, Clone)]
pub struct StatusInfo {
    pub scanning: bool,
    pub auto_stop_in: Option<Duration>,
    pub backend: &'static str,
}

pub enum Command {
    SetScanning {
        enable: bool,
        reply: oneshot::Sender<Result<(), RadioError>>,
    },
    Status {
        reply: oneshot::Sender<StatusInfo>,
    },
    Subscribe {
        reply: oneshot::Sender<broadcast::Receiver<ScanEvent>>,
    },
}

/// IPC 侧持有的服务句柄
#[derive(Clone)]
pub struct ServiceHandle {
    tx: mpsc::Sender<Command>,
}

impl ServiceHandle {
    async fn send(&self, cmd: Command) -> Result<()> {
        self.tx
            .send(cmd)
            .await
            .map_err(|_| anyhow::anyhow!("core service is not running"))
    }

    pub async fn set_scanning(&self, enable: bool) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SetScanning { enable, reply }).await?;
        rx.await??;
        Ok(())
    }

    pub async fn status(&self) -> Result<StatusInfo> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Status { reply }).await?;
        Ok(rx.await?)
    }

    pub async fn subscribe(&self) -> Result<broadcast::Receiver<ScanEvent>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Subscribe { reply }).await?;
        Ok(rx.await?)
    }
}

pub fn channel() -> (ServiceHandle, mpsc::Receiver<Command>) {
    let (tx, rx) = mpsc::channel(16);
    (ServiceHandle { tx }, rx)
}

async fn build_radio(settings: &AppSettings) -> Result<Arc<dyn RadioControl>> {
    let radio: Arc<dyn RadioControl> = match settings.backend {
        RadioBackend::Bluez => Arc::new(BluezRadio::new(settings.adapter.as_deref()).await?),
        RadioBackend::Btle => Arc::new(BtleRadio::new().await?),
    };
    Ok(radio)
}

pub async fn run_service(settings: AppSettings, mut rx: mpsc::Receiver<Command>) -> Result<()> {
    tracing::info!(
        "核心服务初始化... (设备: {}, 后端: {})",
        settings.device_name,
        settings.backend.name()
    );

    let radio = build_radio(&settings).await?;

    // 上电流程：未上电时发出请求，不等待也不解释结果；
    // 仍然未上电的适配器之后会以发现失败的形式暴露
    if !radio.is_powered().await? {
        tracing::info!("适配器未上电，请求开启...");
        radio.request_power_on().await?;
    }

    // 可见性生命周期：服务在线即"可见"
    let indexing = VisibilitySession::new(Arc::new(LogIndexer), ViewAction::main_page());
    indexing.visible().await?;

    let backend_name = settings.backend.name();
    let controller = ScanController::new(radio, SCAN_PERIOD);

    tracing::info!("等待 IPC 命令...");

    loop {
        tokio::select! {
            cmd = rx.recv() => {
                let Some(cmd) = cmd else { break };
                handle_command(&controller, backend_name, cmd).await;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("收到退出信号");
                break;
            }
        }
    }

    // 退出前收尾：停掉未完成的扫描，撤回索引登记
    if controller.is_scanning() {
        if let Err(e) = controller.set_scanning(false).await {
            tracing::warn!("退出时停止扫描失败: {}", e);
        }
    }
    indexing.hidden().await?;

    Ok(())
}

async fn handle_command(controller: &ScanController, backend: &'static str, cmd: Command) {
    match cmd {
        Command::SetScanning { enable, reply } => {
            tracing::info!("扫描开关: {}", if enable { "开" } else { "关" });
            let result = controller.set_scanning(enable).await;
            let _ = reply.send(result);
        }
        Command::Status { reply } => {
            let _ = reply.send(StatusInfo {
                scanning: controller.is_scanning(),
                auto_stop_in: controller.auto_stop_in(),
                backend,
            });
        }
        Command::Subscribe { reply } => {
            let _ = reply.send(controller.subscribe());
        }
    }
}
