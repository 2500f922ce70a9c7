//! Cattyscan Daemon
//!
//! 后台守护进程，负责：
//! - 持有射频后端和扫描开关控制器
//! - 适配器上电流程和索引可见性生命周期
//! - 通过 Unix Socket 与 CLI 通信

mod ipc;
mod service;

use anyhow::Result;
use cattyscan_core::AppSettings;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 桥接 log crate（cattyscan-core 使用）到 tracing
    let _ = tracing_log::LogTracer::init();

    let settings = AppSettings::load();

    // 初始化日志，默认级别来自设置，RUST_LOG 优先
    let default_filter = format!(
        "{level},cattyscan_core=debug",
        level = settings.log_level.filter_str()
    );
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .try_init();

    tracing::info!("Cattyscan Daemon starting...");

    let (handle, rx) = service::channel();

    // 启动 IPC 服务器
    let ipc_handle = tokio::spawn(ipc::run_ipc_server(handle));

    // 启动核心服务
    let service_handle = tokio::spawn(service::run_service(settings, rx));

    // 等待任一任务完成
    tokio::select! {
        res = ipc_handle => {
            tracing::error!("IPC server exited: {:?}", res);
        }
        res = service_handle => {
            tracing::info!("Core service exited: {:?}", res);
        }
    }

    Ok(())
}
