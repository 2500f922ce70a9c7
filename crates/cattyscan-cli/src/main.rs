//! Cattyscan CLI
//!
//! 命令行客户端，通过 Unix Socket 与守护进程通信

mod client;

use anyhow::Result;
use cattyscan_core::scan::SCAN_PERIOD;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cattyscan", version, about = "BLE 扫描开关 - 带自动停止的设备发现工具")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 开始扫描（固定时长后自动停止）
    Start,
    /// 立即停止扫描
    Stop,
    /// 查看当前状态
    Status,
    /// 实时查看扫描事件和发现的设备
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start => {
            println!("🔍 开始扫描 ({}s 后自动停止)...", SCAN_PERIOD.as_secs());
            client::send_request(client::IpcRequest::Start).await?;
        }
        Commands::Stop => {
            println!("⏹️  停止扫描");
            client::send_request(client::IpcRequest::Stop).await?;
        }
        Commands::Status => {
            let resp = client::send_request(client::IpcRequest::Status).await?;
            if let client::IpcResponse::Status {
                scanning,
                auto_stop_in_ms,
                backend,
            } = resp
            {
                if scanning {
                    println!("状态: 扫描中");
                    if let Some(ms) = auto_stop_in_ms {
                        println!("自动停止: {:.1}s 后", ms as f64 / 1000.0);
                    }
                } else {
                    println!("状态: 空闲");
                }
                println!("后端: {}", backend);
            }
        }
        Commands::Watch => {
            println!("👀 监听扫描事件 (Ctrl-C 退出)...");
            client::watch(|event| match event {
                client::WatchEvent::ScanStarted => println!("▶️  扫描开始"),
                client::WatchEvent::ScanStopped { reason } => {
                    let reason = match reason.as_str() {
                        "auto" => "自动停止",
                        "manual" => "手动停止",
                        other => other,
                    };
                    println!("⏹️  扫描结束 ({})", reason);
                }
                client::WatchEvent::Device(device) => {
                    let rssi = device
                        .rssi
                        .map(|r| format!("{} dBm", r))
                        .unwrap_or_else(|| "-".to_string());
                    println!("📡 {} ({}) RSSI {}", device.name, device.address, rssi);
                }
            })
            .await?;
        }
    }

    Ok(())
}
