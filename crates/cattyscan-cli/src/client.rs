//! IPC Client - 与守护进程通信

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use cattyscan_core::radio::DiscoveredDevice;

pub fn socket_path() -> PathBuf {
    std::env::var("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
        .join("cattyscan.sock")
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum IpcRequest {
    #[serde(rename = "status")]
    Status,
    #[serde(rename = "start")]
    Start,
    #[serde(rename = "stop")]
    Stop,
    #[serde(rename = "watch")]
    Watch,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum IpcResponse {
    #[serde(rename = "ok")]
    Ok { message: String },
    #[serde(rename = "error")]
    Error { message: String },
    #[serde(rename = "status")]
    Status {
        scanning: bool,
        auto_stop_in_ms: Option<u64>,
        backend: String,
    },
    #[serde(rename = "event")]
    Event { event: WatchEvent },
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "kind")]
pub enum WatchEvent {
    #[serde(rename = "scan_started")]
    ScanStarted,
    #[serde(rename = "scan_stopped")]
    ScanStopped { reason: String },
    #[serde(rename = "device")]
    Device(DiscoveredDevice),
}

async fn connect() -> Result<UnixStream> {
    let path = socket_path();

    match UnixStream::connect(&path).await {
        Ok(s) => Ok(s),
        Err(e) => {
            eprintln!("❌ 无法连接到守护进程: {}", e);
            eprintln!("   请确保 cattyscan-daemon 正在运行");
            eprintln!("   运行: cargo xtask dev 或 systemctl start cattyscan");
            Err(e.into())
        }
    }
}

pub async fn send_request(request: IpcRequest) -> Result<IpcResponse> {
    let stream = connect().await?;
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    // 发送请求
    let json = serde_json::to_string(&request)?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;

    // 读取响应
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    let response: IpcResponse = serde_json::from_str(&line)?;

    match &response {
        IpcResponse::Ok { message } => println!("✅ {}", message),
        IpcResponse::Error { message } => eprintln!("❌ {}", message),
        _ => {}
    }

    Ok(response)
}

/// 订阅事件流，对每条事件调用 `on_event`，连接断开时返回
pub async fn watch<F>(mut on_event: F) -> Result<()>
where
    F: FnMut(WatchEvent),
{
    let stream = connect().await?;
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let json = serde_json::to_string(&IpcRequest::Watch)?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;

    let mut line = String::new();
    while reader.read_line(&mut line).await? > 0 {
        match serde_json::from_str(&line) {
            Ok(IpcResponse::Event { event }) => on_event(event),
            Ok(IpcResponse::Error { message }) => {
                eprintln!("❌ {}", message);
                break;
            }
            Ok(_) => {}
            Err(e) => eprintln!("❌ 无法解析事件: {}", e),
        }
        line.clear();
    }

    Ok(())
}
