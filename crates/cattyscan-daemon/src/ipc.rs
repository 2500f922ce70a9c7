//! IPC Server - Unix Domain Socket 通信

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

use cattyscan_core::radio::DiscoveredDevice;
use cattyscan_core::scan::{ScanEvent, StopReason};

use crate::service::ServiceHandle;

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

/// watch 流上的一条事件
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

impl From<ScanEvent> for WatchEvent {
    fn from(event: ScanEvent) -> Self {
        match event {
            ScanEvent::Started => WatchEvent::ScanStarted,
            ScanEvent::Stopped { reason } => WatchEvent::ScanStopped {
                reason: match reason {
                    StopReason::Manual => "manual".to_string(),
                    StopReason::AutoStop => "auto".to_string(),
                },
            },
            ScanEvent::Device(device) => WatchEvent::Device(device),
        }
    }
}

pub async fn run_ipc_server(handle: ServiceHandle) -> Result<()> {
    let path = socket_path();

    // 删除旧的 socket 文件
    let _ = std::fs::remove_file(&path);

    let listener = UnixListener::bind(&path)?;
    tracing::info!("IPC 服务器已启动: {:?}", path);

    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                tokio::spawn(handle_client(stream, handle.clone()));
            }
            Err(e) => {
                tracing::warn!("接受连接失败: {}", e);
            }
        }
    }
}

async fn handle_client(stream: UnixStream, handle: ServiceHandle) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    while reader.read_line(&mut line).await? > 0 {
        let request: IpcRequest = match serde_json::from_str(&line) {
            Ok(req) => req,
            Err(e) => {
                let resp = IpcResponse::Error {
                    message: format!("Invalid request: {}", e),
                };
                write_response(&mut writer, &resp).await?;
                line.clear();
                continue;
            }
        };

        tracing::debug!("收到请求: {:?}", request);

        let response = match request {
            IpcRequest::Status => match handle.status().await {
                Ok(status) => IpcResponse::Status {
                    scanning: status.scanning,
                    auto_stop_in_ms: status.auto_stop_in.map(|d| d.as_millis() as u64),
                    backend: status.backend.to_string(),
                },
                Err(e) => IpcResponse::Error {
                    message: e.to_string(),
                },
            },
            IpcRequest::Start => match handle.set_scanning(true).await {
                Ok(()) => IpcResponse::Ok {
                    message: "扫描已开始".to_string(),
                },
                Err(e) => IpcResponse::Error {
                    message: e.to_string(),
                },
            },
            IpcRequest::Stop => match handle.set_scanning(false).await {
                Ok(()) => IpcResponse::Ok {
                    message: "扫描已停止".to_string(),
                },
                Err(e) => IpcResponse::Error {
                    message: e.to_string(),
                },
            },
            IpcRequest::Watch => {
                // 进入流式模式，连接断开前不再处理其它请求
                return watch_client(writer, handle).await;
            }
        };

        write_response(&mut writer, &response).await?;
        line.clear();
    }

    Ok(())
}

async fn write_response(
    writer: &mut tokio::net::unix::OwnedWriteHalf,
    response: &IpcResponse,
) -> Result<()> {
    writer
        .write_all(serde_json::to_string(response)?.as_bytes())
        .await?;
    writer.write_all(b"\n").await?;
    Ok(())
}

async fn watch_client(
    mut writer: tokio::net::unix::OwnedWriteHalf,
    handle: ServiceHandle,
) -> Result<()> {
    let mut events = handle.subscribe().await?;

    loop {
        match events.recv().await {
            Ok(event) => {
                let resp = IpcResponse::Event {
                    event: event.into(),
                };
                // 客户端断开时写入失败，结束本次 watch
                if write_response(&mut writer, &resp).await.is_err() {
                    break;
                }
            }
            Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!("watch 客户端滞后，丢弃 {} 条事件", n);
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }

    Ok(())
}
