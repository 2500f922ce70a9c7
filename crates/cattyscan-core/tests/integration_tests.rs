//! 集成测试 - 扫描开关与可见性生命周期
//!
//! 用记录调用的替身验证控制器和索引登记的外部可见行为。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cattyscan_core::radio::{DiscoveredDevice, RadioControl, RadioError, ScanObserver};
use cattyscan_core::scan::{SCAN_PERIOD, ScanController, ScanEvent, StopReason};
use cattyscan_core::indexing::{IndexingApi, ViewAction, VisibilitySession};

/// 记录调用次数的射频替身
struct RecordingRadio {
    starts: AtomicUsize,
    stops: AtomicUsize,
    observer: Mutex<Option<Arc<dyn ScanObserver>>>,
}

impl RecordingRadio {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            observer: Mutex::new(None),
        })
    }
}

#[async_trait::async_trait]
impl RadioControl for RecordingRadio {
    async fn is_powered(&self) -> Result<bool, RadioError> {
        Ok(true)
    }

    async fn request_power_on(&self) -> Result<(), RadioError> {
        Ok(())
    }

    async fn start_discovery(&self, observer: Arc<dyn ScanObserver>) -> Result<(), RadioError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        *self.observer.lock().unwrap() = Some(observer);
        Ok(())
    }

    async fn stop_discovery(&self) -> Result<(), RadioError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// 记录调用顺序的索引替身
struct RecordingIndexer {
    calls: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl IndexingApi for RecordingIndexer {
    async fn connect(&self) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push("connect".to_string());
        Ok(())
    }

    async fn start(&self, action: &ViewAction) -> anyhow::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("start:{}", action.title));
        Ok(())
    }

    async fn end(&self, action: &ViewAction) -> anyhow::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("end:{}", action.title));
        Ok(())
    }

    async fn disconnect(&self) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push("disconnect".to_string());
        Ok(())
    }
}

/// 完整的开关周期：启动 → 自动停止 → 手动启动 → 手动停止
///
/// 全程恰好两次发现启动、两次发现停止，事件顺序与操作一致。
#[tokio::test(start_paused = true)]
async fn test_full_toggle_lifecycle() {
    let radio = RecordingRadio::new();
    let controller = ScanController::new(radio.clone(), SCAN_PERIOD);
    let mut events = controller.subscribe();

    // 第一轮：自动停止
    controller.set_scanning(true).await.unwrap();
    tokio::time::sleep(SCAN_PERIOD + Duration::from_millis(100)).await;
    assert!(!controller.is_scanning());

    // 第二轮：手动停止
    controller.set_scanning(true).await.unwrap();
    controller.set_scanning(false).await.unwrap();

    assert_eq!(radio.starts.load(Ordering::SeqCst), 2);
    assert_eq!(radio.stops.load(Ordering::SeqCst), 2);

    // 事件顺序
    assert!(matches!(events.recv().await.unwrap(), ScanEvent::Started));
    assert!(matches!(
        events.recv().await.unwrap(),
        ScanEvent::Stopped {
            reason: StopReason::AutoStop
        }
    ));
    assert!(matches!(events.recv().await.unwrap(), ScanEvent::Started));
    assert!(matches!(
        events.recv().await.unwrap(),
        ScanEvent::Stopped {
            reason: StopReason::Manual
        }
    ));
}

/// 手动停止后，被取消的自动停止不会再触发
#[tokio::test(start_paused = true)]
async fn test_canceled_auto_stop_stays_canceled() {
    let radio = RecordingRadio::new();
    let controller = ScanController::new(radio.clone(), SCAN_PERIOD);

    controller.set_scanning(true).await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;
    controller.set_scanning(false).await.unwrap();

    tokio::time::sleep(SCAN_PERIOD * 3).await;

    assert_eq!(radio.stops.load(Ordering::SeqCst), 1);
}

/// 可见性转换按顺序驱动索引登记：
/// 可见 = connect → start，隐藏 = end → disconnect
#[tokio::test]
async fn test_visibility_drives_indexing_in_order() {
    let indexer = Arc::new(RecordingIndexer {
        calls: Mutex::new(Vec::new()),
    });
    let session = VisibilitySession::new(indexer.clone(), ViewAction::main_page());

    session.visible().await.unwrap();
    session.hidden().await.unwrap();

    let calls = indexer.calls.lock().unwrap();
    assert_eq!(
        *calls,
        vec![
            "connect".to_string(),
            "start:Main Page".to_string(),
            "end:Main Page".to_string(),
            "disconnect".to_string(),
        ]
    );
}

/// 设备通知不做过滤、去重或存储，重复上报原样到达订阅者
#[tokio::test(start_paused = true)]
async fn test_duplicate_notifications_pass_through() {
    let radio = RecordingRadio::new();
    let controller = ScanController::new(radio.clone(), SCAN_PERIOD);
    let mut events = controller.subscribe();

    controller.set_scanning(true).await.unwrap();
    assert!(matches!(events.recv().await.unwrap(), ScanEvent::Started));

    let observer = radio.observer.lock().unwrap().clone().unwrap();
    let device = DiscoveredDevice {
        name: "Beacon".to_string(),
        address: "11:22:33:44:55:66".to_string(),
        rssi: Some(-72),
    };
    observer.on_device_found(device.clone()).await;
    observer.on_device_found(device).await;

    for _ in 0..2 {
        match events.recv().await.unwrap() {
            ScanEvent::Device(d) => assert_eq!(d.address, "11:22:33:44:55:66"),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}

/// DiscoveredDevice 的 JSON 形状（IPC 线上格式）
#[test]
fn test_discovered_device_json_shape() {
    let device = DiscoveredDevice {
        name: "Pixel 3".to_string(),
        address: "AA:BB:CC:DD:EE:FF".to_string(),
        rssi: Some(-58),
    };

    let json = serde_json::to_string(&device).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed["name"], "Pixel 3");
    assert_eq!(parsed["address"], "AA:BB:CC:DD:EE:FF");
    assert_eq!(parsed["rssi"], -58);

    let back: DiscoveredDevice = serde_json::from_str(&json).unwrap();
    assert_eq!(back.name, "Pixel 3");
    assert_eq!(back.rssi, Some(-58));
}
