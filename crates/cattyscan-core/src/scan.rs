//! 扫描开关控制器
//!
//! 唯一的状态是一个"正在扫描"标志：
//!
//! - `set_scanning(true)`: 置位标志、启动射频发现，并挂一个
//!   [`SCAN_PERIOD`] 的一次性自动停止定时器
//! - `set_scanning(false)`: 取消挂起的定时器、清除标志、立即停止发现
//!
//! 手动停止必须先取消挂起的自动停止，保证被取消的定时器不会在之后
//! 再触发一次多余的停止调用。

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::warn;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::radio::{DiscoveredDevice, RadioControl, RadioError, ScanObserver};

/// 自动停止前的固定扫描时长
pub const SCAN_PERIOD: Duration = Duration::from_secs(10);

/// 扫描停止的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `set_scanning(false)` 触发
    Manual,
    /// 自动停止定时器触发
    AutoStop,
}

/// 控制器生命周期事件，经广播通道发给订阅者
#[derive(Debug, Clone)]
pub enum ScanEvent {
    Started,
    Stopped { reason: StopReason },
    Device(DiscoveredDevice),
}

struct ScanState {
    scanning: bool,
    // 挂起的自动停止任务，手动停止或重新启动时 abort
    auto_stop: Option<JoinHandle<()>>,
    deadline: Option<Instant>,
}

pub struct ScanController {
    radio: Arc<dyn RadioControl>,
    state: Arc<Mutex<ScanState>>,
    period: Duration,
    events: broadcast::Sender<ScanEvent>,
}

// 把设备通知原样转进事件通道，不过滤、不去重、不存储
struct EventObserver {
    events: broadcast::Sender<ScanEvent>,
}

#[async_trait::async_trait]
impl ScanObserver for EventObserver {
    async fn on_device_found(&self, device: DiscoveredDevice) {
        let _ = self.events.send(ScanEvent::Device(device));
    }
}

impl ScanController {
    pub fn new(radio: Arc<dyn RadioControl>, period: Duration) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            radio,
            state: Arc::new(Mutex::new(ScanState {
                scanning: false,
                auto_stop: None,
                deadline: None,
            })),
            period,
            events,
        }
    }

    /// 订阅控制器事件
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.events.subscribe()
    }

    /// 当前是否在扫描
    pub fn is_scanning(&self) -> bool {
        self.state.lock().unwrap().scanning
    }

    /// 距离自动停止还剩多久，未在扫描时为 None
    pub fn auto_stop_in(&self) -> Option<Duration> {
        self.state
            .lock()
            .unwrap()
            .deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// 扫描开关
    ///
    /// 射频调用失败原样向调用方传播，不做重试。
    pub async fn set_scanning(&self, enable: bool) -> Result<(), RadioError> {
        if enable {
            self.enable().await
        } else {
            self.disable(StopReason::Manual).await
        }
    }

    async fn enable(&self) -> Result<(), RadioError> {
        let was_scanning = {
            let mut state = self.state.lock().unwrap();
            if let Some(pending) = state.auto_stop.take() {
                pending.abort();
            }
            let was = state.scanning;
            state.scanning = true;
            was
        };

        // 已在扫描时只重挂定时器，不重复启动发现
        if !was_scanning {
            let observer = Arc::new(EventObserver {
                events: self.events.clone(),
            });
            if let Err(e) = self.radio.start_discovery(observer).await {
                self.state.lock().unwrap().scanning = false;
                return Err(e);
            }
            let _ = self.events.send(ScanEvent::Started);
        }

        self.arm_auto_stop();
        Ok(())
    }

    async fn disable(&self, reason: StopReason) -> Result<(), RadioError> {
        {
            let mut state = self.state.lock().unwrap();
            if let Some(pending) = state.auto_stop.take() {
                pending.abort();
            }
            state.scanning = false;
            state.deadline = None;
        }

        self.radio.stop_discovery().await?;
        let _ = self.events.send(ScanEvent::Stopped { reason });
        Ok(())
    }

    fn arm_auto_stop(&self) {
        let radio = Arc::clone(&self.radio);
        let state = Arc::clone(&self.state);
        let events = self.events.clone();
        let period = self.period;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(period).await;

            {
                let mut state = state.lock().unwrap();
                state.scanning = false;
                state.auto_stop = None;
                state.deadline = None;
            }

            // 自动停止没有调用方，失败只能记下来
            if let Err(e) = radio.stop_discovery().await {
                warn!("Auto-stop failed to stop discovery: {}", e);
            }
            let _ = events.send(ScanEvent::Stopped {
                reason: StopReason::AutoStop,
            });
        });

        let mut state = self.state.lock().unwrap();
        state.auto_stop = Some(handle);
        state.deadline = Some(Instant::now() + period);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 记录调用次数的射频替身
    struct MockRadio {
        starts: AtomicUsize,
        stops: AtomicUsize,
        observer: Mutex<Option<Arc<dyn ScanObserver>>>,
    }

    impl MockRadio {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                starts: AtomicUsize::new(0),
                stops: AtomicUsize::new(0),
                observer: Mutex::new(None),
            })
        }

        fn starts(&self) -> usize {
            self.starts.load(Ordering::SeqCst)
        }

        fn stops(&self) -> usize {
            self.stops.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl RadioControl for MockRadio {
        async fn is_powered(&self) -> Result<bool, RadioError> {
            Ok(true)
        }

        async fn request_power_on(&self) -> Result<(), RadioError> {
            Ok(())
        }

        async fn start_discovery(
            &self,
            observer: Arc<dyn ScanObserver>,
        ) -> Result<(), RadioError> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            *self.observer.lock().unwrap() = Some(observer);
            Ok(())
        }

        async fn stop_discovery(&self) -> Result<(), RadioError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// toggle(true) 置位标志并恰好启动一次发现
    #[tokio::test(start_paused = true)]
    async fn test_enable_starts_discovery_once() {
        let radio = MockRadio::new();
        let controller = ScanController::new(radio.clone(), SCAN_PERIOD);

        controller.set_scanning(true).await.unwrap();

        assert!(controller.is_scanning());
        assert_eq!(radio.starts(), 1);
        assert_eq!(radio.stops(), 0);
    }

    /// 自动停止在 +10s 触发，清除标志并恰好停止一次发现
    #[tokio::test(start_paused = true)]
    async fn test_auto_stop_fires_after_period() {
        let radio = MockRadio::new();
        let controller = ScanController::new(radio.clone(), SCAN_PERIOD);

        controller.set_scanning(true).await.unwrap();

        // 刚过一半时还在扫描
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(controller.is_scanning());
        assert_eq!(radio.stops(), 0);

        tokio::time::sleep(SCAN_PERIOD).await;
        assert!(!controller.is_scanning());
        assert_eq!(radio.stops(), 1);
        assert_eq!(radio.starts(), 1);
    }

    /// toggle(false) 清除标志并停止发现，与之前的状态无关
    #[tokio::test(start_paused = true)]
    async fn test_disable_from_idle_still_stops() {
        let radio = MockRadio::new();
        let controller = ScanController::new(radio.clone(), SCAN_PERIOD);

        controller.set_scanning(false).await.unwrap();

        assert!(!controller.is_scanning());
        assert_eq!(radio.stops(), 1);
        assert_eq!(radio.starts(), 0);
    }

    /// 手动停止取消挂起的自动停止：之后不会再有多余的停止调用
    #[tokio::test(start_paused = true)]
    async fn test_manual_stop_cancels_pending_auto_stop() {
        let radio = MockRadio::new();
        let controller = ScanController::new(radio.clone(), SCAN_PERIOD);

        controller.set_scanning(true).await.unwrap();
        controller.set_scanning(false).await.unwrap();
        assert_eq!(radio.stops(), 1);

        // 越过原定的触发时刻，被取消的定时器不应再停一次
        tokio::time::sleep(SCAN_PERIOD * 2).await;
        assert_eq!(radio.stops(), 1);
        assert!(!controller.is_scanning());
    }

    /// 扫描中再次 toggle(true) 重挂定时器而不重复启动发现
    #[tokio::test(start_paused = true)]
    async fn test_re_enable_rearms_without_second_start() {
        let radio = MockRadio::new();
        let controller = ScanController::new(radio.clone(), SCAN_PERIOD);

        controller.set_scanning(true).await.unwrap();
        tokio::time::sleep(Duration::from_secs(6)).await;

        controller.set_scanning(true).await.unwrap();
        assert_eq!(radio.starts(), 1);

        // 原定时器的触发点已被推迟
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(controller.is_scanning());
        assert_eq!(radio.stops(), 0);

        tokio::time::sleep(SCAN_PERIOD).await;
        assert!(!controller.is_scanning());
        assert_eq!(radio.stops(), 1);
    }

    /// 设备通知原样转发给订阅者
    #[tokio::test(start_paused = true)]
    async fn test_device_notifications_forwarded() {
        let radio = MockRadio::new();
        let controller = ScanController::new(radio.clone(), SCAN_PERIOD);
        let mut events = controller.subscribe();

        controller.set_scanning(true).await.unwrap();
        assert!(matches!(events.recv().await.unwrap(), ScanEvent::Started));

        let observer = radio.observer.lock().unwrap().clone().unwrap();
        observer
            .on_device_found(DiscoveredDevice {
                name: "Pixel 3".to_string(),
                address: "AA:BB:CC:DD:EE:FF".to_string(),
                rssi: Some(-60),
            })
            .await;

        match events.recv().await.unwrap() {
            ScanEvent::Device(device) => {
                assert_eq!(device.name, "Pixel 3");
                assert_eq!(device.address, "AA:BB:CC:DD:EE:FF");
                assert_eq!(device.rssi, Some(-60));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    /// 自动停止的剩余时间随时间递减
    #[tokio::test(start_paused = true)]
    async fn test_auto_stop_deadline_reported() {
        let radio = MockRadio::new();
        let controller = ScanController::new(radio.clone(), SCAN_PERIOD);

        assert!(controller.auto_stop_in().is_none());

        controller.set_scanning(true).await.unwrap();
        let remaining = controller.auto_stop_in().unwrap();
        assert!(remaining <= SCAN_PERIOD);

        tokio::time::sleep(Duration::from_secs(4)).await;
        let remaining = controller.auto_stop_in().unwrap();
        assert!(remaining <= Duration::from_secs(6));
    }
}
