// ==========================================
// 电池产线数字孪生 - 事件通道
// ==========================================
// 职责: 机台与编排器向外广播生命周期/进度/快照的发布订阅边界
// 红线: 事件投递失败只记日志并吞掉, 绝不中断仿真步
// 说明: 显式实例注入, 不做全局单例; 订阅表是唯一跨任务共享结构,
//       subscribe/unsubscribe/emit 全部在锁内串行化
// ==========================================

use crate::domain::types::LineKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::warn;

// ==========================================
// 机台通知状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineStatus {
    Started,
    ComponentMixing,
    Progress,
    Completed,
    Error,
}

impl MachineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineStatus::Started => "started",
            MachineStatus::ComponentMixing => "component_mixing",
            MachineStatus::Progress => "progress",
            MachineStatus::Completed => "completed",
            MachineStatus::Error => "error",
        }
    }
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 机台通知信封 (通知/WebSocket 层消费)
#[derive(Debug, Clone, Serialize)]
pub struct MachineNotification {
    pub machine_id: String,
    pub line_type: LineKind,
    pub process_name: String,
    pub status: MachineStatus,
    pub timestamp: DateTime<Utc>,
    pub data: Value,
}

// ==========================================
// 工厂级事件
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlantEventKind {
    BatchRequested,
    BatchStartedProcessing,
    BatchStartedAnodeLine,
    BatchCompletedAnodeLine,
    BatchStartedCathodeLine,
    BatchCompletedCathodeLine,
    BatchAssembled,
    BatchStartedCellLine,
    BatchCompletedCellLine,
    BatchCompleted,
    BatchFailed,
}

impl PlantEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlantEventKind::BatchRequested => "batch_requested",
            PlantEventKind::BatchStartedProcessing => "batch_started_processing",
            PlantEventKind::BatchStartedAnodeLine => "batch_started_anode_line",
            PlantEventKind::BatchCompletedAnodeLine => "batch_completed_anode_line",
            PlantEventKind::BatchStartedCathodeLine => "batch_started_cathode_line",
            PlantEventKind::BatchCompletedCathodeLine => "batch_completed_cathode_line",
            PlantEventKind::BatchAssembled => "batch_merged",
            PlantEventKind::BatchStartedCellLine => "batch_started_cell_line",
            PlantEventKind::BatchCompletedCellLine => "batch_completed_cell_line",
            PlantEventKind::BatchCompleted => "batch_completed",
            PlantEventKind::BatchFailed => "batch_failed",
        }
    }
}

impl fmt::Display for PlantEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 工厂级事件信封
#[derive(Debug, Clone, Serialize)]
pub struct PlantEvent {
    pub kind: PlantEventKind,
    pub timestamp: DateTime<Utc>,
    pub data: Value,
}

// ==========================================
// 步进快照
// ==========================================

/// 单步快照信封 (持久化层消费)
///
/// 持久化按 `process` 映射到工序各自的表结构,
/// 核心只保证信封形状, 不假设存储形态。
#[derive(Debug, Clone, Serialize)]
pub struct StepSnapshot {
    pub timestamp: DateTime<Utc>,
    /// 已仿真时长 (s)
    pub duration: f64,
    pub process: String,
    pub battery_model: Value,
    pub machine_parameters: Value,
}

// ==========================================
// TwinEvent - 统一事件载体
// ==========================================
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "channel", rename_all = "snake_case")]
pub enum TwinEvent {
    Plant(PlantEvent),
    Machine(MachineNotification),
    Snapshot(StepSnapshot),
}

// ==========================================
// EventSink - 订阅方契约
// ==========================================

/// 事件订阅方
///
/// 投递失败返回错误即可, 通道负责记日志并继续;
/// 订阅方永远无法中断仿真。
pub trait EventSink: Send + Sync {
    fn deliver(&self, event: &TwinEvent) -> Result<(), Box<dyn Error + Send + Sync>>;
}

// 闭包订阅方适配器
struct FnSink<F>(F);

impl<F> EventSink for FnSink<F>
where
    F: Fn(&TwinEvent) + Send + Sync,
{
    fn deliver(&self, event: &TwinEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        (self.0)(event);
        Ok(())
    }
}

/// 订阅凭据, 用于退订
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

// ==========================================
// EventChannel
// ==========================================

struct ChannelInner {
    next_id: u64,
    sinks: Vec<(u64, Box<dyn EventSink>)>,
    streams: Vec<mpsc::UnboundedSender<TwinEvent>>,
}

/// 事件通道
///
/// 可克隆句柄, 全部克隆共享同一份订阅表。
#[derive(Clone)]
pub struct EventChannel {
    inner: Arc<Mutex<ChannelInner>>,
}

impl EventChannel {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ChannelInner {
                next_id: 0,
                sinks: Vec::new(),
                streams: Vec::new(),
            })),
        }
    }

    // 锁中毒时恢复内部数据继续服务
    fn lock(&self) -> MutexGuard<'_, ChannelInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// 注册订阅方
    pub fn subscribe<S: EventSink + 'static>(&self, sink: S) -> SubscriptionId {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.sinks.push((id, Box::new(sink)));
        SubscriptionId(id)
    }

    /// 以闭包注册订阅方 (闭包投递视为总是成功)
    pub fn subscribe_fn<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(&TwinEvent) + Send + Sync + 'static,
    {
        self.subscribe(FnSink(f))
    }

    /// 退订; 未知凭据静默忽略
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut inner = self.lock();
        inner.sinks.retain(|(sink_id, _)| *sink_id != id.0);
    }

    /// 为异步消费方 (如 WebSocket 转发层) 开一条事件流
    ///
    /// 接收端被丢弃后, 对应发送端在下次 emit 时自动清理。
    pub fn attach_stream(&self) -> mpsc::UnboundedReceiver<TwinEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().streams.push(tx);
        rx
    }

    /// 广播一个事件
    pub fn emit(&self, event: TwinEvent) {
        let mut inner = self.lock();
        for (id, sink) in &inner.sinks {
            if let Err(err) = sink.deliver(&event) {
                warn!(subscription_id = *id, error = %err, "事件投递失败, 已忽略");
            }
        }
        inner
            .streams
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// 广播工厂级事件
    pub fn emit_plant_event(&self, kind: PlantEventKind, data: Value) {
        self.emit(TwinEvent::Plant(PlantEvent {
            kind,
            timestamp: Utc::now(),
            data,
        }));
    }

    /// 广播机台通知
    pub fn emit_machine_notification(
        &self,
        machine_id: &str,
        line_type: LineKind,
        process_name: &str,
        status: MachineStatus,
        data: Value,
    ) {
        self.emit(TwinEvent::Machine(MachineNotification {
            machine_id: machine_id.to_string(),
            line_type,
            process_name: process_name.to_string(),
            status,
            timestamp: Utc::now(),
            data,
        }));
    }

    /// 广播单步快照
    pub fn emit_snapshot(&self, snapshot: StepSnapshot) {
        self.emit(TwinEvent::Snapshot(snapshot));
    }

    /// 当前订阅方数量 (诊断用)
    pub fn subscriber_count(&self) -> usize {
        self.lock().sinks.len()
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_sink(counter: Arc<AtomicUsize>) -> impl EventSink {
        FnSink(move |_event: &TwinEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_subscribe_and_emit_delivers_to_all_sinks() {
        let channel = EventChannel::new();
        let counter = Arc::new(AtomicUsize::new(0));
        channel.subscribe(counting_sink(counter.clone()));
        channel.subscribe(counting_sink(counter.clone()));
        channel.emit_plant_event(PlantEventKind::BatchRequested, json!({"batch_id": "B-1"}));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let channel = EventChannel::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let id = channel.subscribe(counting_sink(counter.clone()));
        channel.unsubscribe(id);
        channel.emit_plant_event(PlantEventKind::BatchCompleted, json!({}));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[test]
    fn test_failing_sink_never_blocks_other_sinks() {
        struct FailingSink;
        impl EventSink for FailingSink {
            fn deliver(
                &self,
                _event: &TwinEvent,
            ) -> Result<(), Box<dyn Error + Send + Sync>> {
                Err("连接已断开".into())
            }
        }

        let channel = EventChannel::new();
        let counter = Arc::new(AtomicUsize::new(0));
        channel.subscribe(FailingSink);
        channel.subscribe(counting_sink(counter.clone()));
        channel.emit_plant_event(PlantEventKind::BatchFailed, json!({}));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attach_stream_receives_events() {
        let channel = EventChannel::new();
        let mut rx = channel.attach_stream();
        channel.emit_plant_event(PlantEventKind::BatchRequested, json!({"batch_id": "B-2"}));
        let event = rx.recv().await.expect("应收到事件");
        match event {
            TwinEvent::Plant(plant) => {
                assert_eq!(plant.kind, PlantEventKind::BatchRequested)
            }
            other => panic!("意外的事件类型: {other:?}"),
        }
    }

    #[test]
    fn test_dropped_stream_is_pruned_on_emit() {
        let channel = EventChannel::new();
        let rx = channel.attach_stream();
        drop(rx);
        // 不 panic 即可, 发送端在 emit 时被清理
        channel.emit_plant_event(PlantEventKind::BatchCompleted, json!({}));
        channel.emit_plant_event(PlantEventKind::BatchCompleted, json!({}));
    }

    #[test]
    fn test_machine_notification_envelope_shape() {
        let channel = EventChannel::new();
        let captured: Arc<Mutex<Vec<TwinEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink_events = captured.clone();
        channel.subscribe_fn(move |event: &TwinEvent| {
            sink_events.lock().unwrap().push(event.clone());
        });
        channel.emit_machine_notification(
            "m-1",
            LineKind::Anode,
            "mixing_anode",
            MachineStatus::Started,
            json!({"total_steps": 300}),
        );
        let events = captured.lock().unwrap();
        let value = serde_json::to_value(&events[0]).unwrap();
        assert_eq!(value["machine_id"], "m-1");
        assert_eq!(value["line_type"], "anode");
        assert_eq!(value["process_name"], "mixing_anode");
        assert_eq!(value["status"], "started");
        assert_eq!(value["data"]["total_steps"], 300);
    }
}
