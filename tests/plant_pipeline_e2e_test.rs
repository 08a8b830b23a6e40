// ==========================================
// 电池产线数字孪生 - 全流水线端到端测试
// ==========================================
// 验证: 双电极线并发 → 汇合屏障 → 电芯线串行直到老化;
//       每条产线每道工序恰好完成一次, 汇合前分切绝不启动
// ==========================================

use battery_line_twin::{
    Batch, EventChannel, MachineStatus, PlantConfig, PlantEventKind, PlantSimulation, TwinEvent,
};
use std::sync::{Arc, Mutex};

// ==========================================
// 测试辅助
// ==========================================

type EventLog = Arc<Mutex<Vec<TwinEvent>>>;

fn capture_events(events: &EventChannel) -> EventLog {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let sink_log = log.clone();
    events.subscribe_fn(move |event: &TwinEvent| {
        sink_log.lock().unwrap().push(event.clone());
    });
    log
}

fn completed_processes(log: &[TwinEvent]) -> Vec<String> {
    log.iter()
        .filter_map(|event| match event {
            TwinEvent::Machine(n) if n.status == MachineStatus::Completed => {
                Some(n.process_name.clone())
            }
            _ => None,
        })
        .collect()
}

fn first_index<F: Fn(&TwinEvent) -> bool>(log: &[TwinEvent], predicate: F) -> Option<usize> {
    log.iter().position(predicate)
}

fn machine_event_index(log: &[TwinEvent], process: &str, status: MachineStatus) -> Option<usize> {
    first_index(log, |event| {
        matches!(event, TwinEvent::Machine(n) if n.process_name == process && n.status == status)
    })
}

fn snapshot_count(log: &[TwinEvent], process: &str) -> usize {
    log.iter()
        .filter(|event| matches!(event, TwinEvent::Snapshot(s) if s.process == process))
        .count()
}

async fn run_one_batch() -> Vec<TwinEvent> {
    let events = EventChannel::new();
    let log = capture_events(&events);
    let config = PlantConfig {
        rng_seed: Some(20240811),
        ..PlantConfig::default()
    };
    let mut plant = PlantSimulation::with_config(config, events).unwrap();
    plant.add_batch(Batch::new("e2e-batch-001")).unwrap();
    plant.run_queue().await.unwrap();
    let captured = log.lock().unwrap();
    captured.clone()
}

// ==========================================
// 端到端场景
// ==========================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_full_pipeline_completes_every_stage_exactly_once() {
    let log = run_one_batch().await;

    let mut completed = completed_processes(&log);
    completed.sort();
    let mut expected: Vec<String> = [
        "mixing_anode",
        "coating_anode",
        "drying_anode",
        "calendaring_anode",
        "mixing_cathode",
        "coating_cathode",
        "drying_cathode",
        "calendaring_cathode",
        "slitting_cell",
        "inspection_cell",
        "rewinding_cell",
        "electrolyte_filling_cell",
        "formation_cycling_cell",
        "aging_cell",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    expected.sort();
    // 每条产线每道工序恰好完成一次
    assert_eq!(completed, expected);

    // 批次走完全程
    assert!(first_index(&log, |e| matches!(
        e,
        TwinEvent::Plant(p) if p.kind == PlantEventKind::BatchCompleted
    ))
    .is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_merge_barrier_holds_until_both_calendaring_outputs_exist() {
    let log = run_one_batch().await;

    let anode_done =
        machine_event_index(&log, "calendaring_anode", MachineStatus::Completed).unwrap();
    let cathode_done =
        machine_event_index(&log, "calendaring_cathode", MachineStatus::Completed).unwrap();
    let merged = first_index(&log, |e| {
        matches!(e, TwinEvent::Plant(p) if p.kind == PlantEventKind::BatchAssembled)
    })
    .unwrap();
    let slitting_started =
        machine_event_index(&log, "slitting_cell", MachineStatus::Started).unwrap();

    // 汇合与分切都必须晚于两条电极线的辊压完成
    assert!(merged > anode_done);
    assert!(merged > cathode_done);
    assert!(slitting_started > anode_done);
    assert!(slitting_started > cathode_done);
    assert!(slitting_started > merged);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_step_counts_match_stage_policies() {
    let log = run_one_batch().await;

    // 匀浆 300 步, 干燥 = 驻留时间/步长 = 20 步, 老化 = 10 天 × 24 步
    assert_eq!(snapshot_count(&log, "mixing_anode"), 300);
    assert_eq!(snapshot_count(&log, "mixing_cathode"), 300);
    assert_eq!(snapshot_count(&log, "coating_anode"), 20);
    assert_eq!(snapshot_count(&log, "drying_anode"), 20);
    assert_eq!(snapshot_count(&log, "calendaring_anode"), 10);
    assert_eq!(snapshot_count(&log, "slitting_cell"), 10);
    assert_eq!(snapshot_count(&log, "aging_cell"), 240);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_formation_voltage_is_capped_and_run_ends_early() {
    let log = run_one_batch().await;

    let voltages: Vec<f64> = log
        .iter()
        .filter_map(|event| match event {
            TwinEvent::Snapshot(s) if s.process == "formation_cycling_cell" => {
                s.battery_model["voltage_v"].as_f64()
            }
            _ => None,
        })
        .collect();
    assert!(!voltages.is_empty());
    // 电压始终不超过 4.2 V 上限
    for v in &voltages {
        assert!(*v <= 4.2 + 1e-12);
    }
    // 触顶即提前终止: 快照数少于 200 步的完整时长
    assert!(voltages.len() < 200);
    assert!((voltages.last().unwrap() - 4.2).abs() < 1e-9);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_plant_events_follow_batch_lifecycle_order() {
    let log = run_one_batch().await;

    let order = [
        PlantEventKind::BatchRequested,
        PlantEventKind::BatchStartedProcessing,
        PlantEventKind::BatchAssembled,
        PlantEventKind::BatchStartedCellLine,
        PlantEventKind::BatchCompletedCellLine,
        PlantEventKind::BatchCompleted,
    ];
    let indices: Vec<usize> = order
        .iter()
        .map(|kind| {
            first_index(&log, |e| matches!(e, TwinEvent::Plant(p) if p.kind == *kind))
                .unwrap_or_else(|| panic!("缺少工厂事件 {kind:?}"))
        })
        .collect();
    for pair in indices.windows(2) {
        assert!(pair[0] < pair[1]);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_snapshot_envelope_carries_model_and_parameters() {
    let log = run_one_batch().await;

    let snapshot = log
        .iter()
        .find_map(|event| match event {
            TwinEvent::Snapshot(s) if s.process == "calendaring_anode" => Some(s.clone()),
            _ => None,
        })
        .unwrap();
    // 快照信封: 时长/工序名/模型属性/机台参数齐全
    assert!(snapshot.duration > 0.0);
    assert_eq!(
        snapshot.battery_model["final_thickness"].as_f64().unwrap(),
        100e-6
    );
    assert_eq!(
        snapshot.machine_parameters["roll_gap"].as_f64().unwrap(),
        100e-6
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_seeded_runs_are_reproducible() {
    let first = run_one_batch().await;
    let second = run_one_batch().await;

    let widths = |log: &[TwinEvent]| -> Vec<f64> {
        log.iter()
            .filter_map(|event| match event {
                TwinEvent::Snapshot(s) if s.process == "slitting_cell" => {
                    s.battery_model["anode"]["width_final"].as_f64()
                }
                _ => None,
            })
            .collect()
    };
    assert_eq!(widths(&first), widths(&second));
}
