// ==========================================
// 电池产线数字孪生 - 控制面集成测试
// ==========================================
// 验证: 批次队列上限 / 机台状态查询 / 参数热更新 / 工厂复位
// ==========================================

use battery_line_twin::{
    AgingParameters, Batch, BatchStatus, EventChannel, LineKind, MachineState, MixingParameters,
    PlantSimulation, SimulationError, StageKind, StageParameters,
};

#[tokio::test]
async fn test_batch_queue_rejects_beyond_limit() {
    let mut plant = PlantSimulation::new(EventChannel::new()).unwrap();
    for i in 0..3 {
        plant.add_batch(Batch::new(format!("B-{i}"))).unwrap();
    }
    let err = plant.add_batch(Batch::new("B-3")).unwrap_err();
    assert!(matches!(err, SimulationError::BatchLimitReached { limit: 3 }));
}

#[tokio::test]
async fn test_plant_state_lists_all_machines_idle_before_start() {
    let plant = PlantSimulation::new(EventChannel::new()).unwrap();
    let state = plant.get_current_plant_state().await;
    // 负极 4 + 正极 4 + 电芯 6
    assert_eq!(state.machine_statuses.len(), 14);
    for machine in &state.machine_statuses {
        assert_eq!(machine.state, MachineState::Off);
        assert_eq!(machine.elapsed_secs, 0.0);
    }
}

#[tokio::test]
async fn test_machine_status_query_by_line_and_stage() {
    let plant = PlantSimulation::new(EventChannel::new()).unwrap();
    let view = plant
        .get_machine_status(LineKind::Cathode, StageKind::Mixing)
        .await
        .unwrap();
    assert_eq!(view.process_name, "mixing_cathode");
    assert_eq!(view.line_type, LineKind::Cathode);

    let err = plant
        .get_machine_status(LineKind::Cell, StageKind::Coating)
        .await
        .unwrap_err();
    assert!(matches!(err, SimulationError::UnknownMachine { .. }));
}

#[tokio::test]
async fn test_update_machine_parameters_validates_before_swap() {
    let plant = PlantSimulation::new(EventChannel::new()).unwrap();

    // 合法参数被接受
    let good = StageParameters::Aging(AgingParameters::new(5e-8, 30.0, 2.0).unwrap());
    plant
        .update_machine_parameters(LineKind::Cell, StageKind::Aging, good)
        .await
        .unwrap();

    // 工序不匹配被拒绝
    let mismatched =
        StageParameters::Mixing(MixingParameters::new(0.5, 0.1, 0.15, 0.25).unwrap());
    let err = plant
        .update_machine_parameters(LineKind::Cell, StageKind::Aging, mismatched)
        .await
        .unwrap_err();
    assert!(matches!(err, SimulationError::Validation { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parameter_override_bundle_applies_before_run() {
    let events = EventChannel::new();
    let mut plant = PlantSimulation::new(events).unwrap();
    // 批次附带参数包: 缩短老化时长到 1 天
    let batch = Batch::new("B-override").with_override(
        LineKind::Cell,
        StageKind::Aging,
        StageParameters::Aging(AgingParameters::new(1e-8, 25.0, 1.0).unwrap()),
    );
    plant.add_batch(batch).unwrap();
    plant.run_queue().await.unwrap();

    let view = plant
        .get_machine_status(LineKind::Cell, StageKind::Aging)
        .await
        .unwrap();
    // 1 天 → 24 步
    assert_eq!(view.total_steps, 24);
}

#[tokio::test]
async fn test_reset_plant_restores_defaults_and_clears_queue() {
    let mut plant = PlantSimulation::new(EventChannel::new()).unwrap();
    plant.add_batch(Batch::new("B-stale")).unwrap();
    let tweaked = StageParameters::Aging(AgingParameters::new(9e-8, 45.0, 1.0).unwrap());
    plant
        .update_machine_parameters(LineKind::Cell, StageKind::Aging, tweaked)
        .await
        .unwrap();

    plant.reset_plant().await.unwrap();

    let state = plant.get_current_plant_state().await;
    assert!(state.batch_requests.is_empty());
    assert_eq!(state.machine_statuses.len(), 14);

    // 新入队的批次仍是 QUEUED 状态
    plant.add_batch(Batch::new("B-fresh")).unwrap();
    let state = plant.get_current_plant_state().await;
    assert_eq!(state.batch_requests.len(), 1);
    assert_eq!(state.batch_requests[0]["status"], BatchStatus::Queued.as_str());
}
