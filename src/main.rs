// ==========================================
// 电池产线数字孪生 - 演示入口
// ==========================================
// 用途: 组建默认工厂, 投入一个批次, 跑完整条流水线,
//       经事件订阅打印关键进度
// 说明: 节拍/延时只是演示关注点, 步数才是权威进度单位
// ==========================================

use battery_line_twin::{
    Batch, EventChannel, MachineStatus, PlantSimulation, TwinEvent, VERSION,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    battery_line_twin::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", battery_line_twin::APP_NAME);
    tracing::info!("系统版本: {}", VERSION);
    tracing::info!("==================================================");

    let events = EventChannel::new();

    // 订阅工厂事件与机台完成通知, 打印关键进度
    events.subscribe_fn(|event: &TwinEvent| match event {
        TwinEvent::Plant(plant) => {
            tracing::info!(
                kind = plant.kind.as_str(),
                data = %plant.data,
                "工厂事件"
            );
        }
        TwinEvent::Machine(notification) => {
            if matches!(
                notification.status,
                MachineStatus::Started | MachineStatus::Completed | MachineStatus::Error
            ) {
                tracing::info!(
                    process = %notification.process_name,
                    status = notification.status.as_str(),
                    data = %notification.data,
                    "机台通知"
                );
            }
        }
        // 快照流量大, 演示时只记数不打印
        TwinEvent::Snapshot(_) => {}
    });

    let mut plant = PlantSimulation::new(events)?;
    plant.add_batch(Batch::new("demo-batch-001"))?;
    plant.run_queue().await?;

    let state = plant.get_current_plant_state().await;
    tracing::info!(
        machines = state.machine_statuses.len(),
        pending = state.batch_requests.len(),
        "流水线结束"
    );
    Ok(())
}
