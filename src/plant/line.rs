// ==========================================
// 电池产线数字孪生 - 产线
// ==========================================
// 职责: 固定顺序的工位序列与工序间模型移交
// 红线: 工序严格按声明顺序执行, 前驱模型定稿后才移交下游;
//       只有显式未配置的工位才会被跳过, 不做依赖图推导
// ==========================================

use crate::domain::types::{LineKind, StageKind};
use crate::error::{SimulationError, SimulationResult};
use crate::machine::{Machine, MachineStatusView};
use crate::model::BatteryModel;
use tokio::sync::watch;
use tracing::{debug, info};

/// 产线工位: 工序名到机台的有序映射项 (机台可未配置)
struct LineSlot {
    stage: StageKind,
    machine: Option<Machine>,
}

/// 产线: 一条物理产线的有序机台序列
pub struct ProductionLine {
    line: LineKind,
    slots: Vec<LineSlot>,
}

impl ProductionLine {
    /// 按声明的工序顺序创建产线, 所有工位初始未配置
    pub fn new(line: LineKind, stages: &[StageKind]) -> Self {
        Self {
            line,
            slots: stages
                .iter()
                .map(|&stage| LineSlot {
                    stage,
                    machine: None,
                })
                .collect(),
        }
    }

    pub fn line(&self) -> LineKind {
        self.line
    }

    /// 将机台装入对应工位
    pub fn install(&mut self, machine: Machine) -> SimulationResult<()> {
        if machine.line() != self.line {
            return Err(SimulationError::Internal(format!(
                "机台 {} 不属于产线 {}",
                machine.process_name(),
                self.line
            )));
        }
        let stage = machine.stage();
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.stage == stage)
            .ok_or(SimulationError::UnknownMachine {
                line: self.line,
                stage,
            })?;
        slot.machine = Some(machine);
        Ok(())
    }

    pub fn machine(&self, stage: StageKind) -> Option<&Machine> {
        self.slots
            .iter()
            .find(|slot| slot.stage == stage)
            .and_then(|slot| slot.machine.as_ref())
    }

    pub fn machine_mut(&mut self, stage: StageKind) -> Option<&mut Machine> {
        self.slots
            .iter_mut()
            .find(|slot| slot.stage == stage)
            .and_then(|slot| slot.machine.as_mut())
    }

    /// 全部已配置机台的状态视图, 按产线顺序
    pub fn statuses(&self) -> Vec<MachineStatusView> {
        self.slots
            .iter()
            .filter_map(|slot| slot.machine.as_ref())
            .map(|machine| machine.status_view())
            .collect()
    }

    /// 依次运行产线上的全部机台
    ///
    /// 进料模型交给首个已配置工位; 每道工序结束后取出模型
    /// 移交下一工位; 返回末道工序的产物模型。
    /// 停机信号在工序间也会被检查, 不再启动后续工序。
    pub fn run(
        &mut self,
        feed: BatteryModel,
        shutdown: &watch::Receiver<bool>,
    ) -> SimulationResult<BatteryModel> {
        info!(line = %self.line, "产线开始运行");
        let mut model = feed;
        for slot in &mut self.slots {
            let Some(machine) = slot.machine.as_mut() else {
                debug!(line = %self.line, stage = %slot.stage, "工位未配置, 跳过");
                continue;
            };
            if *shutdown.borrow() {
                info!(line = %self.line, stage = %slot.stage, "停机信号生效, 产线提前停止");
                break;
            }
            machine.receive_model_from_previous_process(model)?;
            machine.run(shutdown)?;
            model = machine.take_model()?;
        }
        info!(line = %self.line, "产线运行结束");
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ElectrodeKind;
    use crate::event::EventChannel;
    use crate::model::MixingModel;
    use crate::params::{
        CalendaringParameters, CoatingParameters, DryingParameters, MixingParameters,
        StageParameters,
    };

    fn no_shutdown() -> watch::Receiver<bool> {
        let (tx, rx) = watch::channel(false);
        std::mem::forget(tx);
        rx
    }

    fn electrode_line(events: &EventChannel) -> ProductionLine {
        let mut line = ProductionLine::new(LineKind::Anode, StageKind::electrode_stages());
        let machines = [
            StageParameters::Mixing(MixingParameters::new(0.495, 0.045, 0.05, 0.41).unwrap()),
            StageParameters::Coating(CoatingParameters::new(0.05, 200e-6, 5e-6, 0.5).unwrap()),
            StageParameters::Drying(
                DryingParameters::new(0.05, 1.0, 1.0, 0.01, 30.0, 0.004).unwrap(),
            ),
            StageParameters::Calendaring(
                CalendaringParameters::new(100e-6, 5e6, 80.0, 0.1, 0.4).unwrap(),
            ),
        ];
        for params in machines {
            line.install(Machine::new(LineKind::Anode, params, events.clone()).unwrap())
                .unwrap();
        }
        line
    }

    #[test]
    fn test_line_runs_stages_in_declared_order_and_yields_final_model() {
        let events = EventChannel::new();
        let mut line = electrode_line(&events);
        let feed = BatteryModel::Mixing(MixingModel::new(ElectrodeKind::Anode));
        let product = line.run(feed, &no_shutdown()).unwrap();
        assert!(matches!(product, BatteryModel::Calendaring(_)));
        // 辊压产物的最终厚度等于辊缝
        assert_eq!(
            product.properties()["final_thickness"].as_f64().unwrap(),
            100e-6
        );
    }

    #[test]
    fn test_unpopulated_slot_is_skipped() {
        let events = EventChannel::new();
        let mut line = ProductionLine::new(LineKind::Anode, StageKind::electrode_stages());
        // 只装匀浆机台, 其余工位留空
        line.install(
            Machine::new(
                LineKind::Anode,
                StageParameters::Mixing(MixingParameters::new(0.495, 0.045, 0.05, 0.41).unwrap()),
                events.clone(),
            )
            .unwrap(),
        )
        .unwrap();
        let feed = BatteryModel::Mixing(MixingModel::new(ElectrodeKind::Anode));
        let product = line.run(feed, &no_shutdown()).unwrap();
        // 后续工位未配置, 产物仍是匀浆模型
        assert!(matches!(product, BatteryModel::Mixing(_)));
    }

    #[test]
    fn test_broken_chain_surfaces_model_chain_error() {
        let events = EventChannel::new();
        let mut line = ProductionLine::new(LineKind::Anode, StageKind::electrode_stages());
        // 缺少涂布工位: 匀浆产物直接送进干燥, 模型链断裂
        line.install(
            Machine::new(
                LineKind::Anode,
                StageParameters::Mixing(MixingParameters::new(0.495, 0.045, 0.05, 0.41).unwrap()),
                events.clone(),
            )
            .unwrap(),
        )
        .unwrap();
        line.install(
            Machine::new(
                LineKind::Anode,
                StageParameters::Drying(
                    DryingParameters::new(0.05, 1.0, 1.0, 0.01, 30.0, 0.004).unwrap(),
                ),
                events.clone(),
            )
            .unwrap(),
        )
        .unwrap();
        let feed = BatteryModel::Mixing(MixingModel::new(ElectrodeKind::Anode));
        let err = line.run(feed, &no_shutdown()).unwrap_err();
        assert!(matches!(err, SimulationError::ModelChain { .. }));
    }

    #[test]
    fn test_install_rejects_machine_from_other_line() {
        let events = EventChannel::new();
        let mut line = ProductionLine::new(LineKind::Anode, StageKind::electrode_stages());
        let machine = Machine::new(
            LineKind::Cathode,
            StageParameters::Mixing(MixingParameters::new(0.495, 0.045, 0.05, 0.41).unwrap()),
            events,
        )
        .unwrap();
        assert!(line.install(machine).is_err());
    }

    #[test]
    fn test_install_rejects_stage_not_on_line() {
        let events = EventChannel::new();
        let mut line = ProductionLine::new(LineKind::Cell, StageKind::cell_stages());
        let machine = Machine::new(
            LineKind::Cell,
            StageParameters::Mixing(MixingParameters::new(0.495, 0.045, 0.05, 0.41).unwrap()),
            events,
        )
        .unwrap();
        let err = line.install(machine).unwrap_err();
        assert!(matches!(err, SimulationError::UnknownMachine { .. }));
    }
}
