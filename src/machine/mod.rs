// ==========================================
// 电池产线数字孪生 - 机台状态机
// ==========================================
// 职责: 绑定一份工序模型与一组已校验参数, 提供
//       开关机生命周期 / 步数策略 / 统一步进循环 / 统一快照
// 红线: run() 前必须先接收上游模型 (模型链契约);
//       total_steps 在循环开始前一次性计算, 是参数的纯函数
// 说明: 停机信号在步间检查, 进行中的单步总是完整执行
// ==========================================

use crate::domain::types::{LineKind, MachineState, StageKind};
use crate::error::{SimulationError, SimulationResult};
use crate::event::{EventChannel, MachineStatus, StepSnapshot};
use crate::model::{
    mixing::TOTAL_MIXING_STEPS, AgingModel, BatteryModel, CalendaringModel, CoatingModel,
    DryingModel, ElectrodePair, ElectrolyteFillingModel, FormationCyclingModel, InspectionModel,
    MixingModel, RewindingModel, SlittingModel,
};
use crate::params::StageParameters;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

// 默认时间步长 (s); 老化工序 1 步 = 1 小时
const DEFAULT_TIME_STEP_S: f64 = 1.0;
const AGING_TIME_STEP_S: f64 = 3600.0;
// 多数工序的固定步数
const DEFAULT_STAGE_STEPS: u32 = 10;
// 涂布工序步数
const COATING_STEPS: u32 = 20;
// 老化步距 (1 步 = 1 小时)
const HOURS_PER_DAY: f64 = 24.0;
// 进度事件分段数
const PROGRESS_SEGMENTS: u32 = 10;

/// 机台状态视图 (控制面查询用)
#[derive(Debug, Clone, Serialize)]
pub struct MachineStatusView {
    pub machine_id: String,
    pub line_type: LineKind,
    pub process_name: String,
    pub stage: StageKind,
    pub state: MachineState,
    pub elapsed_secs: f64,
    pub total_steps: u32,
    pub battery_model: Option<Value>,
}

/// 步进循环的结束方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunOutcome {
    /// 完整执行了全部步数
    Completed { steps: u32 },
    /// 达到工序自身的提前终止条件 (如化成电压触顶)
    EarlyExit { at_step: u32 },
    /// 停机信号在步间被观察到
    Cancelled { at_step: u32 },
}

/// 工序机台
///
/// 独占持有一份工序模型与一组参数; OFF → ON → OFF,
/// run() 正常结束或提前退出后回到 OFF 并清零已仿真时长。
pub struct Machine {
    id: String,
    process_name: String,
    line: LineKind,
    stage: StageKind,
    state: MachineState,
    elapsed_secs: f64,
    total_steps: u32,
    parameters: StageParameters,
    model: Option<BatteryModel>,
    events: EventChannel,
    rng_seed: Option<u64>,
    started_at: Option<DateTime<Utc>>,
}

impl Machine {
    /// 创建机台; 参数会再次过一遍工序校验规则
    pub fn new(
        line: LineKind,
        parameters: StageParameters,
        events: EventChannel,
    ) -> SimulationResult<Self> {
        parameters.validate()?;
        let stage = parameters.stage();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            process_name: format!("{}_{}", stage.as_str(), line.as_str()),
            line,
            stage,
            state: MachineState::Off,
            elapsed_secs: 0.0,
            total_steps: 0,
            parameters,
            model: None,
            events,
            rng_seed: None,
            started_at: None,
        })
    }

    /// 注入随机种子 (分切/检测噪声可复现)
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    pub fn line(&self) -> LineKind {
        self.line
    }

    pub fn stage(&self) -> StageKind {
        self.stage
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    pub fn parameters(&self) -> &StageParameters {
        &self.parameters
    }

    /// 是否已接收上游模型
    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// 热更新参数; 运行中的机台拒绝更新
    pub fn update_parameters(&mut self, parameters: StageParameters) -> SimulationResult<()> {
        if self.state == MachineState::On {
            return Err(SimulationError::MachineBusy {
                process: self.process_name.clone(),
            });
        }
        if parameters.stage() != self.stage {
            return Err(SimulationError::validation(
                "stage",
                format!(
                    "参数工序 {} 与机台工序 {} 不一致",
                    parameters.stage(),
                    self.stage
                ),
            ));
        }
        parameters.validate()?;
        self.parameters = parameters;
        Ok(())
    }

    /// 接收上游工序移交的模型 (工序 2..N 唯一合法的建模途径)
    ///
    /// 本工序模型从前驱模型复制所需字段构造, 前驱随即被丢弃。
    pub fn receive_model_from_previous_process(
        &mut self,
        previous: BatteryModel,
    ) -> SimulationResult<()> {
        let model = match (self.stage, previous) {
            // 匀浆是首道工序, 直接装入空浆料罐
            (StageKind::Mixing, BatteryModel::Mixing(m)) => BatteryModel::Mixing(m),
            (StageKind::Coating, BatteryModel::Mixing(m)) => {
                BatteryModel::Coating(CoatingModel::from_mixing(&m))
            }
            (StageKind::Drying, BatteryModel::Coating(m)) => {
                BatteryModel::Drying(DryingModel::from_coating(&m))
            }
            (StageKind::Calendaring, BatteryModel::Drying(m)) => {
                let initial_porosity = match &self.parameters {
                    StageParameters::Calendaring(p) => p.initial_porosity,
                    _ => {
                        return Err(SimulationError::Internal(format!(
                            "机台 {} 持有非辊压参数",
                            self.process_name
                        )))
                    }
                };
                BatteryModel::Calendaring(CalendaringModel::from_drying(&m, initial_porosity))
            }
            // 电芯线进料: 两条电极线辊压产物的汇合对
            (StageKind::Slitting, BatteryModel::CalendaredPair(pair)) => {
                BatteryModel::Slitting(ElectrodePair::new(
                    SlittingModel::from_calendaring(&pair.anode, self.side_seed(0)),
                    SlittingModel::from_calendaring(&pair.cathode, self.side_seed(1)),
                ))
            }
            (StageKind::Inspection, BatteryModel::Slitting(pair)) => {
                BatteryModel::Inspection(ElectrodePair::new(
                    InspectionModel::from_slitting(&pair.anode, self.side_seed(2)),
                    InspectionModel::from_slitting(&pair.cathode, self.side_seed(3)),
                ))
            }
            (StageKind::Rewinding, BatteryModel::Inspection(pair)) => {
                BatteryModel::Rewinding(RewindingModel::from_inspection_pair(&pair))
            }
            (StageKind::ElectrolyteFilling, BatteryModel::Rewinding(m)) => {
                BatteryModel::ElectrolyteFilling(ElectrolyteFillingModel::from_rewinding(&m))
            }
            (StageKind::FormationCycling, BatteryModel::ElectrolyteFilling(m)) => {
                BatteryModel::FormationCycling(FormationCyclingModel::from_filling(&m))
            }
            (StageKind::Aging, BatteryModel::FormationCycling(m)) => {
                BatteryModel::Aging(AgingModel::from_formation(&m))
            }
            (stage, previous) => {
                return Err(SimulationError::model_chain(
                    &self.process_name,
                    format!(
                        "工序 {} 收到的上游模型种类为 {}",
                        stage,
                        previous.kind_name()
                    ),
                ))
            }
        };
        self.model = Some(model);
        Ok(())
    }

    // 同一机台内双侧模型的派生种子
    fn side_seed(&self, offset: u64) -> Option<u64> {
        self.rng_seed.map(|seed| seed.wrapping_add(offset))
    }

    /// 步数策略: 参数的纯函数, 循环开始前一次性计算
    pub fn calculate_total_steps(&self) -> u32 {
        match &self.parameters {
            StageParameters::Mixing(_) => TOTAL_MIXING_STEPS,
            StageParameters::Coating(_) => COATING_STEPS,
            // 驻留时间 = 干燥段长度 / 走带速度
            StageParameters::Drying(p) => {
                let residence_time = p.drying_length / p.web_speed;
                ((residence_time / DEFAULT_TIME_STEP_S).floor() as u32).max(1)
            }
            StageParameters::Calendaring(_)
            | StageParameters::Slitting(_)
            | StageParameters::Inspection(_)
            | StageParameters::Rewinding(_)
            | StageParameters::ElectrolyteFilling(_) => DEFAULT_STAGE_STEPS,
            // ceil(时长/步长); 电压触顶仍可提前终止
            StageParameters::FormationCycling(p) => {
                (p.formation_duration_s as f64 / DEFAULT_TIME_STEP_S).ceil() as u32
            }
            // 1 步 = 1 小时
            StageParameters::Aging(p) => {
                ((p.aging_time_days * HOURS_PER_DAY).floor() as u32).max(1)
            }
        }
    }

    /// 单步对应的仿真秒数
    fn time_step_secs(&self) -> f64 {
        match self.stage {
            StageKind::Aging => AGING_TIME_STEP_S,
            _ => DEFAULT_TIME_STEP_S,
        }
    }

    /// 开机
    pub fn turn_on(&mut self) {
        self.state = MachineState::On;
        self.started_at = Some(Utc::now());
        debug!(process = %self.process_name, "机台开机");
    }

    /// 关机并清零已仿真时长
    pub fn turn_off(&mut self) {
        self.state = MachineState::Off;
        self.elapsed_secs = 0.0;
        debug!(process = %self.process_name, "机台关机");
    }

    /// 执行本工序的完整步进循环
    ///
    /// 恰好迭代 `total_steps` 步 (提前终止条件或停机信号除外),
    /// 每步推进模型、捕获快照并经事件通道广播。
    pub fn run(&mut self, shutdown: &watch::Receiver<bool>) -> SimulationResult<()> {
        let mut model = self.model.take().ok_or_else(|| {
            SimulationError::model_chain(&self.process_name, "尚未接收上游模型, 无法运行")
        })?;

        self.total_steps = self.calculate_total_steps();
        self.turn_on();
        self.events.emit_machine_notification(
            &self.id,
            self.line,
            &self.process_name,
            MachineStatus::Started,
            json!({ "total_steps": self.total_steps }),
        );

        let result = self.run_steps(&mut model, shutdown);
        // 模型归还机台, 等待下游取走
        self.model = Some(model);

        match result {
            Ok(outcome) => {
                let final_duration = self.elapsed_secs;
                if let RunOutcome::Completed { steps } | RunOutcome::EarlyExit { at_step: steps } =
                    outcome
                {
                    self.events.emit_machine_notification(
                        &self.id,
                        self.line,
                        &self.process_name,
                        MachineStatus::Completed,
                        json!({
                            "steps_executed": steps,
                            "total_steps": self.total_steps,
                            "duration": final_duration,
                            "early_exit": matches!(outcome, RunOutcome::EarlyExit { .. }),
                        }),
                    );
                }
                if let RunOutcome::Cancelled { at_step } = outcome {
                    info!(
                        process = %self.process_name,
                        at_step,
                        "停机信号生效, 本工序提前停止"
                    );
                }
                self.turn_off();
                Ok(())
            }
            Err(err) => {
                self.events.emit_machine_notification(
                    &self.id,
                    self.line,
                    &self.process_name,
                    MachineStatus::Error,
                    json!({ "message": err.to_string() }),
                );
                self.turn_off();
                Err(err)
            }
        }
    }

    fn run_steps(
        &mut self,
        model: &mut BatteryModel,
        shutdown: &watch::Receiver<bool>,
    ) -> SimulationResult<RunOutcome> {
        let time_step = self.time_step_secs();
        let progress_interval = (self.total_steps / PROGRESS_SEGMENTS).max(1);
        let started_at = self.started_at.unwrap_or_else(Utc::now);

        for t in 0..self.total_steps {
            // 停机只发生在步间, 单步不可抢占
            if *shutdown.borrow() {
                return Ok(RunOutcome::Cancelled { at_step: t });
            }

            self.emit_component_boundary(t);

            model.update_properties(&self.parameters, t)?;
            self.elapsed_secs = (t + 1) as f64 * time_step;

            self.events.emit_snapshot(StepSnapshot {
                timestamp: started_at + Duration::milliseconds((self.elapsed_secs * 1e3) as i64),
                duration: self.elapsed_secs,
                process: self.process_name.clone(),
                battery_model: model.properties(),
                machine_parameters: self.parameters.to_value(),
            });

            if (t + 1) % progress_interval == 0 || t + 1 == self.total_steps {
                self.events.emit_machine_notification(
                    &self.id,
                    self.line,
                    &self.process_name,
                    MachineStatus::Progress,
                    json!({
                        "step": t + 1,
                        "total_steps": self.total_steps,
                        "progress_percent": (t + 1) as f64 / self.total_steps as f64 * 100.0,
                    }),
                );
            }

            // 化成: 电压触顶即提前终止本工序
            if let (BatteryModel::FormationCycling(m), StageParameters::FormationCycling(p)) =
                (&*model, &self.parameters)
            {
                if m.voltage_limit_reached(p) {
                    info!(
                        process = %self.process_name,
                        at_step = t + 1,
                        voltage = m.voltage(),
                        "电压达到上限, 化成提前结束"
                    );
                    return Ok(RunOutcome::EarlyExit { at_step: t + 1 });
                }
            }
        }
        Ok(RunOutcome::Completed {
            steps: self.total_steps,
        })
    }

    // 匀浆投料相位边界事件
    fn emit_component_boundary(&self, t: u32) {
        if self.stage != StageKind::Mixing {
            return;
        }
        let boundary = match MixingModel::component_for_step(t) {
            Some(component) if t % crate::model::mixing::STEPS_PER_COMPONENT == 0 => {
                Some(component)
            }
            _ => None,
        };
        if let Some(component) = boundary {
            self.events.emit_machine_notification(
                &self.id,
                self.line,
                &self.process_name,
                MachineStatus::ComponentMixing,
                json!({
                    "component": component.as_str(),
                    "step": t,
                    // 溶剂在第 0 步整罐打底
                    "solvent_charged": t == 0,
                }),
            );
        }
    }

    /// 取走本工序完成的模型, 移交给下游机台
    pub fn take_model(&mut self) -> SimulationResult<BatteryModel> {
        self.model.take().ok_or_else(|| {
            SimulationError::model_chain(&self.process_name, "机台当前不持有模型")
        })
    }

    /// 当前状态视图
    pub fn status_view(&self) -> MachineStatusView {
        MachineStatusView {
            machine_id: self.id.clone(),
            line_type: self.line,
            process_name: self.process_name.clone(),
            stage: self.stage,
            state: self.state,
            elapsed_secs: self.elapsed_secs,
            total_steps: self.total_steps,
            battery_model: self.model.as_ref().map(|m| m.properties()),
        }
    }
}
