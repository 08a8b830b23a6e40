// ==========================================
// 电池产线数字孪生 - 工厂编排器
// ==========================================
// 职责: 批次队列管理, 双电极线并发执行与汇合屏障, 电芯线串行执行,
//       以及面向 API 层的控制面 (查询/参数热更新/复位)
// 红线: 汇合屏障是强制的, 两条电极线都产出辊压模型之前,
//       电芯线一步也不会启动
// 策略: 一条线失败时, 另一条线照常跑完, 批次标记失败并跳过汇合,
//       不做自动重试
// ==========================================

use crate::domain::batch::Batch;
use crate::domain::types::{BatchStatus, ElectrodeKind, LineKind, StageKind};
use crate::error::{SimulationError, SimulationResult};
use crate::event::{EventChannel, PlantEventKind};
use crate::machine::{Machine, MachineStatusView};
use crate::model::{BatteryModel, CalendaringModel, ElectrodePair, MixingModel, ProcessModel};
use crate::params::{
    AgingParameters, CalendaringParameters, CoatingParameters, DryingParameters,
    ElectrolyteFillingParameters, FormationCyclingParameters, InspectionParameters,
    MixingParameters, RewindingParameters, SlittingParameters, StageParameters,
};
use crate::plant::line::ProductionLine;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinError;
use tracing::{error, info};

/// 工厂配置
#[derive(Debug, Clone)]
pub struct PlantConfig {
    /// 随机种子; 设定后分切/检测噪声可复现
    pub rng_seed: Option<u64>,
    /// 待处理批次上限
    pub max_pending_batches: usize,
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            rng_seed: None,
            max_pending_batches: 3,
        }
    }
}

/// 工厂整体状态视图 (控制面查询用)
#[derive(Debug, Clone, Serialize)]
pub struct PlantState {
    pub batch_requests: Vec<Value>,
    pub running_batches: Vec<Value>,
    pub machine_statuses: Vec<MachineStatusView>,
}

/// 工厂编排器
///
/// 持有三条产线与批次队列; 每个批次: 负极线与正极线在两个
/// 独立任务上并发执行, 汇合屏障等到双方辊压产物都就绪,
/// 再把汇合对送入电芯线串行跑完。
pub struct PlantSimulation {
    config: PlantConfig,
    events: EventChannel,
    anode_line: Arc<Mutex<ProductionLine>>,
    cathode_line: Arc<Mutex<ProductionLine>>,
    cell_line: Arc<Mutex<ProductionLine>>,
    batch_requests: VecDeque<Batch>,
    running_batches: Vec<Batch>,
    shutdown_tx: watch::Sender<bool>,
}

impl PlantSimulation {
    /// 以默认参数组建工厂
    pub fn new(events: EventChannel) -> SimulationResult<Self> {
        Self::with_config(PlantConfig::default(), events)
    }

    pub fn with_config(config: PlantConfig, events: EventChannel) -> SimulationResult<Self> {
        let (anode, cathode, cell) = Self::build_default_lines(&config, &events)?;
        let (shutdown_tx, _) = watch::channel(false);
        Ok(Self {
            config,
            events,
            anode_line: Arc::new(Mutex::new(anode)),
            cathode_line: Arc::new(Mutex::new(cathode)),
            cell_line: Arc::new(Mutex::new(cell)),
            batch_requests: VecDeque::new(),
            running_batches: Vec::new(),
            shutdown_tx,
        })
    }

    /// 出厂默认参数组建三条产线
    fn build_default_lines(
        config: &PlantConfig,
        events: &EventChannel,
    ) -> SimulationResult<(ProductionLine, ProductionLine, ProductionLine)> {
        let coating = || CoatingParameters::new(0.05, 200e-6, 5e-6, 0.5);
        let drying = || DryingParameters::new(0.05, 1.0, 1.0, 0.01, 30.0, 0.004);
        let calendaring = || CalendaringParameters::new(100e-6, 5e6, 80.0, 0.1, 0.4);

        let mut anode_line = ProductionLine::new(LineKind::Anode, StageKind::electrode_stages());
        let mut cathode_line =
            ProductionLine::new(LineKind::Cathode, StageKind::electrode_stages());
        for (line, ratios) in [
            (&mut anode_line, (0.495, 0.045, 0.05, 0.41)),
            (&mut cathode_line, (0.513, 0.039, 0.098, 0.35)),
        ] {
            let kind = line.line();
            let mixing =
                MixingParameters::new(ratios.0, ratios.1, ratios.2, ratios.3)?;
            line.install(Machine::new(
                kind,
                StageParameters::Mixing(mixing),
                events.clone(),
            )?)?;
            line.install(Machine::new(
                kind,
                StageParameters::Coating(coating()?),
                events.clone(),
            )?)?;
            line.install(Machine::new(
                kind,
                StageParameters::Drying(drying()?),
                events.clone(),
            )?)?;
            line.install(Machine::new(
                kind,
                StageParameters::Calendaring(calendaring()?),
                events.clone(),
            )?)?;
        }

        let mut cell_line = ProductionLine::new(LineKind::Cell, StageKind::cell_stages());
        let cell_params = [
            StageParameters::Slitting(SlittingParameters::new(1.0, 0.1, 0.5, 50.0)?),
            StageParameters::Inspection(InspectionParameters::new(0.1, 10e-6, 2.0, 3)?),
            StageParameters::Rewinding(RewindingParameters::new(0.5, 100.0, 0.3, 30.0)?),
            StageParameters::ElectrolyteFilling(ElectrolyteFillingParameters::new(
                100.0, 60.0, 10.0,
            )?),
            StageParameters::FormationCycling(FormationCyclingParameters::new(
                0.05, 4.2, 1.0, 200,
            )?),
            StageParameters::Aging(AgingParameters::new(1e-8, 25.0, 10.0)?),
        ];
        for params in cell_params {
            let mut machine = Machine::new(LineKind::Cell, params, events.clone())?;
            if let Some(seed) = config.rng_seed {
                machine = machine.with_rng_seed(seed);
            }
            cell_line.install(machine)?;
        }
        Ok((anode_line, cathode_line, cell_line))
    }

    /// 事件通道句柄 (供外部协作方订阅)
    pub fn event_channel(&self) -> EventChannel {
        self.events.clone()
    }

    /// 请求停机; 运行中的产线在步间观察到信号后停止
    pub fn request_shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// 入队一个批次; 超出队列上限则拒绝
    pub fn add_batch(&mut self, batch: Batch) -> SimulationResult<()> {
        if self.batch_requests.len() >= self.config.max_pending_batches {
            return Err(SimulationError::BatchLimitReached {
                limit: self.config.max_pending_batches,
            });
        }
        self.events.emit_plant_event(
            PlantEventKind::BatchRequested,
            json!({ "batch_id": &batch.batch_id }),
        );
        self.batch_requests.push_back(batch);
        Ok(())
    }

    /// 按入队顺序逐批处理队列 (FIFO, 一次一个批次)
    ///
    /// 单个批次失败只标记该批次并继续后续批次;
    /// 失败详情经事件通道与日志对外暴露。
    pub async fn run_queue(&mut self) -> SimulationResult<()> {
        while let Some(batch) = self.batch_requests.pop_front() {
            if *self.shutdown_tx.borrow() {
                info!("停机信号生效, 队列停止处理");
                self.batch_requests.push_front(batch);
                break;
            }
            let batch_id = batch.batch_id.clone();
            if let Err(err) = self.run_pipeline_on_batch(batch).await {
                error!(batch_id = %batch_id, error = %err, "批次处理失败");
            }
        }
        Ok(())
    }

    /// 对单个批次执行完整流水线
    async fn run_pipeline_on_batch(&mut self, mut batch: Batch) -> SimulationResult<()> {
        let batch_id = batch.batch_id.clone();
        info!(batch_id = %batch_id, "批次开始处理");
        self.events.emit_plant_event(
            PlantEventKind::BatchStartedProcessing,
            json!({ "batch_id": &batch_id }),
        );

        // 批次附带的参数包先写入机台
        for o in std::mem::take(&mut batch.overrides) {
            if let Err(err) = self
                .update_machine_parameters(o.line, o.stage, o.parameters)
                .await
            {
                error!(batch_id = %batch_id, error = %err, "参数覆盖失败, 批次拒绝启动");
                self.events.emit_plant_event(
                    PlantEventKind::BatchFailed,
                    json!({ "batch_id": &batch_id, "error": err.to_string() }),
                );
                return Err(err);
            }
        }

        batch.status = BatchStatus::Running;
        self.running_batches.push(batch);

        let shutdown_rx = self.shutdown_tx.subscribe();

        // 双电极线并发: 各自一个阻塞任务, 内部工序串行
        let anode_handle = {
            let line = self.anode_line.clone();
            let rx = shutdown_rx.clone();
            tokio::task::spawn_blocking(move || {
                let mut line = line.blocking_lock();
                line.run(
                    BatteryModel::Mixing(MixingModel::new(ElectrodeKind::Anode)),
                    &rx,
                )
            })
        };
        self.events.emit_plant_event(
            PlantEventKind::BatchStartedAnodeLine,
            json!({ "batch_id": &batch_id }),
        );

        let cathode_handle = {
            let line = self.cathode_line.clone();
            let rx = shutdown_rx.clone();
            tokio::task::spawn_blocking(move || {
                let mut line = line.blocking_lock();
                line.run(
                    BatteryModel::Mixing(MixingModel::new(ElectrodeKind::Cathode)),
                    &rx,
                )
            })
        };
        self.events.emit_plant_event(
            PlantEventKind::BatchStartedCathodeLine,
            json!({ "batch_id": &batch_id }),
        );

        // 汇合屏障: 两条线都结束才继续; 任一失败, 另一条也先跑完
        let mut joined = futures::future::join_all([anode_handle, cathode_handle]).await;
        let cathode_result = Self::flatten_line_result(LineKind::Cathode, joined.pop());
        let anode_result = Self::flatten_line_result(LineKind::Anode, joined.pop());

        // 两个结果都无条件检查: 双线同时失败时, 每条线的失败
        // 都要留痕, 不能只报先检查到的那条
        let mut line_failures: Vec<(LineKind, SimulationError)> = Vec::new();
        let anode_model = match anode_result {
            Ok(model) => {
                self.events.emit_plant_event(
                    PlantEventKind::BatchCompletedAnodeLine,
                    json!({ "batch_id": &batch_id }),
                );
                Some(model)
            }
            Err(err) => {
                line_failures.push((LineKind::Anode, err));
                None
            }
        };
        let cathode_model = match cathode_result {
            Ok(model) => {
                self.events.emit_plant_event(
                    PlantEventKind::BatchCompletedCathodeLine,
                    json!({ "batch_id": &batch_id }),
                );
                Some(model)
            }
            Err(err) => {
                line_failures.push((LineKind::Cathode, err));
                None
            }
        };
        if !line_failures.is_empty() {
            for (line, err) in &line_failures {
                error!(batch_id = %batch_id, line = %line, error = %err, "产线失败, 批次标记失败");
            }
            self.finish_batch(&batch_id, BatchStatus::Failed);
            self.events.emit_plant_event(
                PlantEventKind::BatchFailed,
                json!({
                    "batch_id": &batch_id,
                    "failures": line_failures
                        .iter()
                        .map(|(line, err)| {
                            json!({ "line": line.as_str(), "error": err.to_string() })
                        })
                        .collect::<Vec<_>>(),
                }),
            );
            // 首个失败作为批次的记录原因向上返回
            let (_, first) = line_failures.remove(0);
            return Err(first);
        }

        // 停机观察: 产线可能只跑了一部分, 批次按失败收束, 不进汇合
        if *shutdown_rx.borrow() {
            info!(batch_id = %batch_id, "批次因停机信号中止");
            self.finish_batch(&batch_id, BatchStatus::Failed);
            self.events.emit_plant_event(
                PlantEventKind::BatchFailed,
                json!({ "batch_id": &batch_id, "reason": "shutdown" }),
            );
            return Ok(());
        }

        let anode_cal = Self::expect_calendared(LineKind::Anode, anode_model)?;
        let cathode_cal = Self::expect_calendared(LineKind::Cathode, cathode_model)?;
        self.record_line_model(&batch_id, LineKind::Anode, ProcessModel::properties(&anode_cal));
        self.record_line_model(
            &batch_id,
            LineKind::Cathode,
            ProcessModel::properties(&cathode_cal),
        );

        // 汇合: 双侧辊压产物组成电芯线进料
        let pair = BatteryModel::CalendaredPair(ElectrodePair::new(anode_cal, cathode_cal));
        self.events.emit_plant_event(
            PlantEventKind::BatchAssembled,
            json!({ "batch_id": &batch_id }),
        );

        // 电芯线: 单任务串行跑完分切→老化
        self.events.emit_plant_event(
            PlantEventKind::BatchStartedCellLine,
            json!({ "batch_id": &batch_id }),
        );
        let cell_handle = {
            let line = self.cell_line.clone();
            let rx = shutdown_rx.clone();
            tokio::task::spawn_blocking(move || {
                let mut line = line.blocking_lock();
                line.run(pair, &rx)
            })
        };
        let cell_result = Self::flatten_line_result(LineKind::Cell, Some(cell_handle.await));
        let cell_model = match cell_result {
            Ok(model) => model,
            Err(err) => {
                self.fail_batch(&batch_id, LineKind::Cell, &err);
                return Err(err);
            }
        };
        self.record_line_model(&batch_id, LineKind::Cell, cell_model.properties());
        self.events.emit_plant_event(
            PlantEventKind::BatchCompletedCellLine,
            json!({ "batch_id": &batch_id }),
        );

        self.finish_batch(&batch_id, BatchStatus::Completed);
        self.events.emit_plant_event(
            PlantEventKind::BatchCompleted,
            json!({ "batch_id": &batch_id }),
        );
        info!(batch_id = %batch_id, "批次处理完成");
        Ok(())
    }

    // 把任务结果拍平成产线结果; 任务崩溃按产线失败处理
    fn flatten_line_result(
        line: LineKind,
        joined: Option<Result<SimulationResult<BatteryModel>, JoinError>>,
    ) -> SimulationResult<BatteryModel> {
        match joined {
            Some(Ok(Ok(model))) => Ok(model),
            Some(Ok(Err(err))) => Err(err.into_line_failure(line)),
            Some(Err(join_err)) => Err(SimulationError::Internal(format!(
                "产线任务异常终止: {join_err}"
            ))
            .into_line_failure(line)),
            None => Err(
                SimulationError::Internal("产线任务句柄缺失".to_string()).into_line_failure(line),
            ),
        }
    }

    fn expect_calendared(
        line: LineKind,
        model: Option<BatteryModel>,
    ) -> SimulationResult<CalendaringModel> {
        match model {
            Some(BatteryModel::Calendaring(m)) => Ok(m),
            Some(other) => Err(SimulationError::model_chain(
                line.as_str(),
                format!("电极线产物应为辊压模型, 实际为 {}", other.kind_name()),
            )),
            None => Err(SimulationError::model_chain(line.as_str(), "电极线没有产物")),
        }
    }

    fn record_line_model(&mut self, batch_id: &str, line: LineKind, properties: Value) {
        if let Some(batch) = self
            .running_batches
            .iter_mut()
            .find(|batch| batch.batch_id == batch_id)
        {
            batch.update_line_model(line, properties);
        }
    }

    fn fail_batch(&mut self, batch_id: &str, line: LineKind, err: &SimulationError) {
        error!(batch_id = %batch_id, line = %line, error = %err, "产线失败, 批次标记失败");
        self.finish_batch(batch_id, BatchStatus::Failed);
        self.events.emit_plant_event(
            PlantEventKind::BatchFailed,
            json!({
                "batch_id": batch_id,
                "failures": [{ "line": line.as_str(), "error": err.to_string() }],
            }),
        );
    }

    // 批次离开运行集
    fn finish_batch(&mut self, batch_id: &str, status: BatchStatus) {
        if let Some(index) = self
            .running_batches
            .iter()
            .position(|batch| batch.batch_id == batch_id)
        {
            let mut batch = self.running_batches.remove(index);
            batch.status = status;
        }
    }

    /// 查询单个机台状态; 未知产线/工序组合返回错误
    pub async fn get_machine_status(
        &self,
        line: LineKind,
        stage: StageKind,
    ) -> SimulationResult<MachineStatusView> {
        let guard = self.line_handle(line).lock().await;
        guard
            .machine(stage)
            .map(|machine| machine.status_view())
            .ok_or(SimulationError::UnknownMachine { line, stage })
    }

    /// 工厂整体状态: 排队/运行中批次与全部机台状态
    pub async fn get_current_plant_state(&self) -> PlantState {
        let mut machine_statuses = Vec::new();
        for line in [&self.anode_line, &self.cathode_line, &self.cell_line] {
            machine_statuses.extend(line.lock().await.statuses());
        }
        PlantState {
            batch_requests: self
                .batch_requests
                .iter()
                .map(|batch| batch.state_view())
                .collect(),
            running_batches: self
                .running_batches
                .iter()
                .map(|batch| batch.state_view())
                .collect(),
            machine_statuses,
        }
    }

    /// 参数热更新; 机台运行中或参数非法都会拒绝
    pub async fn update_machine_parameters(
        &self,
        line: LineKind,
        stage: StageKind,
        parameters: StageParameters,
    ) -> SimulationResult<()> {
        let mut guard = self.line_handle(line).lock().await;
        guard
            .machine_mut(stage)
            .ok_or(SimulationError::UnknownMachine { line, stage })?
            .update_parameters(parameters)
    }

    /// 复位工厂: 清空队列, 以默认参数重建全部产线
    pub async fn reset_plant(&mut self) -> SimulationResult<()> {
        let (anode, cathode, cell) = Self::build_default_lines(&self.config, &self.events)?;
        *self.anode_line.lock().await = anode;
        *self.cathode_line.lock().await = cathode;
        *self.cell_line.lock().await = cell;
        self.batch_requests.clear();
        self.running_batches.clear();
        self.shutdown_tx.send_replace(false);
        info!("工厂已复位");
        Ok(())
    }

    fn line_handle(&self, line: LineKind) -> &Arc<Mutex<ProductionLine>> {
        match line {
            LineKind::Anode => &self.anode_line,
            LineKind::Cathode => &self.cathode_line,
            LineKind::Cell => &self.cell_line,
        }
    }
}
