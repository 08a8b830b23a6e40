// ==========================================
// 电池产线数字孪生 - 核心库
// ==========================================
// 技术栈: Rust + tokio
// 系统定位: 电极制造产线的时间步进仿真引擎
// 范围: 工序物理模型 / 机台状态机 / 产线编排 / 事件通道;
//       HTTP/WebSocket、持久化、IoT 转发均为外部协作方, 只消费
//       本库暴露的事件流/快照流/控制面
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 类型与批次实体
pub mod domain;

// 参数层 - 工序参数与校验
pub mod params;

// 模型层 - 工序物理模型
pub mod model;

// 机台层 - 工序状态机
pub mod machine;

// 工厂层 - 产线与编排器
pub mod plant;

// 事件通道 - 发布订阅边界
pub mod event;

// 错误类型
pub mod error;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    BatchStatus, ElectrodeKind, LineKind, MachineState, SlurryComponent, StageKind,
};

// 领域实体
pub use domain::{Batch, ParameterOverride};

// 参数
pub use params::{
    AgingParameters, CalendaringParameters, CoatingParameters, DryingParameters,
    ElectrolyteFillingParameters, FormationCyclingParameters, InspectionParameters,
    MixingParameters, RewindingParameters, SlittingParameters, StageParameters,
};

// 模型
pub use model::{BatteryModel, ElectrodePair, ProcessModel};

// 机台
pub use machine::{Machine, MachineStatusView};

// 工厂
pub use plant::{PlantConfig, PlantSimulation, PlantState, ProductionLine};

// 事件
pub use event::{
    EventChannel, EventSink, MachineNotification, MachineStatus, PlantEvent, PlantEventKind,
    StepSnapshot, SubscriptionId, TwinEvent,
};

// 错误
pub use error::{SimulationError, SimulationResult};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "电池产线数字孪生";

// ==========================================
// 预编译检查
// ==========================================
