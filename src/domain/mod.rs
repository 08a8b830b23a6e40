// ==========================================
// 电池产线数字孪生 - 领域层
// ==========================================
// 职责: 领域类型与批次实体
// ==========================================

pub mod batch;
pub mod types;

pub use batch::{Batch, ParameterOverride};
pub use types::{
    BatchStatus, ElectrodeKind, LineKind, MachineState, SlurryComponent, StageKind,
};
