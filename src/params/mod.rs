// ==========================================
// 电池产线数字孪生 - 工艺参数层
// ==========================================
// 职责: 每道工序一组经过校验的不可变参数
// 红线: 校验失败即拒绝构造, 不存在"已构造但非法"的参数
// ==========================================

pub mod cell;
pub mod electrode;

pub use cell::{
    AgingParameters, ElectrolyteFillingParameters, FormationCyclingParameters,
    InspectionParameters, RewindingParameters, SlittingParameters,
};
pub use electrode::{
    CalendaringParameters, CoatingParameters, DryingParameters, MixingParameters,
};

use crate::domain::types::StageKind;
use crate::error::{SimulationError, SimulationResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ==========================================
// 校验辅助
// ==========================================

/// 要求字段为有限正数
pub(crate) fn require_positive(field: &str, value: f64) -> SimulationResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(SimulationError::validation(
            field,
            format!("必须为正数, 实际为 {value}"),
        ));
    }
    Ok(())
}

/// 要求字段为有限非负数
pub(crate) fn require_non_negative(field: &str, value: f64) -> SimulationResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(SimulationError::validation(
            field,
            format!("不能为负数, 实际为 {value}"),
        ));
    }
    Ok(())
}

/// 要求字段落在百分比区间 [0, 100]
pub(crate) fn require_percent(field: &str, value: f64) -> SimulationResult<()> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(SimulationError::validation(
            field,
            format!("必须在 0~100 之间, 实际为 {value}"),
        ));
    }
    Ok(())
}

/// 要求字段落在开区间 (0, 1)
pub(crate) fn require_open_unit(field: &str, value: f64) -> SimulationResult<()> {
    if !value.is_finite() || value <= 0.0 || value >= 1.0 {
        return Err(SimulationError::validation(
            field,
            format!("必须在 (0, 1) 区间内, 实际为 {value}"),
        ));
    }
    Ok(())
}

// ==========================================
// StageParameters - 工序参数联合体
// ==========================================
// 封闭联合体: 机台以统一方式持有任一工序的参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageParameters {
    Mixing(MixingParameters),
    Coating(CoatingParameters),
    Drying(DryingParameters),
    Calendaring(CalendaringParameters),
    Slitting(SlittingParameters),
    Inspection(InspectionParameters),
    Rewinding(RewindingParameters),
    ElectrolyteFilling(ElectrolyteFillingParameters),
    FormationCycling(FormationCyclingParameters),
    Aging(AgingParameters),
}

impl StageParameters {
    /// 参数所属的工序
    pub fn stage(&self) -> StageKind {
        match self {
            StageParameters::Mixing(_) => StageKind::Mixing,
            StageParameters::Coating(_) => StageKind::Coating,
            StageParameters::Drying(_) => StageKind::Drying,
            StageParameters::Calendaring(_) => StageKind::Calendaring,
            StageParameters::Slitting(_) => StageKind::Slitting,
            StageParameters::Inspection(_) => StageKind::Inspection,
            StageParameters::Rewinding(_) => StageKind::Rewinding,
            StageParameters::ElectrolyteFilling(_) => StageKind::ElectrolyteFilling,
            StageParameters::FormationCycling(_) => StageKind::FormationCycling,
            StageParameters::Aging(_) => StageKind::Aging,
        }
    }

    /// 重新执行工序自身的校验规则
    ///
    /// 构造路径已经校验过; 反序列化或参数热更新前再次调用。
    pub fn validate(&self) -> SimulationResult<()> {
        match self {
            StageParameters::Mixing(p) => p.validate(),
            StageParameters::Coating(p) => p.validate(),
            StageParameters::Drying(p) => p.validate(),
            StageParameters::Calendaring(p) => p.validate(),
            StageParameters::Slitting(p) => p.validate(),
            StageParameters::Inspection(p) => p.validate(),
            StageParameters::Rewinding(p) => p.validate(),
            StageParameters::ElectrolyteFilling(p) => p.validate(),
            StageParameters::FormationCycling(p) => p.validate(),
            StageParameters::Aging(p) => p.validate(),
        }
    }

    /// 参数字段的 JSON 视图 (快照信封的 machine_parameters 部分)
    pub fn to_value(&self) -> Value {
        let value = match self {
            StageParameters::Mixing(p) => serde_json::to_value(p),
            StageParameters::Coating(p) => serde_json::to_value(p),
            StageParameters::Drying(p) => serde_json::to_value(p),
            StageParameters::Calendaring(p) => serde_json::to_value(p),
            StageParameters::Slitting(p) => serde_json::to_value(p),
            StageParameters::Inspection(p) => serde_json::to_value(p),
            StageParameters::Rewinding(p) => serde_json::to_value(p),
            StageParameters::ElectrolyteFilling(p) => serde_json::to_value(p),
            StageParameters::FormationCycling(p) => serde_json::to_value(p),
            StageParameters::Aging(p) => serde_json::to_value(p),
        };
        value.unwrap_or(Value::Null)
    }
}
