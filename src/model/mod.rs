// ==========================================
// 电池产线数字孪生 - 物理模型层
// ==========================================
// 职责: 每道工序一个闭式方程模型, 统一两操作契约
// 红线: 除零与越界输入一律钳制/中性化, 不抛错 (稳定性策略)
// 说明: 模型在工序间按值移交, 后继模型从前驱复制所需字段,
//       前驱之后不再被引用
// ==========================================

pub mod aging;
pub mod calendaring;
pub mod coating;
pub mod drying;
pub mod filling;
pub mod formation;
pub mod inspection;
pub mod mixing;
pub mod rewinding;
pub mod slitting;

pub use aging::AgingModel;
pub use calendaring::CalendaringModel;
pub use coating::CoatingModel;
pub use drying::DryingModel;
pub use filling::ElectrolyteFillingModel;
pub use formation::FormationCyclingModel;
pub use inspection::InspectionModel;
pub use mixing::MixingModel;
pub use rewinding::RewindingModel;
pub use slitting::SlittingModel;

use crate::error::{SimulationError, SimulationResult};
use crate::params::StageParameters;
use serde_json::{json, Value};

// ==========================================
// 数值防护
// ==========================================

/// 分母不为正时返回中性值 0, 否则正常相除
pub(crate) fn div_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

// ==========================================
// ProcessModel - 工序模型契约
// ==========================================

/// 工序物理模型的两操作契约
///
/// 机台只依赖这两个操作做统一迭代: 每步调用 `update_properties`
/// 推进状态, 随后用 `properties` 取快照。
pub trait ProcessModel {
    type Params;

    /// 按工序物理方程推进一个时间步 (t 为步序号, 从 0 起)
    fn update_properties(&mut self, params: &Self::Params, t: u32);

    /// 当前状态的只读属性视图
    fn properties(&self) -> Value;
}

// ==========================================
// ElectrodePair - 正负极成对模型
// ==========================================

/// 正负极成对的工序模型
///
/// 汇合后的电芯线在分切与检测工序同时推进两个电极侧,
/// 每步产生一份覆盖双侧的快照。
#[derive(Debug, Clone)]
pub struct ElectrodePair<T> {
    pub anode: T,
    pub cathode: T,
}

impl<T> ElectrodePair<T> {
    pub fn new(anode: T, cathode: T) -> Self {
        Self { anode, cathode }
    }
}

impl<T: ProcessModel> ElectrodePair<T> {
    /// 双侧同步推进一个时间步
    fn update_properties(&mut self, params: &T::Params, t: u32) {
        self.anode.update_properties(params, t);
        self.cathode.update_properties(params, t);
    }

    fn properties(&self) -> Value {
        json!({
            "anode": self.anode.properties(),
            "cathode": self.cathode.properties(),
        })
    }
}

// ==========================================
// BatteryModel - 工序模型联合体
// ==========================================
// 封闭联合体按工序选择模型实现, 避免开放式继承;
// 同时充当工序间移交模型的统一载体
#[derive(Debug)]
pub enum BatteryModel {
    Mixing(MixingModel),
    Coating(CoatingModel),
    Drying(DryingModel),
    Calendaring(CalendaringModel),
    /// 两条电极线辊压产物的汇合对 (电芯线进料, 不是可运行工序)
    CalendaredPair(ElectrodePair<CalendaringModel>),
    Slitting(ElectrodePair<SlittingModel>),
    Inspection(ElectrodePair<InspectionModel>),
    Rewinding(RewindingModel),
    ElectrolyteFilling(ElectrolyteFillingModel),
    FormationCycling(FormationCyclingModel),
    Aging(AgingModel),
}

impl BatteryModel {
    /// 模型种类名称 (诊断与日志用)
    pub fn kind_name(&self) -> &'static str {
        match self {
            BatteryModel::Mixing(_) => "mixing",
            BatteryModel::Coating(_) => "coating",
            BatteryModel::Drying(_) => "drying",
            BatteryModel::Calendaring(_) => "calendaring",
            BatteryModel::CalendaredPair(_) => "calendared_pair",
            BatteryModel::Slitting(_) => "slitting",
            BatteryModel::Inspection(_) => "inspection",
            BatteryModel::Rewinding(_) => "rewinding",
            BatteryModel::ElectrolyteFilling(_) => "electrolyte_filling",
            BatteryModel::FormationCycling(_) => "formation_cycling",
            BatteryModel::Aging(_) => "aging",
        }
    }

    /// 以匹配的工序参数推进一个时间步
    ///
    /// 模型与参数种类由机台配对保证一致, 不一致说明装配错误。
    pub fn update_properties(
        &mut self,
        params: &StageParameters,
        t: u32,
    ) -> SimulationResult<()> {
        match (self, params) {
            (BatteryModel::Mixing(m), StageParameters::Mixing(p)) => {
                m.update_properties(p, t);
                Ok(())
            }
            (BatteryModel::Coating(m), StageParameters::Coating(p)) => {
                m.update_properties(p, t);
                Ok(())
            }
            (BatteryModel::Drying(m), StageParameters::Drying(p)) => {
                m.update_properties(p, t);
                Ok(())
            }
            (BatteryModel::Calendaring(m), StageParameters::Calendaring(p)) => {
                m.update_properties(p, t);
                Ok(())
            }
            (BatteryModel::Slitting(pair), StageParameters::Slitting(p)) => {
                pair.update_properties(p, t);
                Ok(())
            }
            (BatteryModel::Inspection(pair), StageParameters::Inspection(p)) => {
                pair.update_properties(p, t);
                Ok(())
            }
            (BatteryModel::Rewinding(m), StageParameters::Rewinding(p)) => {
                m.update_properties(p, t);
                Ok(())
            }
            (BatteryModel::ElectrolyteFilling(m), StageParameters::ElectrolyteFilling(p)) => {
                m.update_properties(p, t);
                Ok(())
            }
            (BatteryModel::FormationCycling(m), StageParameters::FormationCycling(p)) => {
                m.update_properties(p, t);
                Ok(())
            }
            (BatteryModel::Aging(m), StageParameters::Aging(p)) => {
                m.update_properties(p, t);
                Ok(())
            }
            (model, params) => Err(SimulationError::Internal(format!(
                "模型 {} 与参数 {} 不匹配",
                model.kind_name(),
                params.stage()
            ))),
        }
    }

    /// 当前状态的只读属性视图
    pub fn properties(&self) -> Value {
        match self {
            BatteryModel::Mixing(m) => m.properties(),
            BatteryModel::Coating(m) => m.properties(),
            BatteryModel::Drying(m) => m.properties(),
            BatteryModel::Calendaring(m) => m.properties(),
            BatteryModel::CalendaredPair(pair) => pair.properties(),
            BatteryModel::Slitting(pair) => pair.properties(),
            BatteryModel::Inspection(pair) => pair.properties(),
            BatteryModel::Rewinding(m) => m.properties(),
            BatteryModel::ElectrolyteFilling(m) => m.properties(),
            BatteryModel::FormationCycling(m) => m.properties(),
            BatteryModel::Aging(m) => m.properties(),
        }
    }
}
