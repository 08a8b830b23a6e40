// ==========================================
// 电池产线数字孪生 - 老化模型
// ==========================================
// 职责: SOC 指数自放电衰减、开路电压漂移与漏电流推算
// 说明: 步长 1 小时, 物理量按秒推进
// ==========================================

use super::{FormationCyclingModel, ProcessModel};
use crate::params::AgingParameters;
use serde_json::{json, Value};

// OCV 与 SOC 的线性关系
const OCV_BASE_V: f64 = 3.0;
const OCV_SOC_SLOPE: f64 = 1.2;
// 漏电流与泄漏常数的比例
const LEAK_CURRENT_SCALE: f64 = 1e-3;
// 缺陷判定阈值
const MAX_OCV_DRIFT_V: f64 = 0.1;
const MAX_LEAK_CURRENT_A: f64 = 1e-4;
const MIN_SOC_RETENTION: f64 = 0.95;
// 每步秒数 (1 步 = 1 小时)
pub const SECONDS_PER_STEP: f64 = 3600.0;

/// 老化工序模型
#[derive(Debug, Clone)]
pub struct AgingModel {
    pub(crate) initial_soc: f64,
    pub(crate) cell_capacity: f64,
    pub(crate) initial_ocv: f64,
    pub(crate) soc: f64,
    pub(crate) ocv: f64,
    pub(crate) leak_current: f64,
    pub(crate) defect_risk: bool,
}

impl AgingModel {
    /// 从化成产物构造; 初始 SOC 取 SEI 成膜效率
    pub fn from_formation(formation: &FormationCyclingModel) -> Self {
        let initial_soc = formation.sei_efficiency();
        // 漂移基准: 老化起点的 OCV, 而不是化成末端的充电电压
        let initial_ocv = OCV_BASE_V + OCV_SOC_SLOPE * initial_soc;
        Self {
            initial_soc,
            cell_capacity: formation.capacity(),
            initial_ocv,
            soc: initial_soc,
            ocv: initial_ocv,
            leak_current: 0.0,
            defect_risk: false,
        }
    }

    pub fn soc(&self) -> f64 {
        self.soc
    }

    /// SOC 指数衰减
    fn soc_decay(&self, k_leak: f64, elapsed_secs: f64) -> f64 {
        self.initial_soc * (-k_leak * elapsed_secs).exp()
    }
}

impl ProcessModel for AgingModel {
    type Params = AgingParameters;

    fn update_properties(&mut self, params: &AgingParameters, t: u32) {
        let elapsed_secs = t as f64 * SECONDS_PER_STEP;
        self.soc = self.soc_decay(params.k_leak, elapsed_secs);
        self.ocv = OCV_BASE_V + OCV_SOC_SLOPE * self.soc;
        self.leak_current = params.k_leak * LEAK_CURRENT_SCALE;
        self.defect_risk = (self.initial_ocv - self.ocv) > MAX_OCV_DRIFT_V
            || self.leak_current > MAX_LEAK_CURRENT_A
            || self.soc < MIN_SOC_RETENTION * self.initial_soc;
    }

    fn properties(&self) -> Value {
        json!({
            "SOC": self.soc,
            "Initial_SOC": self.initial_soc,
            "Final_OCV_V": self.ocv,
            "Leakage_Current_A": self.leak_current,
            "Capacity_Ah": self.cell_capacity,
            "defect_risk": self.defect_risk,
        })
    }
}
