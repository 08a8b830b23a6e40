// ==========================================
// 电池产线数字孪生 - 涂布模型
// ==========================================
// 职责: 湿膜/干膜厚度与剪切速率推算, 缺陷风险阈值判定
// ==========================================

use super::{div_or_zero, MixingModel, ProcessModel};
use crate::params::CoatingParameters;
use serde_json::{json, Value};

// 缺陷风险常数 (越大判定越保守)
const DEFECT_RISK_K: f64 = 100.0;
// 均匀性基准标准差与参考剪切速率
const BASE_UNIFORMITY_STD: f64 = 0.01;
const NOMINAL_SHEAR_RATE: f64 = 500.0;

/// 涂布工序模型
///
/// 固含率与粘度从匀浆模型移交, 厚度与剪切速率由参数逐步推算。
#[derive(Debug, Clone)]
pub struct CoatingModel {
    pub(crate) solid_content: f64,
    pub(crate) viscosity: f64,
    pub(crate) wet_thickness: f64,
    pub(crate) dry_thickness: f64,
    pub(crate) shear_rate: f64,
    pub(crate) uniformity_std: f64,
    pub(crate) defect_risk: bool,
}

impl CoatingModel {
    /// 从匀浆产物构造 (固含率 = 固体体积 / 总体积, 空罐为 0)
    pub fn from_mixing(slurry: &MixingModel) -> Self {
        Self {
            solid_content: div_or_zero(slurry.solid_volume(), slurry.total_volume()),
            viscosity: slurry.viscosity(),
            wet_thickness: 0.0,
            dry_thickness: 0.0,
            shear_rate: 0.0,
            uniformity_std: 0.0,
            defect_risk: false,
        }
    }

    pub fn wet_thickness(&self) -> f64 {
        self.wet_thickness
    }

    pub fn solid_content(&self) -> f64 {
        self.solid_content
    }
}

impl ProcessModel for CoatingModel {
    type Params = CoatingParameters;

    fn update_properties(&mut self, params: &CoatingParameters, _t: u32) {
        self.shear_rate = params.coating_speed / params.gap_height;
        self.wet_thickness =
            params.flow_rate / (params.coating_speed * params.coating_width);
        self.dry_thickness = self.wet_thickness * self.solid_content;
        self.uniformity_std = BASE_UNIFORMITY_STD * (self.shear_rate / NOMINAL_SHEAR_RATE);
        self.defect_risk =
            params.coating_speed / params.gap_height > DEFECT_RISK_K * self.viscosity;
    }

    fn properties(&self) -> Value {
        json!({
            "solid_content": self.solid_content,
            "viscosity": self.viscosity,
            "wet_thickness": self.wet_thickness,
            "dry_thickness": self.dry_thickness,
            "shear_rate": self.shear_rate,
            "uniformity_std": self.uniformity_std,
            "defect_risk": self.defect_risk,
        })
    }
}
