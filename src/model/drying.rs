// ==========================================
// 电池产线数字孪生 - 干燥模型
// ==========================================
// 职责: 溶剂质量的传质蒸发衰减与干膜厚度推算
// 红线: 溶剂质量单调不增且不为负 (每步下限钳到 0)
// ==========================================

use super::{CoatingModel, ProcessModel};
use crate::params::DryingParameters;
use serde_json::{json, Value};

// 传质系数基准
const MASS_TRANSFER_K0: f64 = 0.001;
// 涂层表面溶剂浓度 (饱和, 归一化)
const SURFACE_CONCENTRATION: f64 = 1.0;
// 涂层密度 (kg/m^3), 初始溶剂质量估算用
const COATING_DENSITY: f64 = 1500.0;
// 蒸发面宽度与单位长度 (m)
const WEB_WIDTH_M: f64 = 0.5;
const WEB_UNIT_LENGTH_M: f64 = 1.0;
// 时间步长 (s)
const TIME_STEP_S: f64 = 1.0;

/// 干燥工序模型
///
/// 湿膜厚度与固含率从涂布模型移交; 溶剂质量按
/// 蒸发速率 × 时间步衰减, 到 0 为止。
#[derive(Debug, Clone)]
pub struct DryingModel {
    pub(crate) wet_thickness: f64,
    pub(crate) solid_content: f64,
    pub(crate) dry_thickness: f64,
    pub(crate) solvent_mass: f64,
    pub(crate) evaporation_rate: f64,
    pub(crate) defect_risk: bool,
}

impl DryingModel {
    /// 从涂布产物构造, 初始溶剂质量按湿膜含溶剂体积估算
    pub fn from_coating(coating: &CoatingModel) -> Self {
        let wet_thickness = coating.wet_thickness();
        let solid_content = coating.solid_content();
        Self {
            wet_thickness,
            solid_content,
            dry_thickness: 0.0,
            solvent_mass: wet_thickness * (1.0 - solid_content) * COATING_DENSITY,
            evaporation_rate: 0.0,
            defect_risk: false,
        }
    }

    pub fn dry_thickness(&self) -> f64 {
        self.dry_thickness
    }

    fn evaporation_area() -> f64 {
        WEB_WIDTH_M * WEB_UNIT_LENGTH_M
    }

    /// 蒸发速率 = 传质系数 × 面积 × 浓度梯度
    fn evaporation_rate(params: &DryingParameters) -> f64 {
        let mass_transfer_coeff =
            MASS_TRANSFER_K0 * (params.air_velocity / (WEB_WIDTH_M * params.air_gap_height));
        let air_concentration = params.air_humidity / 100.0;
        mass_transfer_coeff
            * Self::evaporation_area()
            * (SURFACE_CONCENTRATION - air_concentration)
    }
}

impl ProcessModel for DryingModel {
    type Params = DryingParameters;

    fn update_properties(&mut self, params: &DryingParameters, _t: u32) {
        self.evaporation_rate = Self::evaporation_rate(params);
        let flux = self.evaporation_rate / Self::evaporation_area();
        self.solvent_mass = (self.solvent_mass - flux * TIME_STEP_S).max(0.0);
        self.dry_thickness = self.wet_thickness * self.solid_content;
        self.defect_risk = flux.abs() > params.max_safe_evaporation_rate;
    }

    fn properties(&self) -> Value {
        json!({
            "wet_thickness": self.wet_thickness,
            "dry_thickness": self.dry_thickness,
            "M_solvent": self.solvent_mass,
            "evaporation_rate": self.evaporation_rate,
            "defect_risk": self.defect_risk,
            "solid_content": self.solid_content,
        })
    }
}
