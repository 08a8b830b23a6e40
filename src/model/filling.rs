// ==========================================
// 电池产线数字孪生 - 注液模型
// ==========================================
// 职责: 几何可注体积与浸润效率推算
// 物性: 浸润效率 1 - exp(-k·t/t_soak), 单调递增渐近于 1
// ==========================================

use super::{ProcessModel, RewindingModel};
use crate::params::ElectrolyteFillingParameters;
use serde_json::{json, Value};

// 隔膜体积与卷长的比例系数
const SEPARATOR_VOLUME_PER_LENGTH: f64 = 0.05;
// 浸润速率常数
const WETTING_RATE_K: f64 = 3.0;
// 欠注判定比例
const UNDERFILL_FRACTION: f64 = 0.8;

/// 注液工序模型
#[derive(Debug, Clone)]
pub struct ElectrolyteFillingModel {
    pub(crate) layer_thickness: f64,
    pub(crate) porosity: f64,
    pub(crate) final_width: f64,
    pub(crate) wound_length: f64,
    pub(crate) separator_volume: f64,
    pub(crate) electrode_volume: f64,
    pub(crate) max_fill_volume: f64,
    pub(crate) wetting_efficiency: f64,
    pub(crate) filled_volume: f64,
    pub(crate) defect_risk: bool,
}

impl ElectrolyteFillingModel {
    /// 从卷绕产物构造
    pub fn from_rewinding(roll: &RewindingModel) -> Self {
        Self {
            layer_thickness: roll.layer_thickness(),
            porosity: roll.porosity(),
            final_width: roll.final_width(),
            wound_length: roll.wound_length(),
            separator_volume: 0.0,
            electrode_volume: 0.0,
            max_fill_volume: 0.0,
            wetting_efficiency: 0.0,
            filled_volume: 0.0,
            defect_risk: false,
        }
    }

    pub fn wetting_efficiency(&self) -> f64 {
        self.wetting_efficiency
    }

    pub fn filled_volume(&self) -> f64 {
        self.filled_volume
    }

    /// 浸润效率, 随时间单调递增, 上界 1
    fn wetting_efficiency_at(t: u32, soaking_time: f64) -> f64 {
        1.0 - (-WETTING_RATE_K * (t as f64) / soaking_time).exp()
    }
}

impl ProcessModel for ElectrolyteFillingModel {
    type Params = ElectrolyteFillingParameters;

    fn update_properties(&mut self, params: &ElectrolyteFillingParameters, t: u32) {
        self.separator_volume = SEPARATOR_VOLUME_PER_LENGTH * self.wound_length;
        self.electrode_volume = self.wound_length * self.final_width * self.layer_thickness;
        self.max_fill_volume = self.porosity * (self.electrode_volume + self.separator_volume);
        self.wetting_efficiency = Self::wetting_efficiency_at(t, params.soaking_time);
        self.filled_volume = self.wetting_efficiency * self.max_fill_volume;
        self.defect_risk = self.filled_volume < UNDERFILL_FRACTION * self.max_fill_volume;
    }

    fn properties(&self) -> Value {
        json!({
            "final_thickness": self.layer_thickness,
            "porosity": self.porosity,
            "final_width": self.final_width,
            "wound_length": self.wound_length,
            "V_sep": self.separator_volume,
            "V_elec": self.electrode_volume,
            "V_max": self.max_fill_volume,
            "eta_wetting": self.wetting_efficiency,
            "V_elec_filling": self.filled_volume,
            "defect_risk": self.defect_risk,
        })
    }
}
