// ==========================================
// 电池产线数字孪生 - 卷绕模型
// ==========================================
// 职责: 合并正负极检测产物为电芯卷芯, 推算卷径/张力锥度/卷硬度
// 说明: 厚度 = 两极厚度之和 + 隔膜厚度; 孔隙率与宽度取双侧均值
// ==========================================

use super::{div_or_zero, ElectrodePair, InspectionModel, ProcessModel};
use crate::params::RewindingParameters;
use serde_json::{json, Value};

// 隔膜厚度 (m)
const SEPARATOR_THICKNESS_M: f64 = 16e-6;
// 卷芯直径 (m)
const CORE_DIAMETER_M: f64 = 0.2;
// 时间步长 (s)
const TIME_STEP_S: f64 = 1.0;

/// 卷绕工序模型 (电芯线, 自此单模型)
#[derive(Debug, Clone)]
pub struct RewindingModel {
    pub(crate) layer_thickness: f64,
    pub(crate) porosity: f64,
    pub(crate) final_width: f64,
    pub(crate) width_error: f64,
    pub(crate) wound_length: f64,
    pub(crate) roll_diameter: f64,
    pub(crate) web_tension: f64,
    pub(crate) roll_hardness: f64,
}

impl RewindingModel {
    /// 合并正负极检测产物
    pub fn from_inspection_pair(pair: &ElectrodePair<InspectionModel>) -> Self {
        Self {
            layer_thickness: pair.anode.final_thickness()
                + pair.cathode.final_thickness()
                + SEPARATOR_THICKNESS_M,
            porosity: (pair.anode.porosity() + pair.cathode.porosity()) / 2.0,
            final_width: (pair.anode.final_width() + pair.cathode.final_width()) / 2.0,
            width_error: (pair.anode.width_error() + pair.cathode.width_error()) / 2.0,
            wound_length: 0.0,
            roll_diameter: 0.0,
            web_tension: 0.0,
            roll_hardness: 0.0,
        }
    }

    pub fn layer_thickness(&self) -> f64 {
        self.layer_thickness
    }

    pub fn porosity(&self) -> f64 {
        self.porosity
    }

    pub fn final_width(&self) -> f64 {
        self.final_width
    }

    pub fn wound_length(&self) -> f64 {
        self.wound_length
    }

    /// 卷径 D = sqrt(core^2 + 4·L·δ/π)
    fn roll_diameter(&self) -> f64 {
        (CORE_DIAMETER_M * CORE_DIAMETER_M
            + 4.0 * self.wound_length * self.layer_thickness / std::f64::consts::PI)
            .sqrt()
    }

    /// 张力锥度 τ = τ0 · (core/D)^n
    fn web_tension(&self, initial_tension: f64, taper_exponent: f64) -> f64 {
        initial_tension * (CORE_DIAMETER_M / self.roll_diameter).powf(taper_exponent)
    }
}

impl ProcessModel for RewindingModel {
    type Params = RewindingParameters;

    fn update_properties(&mut self, params: &RewindingParameters, _t: u32) {
        self.wound_length += params.rewinding_speed * TIME_STEP_S;
        self.roll_diameter = self.roll_diameter();
        self.web_tension = self.web_tension(params.initial_tension, params.tapering_steps);
        self.roll_hardness = div_or_zero(self.web_tension, self.layer_thickness);
    }

    fn properties(&self) -> Value {
        json!({
            "final_thickness": self.layer_thickness,
            "porosity": self.porosity,
            "final_width": self.final_width,
            "epsilon_width": self.width_error,
            "wound_length": self.wound_length,
            "roll_diameter": self.roll_diameter,
            "web_tension": self.web_tension,
            "roll_hardness": self.roll_hardness,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell_feed() -> RewindingModel {
        RewindingModel {
            layer_thickness: 216e-6,
            porosity: 0.3,
            final_width: 0.5,
            width_error: 0.01,
            wound_length: 0.0,
            roll_diameter: 0.0,
            web_tension: 0.0,
            roll_hardness: 0.0,
        }
    }

    fn default_params() -> RewindingParameters {
        RewindingParameters::new(0.5, 100.0, 0.3, 30.0).unwrap()
    }

    #[test]
    fn test_wound_length_accumulates_speed_times_interval() {
        let mut model = cell_feed();
        let params = default_params();
        for t in 0..10 {
            model.update_properties(&params, t);
        }
        assert!((model.wound_length - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_roll_diameter_grows_from_core() {
        let mut model = cell_feed();
        let params = default_params();
        model.update_properties(&params, 0);
        let first = model.roll_diameter;
        assert!(first > CORE_DIAMETER_M);
        for t in 1..20 {
            model.update_properties(&params, t);
        }
        assert!(model.roll_diameter > first);
    }

    #[test]
    fn test_tension_tapers_as_roll_grows() {
        let mut model = cell_feed();
        let params = default_params();
        model.update_properties(&params, 0);
        let early_tension = model.web_tension;
        for t in 1..50 {
            model.update_properties(&params, t);
        }
        assert!(model.web_tension < early_tension);
        assert!(model.web_tension < params.initial_tension);
    }

    #[test]
    fn test_zero_taper_exponent_keeps_constant_tension() {
        let mut model = cell_feed();
        let params = RewindingParameters::new(0.5, 100.0, 0.0, 30.0).unwrap();
        for t in 0..10 {
            model.update_properties(&params, t);
            assert!((model.web_tension - 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_zero_thickness_gives_neutral_hardness() {
        let mut model = cell_feed();
        model.layer_thickness = 0.0;
        model.update_properties(&default_params(), 0);
        assert_eq!(model.roll_hardness, 0.0);
    }
}
