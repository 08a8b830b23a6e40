// ==========================================
// 电池产线数字孪生 - 化成模型
// ==========================================
// 职责: SEI 成膜效率 (logistic 曲线) 与电压/容量推算
// 红线: 电压封顶在参数上限, 机台据此提前终止本工序
// ==========================================

use super::{ElectrolyteFillingModel, ProcessModel};
use crate::params::FormationCyclingParameters;
use serde_json::{json, Value};

// 理论容量 (Ah)
const THEORETICAL_CAPACITY_AH: f64 = 2.0;
// SEI logistic 曲线参数
const SEI_RATE_K: f64 = 0.05;
const SEI_HALF_TIME_S: f64 = 300.0;
// 容量下限保护 (防止除零)
const CAPACITY_FLOOR_AH: f64 = 1e-6;

/// 化成工序模型
#[derive(Debug, Clone)]
pub struct FormationCyclingModel {
    pub(crate) wetting_efficiency: f64,
    pub(crate) electrolyte_volume: f64,
    pub(crate) voltage: f64,
    pub(crate) capacity: f64,
    pub(crate) sei_efficiency: f64,
}

impl FormationCyclingModel {
    /// 从注液产物构造
    pub fn from_filling(filling: &ElectrolyteFillingModel) -> Self {
        Self {
            wetting_efficiency: filling.wetting_efficiency(),
            electrolyte_volume: filling.filled_volume(),
            voltage: 0.0,
            capacity: 0.0,
            sei_efficiency: 0.0,
        }
    }

    pub fn voltage(&self) -> f64 {
        self.voltage
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn sei_efficiency(&self) -> f64 {
        self.sei_efficiency
    }

    /// 是否已达到电压上限 (机台提前终止条件)
    pub fn voltage_limit_reached(&self, params: &FormationCyclingParameters) -> bool {
        self.voltage >= params.charge_voltage_limit_v
    }
}

impl ProcessModel for FormationCyclingModel {
    type Params = FormationCyclingParameters;

    fn update_properties(&mut self, params: &FormationCyclingParameters, t: u32) {
        let t = t as f64;
        self.sei_efficiency = 1.0 / (1.0 + (-SEI_RATE_K * (t - SEI_HALF_TIME_S)).exp());
        self.capacity =
            self.sei_efficiency * THEORETICAL_CAPACITY_AH * self.wetting_efficiency;
        self.voltage = (params.initial_voltage_v
            + (params.charge_current_a * t) / (self.capacity + CAPACITY_FLOOR_AH))
            .min(params.charge_voltage_limit_v);
    }

    fn properties(&self) -> Value {
        json!({
            "voltage_v": self.voltage,
            "capacity_ah": self.capacity,
            "sei_efficiency": self.sei_efficiency,
            "eta_wetting": self.wetting_efficiency,
            "volume_electrolyte": self.electrolyte_volume,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wetted_feed() -> FormationCyclingModel {
        FormationCyclingModel {
            wetting_efficiency: 0.95,
            electrolyte_volume: 0.07,
            voltage: 0.0,
            capacity: 0.0,
            sei_efficiency: 0.0,
        }
    }

    fn default_params() -> FormationCyclingParameters {
        FormationCyclingParameters::new(0.05, 4.2, 1.0, 200).unwrap()
    }

    #[test]
    fn test_voltage_starts_at_initial_voltage() {
        let mut model = wetted_feed();
        model.update_properties(&default_params(), 0);
        assert!((model.voltage - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_voltage_never_exceeds_limit() {
        let mut model = wetted_feed();
        let params = default_params();
        for t in 0..1000 {
            model.update_properties(&params, t);
            assert!(model.voltage <= params.charge_voltage_limit_v);
        }
    }

    #[test]
    fn test_sei_efficiency_is_half_at_half_formation_time() {
        let mut model = wetted_feed();
        model.update_properties(&default_params(), 300);
        assert!((model.sei_efficiency - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_limit_reached_predicate_matches_capped_voltage() {
        let mut model = wetted_feed();
        let params = default_params();
        model.update_properties(&params, 0);
        assert!(!model.voltage_limit_reached(&params));
        // 大电流迅速触顶
        let harsh = FormationCyclingParameters::new(50.0, 4.2, 1.0, 200).unwrap();
        model.update_properties(&harsh, 100);
        assert!(model.voltage_limit_reached(&harsh));
    }

    #[test]
    fn test_capacity_scales_with_wetting_efficiency() {
        let mut wet = wetted_feed();
        let mut dry = wetted_feed();
        dry.wetting_efficiency = 0.5;
        let params = default_params();
        wet.update_properties(&params, 300);
        dry.update_properties(&params, 300);
        assert!(wet.capacity > dry.capacity);
    }
}
