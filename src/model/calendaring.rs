// ==========================================
// 电池产线数字孪生 - 辊压模型
// ==========================================
// 职责: 压应变/理论应力与孔隙率指数衰减推算
// 红线: 干膜厚度为 0 时应变取中性值 0, 不抛错
// ==========================================

use super::{div_or_zero, DryingModel, ProcessModel};
use crate::params::CalendaringParameters;
use serde_json::{json, Value};

// 极片弹性模量 (Pa)
const ELASTIC_MODULUS_PA: f64 = 500e6;
// 孔隙率衰减常数
const POROSITY_DECAY_K: f64 = 3.0;

/// 辊压工序模型
#[derive(Debug, Clone)]
pub struct CalendaringModel {
    pub(crate) dry_thickness: f64,
    pub(crate) initial_porosity: f64,
    pub(crate) final_thickness: f64,
    pub(crate) porosity: f64,
    pub(crate) strain: f64,
    pub(crate) stress_theory: f64,
    pub(crate) defect_risk: bool,
}

impl CalendaringModel {
    /// 从干燥产物构造, 初始孔隙率来自辊压参数
    pub fn from_drying(drying: &DryingModel, initial_porosity: f64) -> Self {
        Self {
            dry_thickness: drying.dry_thickness(),
            initial_porosity,
            final_thickness: 0.0,
            porosity: 0.0,
            strain: 0.0,
            stress_theory: 0.0,
            defect_risk: false,
        }
    }

    pub fn final_thickness(&self) -> f64 {
        self.final_thickness
    }

    pub fn porosity(&self) -> f64 {
        self.porosity
    }

    /// 压应变 ε = (δ_dry - h_roll) / δ_dry
    fn strain(&self, roll_gap: f64) -> f64 {
        div_or_zero(self.dry_thickness - roll_gap, self.dry_thickness)
    }
}

impl ProcessModel for CalendaringModel {
    type Params = CalendaringParameters;

    fn update_properties(&mut self, params: &CalendaringParameters, _t: u32) {
        self.strain = self.strain(params.roll_gap);
        self.stress_theory = ELASTIC_MODULUS_PA * self.strain;
        self.porosity = self.initial_porosity * (-POROSITY_DECAY_K * self.strain).exp();
        self.final_thickness = params.roll_gap;
        self.defect_risk = params.roll_pressure > 2.0 * self.stress_theory;
    }

    fn properties(&self) -> Value {
        json!({
            "final_thickness": self.final_thickness,
            "porosity": self.porosity,
            "strain": self.strain,
            "stress_theory": self.stress_theory,
            "defect_risk": self.defect_risk,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_with_dry_thickness(dry_thickness: f64, initial_porosity: f64) -> CalendaringModel {
        CalendaringModel {
            dry_thickness,
            initial_porosity,
            final_thickness: 0.0,
            porosity: 0.0,
            strain: 0.0,
            stress_theory: 0.0,
            defect_risk: false,
        }
    }

    fn default_params() -> CalendaringParameters {
        CalendaringParameters::new(100e-6, 5e6, 80.0, 0.1, 0.4).unwrap()
    }

    #[test]
    fn test_final_thickness_equals_roll_gap() {
        let mut model = model_with_dry_thickness(150e-6, 0.4);
        model.update_properties(&default_params(), 0);
        assert_eq!(model.final_thickness, 100e-6);
    }

    #[test]
    fn test_positive_strain_reduces_porosity_below_initial() {
        let mut model = model_with_dry_thickness(150e-6, 0.4);
        model.update_properties(&default_params(), 0);
        assert!(model.strain > 0.0);
        assert!(model.porosity > 0.0);
        assert!(model.porosity < 0.4);
    }

    #[test]
    fn test_zero_dry_thickness_gives_neutral_strain() {
        let mut model = model_with_dry_thickness(0.0, 0.4);
        model.update_properties(&default_params(), 0);
        assert_eq!(model.strain, 0.0);
        assert_eq!(model.stress_theory, 0.0);
        // ε = 0 时孔隙率保持初值
        assert!((model.porosity - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_defect_when_pressure_exceeds_twice_theoretical_stress() {
        let mut model = model_with_dry_thickness(150e-6, 0.4);
        // ε = 1/3, σ = 500e6/3 ≈ 1.67e8, 2σ ≈ 3.3e8
        let gentle = CalendaringParameters::new(100e-6, 1e6, 80.0, 0.1, 0.4).unwrap();
        model.update_properties(&gentle, 0);
        assert!(!model.defect_risk);

        let harsh = CalendaringParameters::new(100e-6, 4e8, 80.0, 0.1, 0.4).unwrap();
        model.update_properties(&harsh, 0);
        assert!(model.defect_risk);
    }
}
