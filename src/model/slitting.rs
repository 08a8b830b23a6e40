// ==========================================
// 电池产线数字孪生 - 分切模型
// ==========================================
// 职责: 分切宽度的高斯扰动仿真与毛刺系数推算
// 说明: 噪声源可注入种子, 测试可复现
// ==========================================

use super::{CalendaringModel, ProcessModel};
use crate::params::SlittingParameters;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde_json::{json, Value};

// 宽度扰动标准差 (m)
const WIDTH_NOISE_STD: f64 = 0.05;
// 毛刺系数常数与参考值
const BURR_C: f64 = 1.0;
const SPEED_REF: f64 = 1.0;
const TENSION_REF: f64 = 100.0;
// 缺陷判定阈值
const MAX_WIDTH_DEVIATION: f64 = 0.1;
const MAX_BURR_FACTOR: f64 = 2.0;

/// 分切工序模型 (单电极侧)
///
/// 厚度与孔隙率从辊压产物移交; 宽度每步重新抽样。
#[derive(Debug)]
pub struct SlittingModel {
    pub(crate) thickness: f64,
    pub(crate) porosity: f64,
    pub(crate) width_final: f64,
    pub(crate) width_error: f64,
    pub(crate) burr_factor: f64,
    pub(crate) defect_risk: bool,
    rng: StdRng,
}

impl SlittingModel {
    /// 从辊压产物构造; 厚度取辊压后的最终厚度 (辊缝)
    pub fn from_calendaring(calendared: &CalendaringModel, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            thickness: calendared.final_thickness(),
            porosity: calendared.porosity(),
            width_final: 0.0,
            width_error: 0.0,
            burr_factor: 0.0,
            defect_risk: false,
            rng,
        }
    }

    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    pub fn porosity(&self) -> f64 {
        self.porosity
    }

    /// 毛刺系数 = (C/S) · (v/v_ref) · (τ/τ_ref)
    fn burr_factor(params: &SlittingParameters) -> f64 {
        (BURR_C / params.blade_sharpness)
            * (params.slitting_speed / SPEED_REF)
            * (params.slitting_tension / TENSION_REF)
    }
}

impl ProcessModel for SlittingModel {
    type Params = SlittingParameters;

    fn update_properties(&mut self, params: &SlittingParameters, _t: u32) {
        let noise: f64 = self.rng.sample(StandardNormal);
        self.width_final = params.target_width + WIDTH_NOISE_STD * noise;
        self.width_error = self.width_final - params.target_width;
        self.burr_factor = Self::burr_factor(params);
        self.defect_risk = self.width_error.abs() > MAX_WIDTH_DEVIATION
            || self.burr_factor > MAX_BURR_FACTOR;
    }

    fn properties(&self) -> Value {
        json!({
            "final_thickness": self.thickness,
            "porosity": self.porosity,
            "width_final": self.width_final,
            "epsilon_width": self.width_error,
            "burr_factor": self.burr_factor,
            "defect_risk": self.defect_risk,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calendared_feed() -> CalendaringModel {
        use crate::params::CalendaringParameters;
        let mut model = CalendaringModel {
            dry_thickness: 150e-6,
            initial_porosity: 0.4,
            final_thickness: 0.0,
            porosity: 0.0,
            strain: 0.0,
            stress_theory: 0.0,
            defect_risk: false,
        };
        let params = CalendaringParameters::new(100e-6, 5e6, 80.0, 0.1, 0.4).unwrap();
        model.update_properties(&params, 0);
        model
    }

    fn default_params() -> SlittingParameters {
        SlittingParameters::new(1.0, 0.1, 0.5, 50.0).unwrap()
    }

    #[test]
    fn test_seeded_noise_is_reproducible() {
        let feed = calendared_feed();
        let params = default_params();
        let mut a = SlittingModel::from_calendaring(&feed, Some(42));
        let mut b = SlittingModel::from_calendaring(&feed, Some(42));
        for t in 0..10 {
            a.update_properties(&params, t);
            b.update_properties(&params, t);
            assert_eq!(a.width_final, b.width_final);
        }
    }

    #[test]
    fn test_width_error_is_final_minus_target() {
        let mut model = SlittingModel::from_calendaring(&calendared_feed(), Some(7));
        let params = default_params();
        model.update_properties(&params, 0);
        assert!((model.width_error - (model.width_final - 0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_burr_factor_matches_normalized_product() {
        // (1/2) * (0.5/1) * (150/100) = 0.375
        let params = SlittingParameters::new(2.0, 0.5, 0.5, 150.0).unwrap();
        assert!((SlittingModel::burr_factor(&params) - 0.375).abs() < 1e-12);
    }

    #[test]
    fn test_blunt_blade_raises_burr_defect() {
        let mut model = SlittingModel::from_calendaring(&calendared_feed(), Some(3));
        // (1/1) * (0.1/1) * (50/100) = 0.05, 正常
        model.update_properties(&default_params(), 0);
        let normal_burr = model.burr_factor;
        assert!(normal_burr <= MAX_BURR_FACTOR);

        // 钝刀: (1/0.01) * (0.1/1) * (50/100) = 5.0 > 2.0
        let blunt = SlittingParameters::new(0.01, 0.1, 0.5, 50.0).unwrap();
        model.update_properties(&blunt, 1);
        assert!(model.burr_factor > MAX_BURR_FACTOR);
        assert!(model.defect_risk);
    }

    #[test]
    fn test_thickness_passes_through_calendared_value() {
        let feed = calendared_feed();
        let model = SlittingModel::from_calendaring(&feed, Some(1));
        assert_eq!(model.thickness, feed.final_thickness());
    }
}
