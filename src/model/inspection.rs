// ==========================================
// 电池产线数字孪生 - 极片检测模型
// ==========================================
// 职责: 汇聚上游宽度/厚度/孔隙率/毛刺指标, 叠加随机测量误差,
//       输出四项通过门与总判定 (全部通过才合格)
// ==========================================

use super::{ProcessModel, SlittingModel};
use crate::params::InspectionParameters;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};

// 厚度测量误差相对幅度
const THICKNESS_ERROR_SCALE: f64 = 1e-6;
// 表面缺陷计数上界 (开区间, 取值 0..3)
const SURFACE_DEFECT_BOUND: u32 = 3;

/// 极片检测工序模型 (单电极侧)
#[derive(Debug)]
pub struct InspectionModel {
    pub(crate) final_width: f64,
    pub(crate) final_thickness: f64,
    pub(crate) width_error: f64,
    pub(crate) burr_factor: f64,
    pub(crate) porosity: f64,
    pub(crate) thickness_error: f64,
    pub(crate) surface_defects: u32,
    pub(crate) pass_width: bool,
    pub(crate) pass_thickness: bool,
    pub(crate) pass_burr: bool,
    pub(crate) pass_surface: bool,
    pub(crate) overall: bool,
    rng: StdRng,
}

impl InspectionModel {
    /// 从分切产物构造
    pub fn from_slitting(slit: &SlittingModel, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            final_width: slit.width_final,
            final_thickness: slit.thickness(),
            width_error: slit.width_error,
            burr_factor: slit.burr_factor,
            porosity: slit.porosity(),
            thickness_error: 0.0,
            surface_defects: 0,
            pass_width: false,
            pass_thickness: false,
            pass_burr: false,
            pass_surface: false,
            overall: false,
            rng,
        }
    }

    pub fn final_width(&self) -> f64 {
        self.final_width
    }

    pub fn final_thickness(&self) -> f64 {
        self.final_thickness
    }

    pub fn porosity(&self) -> f64 {
        self.porosity
    }

    pub fn width_error(&self) -> f64 {
        self.width_error
    }
}

impl ProcessModel for InspectionModel {
    type Params = InspectionParameters;

    fn update_properties(&mut self, params: &InspectionParameters, _t: u32) {
        self.thickness_error =
            self.final_thickness * THICKNESS_ERROR_SCALE * self.rng.random_range(-1.0..1.0);
        self.surface_defects = self.rng.random_range(0..SURFACE_DEFECT_BOUND);
        self.pass_width = self.width_error.abs() <= params.epsilon_width_max;
        self.pass_thickness = self.thickness_error.abs() <= params.epsilon_thickness_max;
        self.pass_burr = self.burr_factor <= params.b_max;
        self.pass_surface = self.surface_defects <= params.d_surface_max;
        self.overall =
            self.pass_width && self.pass_thickness && self.pass_burr && self.pass_surface;
    }

    fn properties(&self) -> Value {
        json!({
            "final_width": self.final_width,
            "final_thickness": self.final_thickness,
            "epsilon_width": self.width_error,
            "burr_factor": self.burr_factor,
            "epsilon_thickness": self.thickness_error,
            "D_detected": self.surface_defects,
            "Pass_width": self.pass_width,
            "Pass_thickness": self.pass_thickness,
            "Pass_burr": self.pass_burr,
            "Pass_surface": self.pass_surface,
            "Overall": self.overall,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inspected(seed: u64, width_error: f64, burr: f64) -> InspectionModel {
        InspectionModel {
            final_width: 0.5 + width_error,
            final_thickness: 100e-6,
            width_error,
            burr_factor: burr,
            porosity: 0.3,
            thickness_error: 0.0,
            surface_defects: 0,
            pass_width: false,
            pass_thickness: false,
            pass_burr: false,
            pass_surface: false,
            overall: false,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn default_params() -> InspectionParameters {
        InspectionParameters::new(0.1, 10e-6, 2.0, 3).unwrap()
    }

    #[test]
    fn test_within_tolerance_metrics_pass_all_gates() {
        let mut model = inspected(11, 0.01, 0.5);
        model.update_properties(&default_params(), 0);
        assert!(model.pass_width);
        assert!(model.pass_burr);
        // 厚度误差幅度 ≤ 100e-6 * 1e-6, 远小于 10e-6 阈值
        assert!(model.pass_thickness);
        assert!(model.pass_surface);
        assert!(model.overall);
    }

    #[test]
    fn test_excessive_width_error_fails_width_gate_and_overall() {
        let mut model = inspected(11, 0.5, 0.5);
        model.update_properties(&default_params(), 0);
        assert!(!model.pass_width);
        assert!(!model.overall);
    }

    #[test]
    fn test_excessive_burr_fails_burr_gate() {
        let mut model = inspected(11, 0.01, 5.0);
        model.update_properties(&default_params(), 0);
        assert!(!model.pass_burr);
        assert!(!model.overall);
    }

    #[test]
    fn test_surface_defect_count_stays_in_bound() {
        let mut model = inspected(99, 0.01, 0.5);
        let params = default_params();
        for t in 0..50 {
            model.update_properties(&params, t);
            assert!(model.surface_defects < SURFACE_DEFECT_BOUND);
        }
    }

    #[test]
    fn test_seeded_inspection_is_reproducible() {
        let params = default_params();
        let mut a = inspected(5, 0.01, 0.5);
        let mut b = inspected(5, 0.01, 0.5);
        for t in 0..10 {
            a.update_properties(&params, t);
            b.update_properties(&params, t);
            assert_eq!(a.thickness_error, b.thickness_error);
            assert_eq!(a.surface_defects, b.surface_defects);
        }
    }
}
