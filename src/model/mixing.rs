// ==========================================
// 电池产线数字孪生 - 匀浆模型
// ==========================================
// 职责: 浆料四组分体积累积与密度/粘度/屈服应力推算
// 物性: 粘度采用 Krieger-Dougherty 模型, 固含率钳制在 φmax 之下
// ==========================================

use super::{div_or_zero, ProcessModel};
use crate::domain::types::{ElectrodeKind, SlurryComponent};
use crate::params::MixingParameters;
use serde_json::{Number, Value};

/// 每种固体组分的投料步数
pub const STEPS_PER_COMPONENT: u32 = 100;
/// 匀浆总步数: 粘结剂/导电剂/活性材料各 100 步 (溶剂在第 0 步打底)
pub const TOTAL_MIXING_STEPS: u32 = 3 * STEPS_PER_COMPONENT;

// Krieger-Dougherty 粘度模型常数
const MAX_SOLID_FRACTION: f64 = 0.63;
const INTRINSIC_VISCOSITY: f64 = 3.0;
const SOLID_FRACTION_CLAMP_MARGIN: f64 = 0.001;
const VISCOSITY_SCALE_PA_S: f64 = 0.017;

/// 组分密度与屈服应力权重表 (按电极类型取值)
#[derive(Debug, Clone, Copy)]
struct MaterialTable {
    rho_am: f64,
    rho_ca: f64,
    rho_binder: f64,
    rho_solvent: f64,
    w_am: f64,
    w_binder: f64,
    w_ca: f64,
    w_solvent: f64,
}

impl MaterialTable {
    fn for_electrode(electrode: ElectrodeKind) -> Self {
        match electrode {
            ElectrodeKind::Anode => Self {
                rho_am: 2.26,
                rho_ca: 1.8,
                rho_binder: 1.17,
                rho_solvent: 1.0,
                w_am: 0.85,
                w_binder: 2.2,
                w_ca: 0.3,
                w_solvent: -0.4,
            },
            ElectrodeKind::Cathode => Self {
                rho_am: 2.11,
                rho_ca: 1.8,
                rho_binder: 1.78,
                rho_solvent: 1.03,
                w_am: 0.9,
                w_binder: 2.5,
                w_ca: 0.3,
                w_solvent: -0.5,
            },
        }
    }
}

/// 匀浆工序模型
///
/// 组分体积随投料步累积; 派生属性 (密度/粘度/屈服应力)
/// 每步由当前状态重算。
#[derive(Debug, Clone)]
pub struct MixingModel {
    electrode: ElectrodeKind,
    table: MaterialTable,
    pub(crate) am_volume: f64,
    pub(crate) ca_volume: f64,
    pub(crate) binder_volume: f64,
    pub(crate) solvent_volume: f64,
    pub(crate) viscosity: f64,
    pub(crate) density: f64,
    pub(crate) yield_stress: f64,
}

impl MixingModel {
    /// 创建空浆料罐 (产线首道工序, 无前驱模型)
    pub fn new(electrode: ElectrodeKind) -> Self {
        Self {
            electrode,
            table: MaterialTable::for_electrode(electrode),
            am_volume: 0.0,
            ca_volume: 0.0,
            binder_volume: 0.0,
            solvent_volume: 0.0,
            viscosity: 0.0,
            density: 0.0,
            yield_stress: 0.0,
        }
    }

    pub fn electrode(&self) -> ElectrodeKind {
        self.electrode
    }

    /// 第 t 步正在投放的固体组分 (溶剂在 t=0 整罐打底, 不占投料相)
    pub fn component_for_step(t: u32) -> Option<SlurryComponent> {
        match t / STEPS_PER_COMPONENT {
            0 => Some(SlurryComponent::Binder),
            1 => Some(SlurryComponent::ConductiveAdditive),
            2 => Some(SlurryComponent::ActiveMaterial),
            _ => None,
        }
    }

    /// 当前总体积
    pub fn total_volume(&self) -> f64 {
        self.am_volume + self.ca_volume + self.binder_volume + self.solvent_volume
    }

    /// 当前固体体积
    pub fn solid_volume(&self) -> f64 {
        self.am_volume + self.ca_volume + self.binder_volume
    }

    pub fn viscosity(&self) -> f64 {
        self.viscosity
    }

    fn add(&mut self, component: SlurryComponent, amount: f64) {
        match component {
            SlurryComponent::ActiveMaterial => self.am_volume += amount,
            SlurryComponent::ConductiveAdditive => self.ca_volume += amount,
            SlurryComponent::Binder => self.binder_volume += amount,
            SlurryComponent::Solvent => self.solvent_volume += amount,
        }
    }

    /// 密度 = Σ(体积·ρ) / Σ体积, 空罐返回 0
    fn calculate_density(&self) -> f64 {
        let total_mass = self.am_volume * self.table.rho_am
            + self.ca_volume * self.table.rho_ca
            + self.binder_volume * self.table.rho_binder
            + self.solvent_volume * self.table.rho_solvent;
        div_or_zero(total_mass, self.total_volume())
    }

    /// Krieger-Dougherty 粘度, 固含率钳制在 φmax - ε 以避免极点
    fn calculate_viscosity(&self) -> f64 {
        let mut phi = div_or_zero(self.solid_volume(), self.total_volume());
        if phi >= MAX_SOLID_FRACTION {
            phi = MAX_SOLID_FRACTION - SOLID_FRACTION_CLAMP_MARGIN;
        }
        (1.0 - phi / MAX_SOLID_FRACTION).powf(-INTRINSIC_VISCOSITY * MAX_SOLID_FRACTION)
            * VISCOSITY_SCALE_PA_S
    }

    /// 屈服应力: 组分质量的加权线性组合
    fn calculate_yield_stress(&self) -> f64 {
        self.table.w_am * self.am_volume * self.table.rho_am
            + self.table.w_binder * self.binder_volume * self.table.rho_binder
            + self.table.w_ca * self.ca_volume * self.table.rho_ca
            + self.table.w_solvent * self.solvent_volume * self.table.rho_solvent
    }
}

impl ProcessModel for MixingModel {
    type Params = MixingParameters;

    fn update_properties(&mut self, params: &MixingParameters, t: u32) {
        let tank = params.tank_volume;
        // 溶剂在第 0 步整罐打底
        if t == 0 {
            self.add(SlurryComponent::Solvent, params.solvent_ratio * tank);
        }
        // 固体组分按相位等量投放, 每组分恰好 100 步投满
        if let Some(component) = Self::component_for_step(t) {
            let ratio = match component {
                SlurryComponent::ActiveMaterial => params.am_ratio,
                SlurryComponent::ConductiveAdditive => params.ca_ratio,
                SlurryComponent::Binder => params.binder_ratio,
                SlurryComponent::Solvent => params.solvent_ratio,
            };
            self.add(component, ratio * tank / STEPS_PER_COMPONENT as f64);
        }
        self.density = self.calculate_density();
        self.viscosity = self.calculate_viscosity();
        self.yield_stress = self.calculate_yield_stress();
    }

    fn properties(&self) -> Value {
        let mut map = serde_json::Map::new();
        let num = |v: f64| Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null);
        map.insert("AM_volume".into(), num(self.am_volume));
        map.insert("CA_volume".into(), num(self.ca_volume));
        map.insert("PVDF_volume".into(), num(self.binder_volume));
        map.insert(
            format!("{}_volume", self.electrode.solvent_name()),
            num(self.solvent_volume),
        );
        map.insert("viscosity".into(), num(self.viscosity));
        map.insert("density".into(), num(self.density));
        map.insert("yield_stress".into(), num(self.yield_stress));
        map.insert("total_volume".into(), num(self.total_volume()));
        Value::Object(map)
    }
}
