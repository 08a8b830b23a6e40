// ==========================================
// 电池产线数字孪生 - 电芯线工序参数
// ==========================================
// 职责: 分切/检测/卷绕/注液/化成/老化六道工序的参数与校验规则
// ==========================================

use super::{require_non_negative, require_percent, require_positive};
use crate::error::{SimulationError, SimulationResult};
use serde::{Deserialize, Serialize};

// ==========================================
// 分切参数 (Slitting)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlittingParameters {
    /// 刀片锋利度 (无量纲)
    pub blade_sharpness: f64,
    /// 分切速度 (m/s)
    pub slitting_speed: f64,
    /// 目标宽度 (m)
    pub target_width: f64,
    /// 分切张力 (N)
    pub slitting_tension: f64,
}

impl SlittingParameters {
    pub fn new(
        blade_sharpness: f64,
        slitting_speed: f64,
        target_width: f64,
        slitting_tension: f64,
    ) -> SimulationResult<Self> {
        let params = Self {
            blade_sharpness,
            slitting_speed,
            target_width,
            slitting_tension,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> SimulationResult<()> {
        require_positive("blade_sharpness", self.blade_sharpness)?;
        require_positive("slitting_speed", self.slitting_speed)?;
        require_positive("target_width", self.target_width)?;
        require_positive("slitting_tension", self.slitting_tension)
    }
}

// ==========================================
// 极片检测参数 (Inspection)
// ==========================================
// 四项判定阈值均必须为正
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionParameters {
    /// 宽度偏差上限 (m)
    pub epsilon_width_max: f64,
    /// 厚度偏差上限 (m)
    pub epsilon_thickness_max: f64,
    /// 毛刺系数上限
    pub b_max: f64,
    /// 表面缺陷数上限
    pub d_surface_max: u32,
}

impl InspectionParameters {
    pub fn new(
        epsilon_width_max: f64,
        epsilon_thickness_max: f64,
        b_max: f64,
        d_surface_max: u32,
    ) -> SimulationResult<Self> {
        let params = Self {
            epsilon_width_max,
            epsilon_thickness_max,
            b_max,
            d_surface_max,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> SimulationResult<()> {
        require_positive("epsilon_width_max", self.epsilon_width_max)?;
        require_positive("epsilon_thickness_max", self.epsilon_thickness_max)?;
        require_positive("b_max", self.b_max)?;
        if self.d_surface_max == 0 {
            return Err(SimulationError::validation(
                "d_surface_max",
                "必须为正整数, 实际为 0",
            ));
        }
        Ok(())
    }
}

// ==========================================
// 卷绕参数 (Rewinding)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewindingParameters {
    /// 卷绕速度 (m/s)
    pub rewinding_speed: f64,
    /// 初始张力 (N)
    pub initial_tension: f64,
    /// 张力锥度指数
    pub tapering_steps: f64,
    /// 环境湿度 (%)
    pub environment_humidity: f64,
}

impl RewindingParameters {
    pub fn new(
        rewinding_speed: f64,
        initial_tension: f64,
        tapering_steps: f64,
        environment_humidity: f64,
    ) -> SimulationResult<Self> {
        let params = Self {
            rewinding_speed,
            initial_tension,
            tapering_steps,
            environment_humidity,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> SimulationResult<()> {
        require_positive("rewinding_speed", self.rewinding_speed)?;
        require_positive("initial_tension", self.initial_tension)?;
        require_non_negative("tapering_steps", self.tapering_steps)?;
        require_percent("environment_humidity", self.environment_humidity)
    }
}

// ==========================================
// 注液参数 (Electrolyte Filling)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectrolyteFillingParameters {
    /// 真空度 (mbar)
    pub vacuum_level: f64,
    /// 真空注液时长 (s)
    pub vacuum_filling: f64,
    /// 浸润时长 (s)
    pub soaking_time: f64,
}

impl ElectrolyteFillingParameters {
    pub fn new(
        vacuum_level: f64,
        vacuum_filling: f64,
        soaking_time: f64,
    ) -> SimulationResult<Self> {
        let params = Self {
            vacuum_level,
            vacuum_filling,
            soaking_time,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> SimulationResult<()> {
        require_positive("vacuum_level", self.vacuum_level)?;
        require_positive("vacuum_filling", self.vacuum_filling)?;
        require_positive("soaking_time", self.soaking_time)
    }
}

// ==========================================
// 化成参数 (Formation Cycling)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormationCyclingParameters {
    /// 充电电流 (A)
    pub charge_current_a: f64,
    /// 充电电压上限 (V)
    pub charge_voltage_limit_v: f64,
    /// 初始电压 (V)
    pub initial_voltage_v: f64,
    /// 化成时长 (s)
    pub formation_duration_s: u32,
}

impl FormationCyclingParameters {
    /// 默认化成时长
    pub const DEFAULT_FORMATION_DURATION_S: u32 = 200;

    pub fn new(
        charge_current_a: f64,
        charge_voltage_limit_v: f64,
        initial_voltage_v: f64,
        formation_duration_s: u32,
    ) -> SimulationResult<Self> {
        let params = Self {
            charge_current_a,
            charge_voltage_limit_v,
            initial_voltage_v,
            formation_duration_s,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> SimulationResult<()> {
        require_positive("charge_current_a", self.charge_current_a)?;
        require_positive("charge_voltage_limit_v", self.charge_voltage_limit_v)?;
        require_positive("initial_voltage_v", self.initial_voltage_v)?;
        if self.formation_duration_s == 0 {
            return Err(SimulationError::validation(
                "formation_duration_s",
                "必须为正整数, 实际为 0",
            ));
        }
        Ok(())
    }
}

// ==========================================
// 老化参数 (Aging)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgingParameters {
    /// 自放电泄漏常数 (1/s)
    pub k_leak: f64,
    /// 老化温度 (C)
    pub temperature: f64,
    /// 老化时长 (天)
    pub aging_time_days: f64,
}

impl AgingParameters {
    pub fn new(k_leak: f64, temperature: f64, aging_time_days: f64) -> SimulationResult<Self> {
        let params = Self {
            k_leak,
            temperature,
            aging_time_days,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> SimulationResult<()> {
        require_positive("k_leak", self.k_leak)?;
        require_positive("temperature", self.temperature)?;
        require_positive("aging_time_days", self.aging_time_days)
    }
}
