// ==========================================
// 电池产线数字孪生 - 电极线工序参数
// ==========================================
// 职责: 匀浆/涂布/干燥/辊压四道工序的参数与校验规则
// ==========================================

use super::{require_open_unit, require_percent, require_positive};
use crate::error::{SimulationError, SimulationResult};
use serde::{Deserialize, Serialize};

// 比例之和的浮点容差
const RATIO_SUM_TOLERANCE: f64 = 1e-9;

// ==========================================
// 匀浆参数 (Mixing)
// ==========================================
// 红线: 四组分比例之和必须为 1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixingParameters {
    /// 活性材料比例
    #[serde(rename = "AM_ratio")]
    pub am_ratio: f64,
    /// 导电剂比例
    #[serde(rename = "CA_ratio")]
    pub ca_ratio: f64,
    /// 粘结剂比例
    #[serde(rename = "PVDF_ratio")]
    pub binder_ratio: f64,
    /// 溶剂比例
    pub solvent_ratio: f64,
    /// 搅拌罐容积
    pub tank_volume: f64,
}

impl MixingParameters {
    /// 默认搅拌罐容积
    pub const DEFAULT_TANK_VOLUME: f64 = 200.0;

    pub fn new(
        am_ratio: f64,
        ca_ratio: f64,
        binder_ratio: f64,
        solvent_ratio: f64,
    ) -> SimulationResult<Self> {
        Self::with_tank_volume(
            am_ratio,
            ca_ratio,
            binder_ratio,
            solvent_ratio,
            Self::DEFAULT_TANK_VOLUME,
        )
    }

    pub fn with_tank_volume(
        am_ratio: f64,
        ca_ratio: f64,
        binder_ratio: f64,
        solvent_ratio: f64,
        tank_volume: f64,
    ) -> SimulationResult<Self> {
        let params = Self {
            am_ratio,
            ca_ratio,
            binder_ratio,
            solvent_ratio,
            tank_volume,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> SimulationResult<()> {
        super::require_non_negative("AM_ratio", self.am_ratio)?;
        super::require_non_negative("CA_ratio", self.ca_ratio)?;
        super::require_non_negative("PVDF_ratio", self.binder_ratio)?;
        super::require_non_negative("solvent_ratio", self.solvent_ratio)?;
        let sum = self.am_ratio + self.ca_ratio + self.binder_ratio + self.solvent_ratio;
        if (sum - 1.0).abs() > RATIO_SUM_TOLERANCE {
            return Err(SimulationError::validation(
                "AM_ratio+CA_ratio+PVDF_ratio+solvent_ratio",
                format!("比例之和必须为 1, 实际为 {sum}"),
            ));
        }
        require_positive("tank_volume", self.tank_volume)
    }
}

// ==========================================
// 涂布参数 (Coating)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoatingParameters {
    /// 涂布速度 (m/s)
    pub coating_speed: f64,
    /// 涂布间隙 (m)
    pub gap_height: f64,
    /// 浆料流量 (m^3/s)
    pub flow_rate: f64,
    /// 涂布宽度 (m)
    pub coating_width: f64,
}

impl CoatingParameters {
    pub fn new(
        coating_speed: f64,
        gap_height: f64,
        flow_rate: f64,
        coating_width: f64,
    ) -> SimulationResult<Self> {
        let params = Self {
            coating_speed,
            gap_height,
            flow_rate,
            coating_width,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> SimulationResult<()> {
        require_positive("coating_speed", self.coating_speed)?;
        require_positive("gap_height", self.gap_height)?;
        require_positive("flow_rate", self.flow_rate)?;
        require_positive("coating_width", self.coating_width)
    }
}

// ==========================================
// 干燥参数 (Drying)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DryingParameters {
    /// 走带速度 (m/s)
    pub web_speed: f64,
    /// 干燥段长度 (m)
    pub drying_length: f64,
    /// 热风风速 (m/s)
    pub air_velocity: f64,
    /// 风道间隙 (m)
    pub air_gap_height: f64,
    /// 热风相对湿度 (%)
    pub air_humidity: f64,
    /// 单位面积安全蒸发速率上限
    pub max_safe_evaporation_rate: f64,
}

impl DryingParameters {
    pub fn new(
        web_speed: f64,
        drying_length: f64,
        air_velocity: f64,
        air_gap_height: f64,
        air_humidity: f64,
        max_safe_evaporation_rate: f64,
    ) -> SimulationResult<Self> {
        let params = Self {
            web_speed,
            drying_length,
            air_velocity,
            air_gap_height,
            air_humidity,
            max_safe_evaporation_rate,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> SimulationResult<()> {
        require_positive("web_speed", self.web_speed)?;
        require_positive("drying_length", self.drying_length)?;
        require_positive("air_velocity", self.air_velocity)?;
        require_positive("air_gap_height", self.air_gap_height)?;
        require_percent("air_humidity", self.air_humidity)?;
        require_positive("max_safe_evaporation_rate", self.max_safe_evaporation_rate)
    }
}

// ==========================================
// 辊压参数 (Calendaring)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendaringParameters {
    /// 辊缝 (m)
    pub roll_gap: f64,
    /// 辊压压力 (Pa)
    pub roll_pressure: f64,
    /// 辊温 (C)
    pub temperature: f64,
    /// 辊速 (m/s)
    pub roll_speed: f64,
    /// 辊压前初始孔隙率
    pub initial_porosity: f64,
}

impl CalendaringParameters {
    pub fn new(
        roll_gap: f64,
        roll_pressure: f64,
        temperature: f64,
        roll_speed: f64,
        initial_porosity: f64,
    ) -> SimulationResult<Self> {
        let params = Self {
            roll_gap,
            roll_pressure,
            temperature,
            roll_speed,
            initial_porosity,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> SimulationResult<()> {
        require_positive("roll_gap", self.roll_gap)?;
        require_positive("roll_pressure", self.roll_pressure)?;
        require_positive("roll_speed", self.roll_speed)?;
        require_open_unit("initial_porosity", self.initial_porosity)
    }
}
