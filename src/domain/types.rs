// ==========================================
// 电池产线数字孪生 - 领域类型定义
// ==========================================
// 职责: 产线/工序/机台状态的封闭枚举集
// 说明: 工序集合是封闭的, 通过枚举而不是字符串名选择实现
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 电极类型 (Electrode Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElectrodeKind {
    Anode,   // 负极
    Cathode, // 正极
}

impl ElectrodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElectrodeKind::Anode => "anode",
            ElectrodeKind::Cathode => "cathode",
        }
    }

    /// 电极浆料使用的溶剂名称
    pub fn solvent_name(&self) -> &'static str {
        match self {
            ElectrodeKind::Anode => "H2O",
            ElectrodeKind::Cathode => "NMP",
        }
    }
}

impl fmt::Display for ElectrodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 产线类型 (Line Kind)
// ==========================================
// 负极线与正极线并行, 在辊压→分切边界汇合为电芯线
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Anode,   // 负极线
    Cathode, // 正极线
    Cell,    // 电芯线 (汇合后)
}

impl LineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineKind::Anode => "anode",
            LineKind::Cathode => "cathode",
            LineKind::Cell => "cell",
        }
    }
}

impl fmt::Display for LineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 工序类型 (Stage Kind)
// ==========================================
// 十道物理工序, 声明顺序即产线顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Mixing,             // 匀浆
    Coating,            // 涂布
    Drying,             // 干燥
    Calendaring,        // 辊压
    Slitting,           // 分切
    Inspection,         // 极片检测
    Rewinding,          // 卷绕
    ElectrolyteFilling, // 注液
    FormationCycling,   // 化成
    Aging,              // 老化
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Mixing => "mixing",
            StageKind::Coating => "coating",
            StageKind::Drying => "drying",
            StageKind::Calendaring => "calendaring",
            StageKind::Slitting => "slitting",
            StageKind::Inspection => "inspection",
            StageKind::Rewinding => "rewinding",
            StageKind::ElectrolyteFilling => "electrolyte_filling",
            StageKind::FormationCycling => "formation_cycling",
            StageKind::Aging => "aging",
        }
    }

    /// 电极线工序 (匀浆→辊压), 按产线顺序
    pub fn electrode_stages() -> &'static [StageKind] {
        &[
            StageKind::Mixing,
            StageKind::Coating,
            StageKind::Drying,
            StageKind::Calendaring,
        ]
    }

    /// 电芯线工序 (分切→老化), 按产线顺序
    pub fn cell_stages() -> &'static [StageKind] {
        &[
            StageKind::Slitting,
            StageKind::Inspection,
            StageKind::Rewinding,
            StageKind::ElectrolyteFilling,
            StageKind::FormationCycling,
            StageKind::Aging,
        ]
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 机台状态 (Machine State)
// ==========================================
// OFF → ON → OFF, run() 结束 (正常或提前退出) 后回到 OFF
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MachineState {
    Off,
    On,
}

impl MachineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineState::Off => "OFF",
            MachineState::On => "ON",
        }
    }
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 批次状态 (Batch Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Queued,    // 排队中
    Running,   // 处理中
    Completed, // 已完成
    Failed,    // 失败
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Queued => "QUEUED",
            BatchStatus::Running => "RUNNING",
            BatchStatus::Completed => "COMPLETED",
            BatchStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 浆料组分 (Slurry Component)
// ==========================================
// 封闭组分集合, 取代按字符串名动态存取
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlurryComponent {
    ActiveMaterial,     // 活性材料 (AM)
    ConductiveAdditive, // 导电剂 (CA)
    Binder,             // 粘结剂 (PVDF)
    Solvent,            // 溶剂 (H2O / NMP)
}

impl SlurryComponent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlurryComponent::ActiveMaterial => "AM",
            SlurryComponent::ConductiveAdditive => "CA",
            SlurryComponent::Binder => "PVDF",
            SlurryComponent::Solvent => "solvent",
        }
    }
}

impl fmt::Display for SlurryComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
