// ==========================================
// 电池产线数字孪生 - 批次实体
// ==========================================
// 职责: 一次生产运行的工作单元, 跟踪各产线最新模型快照
// 说明: 批次没有模型链之外的独立身份, 从入队存在到电芯线结束
// ==========================================

use crate::domain::types::{BatchStatus, LineKind, StageKind};
use crate::params::StageParameters;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

/// 批次级参数覆盖: 在批次开始前写入指定机台
#[derive(Debug, Clone)]
pub struct ParameterOverride {
    pub line: LineKind,
    pub stage: StageKind,
    pub parameters: StageParameters,
}

/// 生产批次
///
/// 记录批次生命周期状态与各产线最近一次完成工序的模型属性。
/// 模型本体沿产线在机台间移交, 批次只保留只读快照。
#[derive(Debug, Clone)]
pub struct Batch {
    pub batch_id: String,
    pub status: BatchStatus,
    pub requested_at: DateTime<Utc>,
    /// 批次附带的参数包 (可为空)
    pub overrides: Vec<ParameterOverride>,
    anode_model: Option<Value>,
    cathode_model: Option<Value>,
    cell_model: Option<Value>,
}

impl Batch {
    /// 创建新批次
    pub fn new(batch_id: impl Into<String>) -> Self {
        Self {
            batch_id: batch_id.into(),
            status: BatchStatus::Queued,
            requested_at: Utc::now(),
            overrides: Vec::new(),
            anode_model: None,
            cathode_model: None,
            cell_model: None,
        }
    }

    /// 创建带随机 ID 的批次
    pub fn with_random_id() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    /// 附加参数覆盖
    pub fn with_override(
        mut self,
        line: LineKind,
        stage: StageKind,
        parameters: StageParameters,
    ) -> Self {
        self.overrides.push(ParameterOverride {
            line,
            stage,
            parameters,
        });
        self
    }

    /// 记录某条产线最近完成工序的模型属性
    pub fn update_line_model(&mut self, line: LineKind, properties: Value) {
        match line {
            LineKind::Anode => self.anode_model = Some(properties),
            LineKind::Cathode => self.cathode_model = Some(properties),
            LineKind::Cell => self.cell_model = Some(properties),
        }
    }

    /// 批次状态视图 (供控制面查询)
    pub fn state_view(&self) -> Value {
        json!({
            "batch_id": self.batch_id,
            "status": self.status.as_str(),
            "requested_at": self.requested_at.to_rfc3339(),
            "current_anode_line_model": self.anode_model,
            "current_cathode_line_model": self.cathode_model,
            "current_cell_line_model": self.cell_model,
        })
    }
}
