// ==========================================
// 电池产线数字孪生 - 核心错误类型
// ==========================================
// 职责: 仿真核心的统一错误分类
// 工具: thiserror 派生宏
// 说明: 数值防护 (除零/越界钳制) 不是错误, 由模型层返回中性值
// ==========================================

use crate::domain::types::{LineKind, StageKind};
use thiserror::Error;

/// 仿真核心错误类型
#[derive(Error, Debug)]
pub enum SimulationError {
    // ===== 参数校验错误 =====
    #[error("参数校验失败 (field={field}): {message}")]
    Validation { field: String, message: String },

    // ===== 模型链错误 =====
    #[error("模型链断裂 (process={process}): {message}")]
    ModelChain { process: String, message: String },

    // ===== 产线运行错误 =====
    #[error("产线 {line} 运行失败: {source}")]
    LineFailure {
        line: LineKind,
        #[source]
        source: Box<SimulationError>,
    },

    // ===== 控制面错误 =====
    #[error("批次队列已满: 最多允许 {limit} 个待处理批次")]
    BatchLimitReached { limit: usize },

    #[error("机台正在运行, 无法更新参数 (process={process})")]
    MachineBusy { process: String },

    #[error("机台未找到: line={line}, stage={stage}")]
    UnknownMachine { line: LineKind, stage: StageKind },

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SimulationError {
    /// 构造参数校验错误
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        SimulationError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// 构造模型链错误
    pub fn model_chain(process: impl Into<String>, message: impl Into<String>) -> Self {
        SimulationError::ModelChain {
            process: process.into(),
            message: message.into(),
        }
    }

    /// 包装为产线运行错误
    pub fn into_line_failure(self, line: LineKind) -> Self {
        SimulationError::LineFailure {
            line,
            source: Box::new(self),
        }
    }
}

/// Result 类型别名
pub type SimulationResult<T> = Result<T, SimulationError>;
