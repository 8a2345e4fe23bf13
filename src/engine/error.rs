// ==========================================
// 门店补货决策引擎 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 错误信息必须带商品/门店等显式原因
// ==========================================

use crate::domain::params::ParameterViolation;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    // ===== 单条记录错误（批次内隔离） =====
    #[error("无效输入 (商品 {product_code}, 字段 {field}): {message}")]
    InvalidInput {
        product_code: String,
        field: String,
        message: String,
    },

    // ===== 批次级错误 =====
    #[error("参数表配置错误 (门店 {destination_code}): {}", format_violations(.violations))]
    Configuration {
        destination_code: String,
        violations: Vec<ParameterViolation>,
    },

    #[error("批次已取消: 已完成 {completed}/{total}")]
    Cancelled { completed: usize, total: usize },
}

impl EngineError {
    pub fn invalid_input(product_code: &str, field: &str, message: impl Into<String>) -> Self {
        EngineError::InvalidInput {
            product_code: product_code.to_string(),
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// 是否为批次级致命错误
    pub fn is_batch_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::Configuration { .. } | EngineError::Cancelled { .. }
        )
    }
}

fn format_violations(violations: &[ParameterViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("[{}] {}", v.abc_class, v.message))
        .collect::<Vec<_>>()
        .join("; ")
}
