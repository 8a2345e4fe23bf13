// ==========================================
// 门店补货决策引擎 - API 层错误类型
// ==========================================
// 职责: 汇总引擎/导入/统计/配置各层错误，对外统一为 ApiError
// 红线: 错误信息必须包含显式原因
// ==========================================

use crate::engine::error::EngineError;
use crate::importer::error::ImportError;
use crate::stats::error::StatsError;
use std::error::Error;
use thiserror::Error;

/// API 层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ===== 请求错误 =====
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ===== 下层错误 =====
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("文件导入失败: {0}")]
    Import(#[from] ImportError),

    #[error("统计服务错误: {0}")]
    Stats(#[from] StatsError),

    /// 配置读取失败（含存储的 JSON 非法）
    #[error("配置错误: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<Box<dyn Error + Send + Sync>> for ApiError {
    fn from(err: Box<dyn Error + Send + Sync>) -> Self {
        ApiError::Config(err.to_string())
    }
}

impl ApiError {
    /// 是否为取消
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Engine(EngineError::Cancelled { .. }))
    }
}

/// API 层 Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
