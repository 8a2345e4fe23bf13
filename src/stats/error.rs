// ==========================================
// 门店补货决策引擎 - 外部统计服务错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 单商品失败只记录并回退本地近似，不中断批次
// ==========================================

use thiserror::Error;

/// 外部统计服务错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    // ===== 连接级错误（整批回退） =====
    #[error("统计服务不可达 ({url}): {message}")]
    Unavailable { url: String, message: String },

    // ===== 单商品错误 =====
    #[error("统计服务请求超时 (商品 {product_code}, {timeout_ms}ms)")]
    Timeout { product_code: String, timeout_ms: u64 },

    #[error("统计服务返回错误状态 (商品 {product_code}): HTTP {status} - {body}")]
    HttpStatus {
        product_code: String,
        status: u16,
        body: String,
    },

    #[error("统计服务响应非法 (商品 {product_code}): {message}")]
    InvalidResponse {
        product_code: String,
        message: String,
    },

    #[error("统计服务请求失败 (商品 {product_code}): {message}")]
    Request {
        product_code: String,
        message: String,
    },

    #[error("客户端配置错误: {0}")]
    Client(String),

    #[error("请求已取消 (商品 {product_code})")]
    Cancelled { product_code: String },
}

impl StatsError {
    /// 是否为服务整体不可用（应整批回退）
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StatsError::Unavailable { .. })
    }
}
