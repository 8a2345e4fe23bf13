// ==========================================
// 门店补货决策引擎 - 进度上报与取消
// ==========================================
// 职责: 定义进度上报 trait（依赖倒置，宿主程序实现适配器）
// 说明: 取消为粗粒度，仅在逐商品处理单元之间检查
// ==========================================

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ==========================================
// 进度事件
// ==========================================

/// 批处理阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgressStage {
    /// 主流程计算（分类 → 阈值 → 订货量 → 紧急度）
    Replenishment,
    /// 外部统计服务拉取
    VariabilityFetch,
}

impl ProgressStage {
    pub fn as_str(&self) -> &str {
        match self {
            ProgressStage::Replenishment => "REPLENISHMENT",
            ProgressStage::VariabilityFetch => "VARIABILITY_FETCH",
        }
    }
}

/// 进度事件（completed / total）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: ProgressStage,
    pub completed: usize,
    pub total: usize,
    /// 刚完成的商品
    pub product_code: Option<String>,
}

impl ProgressEvent {
    pub fn new(stage: ProgressStage, completed: usize, total: usize) -> Self {
        Self {
            stage,
            completed,
            total,
            product_code: None,
        }
    }

    pub fn with_product(mut self, product_code: impl Into<String>) -> Self {
        self.product_code = Some(product_code.into());
        self
    }

    pub fn is_finished(&self) -> bool {
        self.completed >= self.total
    }
}

// ==========================================
// 进度上报 Trait
// ==========================================

/// 进度上报者
///
/// 宿主程序实现（界面进度条、日志等），引擎只负责调用
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// 空操作上报者
///
/// 用于不需要进度的场景（如单元测试、批处理工具）
#[derive(Debug, Clone, Default)]
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report(&self, event: ProgressEvent) {
        tracing::trace!(
            stage = event.stage.as_str(),
            completed = event.completed,
            total = event.total,
            "NoOpProgressReporter: 跳过进度上报"
        );
    }
}

/// 可选的上报者包装
///
/// 简化 Option<Arc<dyn ProgressReporter>> 的使用
#[derive(Clone, Default)]
pub struct OptionalProgressReporter {
    inner: Option<Arc<dyn ProgressReporter>>,
}

impl OptionalProgressReporter {
    pub fn with_reporter(reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            inner: Some(reporter),
        }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    pub fn report(&self, event: ProgressEvent) {
        if let Some(reporter) = &self.inner {
            reporter.report(event);
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

// ==========================================
// 取消标志
// ==========================================

/// 协作式取消标志（可跨线程/任务共享）
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
