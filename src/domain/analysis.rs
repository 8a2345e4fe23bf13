// ==========================================
// 门店补货决策引擎 - 波动/趋势/对比分析对象
// ==========================================
// 职责: 变异系数、趋势、季节性，以及两种备货方法的对比报告
// 红线: 对比分析只读，不回写主流程记录
// ==========================================

use crate::domain::types::{
    AbcClass, ComparisonVerdict, RationaleFactor, SeasonalityPattern, TrendDirection,
    VariabilitySource, XyzClass,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 趋势分析结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub direction: TrendDirection,
    /// 相对变化百分比，(短窗 - 长窗) / 长窗 × 100
    pub change_pct: f64,
    /// 置信度代理 = min(|相对变化|, 1.0)
    pub confidence: f64,
}

impl TrendAnalysis {
    pub fn stable() -> Self {
        Self {
            direction: TrendDirection::Stable,
            change_pct: 0.0,
            confidence: 0.0,
        }
    }

    /// 相对变化（小数）
    pub fn relative_change(&self) -> f64 {
        self.change_pct / 100.0
    }
}

/// 季节性分析结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeasonalityAnalysis {
    pub pattern: SeasonalityPattern,
    /// 乘数因子 ≥ 1.0，未检测到时为 1.0
    pub factor: f64,
}

impl SeasonalityAnalysis {
    pub fn none() -> Self {
        Self {
            pattern: SeasonalityPattern::None,
            factor: 1.0,
        }
    }
}

/// 单商品波动指标（外部统计服务或本地近似）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariabilityMetrics {
    pub product_code: String,
    /// 日需求标准差（件/天）
    pub stddev_units: f64,
    pub cv: f64,
    pub trend: TrendAnalysis,
    pub seasonality: SeasonalityAnalysis,
    pub source: VariabilitySource,
}

// ==========================================
// 对比报告
// ==========================================

/// 单商品对比行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub product_code: String,
    pub description: Option<String>,
    pub abc_class: AbcClass,
    pub xyz_class: XyzClass,
    pub baseline_cases: u32,
    pub alternative_cases: u32,
    /// alternative - baseline
    pub diff_cases: i64,
    pub diff_units: f64,
    /// 单件成本已知时的金额差
    pub diff_cost: Option<f64>,
    pub verdict: ComparisonVerdict,
    pub baseline_reorder_days: f64,
    pub alternative_reorder_days: f64,
    pub alternative_safety_days: f64,
    pub trend_pct: f64,
    pub seasonality_factor: f64,
    pub rationale_factors: Vec<RationaleFactor>,
    /// 本地化理由文本
    pub rationale: Vec<String>,
    pub variability_source: VariabilitySource,
    /// 基线方法订货后仍低于替代方法订货点
    pub baseline_exposed: bool,
    /// 替代方法订货后覆盖到订货点
    pub alternative_resolves: bool,
}

/// 对比汇总
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub analyzed: usize,
    pub converging: usize,
    pub alternative_more: usize,
    pub alternative_less: usize,
    pub total_diff_cases: i64,
    pub total_diff_units: f64,
    pub total_diff_cost: f64,
    /// 朴素缺货风险下降估计（%）
    pub stockout_risk_reduction_pct: f64,
    /// 使用本地近似的商品数
    pub approximated: usize,
    /// 任一商品使用本地近似即为降级模式
    pub degraded: bool,
}

/// 单商品分析失败
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonFailure {
    pub product_code: String,
    pub message: String,
}

/// 对比报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub report_id: String,
    pub destination_code: String,
    pub generated_at: DateTime<Utc>,
    pub rows: Vec<ComparisonRow>,
    pub summary: ComparisonSummary,
    pub failures: Vec<ComparisonFailure>,
}

impl ComparisonReport {
    pub fn row(&self, product_code: &str) -> Option<&ComparisonRow> {
        self.rows.iter().find(|r| r.product_code == product_code)
    }
}
