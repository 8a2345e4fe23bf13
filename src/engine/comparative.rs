// ==========================================
// 门店补货决策引擎 - 方法对比分析器
// ==========================================
// 职责: 基线方法 vs 波动感知方法，逐商品差异 + 理由 + 汇总
// 输入: 快照 + 参数表 + 波动指标（外部或本地近似）
// 输出: ComparisonReport
// 红线: 只读建议，不回写主流程记录；降级模式必须显式标记
// ==========================================

use crate::domain::analysis::{
    ComparisonFailure, ComparisonReport, ComparisonRow, ComparisonSummary, VariabilityMetrics,
};
use crate::domain::params::ParameterTable;
use crate::domain::record::{OrderSuggestion, StockThresholds};
use crate::domain::snapshot::VelocitySnapshot;
use crate::domain::types::{ComparisonVerdict, RationaleFactor, SeasonalityPattern, XyzClass};
use crate::engine::classifier::ClassifierEngine;
use crate::engine::error::EngineError;
use crate::engine::order_resolver::OrderQuantityResolver;
use crate::engine::stock_params::StockParameterCalculator;
use crate::engine::validator::validate_snapshot;
use crate::i18n::{t, t_with_args};
use crate::perf::PerfGuard;
use chrono::Utc;
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

/// 收敛容差（箱）
pub const DEFAULT_TOLERANCE_CASES: u32 = 2;

/// 理由阈值: 趋势幅度（%）
pub const RATIONALE_TREND_PCT: f64 = 10.0;

/// 理由阈值: 季节性因子
pub const RATIONALE_SEASONALITY_FACTOR: f64 = 1.1;

// ==========================================
// ComparativeAnalyzer - 方法对比分析器
// ==========================================
pub struct ComparativeAnalyzer {
    tolerance_cases: u32,
    classifier: ClassifierEngine,
    calculator: StockParameterCalculator,
    resolver: OrderQuantityResolver,
}

impl ComparativeAnalyzer {
    pub fn new() -> Self {
        Self::with_tolerance(DEFAULT_TOLERANCE_CASES)
    }

    pub fn with_tolerance(tolerance_cases: u32) -> Self {
        Self {
            tolerance_cases,
            classifier: ClassifierEngine::new(),
            calculator: StockParameterCalculator::new(),
            resolver: OrderQuantityResolver::new(),
        }
    }

    pub fn tolerance_cases(&self) -> u32 {
        self.tolerance_cases
    }

    // ==========================================
    // 批量对比
    // ==========================================

    /// 生成门店对比报告
    ///
    /// # 参数
    /// - external: 外部统计服务结果（按商品代码），缺失的商品回退到本地近似
    ///
    /// # 返回
    /// - Ok(report): 非法快照进入 failures，不影响其他商品
    /// - Err(Configuration): 参数表非法，整批中止
    #[instrument(skip_all, fields(destination = %destination_code, count = snapshots.len()))]
    pub fn analyze(
        &self,
        destination_code: &str,
        snapshots: &[VelocitySnapshot],
        table: &ParameterTable,
        external: &HashMap<String, VariabilityMetrics>,
    ) -> Result<ComparisonReport, EngineError> {
        let violations = table.validate();
        if !violations.is_empty() {
            return Err(EngineError::Configuration {
                destination_code: destination_code.to_string(),
                violations,
            });
        }

        let mut perf = PerfGuard::new("comparative_analyze");
        let mut rows = Vec::with_capacity(snapshots.len());
        let mut failures = Vec::new();

        for snapshot in snapshots {
            if let Err(e) = validate_snapshot(snapshot) {
                tracing::warn!(product_code = %snapshot.product_code, error = %e, "对比分析跳过非法快照");
                failures.push(ComparisonFailure {
                    product_code: snapshot.product_code.clone(),
                    message: e.to_string(),
                });
                continue;
            }

            let metrics = match external.get(&snapshot.product_code) {
                Some(m) => m.clone(),
                None => self.classifier.local_metrics(snapshot),
            };
            rows.push(self.compare_one(snapshot, table, &metrics));
        }

        let summary = Self::summarize(&rows);
        perf.set_items(rows.len());

        if summary.degraded {
            tracing::warn!(
                destination = %destination_code,
                approximated = summary.approximated,
                analyzed = summary.analyzed,
                "对比分析处于降级模式（部分或全部使用本地近似）"
            );
        }

        tracing::info!(
            destination = %destination_code,
            analyzed = summary.analyzed,
            converging = summary.converging,
            more = summary.alternative_more,
            less = summary.alternative_less,
            failures = failures.len(),
            "对比分析完成"
        );

        Ok(ComparisonReport {
            report_id: Uuid::new_v4().to_string(),
            destination_code: destination_code.to_string(),
            generated_at: Utc::now(),
            rows,
            summary,
            failures,
        })
    }

    // ==========================================
    // 单商品对比
    // ==========================================

    /// 单商品对比（调用方保证快照已校验）
    pub fn compare_one(
        &self,
        snapshot: &VelocitySnapshot,
        table: &ParameterTable,
        metrics: &VariabilityMetrics,
    ) -> ComparisonRow {
        let upc = snapshot.units_per_case;
        let classification = self.classifier.classify(snapshot, Some(metrics));

        let baseline_t = self.calculator.baseline(&classification, table);
        let alternative_t = self
            .calculator
            .variability_aware(&classification, table, metrics, upc);

        let baseline_s = self.resolver.resolve(snapshot, &classification, &baseline_t);
        let alternative_s = self
            .resolver
            .resolve(snapshot, &classification, &alternative_t);

        let diff_cases = alternative_s.suggested_cases as i64 - baseline_s.suggested_cases as i64;
        let diff_units = diff_cases as f64 * upc;
        let diff_cost = snapshot.unit_cost.map(|cost| diff_units * cost);
        let verdict = self.verdict(diff_cases);

        let (baseline_exposed, alternative_resolves) =
            Self::stockout_exposure(snapshot, &alternative_t, &baseline_s, &alternative_s);

        let rationale_factors = Self::rationale_factors(classification.xyz_class, metrics, verdict);
        let rationale = rationale_factors
            .iter()
            .map(|f| {
                Self::rationale_text(*f, classification.xyz_class, metrics, &baseline_t, &alternative_t)
            })
            .collect();

        ComparisonRow {
            product_code: snapshot.product_code.clone(),
            description: snapshot.description.clone(),
            abc_class: classification.abc_class,
            xyz_class: classification.xyz_class,
            baseline_cases: baseline_s.suggested_cases,
            alternative_cases: alternative_s.suggested_cases,
            diff_cases,
            diff_units,
            diff_cost,
            verdict,
            baseline_reorder_days: baseline_t.reorder.days,
            alternative_reorder_days: alternative_t.reorder.days,
            alternative_safety_days: alternative_t.safety.days,
            trend_pct: metrics.trend.change_pct,
            seasonality_factor: metrics.seasonality.factor,
            rationale_factors,
            rationale,
            variability_source: metrics.source,
            baseline_exposed,
            alternative_resolves,
        }
    }

    /// 差异结论: |diff| ≤ 容差 → 收敛
    pub fn verdict(&self, diff_cases: i64) -> ComparisonVerdict {
        let tolerance = self.tolerance_cases as i64;
        if diff_cases > tolerance {
            ComparisonVerdict::AlternativeSuggestsMore
        } else if diff_cases < -tolerance {
            ComparisonVerdict::AlternativeSuggestsLess
        } else {
            ComparisonVerdict::Converging
        }
    }

    // ==========================================
    // 理由
    // ==========================================

    /// 理由因子（顺序: 趋势 → 波动 → 季节性）
    ///
    /// 都不命中时: 收敛 → 稳定；不收敛 → 安全库存差异
    pub fn rationale_factors(
        xyz: XyzClass,
        metrics: &VariabilityMetrics,
        verdict: ComparisonVerdict,
    ) -> Vec<RationaleFactor> {
        let mut factors = Vec::new();
        if metrics.trend.change_pct.abs() > RATIONALE_TREND_PCT {
            factors.push(RationaleFactor::Trend);
        }
        if matches!(xyz, XyzClass::Y | XyzClass::Z) {
            factors.push(RationaleFactor::Variability);
        }
        if metrics.seasonality.factor > RATIONALE_SEASONALITY_FACTOR {
            factors.push(RationaleFactor::Seasonality);
        }
        if factors.is_empty() {
            factors.push(match verdict {
                ComparisonVerdict::Converging => RationaleFactor::Stable,
                _ => RationaleFactor::SafetyStock,
            });
        }
        factors
    }

    fn rationale_text(
        factor: RationaleFactor,
        xyz: XyzClass,
        metrics: &VariabilityMetrics,
        baseline: &StockThresholds,
        alternative: &StockThresholds,
    ) -> String {
        match factor {
            RationaleFactor::Trend => {
                let pct = metrics.trend.change_pct;
                let direction = if pct > 0.0 {
                    t("comparison.trend_up")
                } else {
                    t("comparison.trend_down")
                };
                t_with_args(
                    "comparison.rationale.trend",
                    &[("direction", &direction), ("pct", &format!("{:.1}", pct.abs()))],
                )
            }
            RationaleFactor::Variability => t_with_args(
                "comparison.rationale.variability",
                &[
                    ("xyz", xyz.as_str()),
                    ("cv", &format!("{:.2}", metrics.cv)),
                    ("safety_days", &format!("{:.2}", alternative.safety.days)),
                ],
            ),
            RationaleFactor::Seasonality => t_with_args(
                "comparison.rationale.seasonality",
                &[
                    ("pattern", &Self::pattern_label(metrics.seasonality.pattern)),
                    ("factor", &format!("{:.2}", metrics.seasonality.factor)),
                ],
            ),
            RationaleFactor::SafetyStock => t_with_args(
                "comparison.rationale.safety_stock",
                &[
                    ("safety_days", &format!("{:.2}", alternative.safety.days)),
                    ("baseline_safety_days", &format!("{:.2}", baseline.safety.days)),
                ],
            ),
            RationaleFactor::Stable => t("comparison.rationale.stable"),
        }
    }

    fn pattern_label(pattern: SeasonalityPattern) -> String {
        match pattern {
            SeasonalityPattern::None => t("seasonality.none"),
            SeasonalityPattern::Weekday => t("seasonality.weekday"),
            SeasonalityPattern::Weekend => t("seasonality.weekend"),
            SeasonalityPattern::PayCycle => t("seasonality.pay_cycle"),
        }
    }

    // ==========================================
    // 缺货风险 + 汇总
    // ==========================================

    /// 朴素缺货暴露判定
    ///
    /// 以替代方法的调整后销量为准:
    /// - 基线订货后覆盖天数 < 替代订货点 → 基线暴露
    /// - 暴露且替代订货后覆盖天数 ≥ 替代订货点 → 替代方法化解
    fn stockout_exposure(
        snapshot: &VelocitySnapshot,
        alternative_t: &StockThresholds,
        baseline_s: &OrderSuggestion,
        alternative_s: &OrderSuggestion,
    ) -> (bool, bool) {
        let upc = snapshot.units_per_case;
        let velocity_units = alternative_t.velocity_cases * upc;
        if !(velocity_units > 0.0) {
            return (false, false);
        }

        let on_hand = snapshot.stock_on_hand();
        let reorder_days = alternative_t.reorder.days;
        let cover = |cases: u32| (on_hand + cases as f64 * upc) / velocity_units;

        let exposed = cover(baseline_s.suggested_cases) < reorder_days;
        let resolves = exposed && cover(alternative_s.suggested_cases) >= reorder_days;
        (exposed, resolves)
    }

    /// 汇总
    pub fn summarize(rows: &[ComparisonRow]) -> ComparisonSummary {
        let mut summary = ComparisonSummary {
            analyzed: rows.len(),
            ..Default::default()
        };

        let mut resolved = 0usize;
        for row in rows {
            match row.verdict {
                ComparisonVerdict::Converging => summary.converging += 1,
                ComparisonVerdict::AlternativeSuggestsMore => summary.alternative_more += 1,
                ComparisonVerdict::AlternativeSuggestsLess => summary.alternative_less += 1,
            }
            summary.total_diff_cases += row.diff_cases;
            summary.total_diff_units += row.diff_units;
            summary.total_diff_cost += row.diff_cost.unwrap_or(0.0);
            if row.variability_source.is_degraded() {
                summary.approximated += 1;
            }
            if row.alternative_resolves {
                resolved += 1;
            }
        }

        summary.degraded = summary.approximated > 0;
        summary.stockout_risk_reduction_pct = if rows.is_empty() {
            0.0
        } else {
            resolved as f64 / rows.len() as f64 * 100.0
        };
        summary
    }
}

impl Default for ComparativeAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
