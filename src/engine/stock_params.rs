// ==========================================
// 门店补货决策引擎 - 库存参数计算器
// ==========================================
// 职责: 等级 + 销量 → 最小/安全/订货点/最大库存（天数 + 箱数）
// 方法: 基线（参数表倍数） / 波动感知（z × σ × √LT）
// 红线: 两种方法相互独立，可并列计算；"-" 一律全零
// ==========================================

use crate::domain::analysis::{SeasonalityAnalysis, TrendAnalysis, VariabilityMetrics};
use crate::domain::params::{ParameterTable, LEAD_TIME_DAYS};
use crate::domain::record::{Classification, StockThresholds, ThresholdLevel};
use crate::domain::types::{AbcClass, TrendDirection, XyzClass};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// 趋势乘数的上下限
pub const TREND_MULTIPLIER_MIN: f64 = 0.5;
pub const TREND_MULTIPLIER_MAX: f64 = 1.5;

/// 阈值计算方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThresholdMethod {
    Baseline,
    VariabilityAware,
}

// ==========================================
// StockParameterCalculator - 库存参数计算器
// ==========================================
pub struct StockParameterCalculator {
    // 无状态引擎,参数表由调用方传入
}

impl StockParameterCalculator {
    pub fn new() -> Self {
        Self {}
    }

    // ==========================================
    // 基线方法
    // ==========================================

    /// 基线阈值
    ///
    /// 公式:
    /// - minimum_days = min_mult[class]
    /// - safety_days  = safety_mult[class]
    /// - reorder_days = minimum + safety + LEAD_TIME_DAYS
    /// - maximum_days = max_mult[class]
    /// - X_cases      = v × X_days
    pub fn baseline(&self, classification: &Classification, table: &ParameterTable) -> StockThresholds {
        if classification.is_skipped() {
            return StockThresholds::zero();
        }

        let Some(m) = table.get(classification.abc_class) else {
            tracing::warn!(
                abc_class = %classification.abc_class,
                scope = %table.scope,
                "参数表缺少等级倍数，阈值置零"
            );
            return StockThresholds::zero();
        };

        let v = classification.case_velocity;
        StockThresholds {
            velocity_cases: v,
            minimum: ThresholdLevel::from_days(m.min_mult, v),
            safety: ThresholdLevel::from_days(m.safety_mult, v),
            reorder: ThresholdLevel::from_days(m.reorder_days(), v),
            maximum: ThresholdLevel::from_days(m.max_mult, v),
        }
    }

    // ==========================================
    // 波动感知方法
    // ==========================================

    /// 波动感知阈值
    ///
    /// 公式:
    /// - v'           = v × trend_multiplier × seasonality_factor
    /// - safety_cases = z(abc) × xyz_adj × σ_cases × √LEAD_TIME_DAYS
    /// - safety_days  = safety_cases / v'
    /// - reorder_days = minimum + safety + LEAD_TIME_DAYS
    /// - maximum_days = max(max_mult, reorder_days)
    pub fn variability_aware(
        &self,
        classification: &Classification,
        table: &ParameterTable,
        metrics: &VariabilityMetrics,
        units_per_case: f64,
    ) -> StockThresholds {
        if classification.is_skipped() || !(units_per_case > 0.0) {
            return StockThresholds::zero();
        }

        let Some(m) = table.get(classification.abc_class) else {
            return StockThresholds::zero();
        };

        let v = self.adjusted_velocity(
            classification.case_velocity,
            &metrics.trend,
            &metrics.seasonality,
        );
        if !(v > 0.0) {
            return StockThresholds::zero();
        }

        let stddev_cases = (metrics.stddev_units / units_per_case).max(0.0);
        let safety_cases = self.statistical_safety_cases(
            classification.abc_class,
            classification.xyz_class,
            stddev_cases,
        );
        let safety_days = safety_cases / v;

        let minimum_days = m.min_mult;
        let reorder_days = minimum_days + safety_days + LEAD_TIME_DAYS;
        let maximum_days = m.max_mult.max(reorder_days);

        StockThresholds {
            velocity_cases: v,
            minimum: ThresholdLevel::from_days(minimum_days, v),
            safety: ThresholdLevel {
                days: safety_days,
                cases: safety_cases,
            },
            reorder: ThresholdLevel::from_days(reorder_days, v),
            maximum: ThresholdLevel::from_days(maximum_days, v),
        }
    }

    /// 统计安全库存（箱）
    pub fn statistical_safety_cases(&self, abc: AbcClass, xyz: XyzClass, stddev_cases: f64) -> f64 {
        Self::z_score(abc) * xyz.safety_adjustment() * stddev_cases * LEAD_TIME_DAYS.sqrt()
    }

    /// 服务水平对应 z 值: A 99% / AB 98% / B 95% / BC 90% / C 80%
    pub fn z_score(abc: AbcClass) -> f64 {
        match abc {
            AbcClass::A => 2.33,
            AbcClass::AB => 2.05,
            AbcClass::B => 1.65,
            AbcClass::BC => 1.28,
            AbcClass::C => 0.84,
            AbcClass::Unclassified => 0.0,
        }
    }

    /// 趋势 + 季节性调整后的销量
    ///
    /// 稳定趋势乘数为 1；增长/下降时为 clamp(1 + r, 0.5, 1.5)
    pub fn adjusted_velocity(
        &self,
        case_velocity: f64,
        trend: &TrendAnalysis,
        seasonality: &SeasonalityAnalysis,
    ) -> f64 {
        let trend_multiplier = match trend.direction {
            TrendDirection::Stable => 1.0,
            _ => (1.0 + trend.relative_change()).clamp(TREND_MULTIPLIER_MIN, TREND_MULTIPLIER_MAX),
        };
        let season = if seasonality.factor.is_finite() {
            seasonality.factor.max(1.0)
        } else {
            1.0
        };
        case_velocity * trend_multiplier * season
    }

    // ==========================================
    // 可解释性
    // ==========================================

    /// 阈值推导说明（JSON），供"解释此数字"界面直接展示
    pub fn explain_thresholds(
        &self,
        classification: &Classification,
        thresholds: &StockThresholds,
        method: ThresholdMethod,
        units_per_case: f64,
    ) -> String {
        let level = |l: &ThresholdLevel| {
            json!({
                "days": l.days,
                "cases": l.cases,
                "units": l.units(units_per_case),
            })
        };

        json!({
            "method": method,
            "abc_class": classification.abc_class,
            "xyz_class": classification.xyz_class,
            "combined_class": classification.combined(),
            "case_velocity": classification.case_velocity,
            "velocity_used": thresholds.velocity_cases,
            "lead_time_days": LEAD_TIME_DAYS,
            "skipped": classification.is_skipped(),
            "minimum": level(&thresholds.minimum),
            "safety": level(&thresholds.safety),
            "reorder": level(&thresholds.reorder),
            "maximum": level(&thresholds.maximum),
        })
        .to_string()
    }
}

impl Default for StockParameterCalculator {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::params::ClassMultipliers;
    use crate::domain::types::{SeasonalityPattern, VariabilitySource};

    fn classification(abc: AbcClass, xyz: XyzClass, v: f64) -> Classification {
        Classification {
            abc_class: abc,
            xyz_class: xyz,
            case_velocity: v,
            cv: 0.0,
        }
    }

    fn metrics(stddev_units: f64, trend: TrendAnalysis, factor: f64) -> VariabilityMetrics {
        VariabilityMetrics {
            product_code: "P001".to_string(),
            stddev_units,
            cv: 0.3,
            trend,
            seasonality: SeasonalityAnalysis {
                pattern: if factor > 1.0 {
                    SeasonalityPattern::Weekday
                } else {
                    SeasonalityPattern::None
                },
                factor,
            },
            source: VariabilitySource::External,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_baseline_scenario_ab() {
        // v = 10 箱/天，AB: min 2.0 / safety 0.5 / max 7.0
        let calc = StockParameterCalculator::new();
        let table = ParameterTable::fallback()
            .with_class(AbcClass::AB, ClassMultipliers::new(2.0, 0.5, 7.0));
        let t = calc.baseline(&classification(AbcClass::AB, XyzClass::X, 10.0), &table);

        assert!(approx(t.minimum.days, 2.0));
        assert!(approx(t.safety.days, 0.5));
        assert!(approx(t.reorder.days, 3.75));
        assert!(approx(t.maximum.days, 7.0));
        assert!(approx(t.maximum.cases, 70.0));
        assert!(approx(t.maximum.units(100.0), 7000.0));
        assert!(t.minimum.days <= t.reorder.days && t.reorder.days <= t.maximum.days);
    }

    #[test]
    fn test_baseline_zero_for_unclassified() {
        let calc = StockParameterCalculator::new();
        let t = calc.baseline(
            &classification(AbcClass::Unclassified, XyzClass::X, 0.0),
            &ParameterTable::fallback(),
        );
        assert!(t.is_zero());
    }

    #[test]
    fn test_variability_aware_safety_formula() {
        let calc = StockParameterCalculator::new();
        let table = ParameterTable::fallback();
        // σ = 300 件/天, 100 件/箱 → 3 箱；B/Y: z=1.65, adj=1.0
        let t = calc.variability_aware(
            &classification(AbcClass::B, XyzClass::Y, 2.0),
            &table,
            &metrics(300.0, TrendAnalysis::stable(), 1.0),
            100.0,
        );
        let expected_safety = 1.65 * 1.0 * 3.0 * LEAD_TIME_DAYS.sqrt();
        assert!(approx(t.safety.cases, expected_safety));
        assert!(approx(t.safety.days, expected_safety / 2.0));
        assert!(approx(t.reorder.days, 3.0 + expected_safety / 2.0 + LEAD_TIME_DAYS));
        assert!(t.reorder.days <= t.maximum.days);
    }

    #[test]
    fn test_xyz_adjustment_scales_safety() {
        let calc = StockParameterCalculator::new();
        let x = calc.statistical_safety_cases(AbcClass::A, XyzClass::X, 1.0);
        let z = calc.statistical_safety_cases(AbcClass::A, XyzClass::Z, 1.0);
        assert!(approx(x / z, 0.8 / 1.3));
    }

    #[test]
    fn test_maximum_stretches_to_reorder() {
        // 极端波动使订货点超过 max_mult，最大库存随之抬升
        let calc = StockParameterCalculator::new();
        let t = calc.variability_aware(
            &classification(AbcClass::A, XyzClass::Z, 1.0),
            &ParameterTable::fallback(),
            &metrics(10_000.0, TrendAnalysis::stable(), 1.0),
            10.0,
        );
        assert!(t.reorder.days > 4.0);
        assert!(approx(t.maximum.days, t.reorder.days));
    }

    #[test]
    fn test_adjusted_velocity_trend_and_season() {
        let calc = StockParameterCalculator::new();
        let growing = TrendAnalysis {
            direction: TrendDirection::Growing,
            change_pct: 30.0,
            confidence: 0.3,
        };
        let season = SeasonalityAnalysis {
            pattern: SeasonalityPattern::Weekend,
            factor: 1.2,
        };
        assert!(approx(calc.adjusted_velocity(10.0, &growing, &season), 10.0 * 1.3 * 1.2));

        let extreme = TrendAnalysis {
            direction: TrendDirection::Growing,
            change_pct: 300.0,
            confidence: 1.0,
        };
        assert!(approx(
            calc.adjusted_velocity(10.0, &extreme, &SeasonalityAnalysis::none()),
            15.0
        ));

        let small = TrendAnalysis {
            direction: TrendDirection::Stable,
            change_pct: 15.0,
            confidence: 0.15,
        };
        assert!(approx(
            calc.adjusted_velocity(10.0, &small, &SeasonalityAnalysis::none()),
            10.0
        ));
    }

    #[test]
    fn test_explain_contains_method_and_class() {
        let calc = StockParameterCalculator::new();
        let c = classification(AbcClass::AB, XyzClass::Y, 10.0);
        let t = calc.baseline(&c, &ParameterTable::fallback());
        let json: serde_json::Value = serde_json::from_str(&calc.explain_thresholds(
            &c,
            &t,
            ThresholdMethod::Baseline,
            100.0,
        ))
        .unwrap();
        assert_eq!(json["method"], "BASELINE");
        assert_eq!(json["combined_class"], "ABY");
        assert_eq!(json["maximum"]["units"], 7000.0);
    }
}
