// ==========================================
// 门店补货决策引擎 - 分类引擎
// ==========================================
// 职责: ABC 速度分类 + XYZ 波动分类 + 趋势 + 季节性因子
// 输入: VelocitySnapshot（可选外部波动指标）
// 输出: Classification / TrendAnalysis / SeasonalityAnalysis
// 红线: 纯函数，非法速度/包装一律判 "-"，不抛错
// ==========================================

use crate::domain::analysis::{SeasonalityAnalysis, TrendAnalysis, VariabilityMetrics};
use crate::domain::record::Classification;
use crate::domain::snapshot::VelocitySnapshot;
use crate::domain::types::{
    AbcClass, SeasonalityPattern, TrendDirection, VariabilitySource, XyzClass,
};
use chrono::{Datelike, NaiveDate, Weekday};

/// ABC 断点（箱/天），自上而下命中即返回
pub const ABC_BREAKPOINTS: [(f64, AbcClass); 5] = [
    (20.0, AbcClass::A),
    (5.0, AbcClass::AB),
    (0.45, AbcClass::B),
    (0.20, AbcClass::BC),
    (0.001, AbcClass::C),
];

/// XYZ 断点: CV < 0.5 → X；0.5 ≤ CV ≤ 1.0 → Y；CV > 1.0 → Z
pub const XYZ_X_UPPER: f64 = 0.5;
pub const XYZ_Y_UPPER: f64 = 1.0;

/// 趋势判定阈值（±20% 相对变化）
pub const TREND_THRESHOLD: f64 = 0.2;

/// 季节性检测阈值（比值超过即视为存在模式）
pub const SEASONALITY_DETECTION_THRESHOLD: f64 = 1.1;

/// 发薪周期的固定抬升
pub const PAY_CYCLE_UPLIFT: f64 = 1.15;

/// 季节性因子上限
pub const SEASONALITY_CAP: f64 = 2.0;

// ==========================================
// ClassifierEngine - 分类引擎
// ==========================================
pub struct ClassifierEngine {
    // 无状态引擎,不需要注入依赖
}

impl ClassifierEngine {
    pub fn new() -> Self {
        Self {}
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 分类单个商品
    ///
    /// CV 来源: 优先使用外部波动指标，否则使用本地 5日/20日 差值近似
    pub fn classify(
        &self,
        snapshot: &VelocitySnapshot,
        metrics: Option<&VariabilityMetrics>,
    ) -> Classification {
        let case_velocity = snapshot.case_velocity();
        let abc_class = self.classify_abc_by_case_velocity(case_velocity);

        let cv = match metrics {
            Some(m) if m.cv.is_finite() && m.cv >= 0.0 => m.cv,
            _ => self.local_cv(snapshot),
        };

        Classification {
            abc_class,
            xyz_class: self.classify_xyz(cv),
            case_velocity,
            cv,
        }
    }

    // ==========================================
    // ABC 分类
    // ==========================================

    /// 按件数销量与包装分类
    pub fn classify_abc(&self, units_per_day: f64, units_per_case: f64) -> AbcClass {
        if !(units_per_case > 0.0) || !units_per_day.is_finite() {
            return AbcClass::Unclassified;
        }
        self.classify_abc_by_case_velocity(units_per_day / units_per_case)
    }

    /// 按箱当量销量分类
    pub fn classify_abc_by_case_velocity(&self, case_velocity: f64) -> AbcClass {
        if !case_velocity.is_finite() {
            return AbcClass::Unclassified;
        }
        ABC_BREAKPOINTS
            .iter()
            .find(|(threshold, _)| case_velocity >= *threshold)
            .map(|(_, class)| *class)
            .unwrap_or(AbcClass::Unclassified)
    }

    // ==========================================
    // XYZ 分类
    // ==========================================

    pub fn classify_xyz(&self, cv: f64) -> XyzClass {
        if !cv.is_finite() || cv > XYZ_Y_UPPER {
            XyzClass::Z
        } else if cv >= XYZ_X_UPPER {
            XyzClass::Y
        } else {
            XyzClass::X
        }
    }

    /// 变异系数（总体标准差 / 均值）
    ///
    /// 观测为空或均值为 0 时返回 0
    pub fn coefficient_of_variation(observations: &[f64]) -> f64 {
        let values: Vec<f64> = observations
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .collect();
        if values.is_empty() {
            return 0.0;
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        if mean <= 0.0 {
            return 0.0;
        }

        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        variance.sqrt() / mean
    }

    /// 本地日需求标准差近似（件/天）= |v5 - v20|
    pub fn local_stddev_units(&self, snapshot: &VelocitySnapshot) -> f64 {
        let spread = (snapshot.velocity_5d - snapshot.velocity_20d).abs();
        if spread.is_finite() {
            spread
        } else {
            0.0
        }
    }

    /// 本地 CV 近似 = |v5 - v20| / v20
    pub fn local_cv(&self, snapshot: &VelocitySnapshot) -> f64 {
        if !(snapshot.velocity_20d > 0.0) {
            return 0.0;
        }
        self.local_stddev_units(snapshot) / snapshot.velocity_20d
    }

    /// 本地近似波动指标（外部统计服务不可用时的降级来源）
    pub fn local_metrics(&self, snapshot: &VelocitySnapshot) -> VariabilityMetrics {
        VariabilityMetrics {
            product_code: snapshot.product_code.clone(),
            stddev_units: self.local_stddev_units(snapshot),
            cv: self.local_cv(snapshot),
            trend: self.analyze_trend(snapshot.velocity_5d, snapshot.velocity_20d),
            seasonality: self.detect_seasonality(snapshot),
            source: VariabilitySource::LocalApproximation,
        }
    }

    // ==========================================
    // 趋势
    // ==========================================

    /// 短窗 vs 长窗趋势（±20% 阈值）
    pub fn analyze_trend(&self, short_window: f64, long_window: f64) -> TrendAnalysis {
        if !(long_window > 0.0) || !short_window.is_finite() {
            return TrendAnalysis::stable();
        }

        let relative = (short_window - long_window) / long_window;
        let direction = if relative > TREND_THRESHOLD {
            TrendDirection::Growing
        } else if relative < -TREND_THRESHOLD {
            TrendDirection::Declining
        } else {
            TrendDirection::Stable
        };

        TrendAnalysis {
            direction,
            change_pct: relative * 100.0,
            confidence: relative.abs().min(1.0),
        }
    }

    // ==========================================
    // 季节性
    // ==========================================

    /// 检测星期/周末/发薪周期模式
    ///
    /// 规则（取最大因子）:
    /// 1) 同星期日均值 / 20日均值 > 1.1 → WEEKDAY
    /// 2) 快照为周五~周日，且周末 P75 / 周一~周四 P75 > 1.1 → WEEKEND
    /// 3) 快照日在月中（14~16）或月末（最后 2 天、1 号）→ PAY_CYCLE（1.15）
    pub fn detect_seasonality(&self, snapshot: &VelocitySnapshot) -> SeasonalityAnalysis {
        if !(snapshot.velocity_20d > 0.0) {
            return SeasonalityAnalysis::none();
        }

        let mut best = SeasonalityAnalysis::none();
        let mut consider = |pattern: SeasonalityPattern, factor: f64| {
            if factor.is_finite() && factor > SEASONALITY_DETECTION_THRESHOLD && factor > best.factor
            {
                best = SeasonalityAnalysis {
                    pattern,
                    factor: factor.min(SEASONALITY_CAP),
                };
            }
        };

        // 1) 同星期日
        consider(
            SeasonalityPattern::Weekday,
            snapshot.velocity_same_weekday / snapshot.velocity_20d,
        );

        // 2) 周末
        if Self::is_weekend_window(snapshot.snapshot_date) {
            let p75 = &snapshot.velocity_p75_per_weekday;
            let weekday_mean = p75[0..4].iter().sum::<f64>() / 4.0;
            let weekend_mean = (p75[5] + p75[6]) / 2.0;
            if weekday_mean > 0.0 {
                consider(SeasonalityPattern::Weekend, weekend_mean / weekday_mean);
            }
        }

        // 3) 发薪周期
        if Self::is_pay_cycle_window(snapshot.snapshot_date) {
            consider(SeasonalityPattern::PayCycle, PAY_CYCLE_UPLIFT);
        }

        best
    }

    fn is_weekend_window(date: NaiveDate) -> bool {
        matches!(date.weekday(), Weekday::Fri | Weekday::Sat | Weekday::Sun)
    }

    fn is_pay_cycle_window(date: NaiveDate) -> bool {
        let day = date.day();
        let last = Self::last_day_of_month(date);
        (14..=16).contains(&day) || day == 1 || day + 1 >= last
    }

    fn last_day_of_month(date: NaiveDate) -> u32 {
        let (year, month) = if date.month() == 12 {
            (date.year() + 1, 1)
        } else {
            (date.year(), date.month() + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|d| d.pred_opt())
            .map(|d| d.day())
            .unwrap_or(28)
    }
}

impl Default for ClassifierEngine {
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

    /// 2026-01-20 为周二，非月中/月末
    fn tuesday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 20).unwrap()
    }

    fn snapshot(v5: f64, v20: f64, upc: f64) -> VelocitySnapshot {
        let mut s = VelocitySnapshot::new("P001", "S001", tuesday(), upc);
        s.velocity_5d = v5;
        s.velocity_20d = v20;
        s.velocity_same_weekday = v20;
        s
    }

    #[test]
    fn test_abc_breakpoints_top_down() {
        let engine = ClassifierEngine::new();
        assert_eq!(engine.classify_abc_by_case_velocity(20.0), AbcClass::A);
        assert_eq!(engine.classify_abc_by_case_velocity(19.99), AbcClass::AB);
        assert_eq!(engine.classify_abc_by_case_velocity(5.0), AbcClass::AB);
        assert_eq!(engine.classify_abc_by_case_velocity(0.45), AbcClass::B);
        assert_eq!(engine.classify_abc_by_case_velocity(0.2), AbcClass::BC);
        assert_eq!(engine.classify_abc_by_case_velocity(0.001), AbcClass::C);
        assert_eq!(engine.classify_abc_by_case_velocity(0.0009), AbcClass::Unclassified);
        assert_eq!(engine.classify_abc_by_case_velocity(0.0), AbcClass::Unclassified);
    }

    #[test]
    fn test_abc_scenario_ab() {
        // 100 件/箱，1000 件/天 → 10 箱/天 → AB
        let engine = ClassifierEngine::new();
        assert_eq!(engine.classify_abc(1000.0, 100.0), AbcClass::AB);
    }

    #[test]
    fn test_abc_invalid_packaging_is_unclassified() {
        let engine = ClassifierEngine::new();
        assert_eq!(engine.classify_abc(1000.0, 0.0), AbcClass::Unclassified);
        assert_eq!(engine.classify_abc(1000.0, -12.0), AbcClass::Unclassified);
        assert_eq!(engine.classify_abc(f64::NAN, 12.0), AbcClass::Unclassified);
    }

    #[test]
    fn test_xyz_boundaries() {
        let engine = ClassifierEngine::new();
        assert_eq!(engine.classify_xyz(0.0), XyzClass::X);
        assert_eq!(engine.classify_xyz(0.49), XyzClass::X);
        assert_eq!(engine.classify_xyz(0.5), XyzClass::Y);
        assert_eq!(engine.classify_xyz(1.0), XyzClass::Y);
        assert_eq!(engine.classify_xyz(1.01), XyzClass::Z);
    }

    #[test]
    fn test_coefficient_of_variation() {
        assert_eq!(ClassifierEngine::coefficient_of_variation(&[]), 0.0);
        assert_eq!(ClassifierEngine::coefficient_of_variation(&[5.0, 5.0, 5.0]), 0.0);
        // 均值 5，总体标准差 2 → CV 0.4
        let cv = ClassifierEngine::coefficient_of_variation(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((cv - 0.4).abs() < 1e-9, "cv={}", cv);
    }

    #[test]
    fn test_classify_uses_local_proxy_without_metrics() {
        let engine = ClassifierEngine::new();
        // |80 - 100| / 100 = 0.2 → X
        let c = engine.classify(&snapshot(80.0, 100.0, 10.0), None);
        assert_eq!(c.abc_class, AbcClass::AB);
        assert_eq!(c.xyz_class, XyzClass::X);
        assert!((c.cv - 0.2).abs() < 1e-9);
        assert_eq!(c.combined(), "ABX");

        // |250 - 100| / 100 = 1.5 → Z
        let c = engine.classify(&snapshot(250.0, 100.0, 10.0), None);
        assert_eq!(c.xyz_class, XyzClass::Z);
    }

    #[test]
    fn test_zero_velocity_is_dash() {
        let engine = ClassifierEngine::new();
        let c = engine.classify(&snapshot(0.0, 0.0, 10.0), None);
        assert_eq!(c.abc_class, AbcClass::Unclassified);
        assert!(c.is_skipped());
        assert_eq!(c.combined(), "-X");
    }

    #[test]
    fn test_trend_directions() {
        let engine = ClassifierEngine::new();
        let t = engine.analyze_trend(130.0, 100.0);
        assert_eq!(t.direction, TrendDirection::Growing);
        assert!((t.change_pct - 30.0).abs() < 1e-9);
        assert!((t.confidence - 0.3).abs() < 1e-9);

        let t = engine.analyze_trend(70.0, 100.0);
        assert_eq!(t.direction, TrendDirection::Declining);

        let t = engine.analyze_trend(115.0, 100.0);
        assert_eq!(t.direction, TrendDirection::Stable);

        let t = engine.analyze_trend(400.0, 100.0);
        assert_eq!(t.confidence, 1.0);

        let t = engine.analyze_trend(10.0, 0.0);
        assert_eq!(t, TrendAnalysis::stable());
    }

    #[test]
    fn test_seasonality_none_by_default() {
        let engine = ClassifierEngine::new();
        let s = engine.detect_seasonality(&snapshot(100.0, 100.0, 10.0));
        assert_eq!(s.pattern, SeasonalityPattern::None);
        assert_eq!(s.factor, 1.0);
    }

    #[test]
    fn test_seasonality_weekday() {
        let engine = ClassifierEngine::new();
        let mut s = snapshot(100.0, 100.0, 10.0);
        s.velocity_same_weekday = 130.0;
        let result = engine.detect_seasonality(&s);
        assert_eq!(result.pattern, SeasonalityPattern::Weekday);
        assert!((result.factor - 1.3).abs() < 1e-9);
    }

    #[test]
    fn test_seasonality_weekend_and_cap() {
        let engine = ClassifierEngine::new();
        // 2026-01-24 为周六
        let mut s = snapshot(100.0, 100.0, 10.0);
        s.snapshot_date = NaiveDate::from_ymd_opt(2026, 1, 24).unwrap();
        s.velocity_p75_per_weekday = [50.0, 50.0, 50.0, 50.0, 80.0, 200.0, 200.0];
        let result = engine.detect_seasonality(&s);
        assert_eq!(result.pattern, SeasonalityPattern::Weekend);
        assert_eq!(result.factor, SEASONALITY_CAP);
    }

    #[test]
    fn test_seasonality_pay_cycle() {
        let engine = ClassifierEngine::new();
        let mut s = snapshot(100.0, 100.0, 10.0);
        s.snapshot_date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        let result = engine.detect_seasonality(&s);
        assert_eq!(result.pattern, SeasonalityPattern::PayCycle);
        assert!(result.factor > 1.1);

        s.snapshot_date = NaiveDate::from_ymd_opt(2026, 2, 27).unwrap();
        assert_eq!(engine.detect_seasonality(&s).pattern, SeasonalityPattern::PayCycle);
    }
}
