// ==========================================
// 门店补货决策引擎 - 紧急度排序器
// ==========================================
// 职责: 库存位置层级 + ABC 权重 → 紧急度评分，并稳定排序
// 公式: criticality = tier × 10 + abc_weight（越小越紧急）
// 红线: 评分可由记录当前字段完全重算，不单独持久化
// ==========================================

use crate::domain::record::{
    Classification, CriticalityScore, OrderSuggestion, ProductReplenishmentRecord,
    StockThresholds,
};
use crate::domain::types::UrgencyTier;
use std::collections::HashMap;

// ==========================================
// CriticalityRanker - 紧急度排序器
// ==========================================
pub struct CriticalityRanker {
    // 无状态引擎,不需要注入依赖
}

impl CriticalityRanker {
    pub fn new() -> Self {
        Self {}
    }

    // ==========================================
    // 评分
    // ==========================================

    /// 计算紧急度
    ///
    /// 规则:
    /// 1) 分类为 "-" 或覆盖天数为 +∞ → 哨兵 999
    /// 2) 层级: ≤ minimum → 1, ≤ reorder → 2, ≤ maximum → 3, 否则 4
    /// 3) score = tier × 10 + abc_weight
    pub fn score(
        &self,
        classification: &Classification,
        thresholds: &StockThresholds,
        suggestion: &OrderSuggestion,
    ) -> CriticalityScore {
        let abc_weight = classification.abc_class.weight();

        if classification.is_skipped() {
            return CriticalityScore::sentinel(abc_weight);
        }

        let Some(stock_days) = suggestion.stock_days else {
            return CriticalityScore::sentinel(abc_weight);
        };

        let tier = self.tier(stock_days, thresholds);
        CriticalityScore {
            tier: Some(tier),
            abc_weight,
            score: tier.rank() * 10 + abc_weight,
        }
    }

    /// 四级层级判定
    pub fn tier(&self, stock_days: f64, thresholds: &StockThresholds) -> UrgencyTier {
        if stock_days <= thresholds.minimum.days {
            UrgencyTier::Critical
        } else if stock_days <= thresholds.reorder.days {
            UrgencyTier::Urgent
        } else if stock_days <= thresholds.maximum.days {
            UrgencyTier::Optimal
        } else {
            UrgencyTier::Excess
        }
    }

    /// 从记录当前字段重算紧急度
    pub fn rescore(&self, record: &ProductReplenishmentRecord) -> CriticalityScore {
        self.score(&record.classification, &record.thresholds, &record.suggestion)
    }

    // ==========================================
    // 排序
    // ==========================================

    /// 按紧急度升序稳定排序（同分保持原有相对顺序）
    pub fn rank(&self, records: &mut [ProductReplenishmentRecord]) {
        records.sort_by_key(|r| r.criticality.score);
    }

    /// 按层级统计数量（哨兵记录不计入）
    pub fn tier_counts(&self, records: &[ProductReplenishmentRecord]) -> HashMap<UrgencyTier, usize> {
        let mut counts: HashMap<UrgencyTier, usize> = HashMap::new();
        for tier in records.iter().filter_map(|r| r.criticality.tier) {
            *counts.entry(tier).or_insert(0) += 1;
        }
        counts
    }
}

impl Default for CriticalityRanker {
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
    use crate::domain::record::{ThresholdLevel, CRITICALITY_SENTINEL};
    use crate::domain::types::{AbcClass, OrderDecision, XyzClass};

    fn thresholds() -> StockThresholds {
        StockThresholds {
            velocity_cases: 10.0,
            minimum: ThresholdLevel::from_days(2.0, 10.0),
            safety: ThresholdLevel::from_days(0.5, 10.0),
            reorder: ThresholdLevel::from_days(3.75, 10.0),
            maximum: ThresholdLevel::from_days(7.0, 10.0),
        }
    }

    fn classification(abc: AbcClass) -> Classification {
        Classification {
            abc_class: abc,
            xyz_class: XyzClass::X,
            case_velocity: if abc.is_ranked() { 10.0 } else { 0.0 },
            cv: 0.0,
        }
    }

    fn suggestion(stock_days: Option<f64>) -> OrderSuggestion {
        OrderSuggestion {
            decision: OrderDecision::Hold,
            stock_days,
            target_units: 0.0,
            final_units: 0.0,
            suggested_cases: 0,
            clamped_by_upstream: false,
            reason: String::new(),
        }
    }

    #[test]
    fn test_tier_boundaries() {
        let ranker = CriticalityRanker::new();
        let t = thresholds();
        assert_eq!(ranker.tier(2.0, &t), UrgencyTier::Critical);
        assert_eq!(ranker.tier(2.01, &t), UrgencyTier::Urgent);
        assert_eq!(ranker.tier(3.75, &t), UrgencyTier::Urgent);
        assert_eq!(ranker.tier(7.0, &t), UrgencyTier::Optimal);
        assert_eq!(ranker.tier(7.01, &t), UrgencyTier::Excess);
    }

    #[test]
    fn test_score_formula() {
        let ranker = CriticalityRanker::new();
        let s = ranker.score(&classification(AbcClass::AB), &thresholds(), &suggestion(Some(0.5)));
        assert_eq!(s.tier, Some(UrgencyTier::Critical));
        assert_eq!(s.score, 12);

        let s = ranker.score(&classification(AbcClass::C), &thresholds(), &suggestion(Some(10.0)));
        assert_eq!(s.score, 45);
    }

    #[test]
    fn test_sentinel_for_no_velocity() {
        let ranker = CriticalityRanker::new();
        let s = ranker.score(
            &classification(AbcClass::Unclassified),
            &StockThresholds::zero(),
            &suggestion(None),
        );
        assert_eq!(s.score, CRITICALITY_SENTINEL);
        assert_eq!(s.tier, None);
        assert_eq!(s.abc_weight, 6);
    }

    #[test]
    fn test_tier_counts_skip_sentinel() {
        let ranker = CriticalityRanker::new();
        let record = |code: &str, abc: AbcClass, stock_days: Option<f64>| {
            let c = classification(abc);
            let t = if abc.is_ranked() { thresholds() } else { StockThresholds::zero() };
            let s = suggestion(stock_days);
            let criticality = ranker.score(&c, &t, &s);
            let snapshot = crate::domain::snapshot::VelocitySnapshot::new(
                code,
                "S001",
                chrono::NaiveDate::from_ymd_opt(2026, 1, 20).unwrap(),
                10.0,
            );
            ProductReplenishmentRecord {
                snapshot,
                classification: c,
                thresholds: t,
                suggestion: s,
                criticality,
                overrides: Default::default(),
            }
        };

        let records = vec![
            record("P001", AbcClass::A, Some(1.0)),
            record("P002", AbcClass::B, Some(1.5)),
            record("P003", AbcClass::C, Some(20.0)),
            record("P004", AbcClass::Unclassified, None),
        ];
        let counts = ranker.tier_counts(&records);
        assert_eq!(counts.get(&UrgencyTier::Critical), Some(&2));
        assert_eq!(counts.get(&UrgencyTier::Excess), Some(&1));
        assert_eq!(counts.get(&UrgencyTier::Urgent), None);
        assert_eq!(counts.values().sum::<usize>(), 3);
    }

    #[test]
    fn test_a_beats_c_within_same_tier() {
        let ranker = CriticalityRanker::new();
        let a = ranker.score(&classification(AbcClass::A), &thresholds(), &suggestion(Some(3.0)));
        let c = ranker.score(&classification(AbcClass::C), &thresholds(), &suggestion(Some(3.0)));
        assert!(a.score < c.score);
    }
}
