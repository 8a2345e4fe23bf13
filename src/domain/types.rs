// ==========================================
// 门店补货决策引擎 - 领域类型定义
// ==========================================
// 职责: 分类等级、紧急层级、订货决策等枚举
// 红线: ABC/XYZ 是"等级制"，不是评分制；评分只在紧急度排序中出现
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// ABC 速度分类 (ABC Class)
// ==========================================
// 顺序: A > AB > B > BC > C > "-"（按日均箱数递减）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AbcClass {
    A,
    AB,
    B,
    BC,
    C,
    /// 无有效销量（"-"），不参与订货
    #[serde(rename = "-")]
    Unclassified,
}

impl AbcClass {
    /// 参与参数表的五个有效等级
    pub const RANKED: [AbcClass; 5] = [
        AbcClass::A,
        AbcClass::AB,
        AbcClass::B,
        AbcClass::BC,
        AbcClass::C,
    ];

    /// ABC 权重（越小越重要）：A=1 … C=5，"-"=6
    pub fn weight(&self) -> u32 {
        match self {
            AbcClass::A => 1,
            AbcClass::AB => 2,
            AbcClass::B => 3,
            AbcClass::BC => 4,
            AbcClass::C => 5,
            AbcClass::Unclassified => 6,
        }
    }

    /// 是否为可订货等级（"-" 一律跳过）
    pub fn is_ranked(&self) -> bool {
        !matches!(self, AbcClass::Unclassified)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AbcClass::A => "A",
            AbcClass::AB => "AB",
            AbcClass::B => "B",
            AbcClass::BC => "BC",
            AbcClass::C => "C",
            AbcClass::Unclassified => "-",
        }
    }

    /// 从字符串解析（未知值视为 "-"）
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "A" => AbcClass::A,
            "AB" => AbcClass::AB,
            "B" => AbcClass::B,
            "BC" => AbcClass::BC,
            "C" => AbcClass::C,
            _ => AbcClass::Unclassified,
        }
    }
}

impl fmt::Display for AbcClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// XYZ 波动分类 (XYZ Class)
// ==========================================
// 顺序: X < Y < Z（波动递增）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum XyzClass {
    X, // 可预测
    Y, // 波动
    Z, // 无规律
}

impl XyzClass {
    /// 安全库存调整系数：X 收缩，Z 放大
    pub fn safety_adjustment(&self) -> f64 {
        match self {
            XyzClass::X => 0.8,
            XyzClass::Y => 1.0,
            XyzClass::Z => 1.3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            XyzClass::X => "X",
            XyzClass::Y => "Y",
            XyzClass::Z => "Z",
        }
    }
}

impl fmt::Display for XyzClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 销量趋势 (Trend Direction)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendDirection {
    Growing,
    Stable,
    Declining,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Growing => write!(f, "GROWING"),
            TrendDirection::Stable => write!(f, "STABLE"),
            TrendDirection::Declining => write!(f, "DECLINING"),
        }
    }
}

// ==========================================
// 季节性模式 (Seasonality Pattern)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeasonalityPattern {
    None,     // 未检测到
    Weekday,  // 同星期日高于均值
    Weekend,  // 周末高峰
    PayCycle, // 月中/月末发薪效应
}

impl SeasonalityPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeasonalityPattern::None => "NONE",
            SeasonalityPattern::Weekday => "WEEKDAY",
            SeasonalityPattern::Weekend => "WEEKEND",
            SeasonalityPattern::PayCycle => "PAY_CYCLE",
        }
    }
}

impl fmt::Display for SeasonalityPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 紧急层级 (Urgency Tier)
// ==========================================
// 四级方案: 1=Critical 最紧急 … 4=Excess
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UrgencyTier {
    Critical, // stock_days ≤ minimum
    Urgent,   // stock_days ≤ reorder
    Optimal,  // stock_days ≤ maximum
    Excess,   // stock_days > maximum
}

impl UrgencyTier {
    /// 层级编码（1..4，越小越紧急）
    pub fn rank(&self) -> u32 {
        match self {
            UrgencyTier::Critical => 1,
            UrgencyTier::Urgent => 2,
            UrgencyTier::Optimal => 3,
            UrgencyTier::Excess => 4,
        }
    }
}

impl fmt::Display for UrgencyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrgencyTier::Critical => write!(f, "CRITICAL"),
            UrgencyTier::Urgent => write!(f, "URGENT"),
            UrgencyTier::Optimal => write!(f, "OPTIMAL"),
            UrgencyTier::Excess => write!(f, "EXCESS"),
        }
    }
}

// ==========================================
// 订货决策状态 (Order Decision)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderDecision {
    Hold,  // 不订货
    Order, // 订货（数量可能因上游缺货为 0）
}

impl fmt::Display for OrderDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderDecision::Hold => write!(f, "HOLD"),
            OrderDecision::Order => write!(f, "ORDER"),
        }
    }
}

// ==========================================
// 对比结论 (Comparison Verdict)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComparisonVerdict {
    Converging,             // |diff| ≤ 容差
    AlternativeSuggestsMore,
    AlternativeSuggestsLess,
}

impl fmt::Display for ComparisonVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonVerdict::Converging => write!(f, "CONVERGING"),
            ComparisonVerdict::AlternativeSuggestsMore => write!(f, "ALTERNATIVE_SUGGESTS_MORE"),
            ComparisonVerdict::AlternativeSuggestsLess => write!(f, "ALTERNATIVE_SUGGESTS_LESS"),
        }
    }
}

// ==========================================
// 波动数据来源 (Variability Source)
// ==========================================
// 降级模式必须显式可见，不允许静默替换
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariabilitySource {
    External,           // 外部统计服务
    LocalApproximation, // 本地 5日/20日 差值近似
}

impl VariabilitySource {
    pub fn is_degraded(&self) -> bool {
        matches!(self, VariabilitySource::LocalApproximation)
    }
}

impl fmt::Display for VariabilitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariabilitySource::External => write!(f, "EXTERNAL"),
            VariabilitySource::LocalApproximation => write!(f, "LOCAL_APPROXIMATION"),
        }
    }
}

// ==========================================
// 对比理由因子 (Rationale Factor)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RationaleFactor {
    Trend,
    Variability,
    Seasonality,
    /// 无显著信号，差异来自统计安全库存与固定安全天数的差距
    SafetyStock,
    Stable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abc_order_and_weight() {
        assert!(AbcClass::A < AbcClass::AB);
        assert!(AbcClass::C < AbcClass::Unclassified);
        let weights: Vec<u32> = AbcClass::RANKED.iter().map(|c| c.weight()).collect();
        assert_eq!(weights, vec![1, 2, 3, 4, 5]);
        assert_eq!(AbcClass::Unclassified.weight(), 6);
    }

    #[test]
    fn test_abc_round_trip_str() {
        for class in AbcClass::RANKED {
            assert_eq!(AbcClass::from_str(class.as_str()), class);
        }
        assert_eq!(AbcClass::from_str("-"), AbcClass::Unclassified);
        assert_eq!(AbcClass::from_str(" ab "), AbcClass::AB);
    }

    #[test]
    fn test_unclassified_serializes_as_dash() {
        let json = serde_json::to_string(&AbcClass::Unclassified).unwrap();
        assert_eq!(json, "\"-\"");
    }

    #[test]
    fn test_tier_rank() {
        assert_eq!(UrgencyTier::Critical.rank(), 1);
        assert_eq!(UrgencyTier::Excess.rank(), 4);
    }
}
