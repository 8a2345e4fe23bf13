// ==========================================
// 方法对比集成测试
// ==========================================
// 测试目标: 基线 vs 波动感知 差异结论、理由、降级标记
// ==========================================


use replenish_engine::domain::params::ParameterTable;
use replenish_engine::domain::types::{
    ComparisonVerdict, RationaleFactor, VariabilitySource, XyzClass,
};
use replenish_engine::engine::ComparativeAnalyzer;
use std::collections::HashMap;
use test_helpers::{external_metrics, snapshot};

#[test]
fn test_alternative_three_cases_more_is_flagged() {
    // AB，3 天覆盖：基线补到 7 天 → 40 箱
    let s = snapshot("P001", 100.0, 1000.0, 3000.0);
    // σ = 0，CV 0.6（Y），季节性 1.043：替代方法 → 43 箱
    let m = external_metrics("P001", 0.0, 0.6, 0.0, 1.043);

    let row = ComparativeAnalyzer::new().compare_one(&s, &ParameterTable::fallback(), &m);

    assert_eq!(row.baseline_cases, 40);
    assert_eq!(row.alternative_cases, 43);
    assert_eq!(row.diff_cases, 3);
    assert_eq!(row.diff_units, 300.0);
    assert_eq!(row.verdict, ComparisonVerdict::AlternativeSuggestsMore);
    assert_eq!(row.xyz_class, XyzClass::Y);
    assert_eq!(row.rationale_factors, vec![RationaleFactor::Variability]);
    assert_eq!(row.variability_source, VariabilitySource::External);
}

#[test]
fn test_flat_product_below_baseline_reorder_point_explains_gap() {
    // AB，3.5 天覆盖：基线订货点 3.75 → 补 35 箱
    // X 类且 σ = 0：替代订货点低于 3.5 天 → 不订货
    let s = snapshot("P001", 100.0, 1000.0, 3500.0);
    let m = external_metrics("P001", 0.0, 0.0, 0.0, 1.0);

    let row = ComparativeAnalyzer::new().compare_one(&s, &ParameterTable::fallback(), &m);

    assert_eq!(row.xyz_class, XyzClass::X);
    assert_eq!(row.baseline_cases, 35);
    assert!(row.diff_cases < -2);
    assert_eq!(row.verdict, ComparisonVerdict::AlternativeSuggestsLess);
    assert_eq!(row.rationale_factors, vec![RationaleFactor::SafetyStock]);
    assert_eq!(row.rationale.len(), 1);
    assert!(row.alternative_safety_days < 0.5);
}

#[test]
fn test_wider_tolerance_converges() {
    let s = snapshot("P001", 100.0, 1000.0, 3000.0);
    let m = external_metrics("P001", 0.0, 0.6, 0.0, 1.043);

    let row = ComparativeAnalyzer::with_tolerance(3).compare_one(&s, &ParameterTable::fallback(), &m);
    assert_eq!(row.verdict, ComparisonVerdict::Converging);
}

#[test]
fn test_report_marks_degraded_rows() {
    let snapshots = vec![
        snapshot("EXT", 10.0, 100.0, 50.0),
        snapshot("LOCAL", 10.0, 100.0, 50.0),
    ];
    let mut external = HashMap::new();
    external.insert("EXT".to_string(), external_metrics("EXT", 5.0, 0.1, 0.0, 1.0));

    let report = ComparativeAnalyzer::new()
        .analyze("S001", &snapshots, &ParameterTable::fallback(), &external)
        .unwrap();

    assert_eq!(report.summary.analyzed, 2);
    assert_eq!(report.summary.approximated, 1);
    assert!(report.summary.degraded);
    assert_eq!(
        report.row("LOCAL").unwrap().variability_source,
        VariabilitySource::LocalApproximation
    );
    assert_eq!(
        report.row("EXT").unwrap().variability_source,
        VariabilitySource::External
    );
}

#[test]
fn test_all_external_is_not_degraded() {
    let snapshots = vec![snapshot("P001", 10.0, 100.0, 50.0)];
    let mut external = HashMap::new();
    external.insert("P001".to_string(), external_metrics("P001", 5.0, 0.1, 0.0, 1.0));

    let report = ComparativeAnalyzer::new()
        .analyze("S001", &snapshots, &ParameterTable::fallback(), &external)
        .unwrap();
    assert!(!report.summary.degraded);
    assert!(report.failures.is_empty());
}
