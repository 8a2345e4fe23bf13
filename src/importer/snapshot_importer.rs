// ==========================================
// 门店补货决策引擎 - 快照导入器
// ==========================================
// 流程: 文件解析 → 字段映射（中英文列名别名）→ 类型转换 → VelocitySnapshot
// 红线: 单行错误带行号/字段记录，继续处理其余行；
//       只做格式转换，业务校验由引擎负责
// ==========================================

use crate::domain::snapshot::VelocitySnapshot;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::snapshot_importer_trait::RawRow;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, instrument, warn};

/// 星期 P75 列（下标 0 = 周一）
const P75_FIELDS: [&str; 7] = [
    "p75_mon", "p75_tue", "p75_wed", "p75_thu", "p75_fri", "p75_sat", "p75_sun",
];

/// 标准字段 → 可接受的列名
fn aliases(field: &str) -> &'static [&'static str] {
    match field {
        "product_code" => &["product_code", "商品代码", "sku"],
        "description" => &["description", "商品名称", "描述"],
        "category" => &["category", "品类"],
        "brand" => &["brand", "品牌"],
        "destination_code" => &["destination_code", "门店代码", "store_code"],
        "snapshot_date" => &["snapshot_date", "快照日期", "date"],
        "units_per_case" => &["units_per_case", "每箱件数", "upc"],
        "daily_units" => &["daily_units", "当日销量"],
        "velocity_5d" => &["velocity_5d", "5日均销"],
        "velocity_20d" => &["velocity_20d", "20日均销"],
        "velocity_same_weekday" => &["velocity_same_weekday", "同星期均销"],
        "p75_mon" => &["p75_mon", "周一P75"],
        "p75_tue" => &["p75_tue", "周二P75"],
        "p75_wed" => &["p75_wed", "周三P75"],
        "p75_thu" => &["p75_thu", "周四P75"],
        "p75_fri" => &["p75_fri", "周五P75"],
        "p75_sat" => &["p75_sat", "周六P75"],
        "p75_sun" => &["p75_sun", "周日P75"],
        "stock_destination" => &["stock_destination", "门店库存"],
        "stock_in_transit" => &["stock_in_transit", "在途库存"],
        "stock_upstream" => &["stock_upstream", "上游库存", "仓库库存"],
        "unit_cost" => &["unit_cost", "单件成本"],
        _ => &[],
    }
}

/// 单行导入错误
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowError {
    pub row: usize,
    pub field: Option<String>,
    pub message: String,
}

impl From<ImportError> for RowError {
    fn from(err: ImportError) -> Self {
        RowError {
            row: err.row().unwrap_or(0),
            field: err.field().map(str::to_string),
            message: err.to_string(),
        }
    }
}

/// 导入结果
#[derive(Debug, Clone, Default)]
pub struct SnapshotImportResult {
    pub snapshots: Vec<VelocitySnapshot>,
    pub errors: Vec<RowError>,
    /// 非空白数据行数
    pub total_rows: usize,
}

/// 文件中缺省列的补充值
#[derive(Debug, Clone, Default)]
pub struct ImportDefaults {
    pub destination_code: Option<String>,
    pub snapshot_date: Option<NaiveDate>,
}

// ==========================================
// SnapshotImporter
// ==========================================
pub struct SnapshotImporter {
    parser: UniversalFileParser,
    defaults: ImportDefaults,
}

impl SnapshotImporter {
    pub fn new() -> Self {
        Self {
            parser: UniversalFileParser,
            defaults: ImportDefaults::default(),
        }
    }

    pub fn with_defaults(defaults: ImportDefaults) -> Self {
        Self {
            parser: UniversalFileParser,
            defaults,
        }
    }

    /// 导入快照文件
    ///
    /// # 返回
    /// - Ok(result): 行级错误在 result.errors 中
    /// - Err: 文件级错误（不存在、格式不支持、缺少必需列）
    #[instrument(skip(self, file_path), fields(path = %file_path.as_ref().display()))]
    pub fn import_file<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<SnapshotImportResult> {
        let (headers, rows) = self.parser.parse(file_path.as_ref())?;
        self.check_required_columns(&headers)?;

        let result = self.map_rows(&rows);
        info!(
            total_rows = result.total_rows,
            imported = result.snapshots.len(),
            errors = result.errors.len(),
            "快照文件导入完成"
        );
        Ok(result)
    }

    /// 批量映射原始行
    pub fn map_rows(&self, rows: &[RawRow]) -> SnapshotImportResult {
        let mut result = SnapshotImportResult {
            total_rows: rows.len(),
            ..Default::default()
        };

        for row in rows {
            match self.map_row(row) {
                Ok(snapshot) => result.snapshots.push(snapshot),
                Err(e) => {
                    warn!(row = row.row_number, error = %e, "快照行转换失败");
                    result.errors.push(e.into());
                }
            }
        }
        result
    }

    /// 单行 → VelocitySnapshot
    pub fn map_row(&self, row: &RawRow) -> ImportResult<VelocitySnapshot> {
        let n = row.row_number;

        let product_code = self.require_string(row, "product_code")?;
        let destination_code = match self.get_string(row, "destination_code") {
            Some(v) => v,
            None => self
                .defaults
                .destination_code
                .clone()
                .ok_or_else(|| ImportError::MissingField {
                    row: n,
                    field: "destination_code".to_string(),
                })?,
        };
        let snapshot_date = match self.parse_date(row, "snapshot_date")? {
            Some(d) => d,
            None => self
                .defaults
                .snapshot_date
                .ok_or_else(|| ImportError::MissingField {
                    row: n,
                    field: "snapshot_date".to_string(),
                })?,
        };
        let units_per_case = self.require_f64(row, "units_per_case")?;

        let mut snapshot =
            VelocitySnapshot::new(product_code, destination_code, snapshot_date, units_per_case);
        snapshot.description = self.get_string(row, "description");
        snapshot.category = self.get_string(row, "category");
        snapshot.brand = self.get_string(row, "brand");

        snapshot.velocity_5d = self.require_f64(row, "velocity_5d")?;
        snapshot.velocity_20d = self.require_f64(row, "velocity_20d")?;
        snapshot.daily_units = self.parse_f64(row, "daily_units")?.unwrap_or(0.0);
        // 同星期均销缺失时取 20 日均销（不产生星期季节性）
        snapshot.velocity_same_weekday = self
            .parse_f64(row, "velocity_same_weekday")?
            .unwrap_or(snapshot.velocity_20d);
        for (idx, field) in P75_FIELDS.iter().enumerate() {
            snapshot.velocity_p75_per_weekday[idx] = self.parse_f64(row, field)?.unwrap_or(0.0);
        }

        snapshot.stock_destination = self.require_f64(row, "stock_destination")?;
        snapshot.stock_in_transit = self.parse_f64(row, "stock_in_transit")?.unwrap_or(0.0);
        snapshot.stock_upstream = self.require_f64(row, "stock_upstream")?;
        snapshot.unit_cost = self.parse_f64(row, "unit_cost")?;

        Ok(snapshot)
    }

    // ===== 表头检查 =====

    fn check_required_columns(&self, headers: &[String]) -> ImportResult<()> {
        let mut required = vec![
            "product_code",
            "units_per_case",
            "velocity_5d",
            "velocity_20d",
            "stock_destination",
            "stock_upstream",
        ];
        if self.defaults.destination_code.is_none() {
            required.push("destination_code");
        }
        if self.defaults.snapshot_date.is_none() {
            required.push("snapshot_date");
        }

        let missing: Vec<&str> = required
            .into_iter()
            .filter(|field| !aliases(field).iter().any(|a| headers.iter().any(|h| h == a)))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ImportError::MissingColumn(missing.join(", ")))
        }
    }

    // ===== 字段提取 =====

    /// 提取字符串字段（按别名顺序取第一个非空值）
    fn get_string(&self, row: &RawRow, field: &str) -> Option<String> {
        aliases(field)
            .iter()
            .filter_map(|alias| row.fields.get(*alias))
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn require_string(&self, row: &RawRow, field: &str) -> ImportResult<String> {
        self.get_string(row, field).ok_or_else(|| ImportError::MissingField {
            row: row.row_number,
            field: field.to_string(),
        })
    }

    /// 解析浮点数（允许千分位逗号）
    fn parse_f64(&self, row: &RawRow, field: &str) -> ImportResult<Option<f64>> {
        match self.get_string(row, field) {
            None => Ok(None),
            Some(value) => value
                .replace(',', "")
                .parse::<f64>()
                .map(Some)
                .map_err(|_| ImportError::TypeConversionError {
                    row: row.row_number,
                    field: field.to_string(),
                    message: format!("无法解析为数值: {}", value),
                }),
        }
    }

    fn require_f64(&self, row: &RawRow, field: &str) -> ImportResult<f64> {
        self.parse_f64(row, field)?
            .ok_or_else(|| ImportError::MissingField {
                row: row.row_number,
                field: field.to_string(),
            })
    }

    /// 解析日期: YYYY-MM-DD / YYYYMMDD / YYYY/MM/DD / Excel 序列号
    fn parse_date(&self, row: &RawRow, field: &str) -> ImportResult<Option<NaiveDate>> {
        let Some(value) = self.get_string(row, field) else {
            return Ok(None);
        };

        for fmt in ["%Y-%m-%d", "%Y%m%d", "%Y/%m/%d"] {
            if let Ok(d) = NaiveDate::parse_from_str(&value, fmt) {
                return Ok(Some(d));
            }
        }

        // Excel 日期单元格可能以序列号形式出现
        if let Ok(serial) = value.parse::<f64>() {
            if serial.is_finite() && serial > 0.0 && serial < 2_958_466.0 {
                if let Some(base) = NaiveDate::from_ymd_opt(1899, 12, 30) {
                    return Ok(Some(base + Duration::days(serial.floor() as i64)));
                }
            }
        }

        Err(ImportError::DateFormatError {
            row: row.row_number,
            field: field.to_string(),
            value,
        })
    }
}

impl Default for SnapshotImporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn row(n: usize, pairs: &[(&str, &str)]) -> RawRow {
        RawRow {
            row_number: n,
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    fn full_row(n: usize) -> RawRow {
        row(
            n,
            &[
                ("product_code", "P001"),
                ("destination_code", "S001"),
                ("snapshot_date", "2026-01-20"),
                ("units_per_case", "12"),
                ("velocity_5d", "30"),
                ("velocity_20d", "24"),
                ("stock_destination", "1,200"),
                ("stock_upstream", "5000"),
                ("p75_sat", "40"),
            ],
        )
    }

    #[test]
    fn test_map_full_row() {
        let s = SnapshotImporter::new().map_row(&full_row(2)).unwrap();
        assert_eq!(s.product_code, "P001");
        assert_eq!(s.snapshot_date, NaiveDate::from_ymd_opt(2026, 1, 20).unwrap());
        assert_eq!(s.stock_destination, 1200.0);
        assert_eq!(s.velocity_same_weekday, 24.0);
        assert_eq!(s.velocity_p75_per_weekday[5], 40.0);
        assert_eq!(s.unit_cost, None);
    }

    #[test]
    fn test_chinese_aliases_and_compact_date() {
        let r = row(
            3,
            &[
                ("商品代码", "P002"),
                ("门店代码", "S001"),
                ("快照日期", "20260120"),
                ("每箱件数", "6"),
                ("5日均销", "3"),
                ("20日均销", "3"),
                ("门店库存", "10"),
                ("上游库存", "60"),
                ("单件成本", "2.5"),
            ],
        );
        let s = SnapshotImporter::new().map_row(&r).unwrap();
        assert_eq!(s.product_code, "P002");
        assert_eq!(s.unit_cost, Some(2.5));
    }

    #[test]
    fn test_row_errors_carry_row_and_field() {
        let mut bad = full_row(5);
        bad.fields.insert("velocity_20d".to_string(), "abc".to_string());
        let result = SnapshotImporter::new().map_rows(&[full_row(2), bad]);
        assert_eq!(result.total_rows, 2);
        assert_eq!(result.snapshots.len(), 1);
        assert_eq!(result.errors[0].row, 5);
        assert_eq!(result.errors[0].field.as_deref(), Some("velocity_20d"));
    }

    #[test]
    fn test_defaults_fill_missing_destination_and_date() {
        let mut r = full_row(2);
        r.fields.remove("destination_code");
        r.fields.remove("snapshot_date");

        assert!(SnapshotImporter::new().map_row(&r).is_err());

        let importer = SnapshotImporter::with_defaults(ImportDefaults {
            destination_code: Some("S009".to_string()),
            snapshot_date: NaiveDate::from_ymd_opt(2026, 2, 1),
        });
        let s = importer.map_row(&r).unwrap();
        assert_eq!(s.destination_code, "S009");
    }

    #[test]
    fn test_excel_serial_date() {
        let mut r = full_row(2);
        // 46042 = 2026-01-20
        r.fields.insert("snapshot_date".to_string(), "46042".to_string());
        let s = SnapshotImporter::new().map_row(&r).unwrap();
        assert_eq!(s.snapshot_date, NaiveDate::from_ymd_opt(2026, 1, 20).unwrap());
    }
}
