// ==========================================
// 门店补货决策引擎 - 导入接口定义
// ==========================================
// 职责: 文件解析接口（不包含实现）
// 红线: 解析层只产出原始字符串行，不做类型转换
// ==========================================

use crate::importer::error::ImportResult;
use std::collections::HashMap;
use std::path::Path;

/// 原始行记录
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 源文件行号（表头为第 1 行）
    pub row_number: usize,
    /// 列名 → 去空白后的值
    pub fields: HashMap<String, String>,
}

impl RawRow {
    pub fn is_blank(&self) -> bool {
        self.fields.values().all(|v| v.is_empty())
    }
}

// ==========================================
// FileParser Trait
// ==========================================
// 实现者: CsvParser / ExcelParser
pub trait FileParser: Send + Sync {
    /// 解析文件为原始行记录
    ///
    /// # 参数
    /// - file_path: 文件路径
    ///
    /// # 返回
    /// - Ok((表头, 行记录)): 空白行已跳过
    /// - Err: 文件读取错误、格式错误
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<(Vec<String>, Vec<RawRow>)>;
}
