// ==========================================
// 门店补货决策引擎 - 导入层
// ==========================================
// 职责: 快照文件（Excel / CSV）→ VelocitySnapshot
// 红线: 行级错误逐条记录，不中断整批
// ==========================================

pub mod error;
pub mod file_parser;
pub mod snapshot_importer;
pub mod snapshot_importer_trait;

pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser};
pub use snapshot_importer::{ImportDefaults, RowError, SnapshotImportResult, SnapshotImporter};
pub use snapshot_importer_trait::{FileParser, RawRow};
