// ==========================================
// 门店补货决策引擎 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 作用域: 门店代码 → global → 内置默认
// ==========================================

use crate::config::engine_config_trait::EngineConfigReader;
use crate::db::{ensure_config_schema, open_sqlite_connection};
use crate::domain::params::{ClassMultipliers, ParameterTable};
use crate::domain::types::AbcClass;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

/// global 作用域
pub const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例（自动建表）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let conn = open_sqlite_connection(db_path)?;
        ensure_config_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error + Send + Sync>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
            ensure_config_schema(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    // ===== 读写原语 =====

    /// 读取指定作用域的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_scoped_value(
        &self,
        scope_id: &str,
        key: &str,
    ) -> Result<Option<String>, Box<dyn Error + Send + Sync>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![scope_id, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 读取 global 作用域的配置值
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error + Send + Sync>> {
        self.get_scoped_value(GLOBAL_SCOPE, key)
    }

    /// 读取 global 配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 写入配置值（UPSERT）
    pub fn set_config_value(
        &self,
        scope_id: &str,
        key: &str,
        value: &str,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![scope_id, key, value],
        )?;
        Ok(())
    }

    /// 删除配置值，返回是否存在
    pub fn delete_config_value(&self, scope_id: &str, key: &str) -> Result<bool, Box<dyn Error + Send + Sync>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let affected = conn.execute(
            "DELETE FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![scope_id, key],
        )?;
        Ok(affected > 0)
    }

    // ===== 参数表 =====

    /// 写入某作用域某等级的倍数（写入前不校验，读取时由引擎校验）
    pub fn set_class_params(
        &self,
        scope_id: &str,
        class: AbcClass,
        multipliers: &ClassMultipliers,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        if !class.is_ranked() {
            return Err(format!("等级 {} 不支持配置倍数", class).into());
        }
        let value = serde_json::to_string(multipliers)?;
        self.set_config_value(scope_id, &config_keys::class_params(class), &value)
    }

    /// 读取门店参数表
    ///
    /// 规则:
    /// 1) 每个等级先查门店作用域，再查 global，最后用内置默认
    /// 2) 存储值不是合法 JSON → 返回错误（配置错误）
    /// 3) 任一等级来自门店作用域时，scope 标为门店代码
    pub fn load_parameter_table(
        &self,
        destination_code: &str,
    ) -> Result<ParameterTable, Box<dyn Error + Send + Sync>> {
        let fallback = ParameterTable::fallback();
        let mut classes = BTreeMap::new();
        let mut scope = GLOBAL_SCOPE.to_string();

        for class in AbcClass::RANKED {
            let key = config_keys::class_params(class);

            let (raw, from_destination) = match self.get_scoped_value(destination_code, &key)? {
                Some(v) => (Some(v), true),
                None => (self.get_global_config_value(&key)?, false),
            };

            let multipliers = match raw {
                Some(raw) => serde_json::from_str::<ClassMultipliers>(&raw).map_err(|e| {
                    format!(
                        "参数表配置格式错误 (门店 {}, 键 {}): {}; 原值: {}",
                        destination_code, key, e, raw
                    )
                })?,
                None => match fallback.get(class) {
                    Some(m) => *m,
                    None => continue,
                },
            };

            if from_destination {
                scope = destination_code.to_string();
            }
            classes.insert(class, multipliers);
        }

        tracing::debug!(
            destination = %destination_code,
            scope = %scope,
            "参数表加载完成"
        );

        Ok(ParameterTable { scope, classes })
    }
}

// ==========================================
// EngineConfigReader Trait 实现
// ==========================================
#[async_trait]
impl EngineConfigReader for ConfigManager {
    async fn get_parameter_table(
        &self,
        destination_code: &str,
    ) -> Result<ParameterTable, Box<dyn Error + Send + Sync>> {
        self.load_parameter_table(destination_code)
    }

    async fn get_stats_concurrency_limit(&self) -> Result<usize, Box<dyn Error + Send + Sync>> {
        let value = self.get_config_or_default(config_keys::STATS_CONCURRENCY_LIMIT, "10")?;
        Ok(value.trim().parse::<usize>().ok().filter(|v| *v > 0).unwrap_or(10))
    }

    async fn get_stats_timeout_ms(&self) -> Result<u64, Box<dyn Error + Send + Sync>> {
        let value = self.get_config_or_default(config_keys::STATS_TIMEOUT_MS, "5000")?;
        Ok(value.trim().parse::<u64>().ok().filter(|v| *v > 0).unwrap_or(5000))
    }

    async fn get_stats_service_url(&self) -> Result<Option<String>, Box<dyn Error + Send + Sync>> {
        let value = self.get_global_config_value(config_keys::STATS_SERVICE_URL)?;
        Ok(value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()))
    }

    async fn get_comparison_tolerance_cases(&self) -> Result<u32, Box<dyn Error + Send + Sync>> {
        let value = self.get_config_or_default(config_keys::COMPARISON_TOLERANCE_CASES, "2")?;
        Ok(value.trim().parse::<u32>().unwrap_or(2))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    use crate::domain::types::AbcClass;

    // 参数表（JSON: {"min_mult":..,"safety_mult":..,"max_mult":..}）
    pub const CLASS_PARAMS_PREFIX: &str = "class_params/";

    // 外部统计服务
    pub const STATS_CONCURRENCY_LIMIT: &str = "stats_concurrency_limit";
    pub const STATS_TIMEOUT_MS: &str = "stats_timeout_ms";
    pub const STATS_SERVICE_URL: &str = "stats_service_url";

    // 对比分析
    pub const COMPARISON_TOLERANCE_CASES: &str = "comparison_tolerance_cases";

    pub fn class_params(class: AbcClass) -> String {
        format!("{}{}", CLASS_PARAMS_PREFIX, class.as_str())
    }
}
