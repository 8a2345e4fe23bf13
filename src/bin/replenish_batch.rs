// Batch utility: import a snapshot file, compute one destination, print JSON to stdout.
//
// Usage:
//   cargo run --bin replenish_batch -- <file> <destination_code> [--date YYYY-MM-DD] [--compare] [--db path]
//
// Logs go to stderr (RUST_LOG / REPLENISH_ENGINE_LOG_JSON).

use anyhow::{bail, Context};
use chrono::NaiveDate;
use replenish_engine::api::ReplenishmentApi;
use replenish_engine::config::ConfigManager;
use replenish_engine::db::default_db_path;
use replenish_engine::engine::CancellationFlag;
use replenish_engine::logging;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

struct Args {
    file: PathBuf,
    destination_code: String,
    snapshot_date: Option<NaiveDate>,
    compare: bool,
    db_path: PathBuf,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut positional = Vec::new();
    let mut snapshot_date = None;
    let mut compare = false;
    let mut db_path = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--compare" => compare = true,
            "--date" => {
                let value = args.next().context("--date 缺少参数")?;
                let date = NaiveDate::parse_from_str(&value, "%Y-%m-%d")
                    .with_context(|| format!("日期格式非法: {}", value))?;
                snapshot_date = Some(date);
            }
            "--db" => db_path = Some(PathBuf::from(args.next().context("--db 缺少参数")?)),
            _ => positional.push(arg),
        }
    }

    if positional.len() != 2 {
        bail!("用法: replenish_batch <file> <destination_code> [--date YYYY-MM-DD] [--compare] [--db path]");
    }
    let destination_code = positional.pop().unwrap_or_default();
    let file = PathBuf::from(positional.pop().unwrap_or_default());

    Ok(Args {
        file,
        destination_code,
        snapshot_date,
        compare,
        db_path: db_path.unwrap_or_else(default_db_path),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let args = parse_args()?;

    if let Some(parent) = args.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("无法创建数据目录: {}", parent.display()))?;
    }
    let db_path = args.db_path.to_string_lossy().to_string();
    let config = ConfigManager::new(&db_path)
        .map_err(|e| anyhow::anyhow!("打开配置库失败 {}: {}", db_path, e))?;

    let api = ReplenishmentApi::new(Arc::new(config));
    let cancel = CancellationFlag::new();

    let imported = api
        .import_and_compute(&args.file, &args.destination_code, args.snapshot_date, &cancel)
        .await?;

    let comparison = if args.compare {
        let snapshots: Vec<_> = imported
            .batch
            .records
            .iter()
            .map(|r| r.snapshot.clone())
            .collect();
        Some(
            api.run_comparison(&args.destination_code, &snapshots, &cancel)
                .await?,
        )
    } else {
        None
    };

    let output = json!({
        "batch": imported.batch,
        "import_errors": imported.import_errors,
        "total_rows": imported.total_rows,
        "comparison": comparison,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
