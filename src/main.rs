// ==========================================
// 仓储运营后台 - CLI 入口
// ==========================================
// 面向运维/调度器的触发口; 定时调度本身归外部调度器,
// 这里的每个子命令都带 withoutOverlapping 语义 (BatchJobApi 内保证)
// ==========================================

use anyhow::{bail, Result};
use wms_replenish::app::{get_default_db_path, AppState};
use wms_replenish::{logging, JobSummary};

fn print_usage() {
    println!("用法: wms-replenish <命令> [参数...]");
    println!();
    println!("命令:");
    println!("  init-db   [db_path]                  初始化数据库");
    println!("  snapshot  [db_path]                  生成库存快照");
    println!("  calculate [db_path]                  运行补货计算");
    println!("  all       [db_path]                  快照→计算连续运行");
    println!("  allocate  <shortage_id> <operator> [db_path]");
    println!("                                       对指定欠品执行横持充当");
    println!("  import-supply <csv_path> [db_path]   导入供给设定CSV");
    println!("  import-stock  <csv_path> [db_path]   导入库存CSV");
    println!("  jobs      [db_path]                  查看最近的批处理台账");
    println!();
    println!("db_path 省略时使用: {}", get_default_db_path());
}

fn print_summary(summary: &JobSummary) {
    println!(
        "process={} status={} processed_records={} batch_code={}",
        summary.process_name,
        summary.status,
        summary.processed_records,
        summary.batch_code.as_deref().unwrap_or("-"),
    );
    if let Some(msg) = &summary.error_message {
        println!("error: {}", msg);
    }
}

fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let command = match args.first() {
        Some(c) => c.as_str(),
        None => {
            print_usage();
            return Ok(());
        }
    };

    match command {
        "init-db" => {
            let db_path = args.get(1).cloned().unwrap_or_else(get_default_db_path);
            ensure_parent_dir(&db_path)?;
            let _state = AppState::new(&db_path)?;
            println!("数据库初始化完成: {}", db_path);
        }
        "snapshot" => {
            let db_path = args.get(1).cloned().unwrap_or_else(get_default_db_path);
            let state = AppState::new(&db_path)?;
            let summary = state.batch_api.run_snapshot()?;
            print_summary(&summary);
        }
        "calculate" => {
            let db_path = args.get(1).cloned().unwrap_or_else(get_default_db_path);
            let state = AppState::new(&db_path)?;
            let summary = state.batch_api.run_calculation()?;
            print_summary(&summary);
        }
        "all" => {
            let db_path = args.get(1).cloned().unwrap_or_else(get_default_db_path);
            let state = AppState::new(&db_path)?;
            let (snapshot_summary, calc_summary) = state.batch_api.run_all()?;
            print_summary(&snapshot_summary);
            print_summary(&calc_summary);
        }
        "allocate" => {
            let shortage_id = match args.get(1) {
                Some(id) => id.clone(),
                None => bail!("allocate 需要 shortage_id"),
            };
            let operator = args.get(2).cloned().unwrap_or_else(|| "cli".to_string());
            let db_path = args.get(3).cloned().unwrap_or_else(get_default_db_path);

            let state = AppState::new(&db_path)?;
            let outcome = state.shortage_api.allocate(&shortage_id, &operator)?;

            println!(
                "allocations={} remaining={} status={}",
                outcome.allocations.len(),
                outcome.remaining_qty,
                outcome.status
            );
            for a in &outcome.allocations {
                println!(
                    "  {} -> {} assign_qty={}",
                    a.source_warehouse_id, a.target_warehouse_id, a.assign_qty
                );
            }
        }
        "import-supply" => {
            let csv_path = match args.get(1) {
                Some(p) => p.clone(),
                None => bail!("import-supply 需要 csv_path"),
            };
            let db_path = args.get(2).cloned().unwrap_or_else(get_default_db_path);

            let state = AppState::new(&db_path)?;
            let report = state.importer.import_supply_settings(csv_path.as_ref())?;

            println!(
                "total={} success={} blocked={}",
                report.total_rows, report.success_rows, report.blocked_rows
            );
            for err in &report.errors {
                println!("  行{}: {}", err.row_number, err.reason);
            }
        }
        "import-stock" => {
            let csv_path = match args.get(1) {
                Some(p) => p.clone(),
                None => bail!("import-stock 需要 csv_path"),
            };
            let db_path = args.get(2).cloned().unwrap_or_else(get_default_db_path);

            let state = AppState::new(&db_path)?;
            let report = state.importer.import_warehouse_stock(csv_path.as_ref())?;

            println!(
                "total={} success={} blocked={}",
                report.total_rows, report.success_rows, report.blocked_rows
            );
            for err in &report.errors {
                println!("  行{}: {}", err.row_number, err.reason);
            }
        }
        "jobs" => {
            let db_path = args.get(1).cloned().unwrap_or_else(get_default_db_path);
            let state = AppState::new(&db_path)?;

            for job in state.job_repo.list_recent(20)? {
                println!(
                    "{} {} status={} records={} batch={} error={}",
                    job.created_at,
                    job.process_name,
                    job.status,
                    job.processed_records,
                    job.batch_code.as_deref().unwrap_or("-"),
                    job.error_message.as_deref().unwrap_or("-"),
                );
            }
        }
        _ => {
            print_usage();
            bail!("未知命令: {}", command);
        }
    }

    Ok(())
}

/// 确保数据库目录存在
fn ensure_parent_dir(db_path: &str) -> Result<()> {
    if let Some(parent) = std::path::Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
