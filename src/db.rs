// ==========================================
// 仓储运营后台 - SQLite 连接初始化与建库
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，避免“部分模块外键开启/部分不开启”
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 提供自包含的建库入口 (init_schema)，测试与 CLI 共用同一套表定义
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
///
/// 说明：
/// - 版本号用于**提示/告警**（不做自动迁移），避免静默在旧库上运行导致隐性错误。
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 初始化数据库 schema（幂等）
///
/// 表分组:
/// - 主数据: warehouse_master / item_master / contractor_master / warehouse_route
/// - 实时库存: warehouse_stock（拣货/入库协作方写入，调拨预占也写入 reserved_qty）
/// - 批处理: stock_snapshot / supply_setting / replenish_candidate / job_control
/// - 缺货调拨: shortage / shortage_allocation / quantity_correction
/// - 配置: config_scope / config_kv
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_scope (
            scope_id TEXT PRIMARY KEY,
            scope_type TEXT NOT NULL,
            scope_key TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(scope_type, scope_key)
        );

        INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
        VALUES ('global', 'GLOBAL', 'global');

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS warehouse_master (
            warehouse_id TEXT PRIMARY KEY,
            warehouse_name TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS item_master (
            item_id TEXT PRIMARY KEY,
            item_name TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS contractor_master (
            contractor_id TEXT PRIMARY KEY,
            contractor_name TEXT NOT NULL,
            -- 发注ロット(订货单位)。NULL/0 表示不做圆整
            lot_unit_qty REAL,
            lot_fee_type TEXT NOT NULL DEFAULT 'NONE',
            lot_fee_amount REAL NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1
        );

        -- 配送便路线: 横持供给源仓库的排序依据 (priority 越小越优先)
        CREATE TABLE IF NOT EXISTS warehouse_route (
            source_warehouse_id TEXT NOT NULL REFERENCES warehouse_master(warehouse_id),
            target_warehouse_id TEXT NOT NULL REFERENCES warehouse_master(warehouse_id),
            priority INTEGER NOT NULL DEFAULT 100,
            PRIMARY KEY (source_warehouse_id, target_warehouse_id)
        );

        CREATE TABLE IF NOT EXISTS warehouse_stock (
            warehouse_id TEXT NOT NULL REFERENCES warehouse_master(warehouse_id),
            item_id TEXT NOT NULL REFERENCES item_master(item_id),
            on_hand_qty REAL NOT NULL DEFAULT 0,
            reserved_qty REAL NOT NULL DEFAULT 0,
            incoming_qty REAL NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (warehouse_id, item_id)
        );

        -- 库存快照: 快照生成器整套替换，下游只读
        CREATE TABLE IF NOT EXISTS stock_snapshot (
            warehouse_id TEXT NOT NULL,
            item_id TEXT NOT NULL,
            on_hand_qty REAL NOT NULL DEFAULT 0,
            reserved_qty REAL NOT NULL DEFAULT 0,
            available_qty REAL NOT NULL DEFAULT 0,
            incoming_qty REAL NOT NULL DEFAULT 0,
            snapshot_at TEXT NOT NULL,
            PRIMARY KEY (warehouse_id, item_id)
        );

        -- 供给设定: 每 (仓库, 商品) 一条补货来源边
        CREATE TABLE IF NOT EXISTS supply_setting (
            setting_id TEXT PRIMARY KEY,
            warehouse_id TEXT NOT NULL REFERENCES warehouse_master(warehouse_id),
            item_id TEXT NOT NULL REFERENCES item_master(item_id),
            supply_type TEXT NOT NULL,
            source_contractor_id TEXT REFERENCES contractor_master(contractor_id),
            source_warehouse_id TEXT REFERENCES warehouse_master(warehouse_id),
            lead_time_days INTEGER NOT NULL DEFAULT 0,
            daily_consumption_qty REAL NOT NULL DEFAULT 0,
            hierarchy_level INTEGER NOT NULL DEFAULT 0,
            safety_stock_qty REAL NOT NULL DEFAULT 0,
            max_stock_qty REAL NOT NULL DEFAULT 0,
            enabled INTEGER NOT NULL DEFAULT 1,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(warehouse_id, item_id)
        );

        -- 补货候补: 发注候补(ORDER)与移库候补(TRANSFER)共用一张表
        CREATE TABLE IF NOT EXISTS replenish_candidate (
            candidate_id TEXT PRIMARY KEY,
            batch_code TEXT NOT NULL,
            candidate_type TEXT NOT NULL,
            warehouse_id TEXT NOT NULL,
            item_id TEXT NOT NULL,
            source_contractor_id TEXT,
            source_warehouse_id TEXT,
            self_shortage_qty REAL NOT NULL DEFAULT 0,
            upstream_demand_qty REAL NOT NULL DEFAULT 0,
            suggested_qty REAL NOT NULL DEFAULT 0,
            order_qty REAL NOT NULL DEFAULT 0,
            quantity_type TEXT NOT NULL DEFAULT 'PIECE',
            expected_arrival_date TEXT,
            status TEXT NOT NULL DEFAULT 'PENDING',
            exclusion_reason TEXT,
            lot_before_qty REAL,
            lot_after_qty REAL,
            lot_fee_type TEXT,
            lot_fee_amount REAL,
            is_manually_modified INTEGER NOT NULL DEFAULT 0,
            modified_by TEXT,
            modified_at TEXT,
            lock_version INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            transmitted_at TEXT,
            executed_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_candidate_batch
          ON replenish_candidate(batch_code, status);
        CREATE INDEX IF NOT EXISTS idx_candidate_status
          ON replenish_candidate(status, created_at);

        -- 欠品: 拣货时点的缺货记录 (外部拣货子系统写入)
        CREATE TABLE IF NOT EXISTS shortage (
            shortage_id TEXT PRIMARY KEY,
            warehouse_id TEXT NOT NULL,
            item_id TEXT NOT NULL,
            trade_id TEXT NOT NULL,
            trade_item_id TEXT NOT NULL,
            order_qty REAL NOT NULL DEFAULT 0,
            shortage_qty REAL NOT NULL DEFAULT 0,
            qty_type_at_order TEXT NOT NULL DEFAULT 'PIECE',
            source_pick_result_id TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'BEFORE',
            confirmed_by TEXT,
            confirmed_at TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_shortage_status
          ON shortage(status, created_at);

        -- 横持ち出荷: 缺货的跨仓调拨明细
        CREATE TABLE IF NOT EXISTS shortage_allocation (
            allocation_id TEXT PRIMARY KEY,
            shortage_id TEXT NOT NULL REFERENCES shortage(shortage_id),
            source_warehouse_id TEXT NOT NULL,
            target_warehouse_id TEXT NOT NULL,
            item_id TEXT NOT NULL,
            assign_qty REAL NOT NULL DEFAULT 0,
            assign_qty_type TEXT NOT NULL DEFAULT 'PIECE',
            is_finished INTEGER NOT NULL DEFAULT 0,
            finished_by TEXT,
            finished_at TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_allocation_shortage
          ON shortage_allocation(shortage_id);

        -- 批处理台账: 每次快照/计算运行一行
        CREATE TABLE IF NOT EXISTS job_control (
            job_id TEXT PRIMARY KEY,
            batch_code TEXT,
            process_name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'PENDING',
            processed_records INTEGER NOT NULL DEFAULT 0,
            progress_current INTEGER NOT NULL DEFAULT 0,
            progress_total INTEGER NOT NULL DEFAULT 0,
            started_at TEXT,
            ended_at TEXT,
            error_message TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_job_control_process
          ON job_control(process_name, created_at DESC);

        -- 数量订正出队表: 横持完了后向受发注协作方送出的订正记录
        -- request_id 唯一，重复入队视为 no-op
        CREATE TABLE IF NOT EXISTS quantity_correction (
            correction_id TEXT PRIMARY KEY,
            request_id TEXT NOT NULL UNIQUE,
            trade_id TEXT NOT NULL,
            trade_item_id TEXT NOT NULL,
            update_qty REAL NOT NULL DEFAULT 0,
            quantity_type TEXT NOT NULL DEFAULT 'PIECE',
            status TEXT NOT NULL DEFAULT 'QUEUED',
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            sent_at TEXT
        );

        INSERT OR IGNORE INTO schema_version (version) VALUES (1);
        "#,
    )?;
    Ok(())
}
