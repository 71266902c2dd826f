// ==========================================
// 仓储运营后台 - 主数据 CSV 导入器
// ==========================================
// 职责: 供给设定与库存初始数据的 CSV 取入
// 方针: 行级校验, 不合格行阻断并留痕, 不中止整个文件
// ==========================================

use crate::domain::supply::SupplyEdge;
use crate::domain::types::SupplyType;
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::{SupplySettingRepository, WarehouseStockRepository};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// 行级错误
#[derive(Debug, Clone)]
pub struct ImportRowError {
    pub row_number: usize,
    pub reason: String,
}

/// 导入结果报告
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub total_rows: usize,
    pub success_rows: usize,
    pub blocked_rows: usize,
    pub errors: Vec<ImportRowError>,
}

/// 供给设定 CSV 行
///
/// 列: warehouse_id,item_id,supply_type,source_contractor_id,source_warehouse_id,
///     lead_time_days,daily_consumption_qty,hierarchy_level,safety_stock_qty,max_stock_qty,enabled
#[derive(Debug, Deserialize)]
struct SupplySettingRow {
    warehouse_id: String,
    item_id: String,
    supply_type: String,
    #[serde(default)]
    source_contractor_id: Option<String>,
    #[serde(default)]
    source_warehouse_id: Option<String>,
    lead_time_days: i64,
    daily_consumption_qty: f64,
    hierarchy_level: i64,
    safety_stock_qty: f64,
    max_stock_qty: f64,
    enabled: i64,
}

/// 库存 CSV 行
///
/// 列: warehouse_id,item_id,on_hand_qty,reserved_qty,incoming_qty
#[derive(Debug, Deserialize)]
struct StockRow {
    warehouse_id: String,
    item_id: String,
    on_hand_qty: f64,
    reserved_qty: f64,
    incoming_qty: f64,
}

// ==========================================
// MasterDataImporter - 主数据导入器
// ==========================================
pub struct MasterDataImporter {
    supply_repo: Arc<SupplySettingRepository>,
    stock_repo: Arc<WarehouseStockRepository>,
}

impl MasterDataImporter {
    /// 创建新的 MasterDataImporter 实例
    pub fn new(
        supply_repo: Arc<SupplySettingRepository>,
        stock_repo: Arc<WarehouseStockRepository>,
    ) -> Self {
        Self {
            supply_repo,
            stock_repo,
        }
    }

    /// 导入供给设定 CSV
    pub fn import_supply_settings(&self, path: &Path) -> EngineResult<ImportReport> {
        let mut reader = csv::Reader::from_path(path)
            .map_err(|e| EngineError::Internal(format!("CSV 打开失败: {}", e)))?;

        let mut report = ImportReport::default();

        for (index, result) in reader.deserialize::<SupplySettingRow>().enumerate() {
            // ヘッダ行が1行目なので实データ行は2行目から
            let row_number = index + 2;
            report.total_rows += 1;

            let row = match result {
                Ok(row) => row,
                Err(e) => {
                    report.blocked_rows += 1;
                    report.errors.push(ImportRowError {
                        row_number,
                        reason: format!("解析失败: {}", e),
                    });
                    continue;
                }
            };

            match self.upsert_supply_row(row) {
                Ok(()) => report.success_rows += 1,
                Err(reason) => {
                    warn!(row_number = row_number, reason = %reason, "供给设定行被阻断");
                    report.blocked_rows += 1;
                    report.errors.push(ImportRowError { row_number, reason });
                }
            }
        }

        info!(
            total = report.total_rows,
            success = report.success_rows,
            blocked = report.blocked_rows,
            "供给设定导入完成"
        );

        Ok(report)
    }

    fn upsert_supply_row(&self, row: SupplySettingRow) -> Result<(), String> {
        let supply_type = SupplyType::from_db_str(&row.supply_type)
            .ok_or_else(|| format!("未知的 supply_type: {}", row.supply_type))?;

        let edge = SupplyEdge {
            setting_id: Uuid::new_v4().to_string(),
            warehouse_id: row.warehouse_id,
            item_id: row.item_id,
            supply_type,
            source_contractor_id: row.source_contractor_id.filter(|s| !s.trim().is_empty()),
            source_warehouse_id: row.source_warehouse_id.filter(|s| !s.trim().is_empty()),
            lead_time_days: row.lead_time_days,
            daily_consumption_qty: row.daily_consumption_qty,
            hierarchy_level: row.hierarchy_level,
            safety_stock_qty: row.safety_stock_qty,
            max_stock_qty: row.max_stock_qty,
            enabled: row.enabled != 0,
        };

        edge.validate_source()?;

        self.supply_repo.upsert(&edge).map_err(|e| e.to_string())
    }

    /// 导入库存 CSV (初始数据投入用)
    pub fn import_warehouse_stock(&self, path: &Path) -> EngineResult<ImportReport> {
        let mut reader = csv::Reader::from_path(path)
            .map_err(|e| EngineError::Internal(format!("CSV 打开失败: {}", e)))?;

        let mut report = ImportReport::default();

        for (index, result) in reader.deserialize::<StockRow>().enumerate() {
            let row_number = index + 2;
            report.total_rows += 1;

            let row = match result {
                Ok(row) => row,
                Err(e) => {
                    report.blocked_rows += 1;
                    report.errors.push(ImportRowError {
                        row_number,
                        reason: format!("解析失败: {}", e),
                    });
                    continue;
                }
            };

            if row.on_hand_qty < 0.0 || row.reserved_qty < 0.0 || row.incoming_qty < 0.0 {
                report.blocked_rows += 1;
                report.errors.push(ImportRowError {
                    row_number,
                    reason: "数量不可为负".to_string(),
                });
                continue;
            }

            match self.stock_repo.upsert(
                &row.warehouse_id,
                &row.item_id,
                row.on_hand_qty,
                row.reserved_qty,
                row.incoming_qty,
            ) {
                Ok(()) => report.success_rows += 1,
                Err(e) => {
                    warn!(row_number = row_number, error = %e, "库存行被阻断");
                    report.blocked_rows += 1;
                    report.errors.push(ImportRowError {
                        row_number,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            total = report.total_rows,
            success = report.success_rows,
            blocked = report.blocked_rows,
            "库存导入完成"
        );

        Ok(report)
    }
}
