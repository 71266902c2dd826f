// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、主数据/库存投入等功能
// ==========================================

use std::error::Error;
use tempfile::NamedTempFile;
use wms_replenish::app::AppState;
use wms_replenish::domain::master::{Contractor, Item, Warehouse, WarehouseRoute};
use wms_replenish::domain::supply::SupplyEdge;
use wms_replenish::domain::types::{LotFeeType, SupplyType};

/// 创建临时测试数据库并装配 AppState
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
/// - AppState: 装配完成的应用状态 (建库已完成)
pub fn setup_test_state() -> Result<(NamedTempFile, String, AppState), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let state = AppState::new(&db_path)?;

    Ok((temp_file, db_path, state))
}

/// 投入基础主数据
///
/// 仓库: W1..W5 (全部在用), 商品: I1/I2, 供应商: C1 (ロット20, 定额手数料500)
pub fn seed_basic_masters(state: &AppState) -> Result<(), Box<dyn Error>> {
    for id in ["W1", "W2", "W3", "W4", "W5"] {
        state.master_repo.upsert_warehouse(&Warehouse {
            warehouse_id: id.to_string(),
            warehouse_name: format!("仓库{}", id),
            is_active: true,
        })?;
    }

    for id in ["I1", "I2"] {
        state.master_repo.upsert_item(&Item {
            item_id: id.to_string(),
            item_name: format!("商品{}", id),
            is_active: true,
        })?;
    }

    state.master_repo.upsert_contractor(&Contractor {
        contractor_id: "C1".to_string(),
        contractor_name: "测试供应商".to_string(),
        lot_unit_qty: Some(20.0),
        lot_fee_type: LotFeeType::Fixed,
        lot_fee_amount: 500.0,
        is_active: true,
    })?;

    Ok(())
}

/// 投入无ロット设定的供应商
pub fn seed_contractor_without_lot(state: &AppState, contractor_id: &str) -> Result<(), Box<dyn Error>> {
    state.master_repo.upsert_contractor(&Contractor {
        contractor_id: contractor_id.to_string(),
        contractor_name: format!("供应商{}", contractor_id),
        lot_unit_qty: None,
        lot_fee_type: LotFeeType::None,
        lot_fee_amount: 0.0,
        is_active: true,
    })?;
    Ok(())
}

/// 投入配送便路线
pub fn seed_route(
    state: &AppState,
    source: &str,
    target: &str,
    priority: i64,
) -> Result<(), Box<dyn Error>> {
    state.master_repo.upsert_route(&WarehouseRoute {
        source_warehouse_id: source.to_string(),
        target_warehouse_id: target.to_string(),
        priority,
    })?;
    Ok(())
}

/// 投入供给设定
#[allow(clippy::too_many_arguments)]
pub fn seed_supply_edge(
    state: &AppState,
    warehouse_id: &str,
    item_id: &str,
    supply_type: SupplyType,
    source: &str,
    hierarchy_level: i64,
    lead_time_days: i64,
    daily_consumption_qty: f64,
    safety_stock_qty: f64,
    max_stock_qty: f64,
) -> Result<(), Box<dyn Error>> {
    let (source_contractor_id, source_warehouse_id) = match supply_type {
        SupplyType::External => (Some(source.to_string()), None),
        SupplyType::Internal => (None, Some(source.to_string())),
    };

    state.supply_repo.upsert(&SupplyEdge {
        setting_id: format!("T-{}-{}", warehouse_id, item_id),
        warehouse_id: warehouse_id.to_string(),
        item_id: item_id.to_string(),
        supply_type,
        source_contractor_id,
        source_warehouse_id,
        lead_time_days,
        daily_consumption_qty,
        hierarchy_level,
        safety_stock_qty,
        max_stock_qty,
        enabled: true,
    })?;

    Ok(())
}

/// 投入库存行
pub fn seed_stock(
    state: &AppState,
    warehouse_id: &str,
    item_id: &str,
    on_hand_qty: f64,
    reserved_qty: f64,
    incoming_qty: f64,
) -> Result<(), Box<dyn Error>> {
    state
        .stock_repo
        .upsert(warehouse_id, item_id, on_hand_qty, reserved_qty, incoming_qty)?;
    Ok(())
}

/// 典型两级网络:
/// - W1 (卫星, level 0): 安全20, 提前期2, 日消费5, 在库5 → 不足25, 从 W2 移库
/// - W2 (中心, level 1): 安全0, 提前期0, 日消费0, 在库10, 向 C1 发注
pub fn seed_two_tier_scenario(state: &AppState) -> Result<(), Box<dyn Error>> {
    seed_basic_masters(state)?;

    seed_supply_edge(state, "W1", "I1", SupplyType::Internal, "W2", 0, 2, 5.0, 20.0, 0.0)?;
    seed_supply_edge(state, "W2", "I1", SupplyType::External, "C1", 1, 0, 0.0, 0.0, 0.0)?;

    seed_stock(state, "W1", "I1", 5.0, 0.0, 0.0)?;
    seed_stock(state, "W2", "I1", 10.0, 0.0, 0.0)?;

    Ok(())
}
