// Small dev utility: seed a demo database with a two-tier warehouse network.
//
// Usage:
//   cargo run --bin seed_demo_db -- [db_path]
//
// Network: W1/W3 (satellites, level 0) <- W2 (hub, level 1) <- contractor C1.

use wms_replenish::app::AppState;
use wms_replenish::domain::master::{Contractor, Item, Warehouse, WarehouseRoute};
use wms_replenish::domain::supply::SupplyEdge;
use wms_replenish::domain::types::{LotFeeType, SupplyType};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let db_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "wms_replenish_demo.db".to_string());

    let state = AppState::new(&db_path)?;

    for (id, name) in [("W1", "东京第一仓"), ("W2", "关东中心仓"), ("W3", "横滨仓")] {
        state.master_repo.upsert_warehouse(&Warehouse {
            warehouse_id: id.to_string(),
            warehouse_name: name.to_string(),
            is_active: true,
        })?;
    }

    for (id, name) in [("I1", "纸箱A式 60size"), ("I2", "缓冲材 ロール")] {
        state.master_repo.upsert_item(&Item {
            item_id: id.to_string(),
            item_name: name.to_string(),
            is_active: true,
        })?;
    }

    state.master_repo.upsert_contractor(&Contractor {
        contractor_id: "C1".to_string(),
        contractor_name: "丸山包装资材".to_string(),
        lot_unit_qty: Some(20.0),
        lot_fee_type: LotFeeType::Fixed,
        lot_fee_amount: 500.0,
        is_active: true,
    })?;

    // 配送便: W2 为两个卫星仓的第一优先供给源
    for target in ["W1", "W3"] {
        state.master_repo.upsert_route(&WarehouseRoute {
            source_warehouse_id: "W2".to_string(),
            target_warehouse_id: target.to_string(),
            priority: 1,
        })?;
    }

    // 供给设定: 卫星仓从中心仓移库, 中心仓向供应商发注
    let mut seq = 0;
    let mut edge = |warehouse: &str, item: &str, supply_type: SupplyType, source: &str, level: i64| {
        seq += 1;
        let (contractor, warehouse_src) = match supply_type {
            SupplyType::External => (Some(source.to_string()), None),
            SupplyType::Internal => (None, Some(source.to_string())),
        };
        SupplyEdge {
            setting_id: format!("SEED-{:03}", seq),
            warehouse_id: warehouse.to_string(),
            item_id: item.to_string(),
            supply_type,
            source_contractor_id: contractor,
            source_warehouse_id: warehouse_src,
            lead_time_days: if level == 0 { 2 } else { 5 },
            daily_consumption_qty: 5.0,
            hierarchy_level: level,
            safety_stock_qty: 20.0,
            max_stock_qty: 0.0,
            enabled: true,
        }
    };

    for item in ["I1", "I2"] {
        state.supply_repo.upsert(&edge("W1", item, SupplyType::Internal, "W2", 0))?;
        state.supply_repo.upsert(&edge("W3", item, SupplyType::Internal, "W2", 0))?;
        state.supply_repo.upsert(&edge("W2", item, SupplyType::External, "C1", 1))?;
    }

    // 初始库存
    for (warehouse, item, on_hand) in [
        ("W1", "I1", 5.0),
        ("W1", "I2", 40.0),
        ("W2", "I1", 10.0),
        ("W2", "I2", 200.0),
        ("W3", "I1", 8.0),
        ("W3", "I2", 15.0),
    ] {
        state.stock_repo.upsert(warehouse, item, on_hand, 0.0, 0.0)?;
    }

    println!("demo 数据投入完成: {}", db_path);
    println!("次の一手: wms-replenish all {}", db_path);
    Ok(())
}
