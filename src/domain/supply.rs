// ==========================================
// 仓储运营后台 - 供给设定领域模型
// ==========================================
// 不变量: source_contractor_id / source_warehouse_id 恰有一个非空, 且与 supply_type 一致
// hierarchy_level: 0 = 最下游 (消费点), 数值越大越上游
// ==========================================

use crate::domain::types::SupplyType;
use serde::{Deserialize, Serialize};

// ==========================================
// SupplyEdge - 供给边
// ==========================================
// 每 (仓库, 商品) 一条: 要么向供应商发注 (EXTERNAL), 要么从上位仓库移库 (INTERNAL)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplyEdge {
    pub setting_id: String,                   // 设定ID
    pub warehouse_id: String,                 // 补货对象仓库
    pub item_id: String,                      // 商品ID
    pub supply_type: SupplyType,              // 供给类型
    pub source_contractor_id: Option<String>, // 供应商 (EXTERNAL 时非空)
    pub source_warehouse_id: Option<String>,  // 供给源仓库 (INTERNAL 时非空)
    pub lead_time_days: i64,                  // 交付提前期 (天)
    pub daily_consumption_qty: f64,           // 预测日消费量
    pub hierarchy_level: i64,                 // 层级 (0=最下游)
    pub safety_stock_qty: f64,                // 安全在库数
    pub max_stock_qty: f64,                   // 在库上限 (0=无上限)
    pub enabled: bool,                        // 是否启用
}

impl SupplyEdge {
    /// 提前期内的预测消费量
    pub fn forecast_over_lead_time(&self) -> f64 {
        self.daily_consumption_qty * self.lead_time_days as f64
    }

    /// 校验来源字段与 supply_type 的一致性
    ///
    /// # 返回
    /// - `Ok(())`: 恰有一个来源且与类型匹配
    /// - `Err(reason)`: 结构性设定错误的说明
    pub fn validate_source(&self) -> Result<(), String> {
        match self.supply_type {
            SupplyType::External => {
                if self.source_contractor_id.is_none() {
                    return Err("EXTERNAL 供给边缺少 source_contractor_id".to_string());
                }
                if self.source_warehouse_id.is_some() {
                    return Err("EXTERNAL 供给边不应设置 source_warehouse_id".to_string());
                }
            }
            SupplyType::Internal => {
                if self.source_warehouse_id.is_none() {
                    return Err("INTERNAL 供给边缺少 source_warehouse_id".to_string());
                }
                if self.source_contractor_id.is_some() {
                    return Err("INTERNAL 供给边不应设置 source_contractor_id".to_string());
                }
            }
        }

        if self.lead_time_days < 0 {
            return Err(format!("lead_time_days 不可为负: {}", self.lead_time_days));
        }
        if self.daily_consumption_qty < 0.0 {
            return Err(format!(
                "daily_consumption_qty 不可为负: {}",
                self.daily_consumption_qty
            ));
        }
        if self.hierarchy_level < 0 {
            return Err(format!("hierarchy_level 不可为负: {}", self.hierarchy_level));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(supply_type: SupplyType) -> SupplyEdge {
        SupplyEdge {
            setting_id: "S001".to_string(),
            warehouse_id: "W1".to_string(),
            item_id: "I1".to_string(),
            supply_type,
            source_contractor_id: None,
            source_warehouse_id: None,
            lead_time_days: 2,
            daily_consumption_qty: 5.0,
            hierarchy_level: 0,
            safety_stock_qty: 20.0,
            max_stock_qty: 0.0,
            enabled: true,
        }
    }

    #[test]
    fn test_forecast_over_lead_time() {
        let e = edge(SupplyType::External);
        assert_eq!(e.forecast_over_lead_time(), 10.0);
    }

    #[test]
    fn test_validate_source_requires_exactly_one() {
        let mut e = edge(SupplyType::External);
        assert!(e.validate_source().is_err());

        e.source_contractor_id = Some("C1".to_string());
        assert!(e.validate_source().is_ok());

        // 两个来源同时设置 → 结构错误
        e.source_warehouse_id = Some("W2".to_string());
        assert!(e.validate_source().is_err());

        let mut i = edge(SupplyType::Internal);
        assert!(i.validate_source().is_err());
        i.source_warehouse_id = Some("W2".to_string());
        assert!(i.validate_source().is_ok());
    }
}
