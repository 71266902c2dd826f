// ==========================================
// 仓储运营后台 - 供给图解析器
// ==========================================
// 职责: 把供给设定整理为层级升序的计算顺序 (最下游先算)
// 红线: INTERNAL 边构成循环 (直接或间接) 属结构性设定错误, 立即失败, 绝不静默绕过
// ==========================================

use crate::domain::supply::SupplyEdge;
use crate::domain::types::SupplyType;
use crate::engine::error::{EngineError, EngineResult};
use std::collections::{HashMap, HashSet};

// ==========================================
// SupplyGraphResolver - 供给图解析器
// ==========================================
// 纯函数: 不访问数据库, 输入输出均为内存中的供给边
pub struct SupplyGraphResolver;

impl SupplyGraphResolver {
    /// 解析供给图
    ///
    /// # 处理
    /// 1. 过滤 enabled = false 的边
    /// 2. 逐边校验来源一致性 (结构错误即中止)
    /// 3. 按商品检测 INTERNAL 边循环引用
    /// 4. 稳定排序: hierarchy_level 升序 → (warehouse_id, item_id)
    ///
    /// # 错误
    /// - `EngineError::StructuralConfig`: 来源字段与 supply_type 不一致
    /// - `EngineError::CycleDetected`: 仓库间供给关系成环
    pub fn resolve(edges: Vec<SupplyEdge>) -> EngineResult<Vec<SupplyEdge>> {
        let mut edges: Vec<SupplyEdge> = edges.into_iter().filter(|e| e.enabled).collect();

        for edge in &edges {
            edge.validate_source().map_err(|reason| {
                EngineError::StructuralConfig(format!(
                    "供给设定不正 (setting_id={}): {}",
                    edge.setting_id, reason
                ))
            })?;
        }

        Self::detect_cycles(&edges)?;

        // 稳定排序保证同层内顺序确定
        edges.sort_by(|a, b| {
            (a.hierarchy_level, &a.warehouse_id, &a.item_id)
                .cmp(&(b.hierarchy_level, &b.warehouse_id, &b.item_id))
        });

        Ok(edges)
    }

    /// 按商品检测 INTERNAL 边的循环引用
    ///
    /// 每 (仓库, 商品) 至多一条供给边, 因此仓库→供给源构成函数图,
    /// 沿链前进即可判环 (已确认无环的节点不再重复走)
    fn detect_cycles(edges: &[SupplyEdge]) -> EngineResult<()> {
        // item_id → (warehouse → source_warehouse)
        let mut next_by_item: HashMap<&str, HashMap<&str, &str>> = HashMap::new();

        for edge in edges {
            if edge.supply_type == SupplyType::Internal {
                if let Some(source) = edge.source_warehouse_id.as_deref() {
                    next_by_item
                        .entry(edge.item_id.as_str())
                        .or_default()
                        .insert(edge.warehouse_id.as_str(), source);
                }
            }
        }

        for (item_id, next) in &next_by_item {
            let mut done: HashSet<&str> = HashSet::new();

            for start in next.keys() {
                if done.contains(start) {
                    continue;
                }

                let mut path: Vec<&str> = Vec::new();
                let mut on_path: HashSet<&str> = HashSet::new();
                let mut current: &str = start;

                loop {
                    if done.contains(current) {
                        break;
                    }

                    if !on_path.insert(current) {
                        // 从首次出现处截取环路, 便于运维定位
                        let cycle_start = path.iter().position(|w| *w == current).unwrap_or(0);
                        let mut cycle: Vec<&str> = path[cycle_start..].to_vec();
                        cycle.push(current);

                        return Err(EngineError::CycleDetected {
                            path: format!("item={}: {}", item_id, cycle.join(" -> ")),
                        });
                    }

                    path.push(current);

                    match next.get(current) {
                        Some(source) => current = source,
                        None => break,
                    }
                }

                done.extend(path);
            }
        }

        Ok(())
    }
}
