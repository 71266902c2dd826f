// ==========================================
// 仓储运营后台 - 多级补货计算器
// ==========================================
// 职责: 按供给图层级升序 (最下游先算) 计算不足数, 生成发注/移库候补
// 红线:
// - 只读快照, 绝不读取实时库存
// - 上位仓库的计算必须看到本次运行中全部下位需求的累计值
// - 候补只在全量计算成功后一次性落库; 中止的运行不得留下部分候补
// ==========================================

use crate::config::ConfigManager;
use crate::domain::candidate::ReplenishCandidate;
use crate::domain::job::{JobControl, PROCESS_REPLENISH_CALC};
use crate::domain::snapshot::StockSnapshotEntry;
use crate::domain::supply::SupplyEdge;
use crate::domain::types::{CandidateStatus, CandidateType, QuantityType, SupplyType};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::lot_strategy;
use crate::engine::supply_graph::SupplyGraphResolver;
use crate::repository::{
    CandidateRepository, JobControlRepository, MasterRepository, StockSnapshotRepository,
    SupplySettingRepository,
};
use chrono::Duration;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// 进度上报间隔 (边数)
const PROGRESS_STEP: usize = 100;

// ==========================================
// EchelonCalculator - 多级补货计算器
// ==========================================
pub struct EchelonCalculator {
    snapshot_repo: Arc<StockSnapshotRepository>,
    supply_repo: Arc<SupplySettingRepository>,
    candidate_repo: Arc<CandidateRepository>,
    master_repo: Arc<MasterRepository>,
    job_repo: Arc<JobControlRepository>,
    config_manager: Arc<ConfigManager>,
}

impl EchelonCalculator {
    /// 创建新的 EchelonCalculator 实例
    pub fn new(
        snapshot_repo: Arc<StockSnapshotRepository>,
        supply_repo: Arc<SupplySettingRepository>,
        candidate_repo: Arc<CandidateRepository>,
        master_repo: Arc<MasterRepository>,
        job_repo: Arc<JobControlRepository>,
        config_manager: Arc<ConfigManager>,
    ) -> Self {
        Self {
            snapshot_repo,
            supply_repo,
            candidate_repo,
            master_repo,
            job_repo,
            config_manager,
        }
    }

    /// 执行全量补货计算
    ///
    /// # 前提
    /// - 快照已生成 (快照为空视为结构性错误, 整体中止)
    ///
    /// # 返回
    /// - `Ok(JobControl)`: SUCCESS 台账行 (batch_code + processed_records=候补件数)
    /// - `Err`: 结构性错误或存储错误; 台账记 FAILED, 不留下任何候补
    pub fn calculate_all(&self) -> EngineResult<JobControl> {
        let batch_code = self.generate_batch_code()?;
        let job_id = self.job_repo.start_run(PROCESS_REPLENISH_CALC, Some(&batch_code))?;

        info!(job_id = %job_id, batch_code = %batch_code, "开始补货计算");

        match self.calculate_inner(&job_id, &batch_code) {
            Ok(count) => {
                self.job_repo.finish_success(&job_id, count as i64)?;

                info!(
                    job_id = %job_id,
                    batch_code = %batch_code,
                    candidate_count = count,
                    "补货计算完成"
                );

                self.job_repo.find_by_id(&job_id)?.ok_or_else(|| EngineError::NotFound {
                    entity: "JobControl".to_string(),
                    id: job_id.clone(),
                })
            }
            Err(e) => {
                error!(job_id = %job_id, batch_code = %batch_code, error = %e, "补货计算失败");
                let _ = self.job_repo.finish_failed(&job_id, &e.to_string());
                Err(e)
            }
        }
    }

    /// 生成批次代码 (时刻 + 随机短码, 全局唯一)
    fn generate_batch_code(&self) -> EngineResult<String> {
        let prefix = self.config_manager.batch_code_prefix()?;
        let ts = chrono::Utc::now().format("%Y%m%d%H%M%S");
        let suffix = Uuid::new_v4().simple().to_string();
        Ok(format!("{}{}-{}", prefix, ts, &suffix[..8]))
    }

    fn calculate_inner(&self, job_id: &str, batch_code: &str) -> EngineResult<usize> {
        // ==========================================
        // 步骤1: 加载快照 (空快照 = 结构性错误)
        // ==========================================
        let snapshot_entries = self.snapshot_repo.find_all()?;
        if snapshot_entries.is_empty() {
            return Err(EngineError::SnapshotMissing);
        }

        let snapshot: HashMap<(String, String), StockSnapshotEntry> = snapshot_entries
            .into_iter()
            .map(|e| ((e.warehouse_id.clone(), e.item_id.clone()), e))
            .collect();

        // ==========================================
        // 步骤2: 解析供给图 (循环引用即中止)
        // ==========================================
        let edges = SupplyGraphResolver::resolve(self.supply_repo.find_enabled()?)?;

        self.job_repo.update_progress(job_id, 0, edges.len() as i64)?;

        let edge_keys: HashSet<(String, String)> = edges
            .iter()
            .map(|e| (e.warehouse_id.clone(), e.item_id.clone()))
            .collect();

        // ==========================================
        // 步骤3: 层级升序逐边计算
        // ==========================================
        let today = chrono::Utc::now().date_naive();
        let quantity_type = self.config_manager.default_quantity_type()?;
        let now = chrono::Utc::now().naive_utc();

        // (仓库, 商品) → 下位需求累计 (只累加, 不覆盖)
        let mut upstream_demand: HashMap<(String, String), f64> = HashMap::new();
        let mut processed: HashSet<(String, String)> = HashSet::new();

        let mut candidates: Vec<ReplenishCandidate> = Vec::new();
        let mut skipped = 0usize;

        for (index, edge) in edges.iter().enumerate() {
            if index % PROGRESS_STEP == 0 {
                self.job_repo
                    .update_progress(job_id, index as i64, edges.len() as i64)?;
            }

            let key = (edge.warehouse_id.clone(), edge.item_id.clone());
            let demand_in = upstream_demand.get(&key).copied().unwrap_or(0.0);
            processed.insert(key);

            match self.calculate_edge(edge, &snapshot, demand_in, today, quantity_type, batch_code, now)? {
                EdgeOutcome::Candidate(candidate) => {
                    // 移库候补的建议量成为供给源仓库的下位需求
                    if candidate.candidate_type == CandidateType::Transfer {
                        if let Some(source) = candidate.source_warehouse_id.clone() {
                            let source_key = (source.clone(), candidate.item_id.clone());

                            // 供给源已计算完毕还收到需求 = 层级设定与供给方向矛盾
                            if processed.contains(&source_key) {
                                return Err(EngineError::StructuralConfig(format!(
                                    "hierarchy_level 设定与供给方向矛盾: {} (level={}) 的需求到达时 {} 已计算完毕",
                                    edge.warehouse_id, edge.hierarchy_level, source
                                )));
                            }

                            *upstream_demand.entry(source_key).or_insert(0.0) += candidate.suggested_qty;
                        }
                    }

                    candidates.push(candidate);
                }
                EdgeOutcome::NoDemand => {}
                EdgeOutcome::Skipped(reason) => {
                    // 单点错误只跳过该 (仓库, 商品), 不中止整个运行; 但必须留痕
                    warn!(
                        warehouse_id = %edge.warehouse_id,
                        item_id = %edge.item_id,
                        reason = %reason,
                        "补货计算跳过该仓库×商品"
                    );
                    skipped += 1;
                }
            }
        }

        // ==========================================
        // 步骤4: 校验无供给边却收到需求的仓库 (结构性错误)
        // ==========================================
        for ((warehouse_id, item_id), qty) in &upstream_demand {
            let key = (warehouse_id.clone(), item_id.clone());
            if !edge_keys.contains(&key) {
                return Err(EngineError::StructuralConfig(format!(
                    "仓库 {} 收到商品 {} 的下位需求 {} 但没有启用的供给设定",
                    warehouse_id, item_id, qty
                )));
            }
        }

        // ==========================================
        // 步骤5: 全量成功后一次性落库
        // ==========================================
        let count = self.candidate_repo.insert_batch(&candidates)?;

        if skipped > 0 {
            warn!(batch_code = %batch_code, skipped = skipped, "部分仓库×商品被跳过");
        }

        Ok(count)
    }

    /// 单边计算
    ///
    /// 不足数公式 (下位需求计入需求侧, 先被自仓库存吸收):
    ///   requirement = max(0, 安全在库 + 提前期消费预测 + 下位需求累计 - 有效在库 - 入库预定)
    #[allow(clippy::too_many_arguments)]
    fn calculate_edge(
        &self,
        edge: &SupplyEdge,
        snapshot: &HashMap<(String, String), StockSnapshotEntry>,
        demand_in: f64,
        today: chrono::NaiveDate,
        quantity_type: QuantityType,
        batch_code: &str,
        now: chrono::NaiveDateTime,
    ) -> EngineResult<EdgeOutcome> {
        let key = (edge.warehouse_id.clone(), edge.item_id.clone());

        let entry = match snapshot.get(&key) {
            Some(entry) => entry,
            None => {
                return Ok(EdgeOutcome::Skipped(
                    "快照中不存在该仓库×商品的库存行".to_string(),
                ))
            }
        };

        let forecast = edge.forecast_over_lead_time();
        let self_shortage =
            (edge.safety_stock_qty + forecast - entry.available_qty - entry.incoming_qty).max(0.0);
        let requirement = (edge.safety_stock_qty + forecast + demand_in
            - entry.available_qty
            - entry.incoming_qty)
            .max(0.0);

        if requirement <= 0.0 {
            return Ok(EdgeOutcome::NoDemand);
        }

        let expected_arrival = today + Duration::days(edge.lead_time_days);

        match edge.supply_type {
            SupplyType::Internal => {
                // 在库上限约束: 补到上限为止
                let suggested = if edge.max_stock_qty > 0.0 {
                    let cap = (edge.max_stock_qty - entry.available_qty).max(0.0);
                    requirement.min(cap)
                } else {
                    requirement
                };

                if suggested <= 0.0 {
                    return Ok(EdgeOutcome::NoDemand);
                }

                Ok(EdgeOutcome::Candidate(ReplenishCandidate {
                    candidate_id: Uuid::new_v4().to_string(),
                    batch_code: batch_code.to_string(),
                    candidate_type: CandidateType::Transfer,
                    warehouse_id: edge.warehouse_id.clone(),
                    item_id: edge.item_id.clone(),
                    source_contractor_id: None,
                    source_warehouse_id: edge.source_warehouse_id.clone(),
                    self_shortage_qty: self_shortage,
                    upstream_demand_qty: demand_in,
                    suggested_qty: suggested,
                    order_qty: suggested,
                    quantity_type,
                    expected_arrival_date: Some(expected_arrival),
                    status: CandidateStatus::Pending,
                    exclusion_reason: None,
                    lot_before_qty: None,
                    lot_after_qty: None,
                    lot_fee_type: None,
                    lot_fee_amount: None,
                    is_manually_modified: false,
                    modified_by: None,
                    modified_at: None,
                    lock_version: 0,
                    created_at: now,
                    transmitted_at: None,
                    executed_at: None,
                }))
            }
            SupplyType::External => {
                let contractor_id = match edge.source_contractor_id.as_deref() {
                    Some(id) => id,
                    None => {
                        return Ok(EdgeOutcome::Skipped(
                            "EXTERNAL 供给边缺少供应商".to_string(),
                        ))
                    }
                };

                let contractor = match self.master_repo.find_contractor(contractor_id)? {
                    Some(c) => c,
                    None => {
                        return Ok(EdgeOutcome::Skipped(format!(
                            "供应商主数据不存在: {}",
                            contractor_id
                        )))
                    }
                };

                let adjustment = lot_strategy::adjust_for_contractor(requirement, &contractor);

                Ok(EdgeOutcome::Candidate(ReplenishCandidate {
                    candidate_id: Uuid::new_v4().to_string(),
                    batch_code: batch_code.to_string(),
                    candidate_type: CandidateType::Order,
                    warehouse_id: edge.warehouse_id.clone(),
                    item_id: edge.item_id.clone(),
                    source_contractor_id: Some(contractor_id.to_string()),
                    source_warehouse_id: None,
                    self_shortage_qty: self_shortage,
                    upstream_demand_qty: demand_in,
                    suggested_qty: requirement,
                    // 发注数量默认=ロット调整后, 审批前可人工编辑
                    order_qty: adjustment.lot_after_qty,
                    quantity_type,
                    expected_arrival_date: Some(expected_arrival),
                    status: CandidateStatus::Pending,
                    exclusion_reason: None,
                    lot_before_qty: Some(adjustment.lot_before_qty),
                    lot_after_qty: Some(adjustment.lot_after_qty),
                    lot_fee_type: Some(adjustment.lot_fee_type),
                    lot_fee_amount: Some(adjustment.lot_fee_amount),
                    is_manually_modified: false,
                    modified_by: None,
                    modified_at: None,
                    lock_version: 0,
                    created_at: now,
                    transmitted_at: None,
                    executed_at: None,
                }))
            }
        }
    }
}

/// 单边计算结果
enum EdgeOutcome {
    /// 生成候补
    Candidate(ReplenishCandidate),
    /// 无需求 (不足数为 0)
    NoDemand,
    /// 单点错误, 已留痕跳过
    Skipped(String),
}
