// ==========================================
// 仓储运营后台 - 领域类型定义
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 供给类型 (Supply Type)
// ==========================================
// EXTERNAL: 向外部供应商发注 / INTERNAL: 从上位仓库移库
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupplyType {
    External, // 外部发注
    Internal, // 仓库间移库
}

impl fmt::Display for SupplyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupplyType::External => write!(f, "EXTERNAL"),
            SupplyType::Internal => write!(f, "INTERNAL"),
        }
    }
}

impl SupplyType {
    /// 从字符串解析供给类型
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "EXTERNAL" => Some(SupplyType::External),
            "INTERNAL" => Some(SupplyType::Internal),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            SupplyType::External => "EXTERNAL",
            SupplyType::Internal => "INTERNAL",
        }
    }
}

// ==========================================
// 候补类型 (Candidate Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CandidateType {
    Order,    // 发注候补 (向供应商)
    Transfer, // 移库候补 (仓库间)
}

impl fmt::Display for CandidateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateType::Order => write!(f, "ORDER"),
            CandidateType::Transfer => write!(f, "TRANSFER"),
        }
    }
}

impl CandidateType {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ORDER" => Some(CandidateType::Order),
            "TRANSFER" => Some(CandidateType::Transfer),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            CandidateType::Order => "ORDER",
            CandidateType::Transfer => "TRANSFER",
        }
    }
}

// ==========================================
// 候补状态 (Candidate Status)
// ==========================================
// 状态机: PENDING → APPROVED → CONFIRMED → EXECUTED
//         PENDING → EXCLUDED (需填除外理由; 可退回 PENDING 重开)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CandidateStatus {
    Pending,   // 待审批
    Approved,  // 已承认
    Excluded,  // 已除外
    Confirmed, // 已确定 (待送信)
    Executed,  // 已执行 (送信完了, 终态)
}

impl fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl CandidateStatus {
    /// 从字符串解析候补状态
    pub fn from_db_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "APPROVED" => CandidateStatus::Approved,
            "EXCLUDED" => CandidateStatus::Excluded,
            "CONFIRMED" => CandidateStatus::Confirmed,
            "EXECUTED" => CandidateStatus::Executed,
            _ => CandidateStatus::Pending, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            CandidateStatus::Pending => "PENDING",
            CandidateStatus::Approved => "APPROVED",
            CandidateStatus::Excluded => "EXCLUDED",
            CandidateStatus::Confirmed => "CONFIRMED",
            CandidateStatus::Executed => "EXECUTED",
        }
    }

    /// 状态迁移合法性判定
    ///
    /// 红线: EXCLUDED 不得直接进入 CONFIRMED，必须先退回 PENDING
    pub fn can_transition(&self, to: CandidateStatus) -> bool {
        use CandidateStatus::*;
        matches!(
            (self, to),
            (Pending, Approved)
                | (Pending, Excluded)
                | (Approved, Confirmed)
                | (Approved, Pending)
                | (Confirmed, Executed)
                | (Excluded, Pending)
        )
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, CandidateStatus::Executed)
    }
}

// ==========================================
// 欠品状态 (Shortage Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShortageStatus {
    Before,     // 未对应
    Processing, // 对应中 (可能部分充当)
    Done,       // 对应完了
}

impl fmt::Display for ShortageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl ShortageStatus {
    pub fn from_db_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "PROCESSING" => ShortageStatus::Processing,
            "DONE" => ShortageStatus::Done,
            _ => ShortageStatus::Before,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ShortageStatus::Before => "BEFORE",
            ShortageStatus::Processing => "PROCESSING",
            ShortageStatus::Done => "DONE",
        }
    }
}

// ==========================================
// 批处理状态 (Job Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending, // 已登记未开始
    Running, // 运行中
    Success, // 正常结束
    Failed,  // 异常结束
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl JobStatus {
    pub fn from_db_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "RUNNING" => JobStatus::Running,
            "SUCCESS" => JobStatus::Success,
            "FAILED" => JobStatus::Failed,
            _ => JobStatus::Pending,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Success => "SUCCESS",
            JobStatus::Failed => "FAILED",
        }
    }
}

// ==========================================
// 数量区分 (Quantity Type)
// ==========================================
// 拣货/发注时的数量单位: 整箱(CASE) / 散件(PIECE)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuantityType {
    Case,  // 整箱
    Piece, // 散件
}

impl fmt::Display for QuantityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl QuantityType {
    pub fn from_db_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "CASE" => QuantityType::Case,
            _ => QuantityType::Piece,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            QuantityType::Case => "CASE",
            QuantityType::Piece => "PIECE",
        }
    }
}

// ==========================================
// ロット手数料类型 (Lot Fee Type)
// ==========================================
// 圆整到发注ロット时的手数料计算方式 (可插拔策略的键)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LotFeeType {
    None,    // 无手数料
    Fixed,   // 每次圆整固定额
    PerUnit, // 按圆整增量的每单位计费
}

impl fmt::Display for LotFeeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl LotFeeType {
    pub fn from_db_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "FIXED" => LotFeeType::Fixed,
            "PER_UNIT" => LotFeeType::PerUnit,
            _ => LotFeeType::None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            LotFeeType::None => "NONE",
            LotFeeType::Fixed => "FIXED",
            LotFeeType::PerUnit => "PER_UNIT",
        }
    }
}

// ==========================================
// 订正出队状态 (Correction Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CorrectionStatus {
    Queued, // 已入队未送出
    Sent,   // 已送出
}

impl fmt::Display for CorrectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl CorrectionStatus {
    pub fn from_db_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "SENT" => CorrectionStatus::Sent,
            _ => CorrectionStatus::Queued,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            CorrectionStatus::Queued => "QUEUED",
            CorrectionStatus::Sent => "SENT",
        }
    }
}
