// ==========================================
// 仓储运营后台 - ロット调整策略
// ==========================================
// 手数料公式按 lot_fee_type 可插拔, 不硬编码单一公式
// ==========================================

use crate::domain::master::Contractor;
use crate::domain::types::LotFeeType;

/// ロット调整结果
#[derive(Debug, Clone, PartialEq)]
pub struct LotAdjustment {
    pub lot_before_qty: f64,         // 圆整前数量
    pub lot_after_qty: f64,          // 圆整后数量
    pub lot_fee_type: LotFeeType,    // 适用的手数料类型
    pub lot_fee_amount: f64,         // 手数料金额
}

// ==========================================
// LotFeeStrategy - 手数料计算策略
// ==========================================
pub trait LotFeeStrategy {
    /// 计算手数料
    ///
    /// # 参数
    /// - `lot_before`: 圆整前数量
    /// - `lot_after`: 圆整后数量
    /// - `fee_amount`: 供应商主数据上的手数料单价/定额
    fn fee(&self, lot_before: f64, lot_after: f64, fee_amount: f64) -> f64;
}

/// 无手数料
pub struct NoFee;

impl LotFeeStrategy for NoFee {
    fn fee(&self, _lot_before: f64, _lot_after: f64, _fee_amount: f64) -> f64 {
        0.0
    }
}

/// 每次圆整固定额 (有增量时收取)
pub struct FixedFee;

impl LotFeeStrategy for FixedFee {
    fn fee(&self, lot_before: f64, lot_after: f64, fee_amount: f64) -> f64 {
        if lot_after > lot_before {
            fee_amount
        } else {
            0.0
        }
    }
}

/// 按圆整增量的每单位计费
pub struct PerUnitFee;

impl LotFeeStrategy for PerUnitFee {
    fn fee(&self, lot_before: f64, lot_after: f64, fee_amount: f64) -> f64 {
        (lot_after - lot_before).max(0.0) * fee_amount
    }
}

/// 按 lot_fee_type 取策略实例
pub fn strategy_for(fee_type: LotFeeType) -> &'static dyn LotFeeStrategy {
    match fee_type {
        LotFeeType::None => &NoFee,
        LotFeeType::Fixed => &FixedFee,
        LotFeeType::PerUnit => &PerUnitFee,
    }
}

/// 向上圆整到ロット倍数
///
/// lot_unit <= 0 或数量 <= 0 时原样返回
pub fn round_up_to_lot(qty: f64, lot_unit: f64) -> f64 {
    if lot_unit <= 0.0 || qty <= 0.0 {
        return qty;
    }
    (qty / lot_unit).ceil() * lot_unit
}

/// 对建议数量做ロット调整并计算手数料
///
/// 供应商未定义发注ロット时, 圆整前后相同且手数料为 0
pub fn adjust_for_contractor(suggested_qty: f64, contractor: &Contractor) -> LotAdjustment {
    let lot_after = match contractor.lot_unit_qty {
        Some(lot_unit) if lot_unit > 0.0 => round_up_to_lot(suggested_qty, lot_unit),
        _ => suggested_qty,
    };

    let strategy = strategy_for(contractor.lot_fee_type);
    let fee = strategy.fee(suggested_qty, lot_after, contractor.lot_fee_amount);

    LotAdjustment {
        lot_before_qty: suggested_qty,
        lot_after_qty: lot_after,
        lot_fee_type: contractor.lot_fee_type,
        lot_fee_amount: fee,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contractor(lot_unit: Option<f64>, fee_type: LotFeeType, fee_amount: f64) -> Contractor {
        Contractor {
            contractor_id: "C1".to_string(),
            contractor_name: "テスト商事".to_string(),
            lot_unit_qty: lot_unit,
            lot_fee_type: fee_type,
            lot_fee_amount: fee_amount,
            is_active: true,
        }
    }

    #[test]
    fn test_round_up_to_lot() {
        assert_eq!(round_up_to_lot(15.0, 20.0), 20.0);
        assert_eq!(round_up_to_lot(20.0, 20.0), 20.0);
        assert_eq!(round_up_to_lot(21.0, 20.0), 40.0);
        assert_eq!(round_up_to_lot(0.0, 20.0), 0.0);
        // ロット未定义 (0) 时原样返回
        assert_eq!(round_up_to_lot(15.0, 0.0), 15.0);
    }

    #[test]
    fn test_adjust_without_lot_unit() {
        let adj = adjust_for_contractor(15.0, &contractor(None, LotFeeType::Fixed, 100.0));
        assert_eq!(adj.lot_before_qty, 15.0);
        assert_eq!(adj.lot_after_qty, 15.0);
        assert_eq!(adj.lot_fee_amount, 0.0);
    }

    #[test]
    fn test_fixed_fee_applies_only_on_rounding() {
        let c = contractor(Some(20.0), LotFeeType::Fixed, 100.0);

        let adj = adjust_for_contractor(15.0, &c);
        assert_eq!(adj.lot_after_qty, 20.0);
        assert_eq!(adj.lot_fee_amount, 100.0);

        // ちょうどロット倍数: 圆整无增量, 不收手数料
        let adj = adjust_for_contractor(40.0, &c);
        assert_eq!(adj.lot_after_qty, 40.0);
        assert_eq!(adj.lot_fee_amount, 0.0);
    }

    #[test]
    fn test_per_unit_fee() {
        let c = contractor(Some(20.0), LotFeeType::PerUnit, 3.0);

        let adj = adjust_for_contractor(15.0, &c);
        assert_eq!(adj.lot_after_qty, 20.0);
        // 增量 5 × 单价 3
        assert_eq!(adj.lot_fee_amount, 15.0);
    }
}
