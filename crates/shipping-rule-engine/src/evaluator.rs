//! 条件评估器
//!
//! 对解析出的条件和配置规则求值。输入的计量数据必须已统一为 LB / IN。

use crate::error::Result;
use crate::measurement::{DerivedMeasurement, NormalizedMeasurement};
use crate::models::{Condition, ConditionKind, ConditionParams, ConfigRule, DimensionSelector};
use crate::operators::Operator;
use rust_decimal::Decimal;
use tracing::{debug, warn};

/// 条件评估器
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// 评估条件
    ///
    /// 只有派生尺寸计算溢出会返回错误；其余无法求值的条件返回 `Ok(false)`。
    pub fn evaluate(condition: &Condition, data: &NormalizedMeasurement) -> Result<bool> {
        match &condition.params {
            ConditionParams::Weight(range) => Ok(range.contains(data.weight)),
            ConditionParams::LengthGirth(range) => {
                // 每次从当前尺寸重新计算，不使用缓存值
                let derived = DerivedMeasurement::compute(data)?;
                Ok(range.contains(derived.total_length))
            }
            ConditionParams::Length { range, dimension } => match dimension {
                DimensionSelector::Longest => Ok(range.contains(data.length)),
                // 第二长边排序尚未实现
                DimensionSelector::SecondLongest => Ok(false),
            },
            ConditionParams::Residential { expected } => {
                Ok(data.is_residential == expected.unwrap_or(true))
            }
            ConditionParams::Remote { min_level } => {
                Ok(data.remote_level >= min_level.unwrap_or(1))
            }
            ConditionParams::Compound => {
                let derived = DerivedMeasurement::compute(data)?;
                debug!(
                    total_length = %derived.total_length,
                    "组合条件为预留类型，不参与匹配"
                );
                Ok(false)
            }
            ConditionParams::Unknown { .. } => Ok(false),
        }
    }
}

impl Condition {
    /// 求值，内部错误向上返回
    pub fn try_evaluate(&self, data: &NormalizedMeasurement) -> Result<bool> {
        ConditionEvaluator::evaluate(self, data)
    }

    /// 求值，内部错误视为不满足
    pub fn evaluate(&self, data: &NormalizedMeasurement) -> bool {
        match self.try_evaluate(data) {
            Ok(matched) => matched,
            Err(e) => {
                warn!(error = %e, condition = %self.raw_text, "条件求值失败，视为不满足");
                false
            }
        }
    }
}

impl ConfigRule {
    /// 规则比较的度量值；无对应度量的类型返回 None
    pub fn metric(
        &self,
        data: &NormalizedMeasurement,
        derived: &DerivedMeasurement,
    ) -> Option<Decimal> {
        match self.condition_type {
            ConditionKind::Weight => Some(data.weight),
            ConditionKind::Length => Some(data.length),
            ConditionKind::LengthGirth => Some(derived.total_length),
            ConditionKind::Remote => Some(Decimal::from(data.remote_level)),
            ConditionKind::Residential => Some(if data.is_residential {
                Decimal::ONE
            } else {
                Decimal::ZERO
            }),
            ConditionKind::Compound | ConditionKind::Unknown => None,
        }
    }

    /// 度量值严格大于阈值时匹配
    pub fn matches(&self, data: &NormalizedMeasurement, derived: &DerivedMeasurement) -> bool {
        if self.operator != Operator::Gt {
            warn!(
                operator = %self.operator,
                rule = %self.description,
                "配置规则仅支持 > 操作符，已跳过"
            );
            return false;
        }

        match self.metric(data, derived) {
            Some(value) => value > self.value,
            None => {
                warn!(
                    condition_type = %self.condition_type,
                    rule = %self.description,
                    "配置规则类型没有可比较的度量，已跳过"
                );
                false
            }
        }
    }
}
