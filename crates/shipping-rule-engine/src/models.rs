//! 规则引擎领域模型

use crate::operators::Operator;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 条件类型（封闭枚举）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    Weight,
    Length,
    LengthGirth,
    Residential,
    Remote,
    Compound,
    Unknown,
}

impl ConditionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weight => "weight",
            Self::Length => "length",
            Self::LengthGirth => "length_girth",
            Self::Residential => "residential",
            Self::Remote => "remote",
            Self::Compound => "compound",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 数值区间，边界默认不包含
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NumericRange {
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
    pub min_inclusive: bool,
    pub max_inclusive: bool,
}

impl NumericRange {
    /// 无边界区间，永远不满足
    pub fn unconstrained() -> Self {
        Self::default()
    }

    pub fn greater_than(min: Decimal) -> Self {
        Self {
            min: Some(min),
            ..Self::default()
        }
    }

    pub fn less_than(max: Decimal) -> Self {
        Self {
            max: Some(max),
            ..Self::default()
        }
    }

    pub fn between(min: Decimal, max: Decimal) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            ..Self::default()
        }
    }

    pub fn with_min_inclusive(mut self, inclusive: bool) -> Self {
        self.min_inclusive = inclusive;
        self
    }

    pub fn with_max_inclusive(mut self, inclusive: bool) -> Self {
        self.max_inclusive = inclusive;
        self
    }

    pub fn is_unconstrained(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// 判断数值是否落在区间内；无边界时返回 false
    pub fn contains(&self, value: Decimal) -> bool {
        let above_min = |min: Decimal| {
            if self.min_inclusive {
                value >= min
            } else {
                value > min
            }
        };
        let below_max = |max: Decimal| {
            if self.max_inclusive {
                value <= max
            } else {
                value < max
            }
        };

        match (self.min, self.max) {
            (Some(min), Some(max)) => above_min(min) && below_max(max),
            (Some(min), None) => above_min(min),
            (None, Some(max)) => below_max(max),
            (None, None) => false,
        }
    }
}

impl fmt::Display for NumericRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (None, None) => write!(f, "(unconstrained)"),
            (min, max) => {
                match min {
                    Some(v) if self.min_inclusive => write!(f, "[{}", v.normalize())?,
                    Some(v) => write!(f, "({}", v.normalize())?,
                    None => write!(f, "(-inf")?,
                }
                match max {
                    Some(v) if self.max_inclusive => write!(f, ", {}]", v.normalize()),
                    Some(v) => write!(f, ", {})", v.normalize()),
                    None => write!(f, ", +inf)"),
                }
            }
        }
    }
}

/// 长度条件作用的边
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DimensionSelector {
    #[default]
    Longest,
    /// 第二长边，尚未实现排序，求值恒为 false
    SecondLongest,
}

/// 无法求值的特殊条件标记
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialType {
    Signature,
    AddressCorrection,
    DateRange,
    VolumetricWeight,
}

impl SpecialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Signature => "signature",
            Self::AddressCorrection => "address_correction",
            Self::DateRange => "date_range",
            Self::VolumetricWeight => "volumetric_weight",
        }
    }
}

/// 文本中识别出的日期区间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

/// 各条件类型的参数
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionParams {
    Weight(NumericRange),
    Length {
        range: NumericRange,
        dimension: DimensionSelector,
    },
    LengthGirth(NumericRange),
    Residential {
        expected: Option<bool>,
    },
    Remote {
        min_level: Option<u32>,
    },
    /// 预留的组合条件，解析流程不会产生
    Compound,
    Unknown {
        special: Option<SpecialType>,
        date_range: Option<DateRange>,
    },
}

/// 从规则描述解析出的条件，每次解析生成、求值后即丢弃
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub params: ConditionParams,
    pub raw_text: String,
}

impl Condition {
    pub fn new(params: ConditionParams, raw_text: impl Into<String>) -> Self {
        Self {
            params,
            raw_text: raw_text.into(),
        }
    }

    pub fn kind(&self) -> ConditionKind {
        match self.params {
            ConditionParams::Weight(_) => ConditionKind::Weight,
            ConditionParams::Length { .. } => ConditionKind::Length,
            ConditionParams::LengthGirth(_) => ConditionKind::LengthGirth,
            ConditionParams::Residential { .. } => ConditionKind::Residential,
            ConditionParams::Remote { .. } => ConditionKind::Remote,
            ConditionParams::Compound => ConditionKind::Compound,
            ConditionParams::Unknown { .. } => ConditionKind::Unknown,
        }
    }

    /// 数值类条件的区间
    pub fn range(&self) -> Option<&NumericRange> {
        match &self.params {
            ConditionParams::Weight(range) | ConditionParams::LengthGirth(range) => Some(range),
            ConditionParams::Length { range, .. } => Some(range),
            _ => None,
        }
    }

    pub fn special_type(&self) -> Option<SpecialType> {
        match self.params {
            ConditionParams::Unknown { special, .. } => special,
            _ => None,
        }
    }
}

fn default_operator() -> Operator {
    Operator::Gt
}

/// 配置规则：按阈值比较的声明式条件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigRule {
    #[serde(alias = "conditionKind", alias = "type")]
    pub condition_type: ConditionKind,
    #[serde(default = "default_operator")]
    pub operator: Operator,
    #[serde(alias = "thresholdValue", alias = "threshold_value")]
    pub value: Decimal,
    #[serde(default)]
    pub description: String,
}

impl ConfigRule {
    pub fn new(
        condition_type: ConditionKind,
        value: Decimal,
        description: impl Into<String>,
    ) -> Self {
        Self {
            condition_type,
            operator: Operator::Gt,
            value,
            description: description.into(),
        }
    }
}

fn default_length_girth() -> Decimal {
    Decimal::from(165)
}

fn default_length() -> Decimal {
    Decimal::from(108)
}

fn default_weight() -> Decimal {
    Decimal::from(150)
}

/// 兜底阈值（英寸 / 磅）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_length_girth", alias = "lengthGirth")]
    pub length_girth: Decimal,
    #[serde(default = "default_length")]
    pub length: Decimal,
    #[serde(default = "default_weight")]
    pub weight: Decimal,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            length_girth: default_length_girth(),
            length: default_length(),
            weight: default_weight(),
        }
    }
}

impl Thresholds {
    pub fn get(&self, kind: ConditionKind) -> Option<Decimal> {
        match kind {
            ConditionKind::LengthGirth => Some(self.length_girth),
            ConditionKind::Length => Some(self.length),
            ConditionKind::Weight => Some(self.weight),
            _ => None,
        }
    }
}

/// 规则文档
///
/// 加载后只读；重新加载时整体替换为新实例。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RuleSet {
    /// 不可发包裹的全局规则，按顺序匹配
    #[serde(default, alias = "unauthorizedConditions")]
    pub unauthorized_conditions: Vec<ConfigRule>,
    /// 产品专属规则
    #[serde(default, alias = "productConditions")]
    pub product_conditions: BTreeMap<String, Vec<ConfigRule>>,
    #[serde(default)]
    pub thresholds: Thresholds,
}

impl RuleSet {
    /// 内置默认规则文档
    pub fn builtin() -> Self {
        let mut product_conditions = BTreeMap::new();
        product_conditions.insert(
            "FURNITURE-SOFA-01".to_string(),
            vec![
                ConfigRule::new(
                    ConditionKind::LengthGirth,
                    Decimal::from(130),
                    "大件家具：长度+周长超过130英寸",
                ),
                ConfigRule::new(ConditionKind::Weight, Decimal::from(70), "大件家具：重量超过70磅"),
            ],
        );
        product_conditions.insert(
            "BATTERY-PACK-02".to_string(),
            vec![ConfigRule::new(
                ConditionKind::Weight,
                Decimal::from(30),
                "锂电池包：重量超过30磅",
            )],
        );

        Self {
            unauthorized_conditions: vec![
                ConfigRule::new(
                    ConditionKind::LengthGirth,
                    default_length_girth(),
                    "长度+周长超过165英寸 (length + girth > 165 in)",
                ),
                ConfigRule::new(
                    ConditionKind::Length,
                    default_length(),
                    "最长边超过108英寸 (longest side > 108 in)",
                ),
                ConfigRule::new(
                    ConditionKind::Weight,
                    default_weight(),
                    "重量超过150磅 (weight > 150 lb)",
                ),
            ],
            product_conditions,
            thresholds: Thresholds::default(),
        }
    }

    pub fn unauthorized_conditions(&self) -> &[ConfigRule] {
        &self.unauthorized_conditions
    }

    /// 产品专属规则；未提供或未知的产品返回空切片
    pub fn product_conditions(&self, product_id: Option<&str>) -> &[ConfigRule] {
        product_id
            .and_then(|id| self.product_conditions.get(id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.unauthorized_conditions.is_empty() && self.product_conditions.is_empty()
    }
}

/// 判定在流水线的哪一阶段结束
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStage {
    EmptyDescription,
    UnauthorizedRule,
    ProductRule,
    ParsedCondition,
    Fallback,
    Failed,
}

impl DecisionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyDescription => "empty_description",
            Self::UnauthorizedRule => "unauthorized_rule",
            Self::ProductRule => "product_rule",
            Self::ParsedCondition => "parsed_condition",
            Self::Fallback => "fallback",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for DecisionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 判定结果
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    pub matched: bool,
    pub stage: DecisionStage,
    /// 命中的配置规则描述
    pub matched_rule: Option<String>,
    pub condition_kind: Option<ConditionKind>,
    pub evaluation_trace: Vec<String>,
    pub evaluation_time_ms: i64,
}

impl CheckOutcome {
    pub fn new(stage: DecisionStage) -> Self {
        Self {
            matched: false,
            stage,
            matched_rule: None,
            condition_kind: None,
            evaluation_trace: Vec::new(),
            evaluation_time_ms: 0,
        }
    }
}
