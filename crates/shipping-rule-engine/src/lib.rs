//! 运费条件规则引擎
//!
//! 判断包裹记录是否满足一条中英文混写的附加费条件描述，支持：
//! - 重量 / 尺寸单位换算（统一到磅和英寸，向上取整）
//! - 规则文档加载、持久化和快照热替换
//! - 关键词驱动的条件描述解析
//! - 全局规则 → 产品规则 → 解析条件 → 兜底匹配 的判定流水线

pub mod checker;
pub mod error;
pub mod evaluator;
pub mod fallback;
pub mod keywords;
pub mod measurement;
pub mod models;
pub mod operators;
pub mod parser;
pub mod store;
pub mod units;

pub use checker::{ConditionChecker, describe_metrics};
pub use error::{Result, RuleError};
pub use evaluator::ConditionEvaluator;
pub use keywords::KeywordSet;
pub use measurement::{DerivedMeasurement, Measurement, NormalizedMeasurement, ShipmentData};
pub use models::{
    CheckOutcome, Condition, ConditionKind, ConditionParams, ConfigRule, DecisionStage,
    NumericRange, RuleSet, Thresholds,
};
pub use operators::{Comparison, Operator};
pub use parser::ConditionParser;
pub use store::{FileBackend, MemoryBackend, RuleConfigStore, RuleDocumentBackend};
pub use units::{DimensionUnit, UnitConverter, UnitDefaults, WeightUnit};
