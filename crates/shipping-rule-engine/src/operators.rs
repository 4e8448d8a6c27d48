//! 规则操作符定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 配置规则的比较操作符
///
/// 规则文档中以符号形式书写（`">"`、`">="` 等），也接受 `gt`/`gte` 等别名。
/// 当前规则模型只对 `Gt` 求值，其余操作符被视为不匹配。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = ">", alias = "gt")]
    Gt,
    #[serde(rename = ">=", alias = "gte")]
    Gte,
    #[serde(rename = "<", alias = "lt")]
    Lt,
    #[serde(rename = "<=", alias = "lte")]
    Lte,
    #[serde(rename = "==", alias = "eq")]
    Eq,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Eq => "==",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// 文本中推断出的比较方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Greater,
    Less,
    Between,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Greater => write!(f, "greater"),
            Self::Less => write!(f, "less"),
            Self::Between => write!(f, "between"),
        }
    }
}
