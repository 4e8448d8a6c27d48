//! 规则引擎错误类型

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("字段不存在: {0}")]
    FieldNotFound(String),

    #[error("类型不匹配: 字段 {field} 期望 {expected}, 实际 {actual}")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("无效的计量单位: {0}")]
    InvalidUnit(String),

    #[error("无法解析日期: '{0}'")]
    InvalidDate(String),

    #[error("数值溢出: {0}")]
    ArithmeticOverflow(String),

    #[error("规则文档存储失败: {0}")]
    Storage(String),

    #[error("正则表达式编译失败: {0}")]
    Regex(#[from] regex::Error),

    #[error("JSON 序列化错误: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RuleError>;
