//! 日志初始化模块
//!
//! 所有服务通过单一入口点配置日志输出，确保一致的格式和过滤规则。

pub mod tracing;

pub use self::tracing::init;
