//! 共享库
//!
//! 包含运费计算相关服务共用的配置加载与日志初始化代码。

pub mod config;
pub mod observability;
