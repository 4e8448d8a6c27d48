//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// 规则文档配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// 规则文档（JSON）的持久化路径
    pub document_path: String,
    /// 是否记录详细的判定追踪
    pub trace_enabled: bool,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            document_path: "config/shipping_rules.json".to_string(),
            trace_enabled: false,
        }
    }
}

/// 计量单位配置
///
/// 记录中未携带单位时使用的进程级默认单位。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UnitsConfig {
    pub default_weight_unit: String,
    pub default_dimension_unit: String,
}

impl Default for UnitsConfig {
    fn default() -> Self {
        Self {
            default_weight_unit: "LB".to_string(),
            default_dimension_unit: "IN".to_string(),
        }
    }
}

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// 日志输出格式：json（结构化）或 pretty（人类可读）
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl ObservabilityConfig {
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub rules: RulesConfig,
    pub units: UnitsConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. config/{service_name}.toml（服务特定配置）
    /// 4. 环境变量（FREIGHT_ 前缀，如 FREIGHT_RULES__DOCUMENT_PATH -> rules.document_path）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("FREIGHT_ENV").unwrap_or_else(|_| "development".to_string());

        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        Self::load_from_dir(service_name, &env, &config_dir)
    }

    /// 从指定目录加载配置，不读取 FREIGHT_ENV / CONFIG_DIR
    pub fn load_from_dir(
        service_name: &str,
        env: &str,
        config_dir: impl AsRef<Path>,
    ) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", env))).required(false))
            .add_source(
                File::from(config_dir.join(format!("{}.toml", service_name))).required(false),
            )
            // 嵌套字段用双下划线分隔，避免与字段名中的下划线冲突
            .add_source(
                Environment::with_prefix("FREIGHT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.rules.document_path, "config/shipping_rules.json");
        assert!(!config.rules.trace_enabled);
        assert_eq!(config.units.default_weight_unit, "LB");
        assert_eq!(config.units.default_dimension_unit, "IN");
        assert!(!config.observability.json_logs());
    }

    #[test]
    fn test_load_from_missing_dir_uses_defaults() {
        let config =
            AppConfig::load_from_dir("freight-calculator", "test", "/nonexistent/config-dir")
                .unwrap();

        assert_eq!(config.service_name, "freight-calculator");
        assert_eq!(config.environment, "test");
        assert_eq!(config.units.default_dimension_unit, "IN");
    }

    #[test]
    fn test_layered_files_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("default.toml"),
            "[units]\ndefault_weight_unit = \"KG\"\n\n[rules]\ntrace_enabled = true\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("freight-calculator.toml"),
            "[units]\ndefault_dimension_unit = \"CM\"\n",
        )
        .unwrap();

        let config =
            AppConfig::load_from_dir("freight-calculator", "staging", dir.path()).unwrap();

        assert_eq!(config.units.default_weight_unit, "KG");
        assert_eq!(config.units.default_dimension_unit, "CM");
        assert!(config.rules.trace_enabled);
        assert!(!config.is_production());
    }

    #[test]
    fn test_json_log_format() {
        let obs = ObservabilityConfig {
            log_format: "JSON".to_string(),
            ..Default::default()
        };
        assert!(obs.json_logs());
    }
}
