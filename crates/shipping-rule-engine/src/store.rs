//! 规则文档存储
//!
//! 规则文档通过 `RuleDocumentBackend` 持久化，读取失败时退化为空规则集。
//! 当前快照保存在 `ArcSwap` 中，重新加载时整体替换，读取端不会看到半更新的文档。

use crate::error::{Result, RuleError};
use crate::models::RuleSet;
use arc_swap::ArcSwap;
use freight_shared::config::RulesConfig;
use parking_lot::RwLock;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// 规则文档的持久化后端
pub trait RuleDocumentBackend: Send + Sync {
    /// 读取文档；文档不存在时返回 `Ok(None)`
    fn read(&self) -> Result<Option<String>>;

    fn write(&self, document: &str) -> Result<()>;

    /// 用于日志的后端描述
    fn describe(&self) -> String;
}

/// 基于本地文件的后端
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RuleDocumentBackend for FileBackend {
    fn read(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, document: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        // 先写临时文件再 rename，避免读取端看到写了一半的文档
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, document)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// 内存后端
#[derive(Debug, Default)]
pub struct MemoryBackend {
    document: RwLock<Option<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            document: RwLock::new(Some(document.into())),
        }
    }
}

impl RuleDocumentBackend for MemoryBackend {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.document.read().clone())
    }

    fn write(&self, document: &str) -> Result<()> {
        *self.document.write() = Some(document.to_string());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// 规则配置存储
#[derive(Clone)]
pub struct RuleConfigStore {
    backend: Arc<dyn RuleDocumentBackend>,
    /// 当前发布的规则集快照
    current: Arc<ArcSwap<RuleSet>>,
}

impl RuleConfigStore {
    pub fn new(backend: impl RuleDocumentBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
            current: Arc::new(ArcSwap::from_pointee(RuleSet::default())),
        }
    }

    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::new(FileBackend::new(path))
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    pub fn from_config(config: &RulesConfig) -> Self {
        Self::file(&config.document_path)
    }

    /// 文档不存在时写入内置默认文档，返回是否写入
    #[instrument(skip(self), fields(backend = %self.backend.describe()))]
    pub fn ensure_default_config(&self) -> Result<bool> {
        if self.backend.read()?.is_some() {
            return Ok(false);
        }

        let document = serde_json::to_string_pretty(&RuleSet::builtin())?;
        self.backend.write(&document)?;
        info!("已写入默认规则文档");
        Ok(true)
    }

    /// 读取并解析文档
    fn read_rule_set(&self) -> Result<RuleSet> {
        let document = self
            .backend
            .read()?
            .ok_or_else(|| RuleError::Storage("规则文档不存在".to_string()))?;

        Ok(serde_json::from_str(&document)?)
    }

    /// 读取规则集（不修改当前快照）
    ///
    /// 文档缺失、不可读或格式错误时记录日志并返回空规则集。
    #[instrument(skip(self), fields(backend = %self.backend.describe()))]
    pub fn load(&self) -> Arc<RuleSet> {
        match self.read_rule_set() {
            Ok(rules) => {
                info!(
                    unauthorized = rules.unauthorized_conditions.len(),
                    products = rules.product_conditions.len(),
                    "规则文档已加载"
                );
                Arc::new(rules)
            }
            Err(e) => {
                error!(error = %e, "规则文档加载失败，使用空规则集");
                Arc::new(RuleSet::default())
            }
        }
    }

    /// 重新读取并发布新快照
    pub fn reload(&self) -> Arc<RuleSet> {
        let rules = self.load();
        self.current.store(rules.clone());
        rules
    }

    /// 首次访问语义：确保默认文档存在后加载并发布
    pub fn load_or_create(&self) -> Arc<RuleSet> {
        if let Err(e) = self.ensure_default_config() {
            warn!(error = %e, "默认规则文档写入失败");
        }
        self.reload()
    }

    /// 持久化并发布规则集
    #[instrument(skip(self, rules), fields(backend = %self.backend.describe()))]
    pub fn save(&self, rules: RuleSet) -> Result<()> {
        let document = serde_json::to_string_pretty(&rules)?;
        self.backend.write(&document)?;
        self.current.store(Arc::new(rules));
        info!("规则文档已保存");
        Ok(())
    }

    /// 当前快照
    pub fn snapshot(&self) -> Arc<RuleSet> {
        self.current.load_full()
    }
}
