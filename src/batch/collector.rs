//! # 优化目录收集器
//!
//! 在目录树中查找 DFTB+ 优化目录：包含优化日志或 `geo_end.xyz` 的目录。
//!
//! ## 功能
//! - 递归目录搜索
//! - 按相对路径的 glob 模式过滤 (如 `graphene/B/*/*`)
//!
//! ## 依赖关系
//! - 被 `commands/scan.rs` 调用
//! - 使用 `walkdir` 遍历目录, `glob` 匹配模式

use crate::error::{DopingsError, Result};
use crate::parsers::GEO_END_FILE;

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 优化目录收集器
pub struct OptDirCollector {
    /// 根目录
    root: PathBuf,
    /// 优化日志文件名
    output_name: String,
    /// 相对路径匹配模式
    pattern: Option<glob::Pattern>,
    /// 需要跳过的目录名 (续算备份)
    skip_dir: Option<String>,
}

impl OptDirCollector {
    pub fn new(root: impl Into<PathBuf>, output_name: &str) -> Self {
        Self {
            root: root.into(),
            output_name: output_name.to_string(),
            pattern: None,
            skip_dir: None,
        }
    }

    /// 设置相对路径的匹配模式
    pub fn with_pattern(mut self, pattern: Option<&str>) -> Result<Self> {
        self.pattern = match pattern {
            Some(p) => Some(glob::Pattern::new(p).map_err(|e| {
                DopingsError::InvalidArgument(format!("Invalid pattern '{}': {}", p, e))
            })?),
            None => None,
        };
        Ok(self)
    }

    /// 不进入该名字的目录
    pub fn skip_dir(mut self, name: &str) -> Self {
        self.skip_dir = Some(name.to_string());
        self
    }

    fn is_opt_dir(&self, dir: &Path) -> bool {
        dir.join(&self.output_name).is_file() || dir.join(GEO_END_FILE).is_file()
    }

    fn matches_pattern(&self, dir: &Path) -> bool {
        let Some(pattern) = &self.pattern else {
            return true;
        };
        dir.strip_prefix(&self.root)
            .ok()
            .and_then(|rel| rel.to_str())
            .is_some_and(|rel| pattern.matches(rel))
    }

    /// 收集所有优化目录，按路径排序
    pub fn collect(&self) -> Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Err(DopingsError::DirectoryNotFound {
                path: self.root.display().to_string(),
            });
        }

        let skip = self.skip_dir.as_deref();
        let walker = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|e| skip.map_or(true, |s| e.file_name().to_str() != Some(s)))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir());

        let mut dirs: Vec<PathBuf> = walker
            .map(|e| e.into_path())
            .filter(|dir| self.is_opt_dir(dir) && self.matches_pattern(dir))
            .collect();

        dirs.sort();
        Ok(dirs)
    }
}
