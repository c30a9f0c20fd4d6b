//! # 统一错误处理模块
//!
//! 定义 dopings 的所有错误类型，使用 `thiserror` 派生。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// dopings 统一错误类型
#[derive(Error, Debug)]
pub enum DopingsError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    #[error("Failed to load config file: {path}\nReason: {reason}")]
    ConfigError { path: String, reason: String },

    // ─────────────────────────────────────────────────────────────
    // 数据错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Missing key: {0}")]
    MissingKey(String),

    #[error("Atom id {id} out of range for structure with {size} atoms")]
    IndexOutOfRange { id: usize, size: usize },

    #[error("Missing data: {0}")]
    MissingData(String),

    // ─────────────────────────────────────────────────────────────
    // 外部命令错误
    // ─────────────────────────────────────────────────────────────
    #[error("External command '{command}' could not be started")]
    CommandNotFound {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("External command failed: {command}\n{reason}")]
    CommandFailed { command: String, reason: String },

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────
    // 序列化错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // 绘图
    // ─────────────────────────────────────────────────────────────
    #[error("Plotting failed: {0}")]
    PlotError(String),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("No optimization directories found under: {root}")]
    NoStructuresFound { root: String },

    #[error("{0}")]
    Other(String),
}

impl DopingsError {
    /// 读文件错误的简写
    pub fn read(path: &std::path::Path, source: std::io::Error) -> Self {
        DopingsError::FileReadError {
            path: path.display().to_string(),
            source,
        }
    }

    /// 写文件错误的简写
    pub fn write(path: &std::path::Path, source: std::io::Error) -> Self {
        DopingsError::FileWriteError {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, DopingsError>;
