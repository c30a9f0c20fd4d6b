//! # 批量处理模块
//!
//! 提供对结构集合与优化目录的批量处理能力。
//!
//! ## 功能
//! - 在目录树中收集优化目录
//! - 并行处理
//! - 进度反馈与统计
//!
//! ## 依赖关系
//! - 被 `dops_set/`, `commands/scan.rs` 使用
//! - 使用 `rayon` 进行并行处理
//! - 使用 `indicatif` 显示进度

pub mod collector;
pub mod runner;

pub use collector::OptDirCollector;
pub use runner::{BatchResult, BatchRunner, ProcessResult};
