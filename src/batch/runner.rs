//! # 批量执行器
//!
//! 并行执行批量处理任务。
//!
//! ## 功能
//! - 基于 rayon 的并行迭代
//! - 进度条显示
//! - 错误收集与汇总报告
//!
//! ## 依赖关系
//! - 被 `dops_set/mod.rs` 的 `map`、`commands/scan.rs` 调用
//! - 使用 `utils/progress.rs` 创建进度条
//! - 使用 `rayon` 进行并行计算

use crate::error::{DopingsError, Result};
use crate::utils::{output, progress};

use rayon::prelude::*;

/// 单项处理结果
#[derive(Debug, Clone)]
pub enum ProcessResult {
    /// 处理成功
    Success(String),
    /// 跳过（如缺少数据）
    Skipped(String),
    /// 处理失败
    Failed(String, String), // (名称, 错误信息)
}

impl ProcessResult {
    /// 由 `Result` 转换，错误记为失败
    pub fn from_result<T>(name: impl Into<String>, result: Result<T>) -> Self {
        match result {
            Ok(_) => ProcessResult::Success(name.into()),
            Err(e) => ProcessResult::Failed(name.into(), e.to_string()),
        }
    }
}

/// 批量处理结果统计
#[derive(Debug, Default)]
pub struct BatchResult {
    /// 成功数量
    pub success: usize,
    /// 跳过数量
    pub skipped: usize,
    /// 失败数量
    pub failed: usize,
    /// 失败详情
    pub failures: Vec<(String, String)>,
}

impl BatchResult {
    /// 合并处理结果
    pub fn merge(&mut self, result: ProcessResult) {
        match result {
            ProcessResult::Success(_) => self.success += 1,
            ProcessResult::Skipped(_) => self.skipped += 1,
            ProcessResult::Failed(name, err) => {
                self.failed += 1;
                self.failures.push((name, err));
            }
        }
    }

    /// 总处理数量
    pub fn total(&self) -> usize {
        self.success + self.skipped + self.failed
    }

    /// 打印汇总与失败详情
    pub fn print_summary(&self, what: &str) {
        for (name, err) in &self.failures {
            output::print_error(&format!("{}: {}", name, err));
        }
        output::print_done(&format!(
            "{}: {} succeeded, {} skipped, {} failed ({} total)",
            what,
            self.success,
            self.skipped,
            self.failed,
            self.total()
        ));
    }
}

/// 批量执行器
pub struct BatchRunner {
    /// 并行作业数
    jobs: usize,
}

impl BatchRunner {
    /// 创建新的批量执行器，`jobs == 0` 时使用全部核心
    pub fn new(jobs: usize) -> Self {
        let jobs = if jobs == 0 { num_cpus::get() } else { jobs };
        Self { jobs }
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// 并行处理列表中的每一项
    pub fn run<T, F>(&self, items: &[T], message: &str, processor: F) -> Result<BatchResult>
    where
        T: Sync,
        F: Fn(&T) -> ProcessResult + Sync + Send,
    {
        let results = self.collect(items, message, processor)?;

        let mut batch_result = BatchResult::default();
        for result in results {
            batch_result.merge(result);
        }
        Ok(batch_result)
    }

    /// 并行计算每一项并按原顺序返回结果
    pub fn collect<T, R, F>(&self, items: &[T], message: &str, processor: F) -> Result<Vec<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        let pb = progress::create_progress_bar(items.len() as u64, message);

        // 配置 rayon 线程池
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map_err(|e| DopingsError::Other(format!("Failed to build thread pool: {}", e)))?;

        let results: Vec<R> = pool.install(|| {
            items
                .par_iter()
                .map(|item| {
                    let result = processor(item);
                    pb.inc(1);
                    result
                })
                .collect()
        });

        pb.finish_and_clear();
        log::debug!("{}: {} items on {} threads", message, items.len(), self.jobs);

        Ok(results)
    }
}
