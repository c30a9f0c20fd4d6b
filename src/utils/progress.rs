//! # 进度条工具
//!
//! 封装 `indicatif`：批量处理用计数进度条，
//! 单个优化运行时用计时 spinner。
//!
//! ## 依赖关系
//! - 被 `batch/runner.rs`, `dops_set/optimize.rs` 使用
//! - 使用 `indicatif` crate

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const BAR_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {elapsed_precise} {msg}";

/// 模板写错时退回默认样式
fn style(template: &str, fallback: fn() -> ProgressStyle) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|e| {
        log::warn!("bad progress template: {}", e);
        fallback()
    })
}

/// 批量处理的进度条
pub fn create_progress_bar(len: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(style(BAR_TEMPLATE, ProgressStyle::default_bar).progress_chars("#>-"));
    pb.set_message(message.to_string());
    pb
}

/// 优化运行时的 spinner
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        style(SPINNER_TEMPLATE, ProgressStyle::default_spinner)
            .tick_strings(&["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"]),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_are_valid() {
        assert!(ProgressStyle::with_template(BAR_TEMPLATE).is_ok());
        assert!(ProgressStyle::with_template(SPINNER_TEMPLATE).is_ok());
    }

    #[test]
    fn test_progress_bar_length() {
        let pb = create_progress_bar(7, "Testing");
        assert_eq!(pb.length(), Some(7));
        pb.finish_and_clear();
    }
}
