//! # 美化输出工具
//!
//! 终端消息统一带一个着色的标签前缀：
//! `[OK]` `[ERR]` `[WARN]` `[*]` `[SKIP]` `[DONE]`。
//! 错误写到 stderr，其余写到 stdout。
//!
//! ## 依赖关系
//! - 被 `commands/`, `dops_set/`, `viz/`, `graphine/`, `batch/` 使用
//! - 使用 `colored` crate

use colored::{ColoredString, Colorize};
use std::path::Path;

/// 消息标签
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Ok,
    Err,
    Warn,
    Info,
    Skip,
    Done,
}

impl Tag {
    fn styled(self) -> ColoredString {
        match self {
            Tag::Ok => "[OK]".green().bold(),
            Tag::Err => "[ERR]".red().bold(),
            Tag::Warn => "[WARN]".yellow().bold(),
            Tag::Info => "[*]".blue().bold(),
            Tag::Skip => "[SKIP]".dimmed(),
            Tag::Done => "[DONE]".green().bold(),
        }
    }
}

fn line(tag: Tag, msg: &str) -> String {
    format!("{} {}", tag.styled(), msg)
}

/// 打印成功消息
pub fn print_success(msg: &str) {
    println!("{}", line(Tag::Ok, msg));
}

/// 打印写出的文件
pub fn print_path(path: &Path) {
    print_success(&path.display().to_string());
}

/// 打印错误消息
pub fn print_error(msg: &str) {
    eprintln!("{}", line(Tag::Err, msg));
}

/// 打印警告消息
pub fn print_warning(msg: &str) {
    println!("{}", line(Tag::Warn, msg));
}

/// 打印信息消息
pub fn print_info(msg: &str) {
    println!("{}", line(Tag::Info, msg));
}

/// 打印跳过消息
pub fn print_skip(msg: &str) {
    println!("{}", line(Tag::Skip, msg));
}

/// 打印完成消息
pub fn print_done(msg: &str) {
    println!("{}", line(Tag::Done, msg));
}

/// 打印标题栏
pub fn print_header(title: &str) {
    let rule = "─".repeat(60);
    println!("\n{}", rule.dimmed());
    println!("  {}", title.bold());
    println!("{}\n", rule.dimmed());
}
