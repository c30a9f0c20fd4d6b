//! # inspect 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/inspect.rs`

use clap::Args;
use std::path::PathBuf;

/// inspect 子命令参数
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Optimization directory
    pub dir: PathBuf,

    /// Parameter set, needed for the formation energy
    #[arg(short, long)]
    pub param: Option<String>,

    /// Write the whole structure to a JSON file
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Element pair for the shortest distances (e.g. "B-C")
    #[arg(long)]
    pub pair: Option<String>,

    /// Number of shortest distances to list
    #[arg(short, long, default_value_t = 5)]
    pub n: usize,
}

impl InspectArgs {
    /// 解析 `E1-E2` 形式的元素对
    pub fn elem_pair(&self) -> Option<Result<(String, String), String>> {
        self.pair.as_deref().map(|pair| match pair.split_once('-') {
            Some((e1, e2)) if !e1.is_empty() && !e2.is_empty() => Ok((e1.to_string(), e2.to_string())),
            _ => Err(format!("Invalid element pair '{}', expected e.g. 'B-C'", pair)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pair: Option<&str>) -> InspectArgs {
        InspectArgs {
            dir: PathBuf::from("."),
            param: None,
            json: None,
            pair: pair.map(str::to_string),
            n: 5,
        }
    }

    #[test]
    fn test_elem_pair() {
        assert!(args(None).elem_pair().is_none());
        assert_eq!(
            args(Some("B-C")).elem_pair(),
            Some(Ok(("B".to_string(), "C".to_string())))
        );
        assert!(matches!(args(Some("BC")).elem_pair(), Some(Err(_))));
        assert!(matches!(args(Some("B-")).elem_pair(), Some(Err(_))));
    }
}
