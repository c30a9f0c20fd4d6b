//! # 石墨炔专用分析
//!
//! 仅用于材料 `graphine` 的掺杂集合：几何量计算与几何变化图。
//!
//! ## 依赖关系
//! - 被 `commands/sets.rs` 使用
//! - 子模块: calcs, viz

pub mod calcs;
pub mod viz;

pub use viz::{geometry_csv, geometry_graph};

/// 启用几何分析的材料名
pub const MATERIAL: &str = "graphine";
