//! # 数据模型模块
//!
//! 定义原子、结构、位点标签与优化报告。
//!
//! ## 依赖关系
//! - 被 `parsers/`, `dops_set/`, `graphine/`, `viz/`, `commands/` 使用
//! - 子模块: atom, structure, site, report

pub mod atom;
pub mod report;
pub mod site;
pub mod structure;

pub use atom::AtomData;
pub use report::{OptReport, OptStatus};
pub use site::SiteLabel;
pub use structure::{Structure, StructureMeta};
