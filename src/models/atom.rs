//! # 原子数据模型
//!
//! 单个原子：元素符号、笛卡尔坐标 (Å) 与可选的 Mulliken 电荷 (电子布居)。
//!
//! ## 依赖关系
//! - 被 `models/structure.rs`, `parsers/geo_end.rs` 使用
//! - 无外部模块依赖

use serde::{Deserialize, Serialize};

/// 原子信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomData {
    /// 元素符号（区分大小写）
    pub elem: String,

    /// 笛卡尔坐标 [x, y, z]
    pub coord: [f64; 3],

    /// 电荷（电子布居数）
    pub charge: Option<f64>,
}

impl AtomData {
    pub fn new(elem: impl Into<String>, coord: [f64; 3]) -> Self {
        AtomData {
            elem: elem.into(),
            coord,
            charge: None,
        }
    }

    pub fn with_charge(mut self, charge: f64) -> Self {
        self.charge = Some(charge);
        self
    }

    /// 到另一个原子的距离
    pub fn dist_to(&self, other: &AtomData) -> f64 {
        self.coord
            .iter()
            .zip(other.coord.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}
