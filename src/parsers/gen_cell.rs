//! # geo_end.gen 晶胞解析器
//!
//! 周期性优化的 `geo_end.gen` 文件末尾四行是晶胞原点与三个晶格矢量 (Å)：
//! ```text
//!    24  S
//!   C H
//!     1 1    0.0000  0.0000  0.0000
//!   ...
//!    0.000000   0.000000   0.000000
//!   12.340000   0.000000   0.000000
//!   -6.170000  10.686000   0.000000
//!    0.000000   0.000000 100.000000
//! ```
//! 头行的类型为 `S` (笛卡尔) 或 `F` (分数) 时才是周期性结构。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 的 `read_cell` 使用
//! - 晶胞供 `h2_gen/` 使用

use crate::error::{DopingsError, Result};

use nalgebra::Vector3;
use std::fs;
use std::path::Path;

/// 周期性晶胞
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub origin: Vector3<f64>,
    pub vectors: [Vector3<f64>; 3],
}

impl Cell {
    /// 前两个晶格矢量张成的面积 (Å²)
    pub fn area(&self) -> f64 {
        self.vectors[0].cross(&self.vectors[1]).norm()
    }
}

/// 解析 gen 文件
pub fn parse_gen_file(path: &Path) -> Result<Cell> {
    let content = fs::read_to_string(path).map_err(|e| DopingsError::read(path, e))?;
    parse_cell(&content).map_err(|reason| DopingsError::ParseError {
        format: "gen".to_string(),
        path: path.display().to_string(),
        reason,
    })
}

pub fn parse_cell(content: &str) -> std::result::Result<Cell, String> {
    let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();

    let kind = lines
        .first()
        .and_then(|l| l.split_whitespace().nth(1))
        .ok_or_else(|| "Missing gen header".to_string())?;
    if !matches!(kind.to_ascii_uppercase().as_str(), "S" | "F") {
        return Err(format!("Geometry of type '{}' has no cell", kind));
    }
    if lines.len() < 6 {
        return Err("Expected the cell origin and three lattice vectors".to_string());
    }

    let parse_vec = |line: &str| -> std::result::Result<Vector3<f64>, String> {
        let values: Vec<f64> = line
            .split_whitespace()
            .map(|v| v.parse::<f64>().map_err(|_| format!("Invalid number '{}' in line: '{}'", v, line)))
            .collect::<std::result::Result<_, _>>()?;
        match values.as_slice() {
            [x, y, z] => Ok(Vector3::new(*x, *y, *z)),
            _ => Err(format!("Expected three components in line: '{}'", line)),
        }
    };

    let tail = &lines[lines.len() - 4..];
    Ok(Cell {
        origin: parse_vec(tail[0])?,
        vectors: [parse_vec(tail[1])?, parse_vec(tail[2])?, parse_vec(tail[3])?],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEN: &str = "\
   2  S
  C H
    1 1    0.0  0.0  0.0
    2 2    1.1  0.0  0.0
   0.5   0.0   0.0
   4.0   0.0   0.0
   0.0   3.0   0.0
   0.0   0.0  50.0
";

    #[test]
    fn test_parse_cell() {
        let cell = parse_cell(GEN).unwrap();
        assert_eq!(cell.origin, Vector3::new(0.5, 0.0, 0.0));
        assert_eq!(cell.vectors[1], Vector3::new(0.0, 3.0, 0.0));
        assert!((cell.area() - 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_cluster_has_no_cell() {
        let cluster = "   2  C\n  C H\n    1 1 0 0 0\n    2 2 1.1 0 0\n";
        assert!(parse_cell(cluster).is_err());
        assert!(parse_cell("").is_err());
        assert!(parse_cell(&GEN.replace("50.0", "x")).is_err());
    }
}
