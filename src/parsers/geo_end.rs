//! # geo_end.xyz 轨迹解析器
//!
//! DFTB+ 在几何优化过程中把每一步的结构追加写入 `geo_end.xyz`。
//! 每一帧为 `n + 2` 行：原子数、注释行、`n` 行原子数据。
//! 原子行有 4 列 (元素, X, Y, Z) 或 5 列 (再加电荷)。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 的 `read_frame` 使用
//! - 使用 `models/atom.rs`

use crate::error::{DopingsError, Result};
use crate::models::AtomData;

use std::fs;
use std::path::Path;

/// 解析 geo_end.xyz 文件，返回最后一帧的原子
pub fn parse_geo_end_file(path: &Path) -> Result<Vec<AtomData>> {
    let content = fs::read_to_string(path).map_err(|e| DopingsError::read(path, e))?;
    parse_last_frame(&content).map_err(|reason| DopingsError::ParseError {
        format: "xyz".to_string(),
        path: path.display().to_string(),
        reason,
    })
}

/// 从多帧 XYZ 文本中取最后一个完整帧
pub fn parse_last_frame(content: &str) -> std::result::Result<Vec<AtomData>, String> {
    let lines: Vec<&str> = content.lines().collect();

    if lines.len() < 3 {
        return Err("The file has no data lines".to_string());
    }

    let struct_size: usize = lines[0]
        .trim()
        .parse()
        .map_err(|_| format!("Invalid atom count: '{}'", lines[0].trim()))?;
    if struct_size == 0 {
        return Err("Atom count is zero".to_string());
    }

    let page_size = struct_size + 2;
    let number_of_pages = lines.len() / page_size;
    if number_of_pages == 0 {
        return Err(format!(
            "Expected at least {} lines for one frame, found {}",
            page_size,
            lines.len()
        ));
    }

    // 最后一个完整帧，去掉两行帧头
    let start = (number_of_pages - 1) * page_size;
    let frame = &lines[start + 2..start + page_size];

    let number_of_data = frame[0].split_whitespace().count();
    if number_of_data != 4 && number_of_data != 5 {
        return Err("Unexpected number of data in geometry file".to_string());
    }

    frame
        .iter()
        .map(|line| parse_atom_line(line, number_of_data))
        .collect()
}

/// 解析一行原子数据
fn parse_atom_line(line: &str, number_of_data: usize) -> std::result::Result<AtomData, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() != number_of_data {
        return Err(format!("Unexpected number of data in line: '{}'", line));
    }

    let parse = |s: &str| -> std::result::Result<f64, String> {
        s.parse::<f64>()
            .map_err(|_| format!("Invalid number '{}' in line: '{}'", s, line))
    };

    let coord = [parse(parts[1])?, parse(parts[2])?, parse(parts[3])?];
    let atom = AtomData::new(parts[0], coord);

    if number_of_data == 5 {
        Ok(atom.with_charge(parse(parts[4])?))
    } else {
        Ok(atom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_FRAMES: &str = "\
3
Geometry Step: 0
C 0.0 0.0 0.0 4.10
H 1.0 0.0 0.0 0.95
H 0.0 1.0 0.0 0.95
3
Geometry Step: 1
C 0.1 0.0 0.0 4.08
H 1.1 0.0 0.0 0.96
H 0.0 1.1 -0.2 0.96
";

    #[test]
    fn test_last_frame_with_charges() {
        let atoms = parse_last_frame(TWO_FRAMES).unwrap();
        assert_eq!(atoms.len(), 3);
        assert_eq!(atoms[0].elem, "C");
        assert!((atoms[0].coord[0] - 0.1).abs() < 1e-12);
        assert!((atoms[2].coord[2] + 0.2).abs() < 1e-12);
        assert_eq!(atoms[1].charge, Some(0.96));
    }

    #[test]
    fn test_frame_without_charges() {
        let text = "2\nframe\nC 0 0 0\nN 1.4 0 0\n";
        let atoms = parse_last_frame(text).unwrap();
        assert_eq!(atoms[1].elem, "N");
        assert!(atoms.iter().all(|a| a.charge.is_none()));
    }

    #[test]
    fn test_incomplete_trailing_frame_is_ignored() {
        let text = format!("{}3\nGeometry Step: 2\nC 9 9 9 4.0\n", TWO_FRAMES);
        let atoms = parse_last_frame(&text).unwrap();
        assert!((atoms[0].coord[0] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_errors() {
        assert!(parse_last_frame("1\n").is_err());
        assert!(parse_last_frame("2\nx\nC 0 0\nC 1 1\n").is_err());
        assert!(parse_last_frame("1\nx\nC 0 0 zero\n").is_err());
        assert!(parse_last_frame("abc\nx\nC 0 0 0\n").is_err());
    }
}
