//! # detailed.out 解析器
//!
//! 只提取偶极矩：第一行以 `au` 为单位的 `Dipole moment:  x  y  z  au`。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 的 `read_dipole` 使用

/// 提取偶极矩向量
pub fn parse_dipole(content: &str) -> Option<[f64; 3]> {
    let line = content
        .lines()
        .find(|line| line.split_whitespace().any(|w| w == "au"))?;

    let words: Vec<&str> = line.split_whitespace().collect();
    if words.len() < 5 {
        return None;
    }

    Some([
        words[2].parse().ok()?,
        words[3].parse().ok()?,
        words[4].parse().ok()?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dipole() {
        let text = "Fermi level:  -0.17 H  -4.71 eV\n\
                    Dipole moment:    0.12345678   -0.50000000    0.00100000 au\n\
                    Dipole moment:    0.31378400   -1.27087000    0.00254000 Debye\n";
        let dipole = parse_dipole(text).unwrap();
        assert!((dipole[0] - 0.12345678).abs() < 1e-12);
        assert!((dipole[1] + 0.5).abs() < 1e-12);
        assert!((dipole[2] - 0.001).abs() < 1e-12);
    }

    #[test]
    fn test_no_dipole() {
        assert!(parse_dipole("Total energy: -45.0 H\n").is_none());
    }
}
