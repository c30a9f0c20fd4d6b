//! # HSD 输入文件读写
//!
//! DFTB+ 的 `dftb_in.hsd` 使用 Human-friendly Structured Data 格式：
//!
//! ```text
//! Geometry = xyzFormat {
//!   <<< "inp.xyz"
//! }
//! Hamiltonian = DFTB {
//!   SCC = Yes
//!   MaxAngularMomentum {
//!     C = "p"
//!   }
//!   Filling = Fermi {
//!     Temperature [K] = 2000
//!   }
//! }
//! ```
//!
//! `Name = Method { ... }` 与 `Name { Method { ... } }` 等价，
//! 解析后均表示为只含一个子块的块。键名查找不区分大小写。
//! `<<<` 包含指令与数据行原样保留为 `Raw` 行。
//!
//! ## 依赖关系
//! - 被 `dops_set/files.rs` 使用

use crate::error::{DopingsError, Result};

use std::fs;
use std::path::Path;

const INDENT: &str = "  ";

/// HSD 条目
#[derive(Debug, Clone, PartialEq)]
pub enum HsdEntry {
    /// `Name = value`
    Value { name: String, value: String },
    /// `Name { ... }`
    Block { name: String, block: HsdBlock },
    /// 数据行或包含指令
    Raw(String),
}

impl HsdEntry {
    /// 条目名，Raw 行没有名字
    pub fn name(&self) -> Option<&str> {
        match self {
            HsdEntry::Value { name, .. } | HsdEntry::Block { name, .. } => Some(name),
            HsdEntry::Raw(_) => None,
        }
    }
}

/// HSD 块：有序条目列表
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HsdBlock {
    pub entries: Vec<HsdEntry>,
}

impl HsdBlock {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.name().is_some_and(|n| n.eq_ignore_ascii_case(name)))
    }

    /// 按名字查找条目
    pub fn get(&self, name: &str) -> Option<&HsdEntry> {
        self.position(name).map(|i| &self.entries[i])
    }

    /// 按名字查找子块
    pub fn block(&self, name: &str) -> Option<&HsdBlock> {
        match self.get(name)? {
            HsdEntry::Block { block, .. } => Some(block),
            _ => None,
        }
    }

    /// 按名字查找取值
    pub fn value(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            HsdEntry::Value { value, .. } => Some(value),
            _ => None,
        }
    }

    /// 按路径查找子块
    pub fn path(&self, path: &[&str]) -> Option<&HsdBlock> {
        path.iter().try_fold(self, |block, name| block.block(name))
    }

    /// 按名字查找可变子块，不创建
    pub fn block_mut(&mut self, name: &str) -> Option<&mut HsdBlock> {
        let index = self.position(name)?;
        match &mut self.entries[index] {
            HsdEntry::Block { block, .. } => Some(block),
            _ => None,
        }
    }

    /// 按路径查找可变子块，任一层级缺失时返回 None
    pub fn existing_path_mut(&mut self, path: &[&str]) -> Option<&mut HsdBlock> {
        path.iter().try_fold(self, |block, name| block.block_mut(name))
    }

    /// 获取子块，不存在或为取值时创建空块
    pub fn child_block_mut(&mut self, name: &str) -> &mut HsdBlock {
        let index = match self.position(name) {
            Some(i) => {
                if !matches!(self.entries[i], HsdEntry::Block { .. }) {
                    self.entries[i] = HsdEntry::Block {
                        name: name.to_string(),
                        block: HsdBlock::new(),
                    };
                }
                i
            }
            None => {
                self.entries.push(HsdEntry::Block {
                    name: name.to_string(),
                    block: HsdBlock::new(),
                });
                self.entries.len() - 1
            }
        };

        match &mut self.entries[index] {
            HsdEntry::Block { block, .. } => block,
            _ => unreachable!("entry was just made a block"),
        }
    }

    /// 沿路径获取子块，缺失的层级自动创建
    pub fn path_mut(&mut self, path: &[&str]) -> &mut HsdBlock {
        path.iter()
            .fold(self, |block, name| block.child_block_mut(name))
    }

    fn replace_or_push(&mut self, entry: HsdEntry) {
        let name = entry.name().unwrap_or_default().to_string();
        match self.position(&name) {
            Some(i) => self.entries[i] = entry,
            None => self.entries.push(entry),
        }
    }

    /// 设置取值，覆盖同名条目
    pub fn set_value(&mut self, name: &str, value: impl ToString) {
        self.replace_or_push(HsdEntry::Value {
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    /// 设置子块，覆盖同名条目
    pub fn set_block(&mut self, name: &str, block: HsdBlock) {
        self.replace_or_push(HsdEntry::Block {
            name: name.to_string(),
            block,
        });
    }

    /// 追加一行原始数据
    pub fn push_raw(&mut self, line: impl Into<String>) {
        self.entries.push(HsdEntry::Raw(line.into()));
    }

    /// 输出为 HSD 文本
    pub fn to_hsd_string(&self) -> String {
        let mut out = String::new();
        write_entries(&self.entries, 0, &mut out);
        out
    }
}

fn write_entries(entries: &[HsdEntry], depth: usize, out: &mut String) {
    let indent = INDENT.repeat(depth);

    for entry in entries {
        match entry {
            HsdEntry::Value { name, value } => {
                out.push_str(&format!("{}{} = {}\n", indent, name, value));
            }
            HsdEntry::Raw(line) => {
                out.push_str(&format!("{}{}\n", indent, line));
            }
            HsdEntry::Block { name, block } => {
                // `Name = Method {`
                let (header, body) = match block.entries.as_slice() {
                    [HsdEntry::Block {
                        name: method,
                        block: inner,
                    }] => (format!("{} = {}", name, method), inner),
                    _ => (name.clone(), block),
                };

                if body.entries.is_empty() {
                    out.push_str(&format!("{}{} {{}}\n", indent, header));
                } else {
                    out.push_str(&format!("{}{} {{\n", indent, header));
                    write_entries(&body.entries, depth + 1, out);
                    out.push_str(&format!("{}}}\n", indent));
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────
// 解析
// ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Eq,
    Open,
    Close,
    Newline,
}

fn tokenize(text: &str) -> std::result::Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut chars = text.chars();
    let mut line = 1;

    fn flush(word: &mut String, tokens: &mut Vec<Token>) {
        if !word.is_empty() {
            tokens.push(Token::Word(std::mem::take(word)));
        }
    }

    while let Some(c) = chars.next() {
        match c {
            '#' => {
                flush(&mut word, &mut tokens);
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
                tokens.push(Token::Newline);
                line += 1;
            }
            '"' | '\'' => {
                word.push(c);
                let mut closed = false;
                for q in chars.by_ref() {
                    word.push(q);
                    if q == '\n' {
                        line += 1;
                    }
                    if q == c {
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err(format!("Unterminated string starting on line {}", line));
                }
            }
            '=' => {
                flush(&mut word, &mut tokens);
                tokens.push(Token::Eq);
            }
            '{' => {
                flush(&mut word, &mut tokens);
                tokens.push(Token::Open);
            }
            '}' => {
                flush(&mut word, &mut tokens);
                tokens.push(Token::Close);
            }
            '\n' | ';' => {
                flush(&mut word, &mut tokens);
                tokens.push(Token::Newline);
                if c == '\n' {
                    line += 1;
                }
            }
            c if c.is_whitespace() => flush(&mut word, &mut tokens),
            c => word.push(c),
        }
    }
    flush(&mut word, &mut tokens);

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn words(&mut self) -> Vec<String> {
        let mut words = Vec::new();
        while let Some(Token::Word(w)) = self.peek() {
            words.push(w.clone());
            self.pos += 1;
        }
        words
    }

    /// 解析块内容，直到 `}` (嵌套) 或文本结尾 (顶层)
    fn block(&mut self, nested: bool) -> std::result::Result<HsdBlock, String> {
        let mut block = HsdBlock::new();

        loop {
            let words = self.words();

            match self.peek().cloned() {
                None => {
                    if nested {
                        return Err("Missing closing '}'".to_string());
                    }
                    push_raw(&mut block, &words);
                    return Ok(block);
                }
                Some(Token::Close) => {
                    self.pos += 1;
                    if !nested {
                        return Err("Unexpected '}'".to_string());
                    }
                    push_raw(&mut block, &words);
                    return Ok(block);
                }
                Some(Token::Newline) => {
                    self.pos += 1;
                    push_raw(&mut block, &words);
                }
                Some(Token::Open) => {
                    self.pos += 1;
                    if words.is_empty() {
                        return Err("Block without a name".to_string());
                    }
                    let inner = self.block(true)?;
                    block.entries.push(HsdEntry::Block {
                        name: words.join(" "),
                        block: inner,
                    });
                }
                Some(Token::Eq) => {
                    self.pos += 1;
                    if words.is_empty() {
                        return Err("Assignment without a name".to_string());
                    }
                    let name = words.join(" ");
                    let rhs = self.words();

                    if self.peek() == Some(&Token::Open) {
                        self.pos += 1;
                        let inner = self.block(true)?;
                        let child = if rhs.is_empty() {
                            inner
                        } else {
                            HsdBlock {
                                entries: vec![HsdEntry::Block {
                                    name: rhs.join(" "),
                                    block: inner,
                                }],
                            }
                        };
                        block.entries.push(HsdEntry::Block { name, block: child });
                    } else {
                        if rhs.is_empty() {
                            return Err(format!("Missing value for '{}'", name));
                        }
                        block.entries.push(HsdEntry::Value {
                            name,
                            value: rhs.join(" "),
                        });
                    }
                }
                Some(Token::Word(_)) => unreachable!("words() consumes every word"),
            }
        }
    }
}

fn push_raw(block: &mut HsdBlock, words: &[String]) {
    if !words.is_empty() {
        block.push_raw(words.join(" "));
    }
}

/// 解析 HSD 文本
pub fn parse_hsd(text: &str) -> std::result::Result<HsdBlock, String> {
    let tokens = tokenize(text)?;
    Parser { tokens, pos: 0 }.block(false)
}

/// 读取 HSD 文件
pub fn read_hsd(path: &Path) -> Result<HsdBlock> {
    let text = fs::read_to_string(path).map_err(|e| DopingsError::read(path, e))?;
    parse_hsd(&text).map_err(|reason| DopingsError::ParseError {
        format: "HSD".to_string(),
        path: path.display().to_string(),
        reason,
    })
}

/// 写出 HSD 文件
pub fn write_hsd(block: &HsdBlock, path: &Path) -> Result<()> {
    fs::write(path, block.to_hsd_string()).map_err(|e| DopingsError::write(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENERIC: &str = r#"
Geometry = xyzFormat {}

Driver = ConjugateGradient {
  MovedAtoms = 1:-1
  MaxSteps = 1000   # limite
  OutputPrefix = "geo_end"
}

Hamiltonian = DFTB {
  SCC = Yes
  MaxAngularMomentum {}
  SlaterKosterFiles = Type2FileNames {
    Separator = "-"
    Suffix = ".skf"
  }
  KPointsAndWeights = {
    0.0 0.0 0.0 1.0
  }
}

Options { WriteChargesAsText = Yes }
"#;

    #[test]
    fn test_parse_generic_template() {
        let hsd = parse_hsd(GENERIC).unwrap();

        let driver = hsd.path(&["Driver", "ConjugateGradient"]).unwrap();
        assert_eq!(driver.value("maxsteps"), Some("1000"));
        assert_eq!(driver.value("OutputPrefix"), Some("\"geo_end\""));

        let dftb = hsd.path(&["Hamiltonian", "DFTB"]).unwrap();
        assert_eq!(dftb.value("SCC"), Some("Yes"));
        assert_eq!(
            dftb.block("KPointsAndWeights").unwrap().entries,
            vec![HsdEntry::Raw("0.0 0.0 0.0 1.0".to_string())]
        );

        let options = hsd.block("Options").unwrap();
        assert_eq!(options.value("WriteChargesAsText"), Some("Yes"));

        let geometry = hsd.path(&["Geometry", "xyzFormat"]).unwrap();
        assert!(geometry.entries.is_empty());
    }

    #[test]
    fn test_round_trip() {
        let hsd = parse_hsd(GENERIC).unwrap();
        let text = hsd.to_hsd_string();
        assert!(text.contains("Driver = ConjugateGradient {\n"));
        assert!(text.contains("  SlaterKosterFiles = Type2FileNames {\n"));
        assert!(text.contains("Geometry = xyzFormat {}\n"));

        let again = parse_hsd(&text).unwrap();
        assert_eq!(again, hsd);
    }

    #[test]
    fn test_path_mut_and_setters() {
        let mut hsd = parse_hsd(GENERIC).unwrap();

        hsd.path_mut(&["Hamiltonian", "DFTB", "MaxAngularMomentum"])
            .set_value("C", "\"p\"");
        hsd.path_mut(&["Options"]).set_value("ReadChargesAsText", "Yes");
        hsd.path_mut(&["Analysis"]).set_value("CalculateForces", "Yes");

        let mut fermi = HsdBlock::new();
        fermi.set_value("Temperature [K]", 2000);
        let mut filling = HsdBlock::new();
        filling.set_block("Fermi", fermi);
        hsd.path_mut(&["Hamiltonian", "DFTB"]).set_block("Filling", filling);

        let text = hsd.to_hsd_string();
        assert!(text.contains("  MaxAngularMomentum {\n    C = \"p\"\n  }\n"));
        assert!(text.contains("  Filling = Fermi {\n    Temperature [K] = 2000\n  }\n"));
        assert!(text.contains("Analysis {\n  CalculateForces = Yes\n}\n"));

        let parsed = parse_hsd(&text).unwrap();
        let dftb = parsed.path(&["Hamiltonian", "DFTB"]).unwrap();
        assert_eq!(dftb.path(&["Filling", "Fermi"]).unwrap().value("Temperature [K]"), Some("2000"));
    }

    #[test]
    fn test_existing_path_mut_does_not_create() {
        let mut hsd = parse_hsd(GENERIC).unwrap();

        assert!(hsd.existing_path_mut(&["Driver", "GeometryOptimization"]).is_none());
        assert!(hsd.existing_path_mut(&["Options", "WriteChargesAsText"]).is_none());
        assert_eq!(hsd, parse_hsd(GENERIC).unwrap());

        hsd.existing_path_mut(&["driver", "conjugategradient"])
            .unwrap()
            .set_value("MaxSteps", 10000);
        let driver = hsd.path(&["Driver", "ConjugateGradient"]).unwrap();
        assert_eq!(driver.value("MaxSteps"), Some("10000"));
    }

    #[test]
    fn test_child_block_replaces_value() {
        let mut hsd = parse_hsd("Prefix = \"old\"\n").unwrap();
        hsd.child_block_mut("prefix").push_raw("<<< \"x\"");
        assert_eq!(hsd.entries.len(), 1);
        assert!(hsd.block("Prefix").is_some());
    }

    #[test]
    fn test_include_line_is_raw() {
        let hsd = parse_hsd("Geometry = xyzFormat {\n  <<< \"inp.xyz\"\n}\n").unwrap();
        let geometry = hsd.path(&["Geometry", "xyzFormat"]).unwrap();
        assert_eq!(geometry.entries, vec![HsdEntry::Raw("<<< \"inp.xyz\"".to_string())]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_hsd("A {\n B = 1\n").is_err());
        assert!(parse_hsd("A = 1\n}\n").is_err());
        assert!(parse_hsd("Prefix = \"unterminated\n").is_err());
        assert!(parse_hsd("= 3\n").is_err());
    }
}
