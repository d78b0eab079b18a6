//! # ABACUS STRU 格式解析器
//!
//! 读取 `deck/stru.rs` 写出的 STRU 文件（也兼容常见的手写 STRU）：
//! - `ATOMIC_SPECIES`: kind 名、质量、赝势文件
//! - `LATTICE_CONSTANT`: 晶格向量的缩放因子
//! - `LATTICE_VECTORS`: 三行晶格向量
//! - `ATOMIC_POSITIONS`: Direct/Cartesian，按 kind 分组，每组为
//!   名称、初始磁矩、原子数、原子行（坐标 + 可选 0/1 掩码）
//!
//! 其他块（如 `NUMERICAL_ORBITAL`）被跳过。`#` 与 `//` 之后的内容视为注释。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/structure.rs`

use super::{kind_symbol, ParsedStructure};
use crate::deck::StruSettings;
use crate::error::{read_error, RelaxError, Result};
use crate::models::{Kind, Lattice, Structure};
use std::fs;
use std::path::Path;

const FORMAT: &str = "stru";

const BLOCKS: [&str; 6] = [
    "ATOMIC_SPECIES",
    "LATTICE_CONSTANT",
    "LATTICE_VECTORS",
    "ATOMIC_POSITIONS",
    "NUMERICAL_ORBITAL",
    "NUMERICAL_DESCRIPTOR",
];

fn parse_error(source: &str, reason: impl Into<String>) -> RelaxError {
    RelaxError::ParseError {
        format: FORMAT.to_string(),
        path: source.to_string(),
        reason: reason.into(),
    }
}

/// 解析 STRU 文件
pub fn parse_stru_file(path: &Path) -> Result<ParsedStructure> {
    let content = fs::read_to_string(path).map_err(read_error(path))?;
    parse_stru_content(&content, &path.display().to_string())
}

fn strip_comment(line: &str) -> &str {
    let end = [line.find('#'), line.find("//")]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(line.len());
    line[..end].trim()
}

/// 从字符串内容解析 STRU 格式
pub fn parse_stru_content(content: &str, source: &str) -> Result<ParsedStructure> {
    let lines: Vec<&str> = content
        .lines()
        .map(strip_comment)
        .filter(|l| !l.is_empty())
        .collect();

    let mut species: Vec<(String, f64)> = Vec::new();
    let mut scale = 1.0;
    let mut vectors: Option<[[f64; 3]; 3]> = None;
    let mut positions_at: Option<usize> = None;

    let mut i = 0;
    while i < lines.len() {
        match lines[i] {
            "ATOMIC_SPECIES" => {
                i += 1;
                while i < lines.len() && !BLOCKS.contains(&lines[i]) {
                    let tokens: Vec<&str> = lines[i].split_whitespace().collect();
                    let mass = tokens
                        .get(1)
                        .and_then(|m| m.parse::<f64>().ok())
                        .ok_or_else(|| {
                            parse_error(source, format!("Invalid species line '{}'", lines[i]))
                        })?;
                    species.push((tokens[0].to_string(), mass));
                    i += 1;
                }
            }
            "LATTICE_CONSTANT" => {
                scale = lines
                    .get(i + 1)
                    .and_then(|l| l.split_whitespace().next())
                    .and_then(|v| v.parse().ok())
                    .ok_or_else(|| parse_error(source, "Invalid LATTICE_CONSTANT"))?;
                i += 2;
            }
            "LATTICE_VECTORS" => {
                let mut matrix = [[0.0; 3]; 3];
                for (k, row) in matrix.iter_mut().enumerate() {
                    let parts: Vec<f64> = lines
                        .get(i + 1 + k)
                        .map(|l| l.split_whitespace().filter_map(|s| s.parse().ok()).collect())
                        .unwrap_or_default();
                    if parts.len() != 3 {
                        return Err(parse_error(
                            source,
                            format!("Invalid lattice vector {}", k + 1),
                        ));
                    }
                    *row = [parts[0], parts[1], parts[2]];
                }
                vectors = Some(matrix);
                i += 4;
            }
            "ATOMIC_POSITIONS" => {
                positions_at = Some(i + 1);
                i += 1;
                while i < lines.len() && !BLOCKS.contains(&lines[i]) {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }

    let matrix = vectors.ok_or_else(|| parse_error(source, "Missing LATTICE_VECTORS block"))?;
    let lattice = Lattice::from_vectors(matrix.map(|row| row.map(|x| x * scale)));
    let start = positions_at.ok_or_else(|| parse_error(source, "Missing ATOMIC_POSITIONS block"))?;

    let name = Path::new(source)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("STRU")
        .to_string();
    let mut structure = Structure::new(name, lattice);
    for (kind_name, mass) in &species {
        let symbol = kind_symbol(kind_name, FORMAT, source)?;
        structure.append_kind(Kind::new(kind_name.as_str(), symbol, *mass))?;
    }

    let coord_type = lines
        .get(start)
        .ok_or_else(|| parse_error(source, "Missing coordinate type"))?
        .to_lowercase();
    let cartesian = match coord_type.as_str() {
        "direct" => false,
        "cartesian" => true,
        other => {
            return Err(parse_error(
                source,
                format!("Unsupported coordinate type '{}'", other),
            ))
        }
    };

    let mut magnetic = Vec::new();
    let mut masks: Vec<Vec<i64>> = Vec::new();
    let mut any_mask = false;

    let mut i = start + 1;
    while i < lines.len() && !BLOCKS.contains(&lines[i]) {
        let kind_name = lines[i];
        if structure.get_kind(kind_name).is_none() {
            return Err(parse_error(
                source,
                format!("Kind '{}' is not declared in ATOMIC_SPECIES", kind_name),
            ));
        }
        let mag: f64 = lines
            .get(i + 1)
            .and_then(|l| l.parse().ok())
            .ok_or_else(|| parse_error(source, format!("Invalid magnetic moment for {}", kind_name)))?;
        let count: usize = lines
            .get(i + 2)
            .and_then(|l| l.parse().ok())
            .ok_or_else(|| parse_error(source, format!("Invalid atom count for {}", kind_name)))?;
        magnetic.push(mag);
        i += 3;

        for _ in 0..count {
            let line = lines
                .get(i)
                .ok_or_else(|| parse_error(source, format!("Missing atoms for {}", kind_name)))?;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let coords: Vec<f64> = tokens.iter().take(3).filter_map(|s| s.parse().ok()).collect();
            if coords.len() != 3 {
                return Err(parse_error(source, format!("Invalid atom line '{}'", line)));
            }

            let mut position = [coords[0], coords[1], coords[2]];
            if cartesian {
                position = structure.lattice.cart_to_frac(position.map(|x| x * scale))?;
            }
            structure.append_site(kind_name, position)?;

            let mask: Vec<i64> = tokens
                .iter()
                .skip(3)
                .take(3)
                .filter_map(|s| s.parse().ok())
                .collect();
            if mask.len() == 3 {
                any_mask = true;
                masks.push(mask);
            } else {
                masks.push(vec![0, 0, 0]);
            }
            i += 1;
        }
    }

    Ok(ParsedStructure {
        structure,
        settings: StruSettings {
            initial_magnetic: Some(magnetic),
            fixed_coords: any_mask.then_some(masks),
        },
    })
}
