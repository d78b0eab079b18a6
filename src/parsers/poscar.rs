//! # VASP POSCAR 格式解析器
//!
//! 解析 VASP POSCAR/CONTCAR 文件格式。
//!
//! ## POSCAR 格式说明
//! ```text
//! Comment line (structure name)
//! 1.0                    # scaling factor
//! a1 a2 a3               # lattice vector a
//! b1 b2 b3               # lattice vector b
//! c1 c2 c3               # lattice vector c
//! Element1 Element2 ...  # element symbols (VASP 5+)
//! n1 n2 ...              # number of atoms per element
//! Selective dynamics     # optional
//! Direct/Cartesian       # coordinate type
//! x1 y1 z1 [T T F]       # atom positions
//! ...
//! ```
//!
//! VASP 4 文件没有元素行，此时从注释行读取元素符号。
//! Selective dynamics 转换为 STRU 掩码：T（可移动）记为 0，F（固定）记为 1。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/structure.rs`

use super::{kind_symbol, ParsedStructure};
use crate::deck::StruSettings;
use crate::error::{read_error, RelaxError, Result};
use crate::models::elements::atomic_mass;
use crate::models::{Kind, Lattice, Structure};
use std::fs;
use std::path::Path;

const FORMAT: &str = "poscar";

fn parse_error(source: &str, reason: impl Into<String>) -> RelaxError {
    RelaxError::ParseError {
        format: FORMAT.to_string(),
        path: source.to_string(),
        reason: reason.into(),
    }
}

/// 解析 POSCAR/CONTCAR 文件
pub fn parse_poscar_file(path: &Path) -> Result<ParsedStructure> {
    let content = fs::read_to_string(path).map_err(read_error(path))?;
    parse_poscar_content(&content, &path.display().to_string())
}

/// 从字符串内容解析 POSCAR 格式
pub fn parse_poscar_content(content: &str, source: &str) -> Result<ParsedStructure> {
    let lines: Vec<&str> = content.lines().collect();

    if lines.len() < 8 {
        return Err(parse_error(source, "File too short"));
    }

    // Line 0: Comment/name
    let comment = lines[0].trim();
    let name = if comment.is_empty() {
        Path::new(source)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string()
    } else {
        comment.to_string()
    };

    // Line 1: Scaling factor
    let scale: f64 = lines[1]
        .split_whitespace()
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| parse_error(source, "Invalid scaling factor at line 2"))?;

    // Lines 2-4: Lattice vectors
    let mut matrix = [[0.0; 3]; 3];
    for (i, row) in matrix.iter_mut().enumerate() {
        let parts: Vec<f64> = lines[2 + i]
            .split_whitespace()
            .filter_map(|s| s.parse().ok())
            .collect();
        if parts.len() < 3 {
            return Err(parse_error(
                source,
                format!("Invalid lattice vector at line {}", 3 + i),
            ));
        }
        *row = [parts[0] * scale, parts[1] * scale, parts[2] * scale];
    }
    let lattice = Lattice::from_vectors(matrix);

    // Line 5: Element symbols (VASP 5+) or atom counts (VASP 4)
    let line5_parts: Vec<&str> = lines[5].split_whitespace().collect();
    let first = line5_parts
        .first()
        .ok_or_else(|| parse_error(source, "Missing element/count line"))?;
    let (labels, counts, atom_line_start) = if first.parse::<usize>().is_ok() {
        let counts: Vec<usize> = line5_parts.iter().filter_map(|s| s.parse().ok()).collect();
        let labels: Vec<String> = comment
            .split_whitespace()
            .take(counts.len())
            .map(str::to_string)
            .collect();
        if labels.len() != counts.len() {
            return Err(parse_error(
                source,
                "VASP 4 file without element symbols in the comment line",
            ));
        }
        (labels, counts, 6)
    } else {
        let labels: Vec<String> = line5_parts.iter().map(|s| s.to_string()).collect();
        let counts: Vec<usize> = lines[6]
            .split_whitespace()
            .filter_map(|s| s.parse().ok())
            .collect();
        (labels, counts, 7)
    };

    if labels.len() != counts.len() {
        return Err(parse_error(
            source,
            format!("{} element symbols but {} counts", labels.len(), counts.len()),
        ));
    }

    // Check for "Selective dynamics" line
    let mut coord_line = atom_line_start;
    let selective = lines
        .get(coord_line)
        .map(|l| l.trim().to_lowercase().starts_with('s'))
        .unwrap_or(false);
    if selective {
        coord_line += 1;
    }

    let coord_type = lines
        .get(coord_line)
        .ok_or_else(|| parse_error(source, "Missing coordinate type line"))?
        .trim()
        .to_lowercase();
    let is_cartesian = coord_type.starts_with('c') || coord_type.starts_with('k');

    let mut structure = Structure::new(name, lattice);
    for label in &labels {
        if structure.get_kind(label).is_none() {
            let symbol = kind_symbol(label, FORMAT, source)?;
            let mass = atomic_mass(symbol).unwrap_or_default();
            structure.append_kind(Kind::new(label.as_str(), symbol, mass))?;
        }
    }

    // Parse atom positions
    let mut masks: Vec<Vec<i64>> = Vec::new();
    let mut line_idx = coord_line + 1;

    for (label, &count) in labels.iter().zip(counts.iter()) {
        for _ in 0..count {
            let line = lines.get(line_idx).ok_or_else(|| {
                parse_error(source, format!("Expected atom position at line {}", line_idx + 1))
            })?;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let parts: Vec<f64> = tokens.iter().take(3).filter_map(|s| s.parse().ok()).collect();
            if parts.len() < 3 {
                return Err(parse_error(
                    source,
                    format!("Invalid atom position at line {}", line_idx + 1),
                ));
            }

            let mut position = [parts[0], parts[1], parts[2]];
            if is_cartesian {
                position = position.map(|x| x * scale);
                position = structure.lattice.cart_to_frac(position)?;
            }
            structure.append_site(label, position)?;

            if selective {
                let flags: Vec<i64> = tokens
                    .iter()
                    .skip(3)
                    .take(3)
                    .map(|f| i64::from(f.to_ascii_uppercase().starts_with('F')))
                    .collect();
                if flags.len() != 3 {
                    return Err(parse_error(
                        source,
                        format!("Missing selective dynamics flags at line {}", line_idx + 1),
                    ));
                }
                masks.push(flags);
            }
            line_idx += 1;
        }
    }

    Ok(ParsedStructure {
        structure,
        settings: StruSettings {
            initial_magnetic: None,
            fixed_coords: selective.then_some(masks),
        },
    })
}
