//! # STRU 文件生成
//!
//! ## STRU 格式说明
//! ```text
//! ATOMIC_SPECIES
//! Ge     72.64 Ge.upf          # 按 kind 名排序
//! Si     28.0855 Si.upf
//! LATTICE_CONSTANT
//! 1
//! LATTICE_VECTORS
//! a1 a2 a3
//! b1 b2 b3
//! c1 c2 c3
//! ATOMIC_POSITIONS
//! Direct
//! Si                           # kind，按 site 中首次出现顺序
//! 0.0                          # 初始磁矩
//! 2                            # 原子数
//!       0.0000000000       0.0000000000       0.0000000000   0 0 0
//! ...
//! ```
//!
//! 四个块依次写入同一文件；后面的块校验失败时文件中可能残留前面的块。
//!
//! ## 依赖关系
//! - 被 `calculation/` 使用
//! - 使用 `models/structure.rs`, `models/pseudo.rs`

use super::PSEUDO_SUBFOLDER;
use crate::error::{write_error, RelaxError, Result};
use crate::models::{Lattice, LocalCopy, PseudoMap, Structure};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// 影响 STRU 生成的附加设置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct StruSettings {
    /// 每个 kind 的初始磁矩，长度必须等于 kind 数
    #[serde(default)]
    pub initial_magnetic: Option<Vec<f64>>,
    /// 每个 site 的固定坐标掩码 (0/1)，长度必须等于 site 数
    #[serde(default)]
    pub fixed_coords: Option<Vec<Vec<i64>>>,
}

/// ATOMIC_SPECIES 块及其副产物
#[derive(Debug, Clone)]
pub struct SpeciesBlock {
    pub text: String,
    /// 需要复制到工作目录的赝势文件（按标识去重）
    pub local_copies: Vec<LocalCopy>,
    /// kind 名 -> 排序后的序号（从 1 开始）
    pub ranks: BTreeMap<String, usize>,
}

/// 在已用文件名中选择不冲突的名称：`name`, `base-1.ext`, `base-2.ext`, ...
pub fn unique_filename(filename: &str, used: &[String]) -> String {
    if !used.iter().any(|u| u == filename) {
        return filename.to_string();
    }

    let (base, ext) = match filename.rfind('.') {
        Some(pos) if pos > 0 => (&filename[..pos], &filename[pos..]),
        _ => (filename, ""),
    };

    (1..)
        .map(|n| format!("{}-{}{}", base, n, ext))
        .find(|candidate| !used.iter().any(|u| u == candidate))
        .unwrap_or_else(|| filename.to_string())
}

/// 生成 ATOMIC_SPECIES 块
pub fn atomic_species_block(structure: &Structure, pseudos: &PseudoMap) -> Result<SpeciesBlock> {
    // 赝势标识 -> 已分配文件名；同一赝势的多个 kind 共用一个文件
    let mut assigned: HashMap<&str, String> = HashMap::new();
    let mut used_names: Vec<String> = Vec::new();
    let mut local_copies = Vec::new();
    let mut lines: Vec<(&str, String)> = Vec::new();

    for kind in structure.kinds() {
        let pseudo = pseudos.get(&kind.name).ok_or_else(|| {
            RelaxError::ValidationError(format!(
                "No pseudopotential specified for kind '{}'",
                kind.name
            ))
        })?;

        let filename = match assigned.get(pseudo.identity.as_str()) {
            Some(name) => name.clone(),
            None => {
                let name = unique_filename(&pseudo.filename, &used_names);
                used_names.push(name.clone());
                assigned.insert(pseudo.identity.as_str(), name.clone());
                local_copies.push(LocalCopy {
                    identity: pseudo.identity.clone(),
                    source: pseudo.source.clone(),
                    filename: pseudo.filename.clone(),
                    destination: PathBuf::from(PSEUDO_SUBFOLDER).join(&name),
                });
                name
            }
        };

        lines.push((
            kind.name.as_str(),
            format!("{:<6} {:?} {}\n", kind.name, kind.mass, filename),
        ));
    }

    lines.sort();

    let ranks = lines
        .iter()
        .enumerate()
        .map(|(idx, (name, _))| (name.to_string(), idx + 1))
        .collect();

    let mut text = String::from("ATOMIC_SPECIES\n");
    for (_, line) in &lines {
        text.push_str(line);
    }

    Ok(SpeciesBlock {
        text,
        local_copies,
        ranks,
    })
}

/// LATTICE_CONSTANT 块（固定为 1）
pub fn lattice_constant_block() -> String {
    "LATTICE_CONSTANT\n1\n".to_string()
}

/// LATTICE_VECTORS 块
pub fn lattice_vectors_block(lattice: &Lattice) -> String {
    let mut text = String::from("LATTICE_VECTORS\n");
    for row in &lattice.matrix {
        text.push_str(&format!("{:?} {:?} {:?}\n", row[0], row[1], row[2]));
    }
    text
}

fn magnetic_strings(structure: &Structure, settings: &StruSettings) -> Result<Vec<String>> {
    let nkinds = structure.kinds().len();
    match &settings.initial_magnetic {
        None => Ok(vec!["0.0".to_string(); nkinds]),
        Some(values) if values.len() != nkinds => Err(RelaxError::ValidationError(format!(
            "Input structure contains {} elements, but initial_magnetic has length {}",
            nkinds,
            values.len()
        ))),
        Some(values) => Ok(values.iter().map(|m| format!("{:.1}", m)).collect()),
    }
}

fn fixed_coords_strings(structure: &Structure, settings: &StruSettings) -> Result<Vec<String>> {
    let nsites = structure.sites().len();
    let fixed = match &settings.fixed_coords {
        None => return Ok(vec!["  0 0 0".to_string(); nsites]),
        Some(fixed) => fixed,
    };

    if fixed.len() != nsites {
        return Err(RelaxError::ValidationError(format!(
            "Input structure contains {} sites, but fixed_coords has length {}",
            nsites,
            fixed.len()
        )));
    }

    fixed
        .iter()
        .enumerate()
        .map(|(i, mask)| {
            if mask.len() != 3 {
                return Err(RelaxError::ValidationError(format!(
                    "fixed_coords({}) has not length three",
                    i + 1
                )));
            }
            if mask.iter().any(|&f| f != 0 && f != 1) {
                return Err(RelaxError::ValidationError(format!(
                    "fixed_coords({}) has non-(0, 1) elements",
                    i + 1
                )));
            }
            Ok(format!("  {} {} {}", mask[0], mask[1], mask[2]))
        })
        .collect()
}

/// 生成 ATOMIC_POSITIONS 块
pub fn atomic_positions_block(structure: &Structure, settings: &StruSettings) -> Result<String> {
    let magnetic = magnetic_strings(structure, settings)?;
    let fixed = fixed_coords_strings(structure, settings)?;

    // 按 site 中 kind 首次出现的顺序分组
    let mut groups: Vec<(&str, Vec<String>)> = Vec::new();
    for (site, mask) in structure.sites().iter().zip(&fixed) {
        let p = site.position;
        let line = format!("{:18.10} {:18.10} {:18.10} {}\n", p[0], p[1], p[2], mask);
        match groups.iter_mut().find(|(name, _)| *name == site.kind_name) {
            Some((_, lines)) => lines.push(line),
            None => groups.push((site.kind_name.as_str(), vec![line])),
        }
    }

    let mut text = String::from("ATOMIC_POSITIONS\nDirect\n");
    for (idx, (name, lines)) in groups.iter().enumerate() {
        text.push_str(&format!("{}\n{}\n{}\n", name, magnetic[idx], lines.len()));
        for line in lines {
            text.push_str(line);
        }
    }
    Ok(text)
}

/// 逐块写出 STRU 文件，返回需要暂存的赝势文件列表
pub fn write_stru(
    path: &Path,
    structure: &Structure,
    pseudos: &PseudoMap,
    settings: &StruSettings,
) -> Result<Vec<LocalCopy>> {
    let file = File::create(path).map_err(write_error(path))?;
    let mut writer = BufWriter::new(file);

    let species = atomic_species_block(structure, pseudos)?;
    writer
        .write_all(species.text.as_bytes())
        .map_err(write_error(path))?;
    writer
        .write_all(lattice_constant_block().as_bytes())
        .map_err(write_error(path))?;
    writer
        .write_all(lattice_vectors_block(&structure.lattice).as_bytes())
        .map_err(write_error(path))?;
    writer.flush().map_err(write_error(path))?;

    let positions = atomic_positions_block(structure, settings)?;
    writer
        .write_all(positions.as_bytes())
        .map_err(write_error(path))?;
    writer.flush().map_err(write_error(path))?;

    Ok(species.local_copies)
}
