//! # 解析器模块
//!
//! 读取结构文件，得到 `Structure` 以及文件中附带的 STRU 设置
//! （POSCAR 的 selective dynamics、STRU 的磁矩与固定坐标）。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 使用 `models/` 数据模型
//! - 子模块: poscar, stru

pub mod poscar;
pub mod stru;

use crate::deck::StruSettings;
use crate::error::{RelaxError, Result};
use crate::models::Structure;
use std::path::Path;

/// 解析结果
#[derive(Debug, Clone)]
pub struct ParsedStructure {
    pub structure: Structure,
    /// 文件中携带的设置；未提供的字段为 None
    pub settings: StruSettings,
}

/// 从文件名推断格式并解析
pub fn parse_structure_file(path: &Path) -> Result<ParsedStructure> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    if name.starts_with("STRU") || ext == "stru" {
        return stru::parse_stru_file(path);
    }
    if name.starts_with("POSCAR") || name.starts_with("CONTCAR") || ext == "vasp" || ext == "poscar" {
        return poscar::parse_poscar_file(path);
    }

    Err(RelaxError::UnsupportedFormat(format!(
        "Cannot determine format for: {}",
        path.display()
    )))
}

/// 按元素符号或标签（如 `Fe1`、`O_up`）构造 kind
pub(crate) fn kind_symbol(label: &str, format: &str, source: &str) -> Result<&'static str> {
    crate::models::elements::symbol_from_label(label).ok_or_else(|| RelaxError::ParseError {
        format: format.to_string(),
        path: source.to_string(),
        reason: format!("Unknown element label '{}'", label),
    })
}
