//! # 命令共享逻辑
//!
//! 把 CLI 参数转换为领域输入：结构与 STRU 设置、覆盖参数、赝势来源。
//!
//! ## 依赖关系
//! - 被 `commands/launch.rs`, `commands/prepare.rs`, `commands/data.rs` 使用
//! - 使用 `parsers/`, `models/`, `resolve/pseudos.rs`

use crate::cli::common::{InputArgs, PseudoArgs};
use crate::deck::StruSettings;
use crate::error::{read_error, RelaxError, Result};
use crate::models::{ParamValue, ParameterSet, PseudoMap, Pseudopotential, Structure};
use crate::parsers;
use crate::resolve::DirectoryFamily;
use crate::utils::output;
use std::fs;
use std::path::{Path, PathBuf};

/// 读取结构文件；`--settings` 中给出的字段覆盖文件自带的设置
pub fn load_structure(input: &InputArgs) -> Result<(Structure, StruSettings)> {
    if !input.structure.exists() {
        return Err(RelaxError::FileNotFound {
            path: input.structure.display().to_string(),
        });
    }

    let parsed = parsers::parse_structure_file(&input.structure)?;
    output::print_info(&format!(
        "Loaded {} ({} kinds, {} sites) from {}",
        parsed.structure.formula(),
        parsed.structure.kinds().len(),
        parsed.structure.sites().len(),
        input.structure.display()
    ));

    let mut settings = parsed.settings;
    if let Some(path) = &input.settings {
        let overrides = read_settings(path)?;
        if overrides.initial_magnetic.is_some() {
            settings.initial_magnetic = overrides.initial_magnetic;
        }
        if overrides.fixed_coords.is_some() {
            settings.fixed_coords = overrides.fixed_coords;
        }
    }

    Ok((parsed.structure, settings))
}

fn read_settings(path: &Path) -> Result<StruSettings> {
    let content = fs::read_to_string(path).map_err(read_error(path))?;
    serde_json::from_str(&content).map_err(|e| RelaxError::ParseError {
        format: "settings".to_string(),
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// `-p KEY VALUE` 序列转换为参数集，值按字面推断类型
pub fn collect_overrides(pairs: &[String]) -> Result<ParameterSet> {
    if pairs.len() % 2 != 0 {
        return Err(RelaxError::InvalidArgument(
            "Parameters must be given as KEY VALUE pairs".to_string(),
        ));
    }

    Ok(pairs
        .chunks(2)
        .map(|pair| (pair[0].clone(), ParamValue::parse(&pair[1])))
        .collect())
}

/// `--pseudo KIND=PATH` 转换为显式赝势映射；未给出时返回 None
pub fn explicit_pseudos(specs: &[String]) -> Result<Option<PseudoMap>> {
    if specs.is_empty() {
        return Ok(None);
    }

    let mut map = PseudoMap::new();
    for spec in specs {
        let (kind, path) = spec.split_once('=').ok_or_else(|| {
            RelaxError::InvalidArgument(format!("Expected KIND=PATH, got '{}'", spec))
        })?;
        let kind = kind.trim();
        if kind.is_empty() {
            return Err(RelaxError::InvalidArgument(format!(
                "Missing kind name in '{}'",
                spec
            )));
        }
        let pseudo = Pseudopotential::from_file(Path::new(path.trim()))?;
        if map.insert(kind.to_string(), pseudo).is_some() {
            return Err(RelaxError::InvalidArgument(format!(
                "Pseudopotential for kind '{}' given more than once",
                kind
            )));
        }
    }
    Ok(Some(map))
}

/// 赝势族根目录，默认为当前目录
pub fn pseudo_families(pseudo: &PseudoArgs) -> DirectoryFamily {
    DirectoryFamily::new(
        pseudo
            .pseudo_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(".")),
    )
}
