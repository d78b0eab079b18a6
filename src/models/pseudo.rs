//! # 赝势数据模型
//!
//! 赝势文件引用与 kind -> 赝势映射。
//!
//! ## 依赖关系
//! - 被 `deck/stru.rs`, `resolve/pseudos.rs`, `calculation/` 使用

use crate::error::{RelaxError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// 单个赝势文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pseudopotential {
    /// 稳定标识：规范化后的源文件路径
    pub identity: String,
    /// 声明的文件名
    pub filename: String,
    /// 源文件位置
    pub source: PathBuf,
}

impl Pseudopotential {
    /// 从磁盘文件创建，文件必须存在
    pub fn from_file(path: &Path) -> Result<Self> {
        let source = path.canonicalize().map_err(|_| RelaxError::FileNotFound {
            path: path.display().to_string(),
        })?;
        let filename = source
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                RelaxError::InvalidArgument(format!(
                    "Pseudopotential path has no file name: {}",
                    path.display()
                ))
            })?;

        Ok(Pseudopotential {
            identity: source.display().to_string(),
            filename,
            source,
        })
    }
}

/// kind 名称 -> 赝势
pub type PseudoMap = BTreeMap<String, Pseudopotential>;
