//! # JSON 文件预设存储
//!
//! 所有预设保存在单个 JSON 文件中：
//! ```text
//! { "next_id": 3, "presets": [ { "id": 1, "name": "default", "username": "...", "parameters": {...} }, ... ] }
//! ```
//! 名称在添加时强制唯一。
//!
//! ## 依赖关系
//! - 被 `commands/data.rs`, `commands/launch.rs` 使用
//! - 使用 `serde_json`

use super::PresetStore;
use crate::error::{read_error, write_error, RelaxError, Result};
use crate::models::{NamedPreset, ParameterSet};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    next_id: u64,
    presets: Vec<NamedPreset>,
}

/// 基于 JSON 文件的预设存储
#[derive(Debug)]
pub struct JsonPresetStore {
    path: PathBuf,
    data: StoreFile,
}

impl JsonPresetStore {
    /// 打开存储文件；文件不存在时视为空存储
    pub fn open(path: &Path) -> Result<Self> {
        let data = if path.exists() {
            let content = fs::read_to_string(path).map_err(read_error(path))?;
            serde_json::from_str(&content).map_err(|e| RelaxError::ParseError {
                format: "preset store".to_string(),
                path: path.display().to_string(),
                reason: e.to_string(),
            })?
        } else {
            StoreFile {
                next_id: 1,
                presets: Vec::new(),
            }
        };

        Ok(JsonPresetStore {
            path: path.to_path_buf(),
            data,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list(&self) -> &[NamedPreset] {
        &self.data.presets
    }

    /// 按 id 或名称查找
    pub fn get(&self, identifier: &str) -> Option<&NamedPreset> {
        let id = identifier.parse::<u64>().ok();
        self.data
            .presets
            .iter()
            .find(|p| Some(p.id) == id || p.name == identifier)
    }

    /// 添加新预设；名称已存在时失败
    pub fn add(&mut self, name: &str, username: &str, parameters: ParameterSet) -> Result<&NamedPreset> {
        if self.data.presets.iter().any(|p| p.name == name) {
            return Err(RelaxError::ResolutionError(format!(
                "Name {} parameters already exists.",
                name
            )));
        }

        let id = self.data.next_id.max(1);
        self.data.next_id = id + 1;
        self.data.presets.push(NamedPreset {
            id,
            name: name.to_string(),
            username: username.to_string(),
            parameters,
        });
        self.save()?;

        Ok(&self.data.presets[self.data.presets.len() - 1])
    }

    /// 按 id 或名称删除
    pub fn remove(&mut self, identifier: &str) -> Result<NamedPreset> {
        let id = identifier.parse::<u64>().ok();
        let pos = self
            .data
            .presets
            .iter()
            .position(|p| Some(p.id) == id || p.name == identifier)
            .ok_or_else(|| {
                RelaxError::ResolutionError(format!("No parameters named or numbered '{}'", identifier))
            })?;

        let removed = self.data.presets.remove(pos);
        self.save()?;
        Ok(removed)
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_error(parent))?;
        }
        let content = serde_json::to_string_pretty(&self.data)?;
        fs::write(&self.path, content).map_err(write_error(&self.path))
    }
}

impl PresetStore for JsonPresetStore {
    fn find(&self, name: &str) -> Result<Vec<NamedPreset>> {
        Ok(self
            .data
            .presets
            .iter()
            .filter(|p| p.name == name)
            .cloned()
            .collect())
    }
}
