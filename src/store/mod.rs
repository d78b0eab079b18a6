//! # 命名参数预设存储
//!
//! 工作流只通过 `PresetStore::find` 按名称查找预设，
//! 具体存储（JSON 文件、内存）由调用方注入。
//!
//! ## 依赖关系
//! - 被 `resolve/parameters.rs`, `commands/` 使用
//! - 子模块: json

pub mod json;

pub use json::JsonPresetStore;

use crate::error::Result;
use crate::models::NamedPreset;

/// 预设查询接口
pub trait PresetStore {
    /// 返回名称匹配的全部记录（可能为 0 条或多条）
    fn find(&self, name: &str) -> Result<Vec<NamedPreset>>;
}
