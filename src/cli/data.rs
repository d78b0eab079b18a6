//! # data 子命令 CLI 定义
//!
//! 管理命名参数预设：
//! - `list`: 列出全部预设
//! - `show`: 以 INPUT 格式显示一个预设
//! - `add`: 从 JSON 文件和/或命令行键值添加预设
//! - `export`: 导出预设为 JSON
//! - `del`: 删除预设
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/data.rs`

use clap::{Args, Subcommand};
use std::path::PathBuf;

/// data 主命令参数
#[derive(Args, Debug)]
pub struct DataArgs {
    /// Parameters preset store
    #[arg(long, global = true, env = "ABACUS_RELAX_STORE", default_value = "presets.json")]
    pub store: PathBuf,

    #[command(subcommand)]
    pub command: DataCommands,
}

/// data 子命令
#[derive(Subcommand, Debug)]
pub enum DataCommands {
    /// List stored parameters presets
    List,

    /// Show one preset in INPUT format
    Show {
        /// Preset id or name
        identifier: String,
    },

    /// Add a named preset
    Add(AddArgs),

    /// Export a preset as JSON
    Export {
        /// Preset id or name
        identifier: String,

        /// Output file (default: stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Delete presets
    Del {
        /// Preset ids or names
        #[arg(required = true)]
        identifiers: Vec<String>,
    },
}

/// data add 参数
#[derive(Args, Debug)]
pub struct AddArgs {
    /// Unique preset name
    pub name: String,

    /// JSON object with parameters
    #[arg(short = 'f', long)]
    pub file: Option<PathBuf>,

    /// Parameter (repeatable): -p ecutwfc 80
    #[arg(
        short = 'p',
        long = "parameters",
        num_args = 2,
        value_names = ["KEY", "VALUE"],
        action = clap::ArgAction::Append
    )]
    pub parameters: Vec<String>,

    /// Owner recorded with the preset
    #[arg(long, env = "USER", default_value = "unknown")]
    pub username: String,
}
