//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `parsers/`, `workflow/`, `store/`, `utils/`
//! - 子模块: common, launch, prepare, data

pub mod common;
pub mod data;
pub mod launch;
pub mod prepare;

use crate::cli::Commands;
use crate::error::Result;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Launch(args) => launch::execute(args),
        Commands::Prepare(args) => prepare::execute(args),
        Commands::Data(args) => data::execute(args),
    }
}
