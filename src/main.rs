//! # abacus-relax - ABACUS 输入生成与迭代弛豫工作流
//!
//! 为平面波 DFT 程序 ABACUS 生成 KPT / STRU / INPUT 输入文件，
//! 并以状态机驱动"提交计算、检查结果、按需重复"的弛豫流程。
//!
//! ## 子命令
//! - `launch relax` - 运行迭代弛豫工作流（本地或 Slurm）
//! - `prepare`      - 只生成输入文件
//! - `data`         - 命名参数预设管理
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/          (命令行参数定义)
//!   ├── commands/     (命令执行逻辑)
//!   │     ├── parsers/     (结构文件解析)
//!   │     ├── workflow/    (弛豫状态机)
//!   │     │     ├── resolve/     (参数、k 点、赝势解析)
//!   │     │     ├── calculation/ (作业适配器)
//!   │     │     │     └── deck/  (KPT / STRU / INPUT 序列化)
//!   │     │     └── substrate/   (本地 / Slurm 作业底座)
//!   │     ├── store/       (命名参数预设)
//!   │     └── models/      (数据模型)
//!   ├── utils/        (输出、进度、sbatch 工具)
//!   └── error.rs      (错误处理)
//! ```

mod calculation;
mod cli;
mod commands;
mod deck;
mod error;
mod models;
mod parsers;
mod resolve;
mod store;
mod substrate;
mod utils;
mod workflow;

use anyhow::Context;
use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        utils::output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let name = cli.command.name();
    commands::run(cli.command).with_context(|| format!("`{}` failed", name))
}
