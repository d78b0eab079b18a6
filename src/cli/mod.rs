//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `launch`: 启动工作流（嵌套子命令）
//!   - `relax`: 迭代弛豫
//! - `prepare`: 只生成输入文件
//! - `data`: 命名参数预设管理（list/show/add/export/del）
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: common, launch, prepare, data

pub mod common;
pub mod data;
pub mod launch;
pub mod prepare;

use clap::{Parser, Subcommand};

/// abacus-relax - ABACUS 输入生成与弛豫工作流
#[derive(Parser)]
#[command(name = "abacus-relax")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Input decks and iterative relaxation workflows for ABACUS", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Launch a workflow
    Launch(launch::LaunchArgs),

    /// Write KPT/STRU/INPUT for a structure without submitting
    Prepare(prepare::PrepareArgs),

    /// Manage named parameters presets
    Data(data::DataArgs),
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Launch(_) => "launch",
            Commands::Prepare(_) => "prepare",
            Commands::Data(_) => "data",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_launch_relax() {
        let cli = Cli::try_parse_from([
            "abacus-relax", "launch", "relax", "-S", "POSCAR", "-p", "ecutwfc", "80", "-p",
            "scf_thr", "1e-7", "--pseudo", "Si=Si.upf", "-x", "--max-iterations", "3",
        ])
        .unwrap();
        let Commands::Launch(args) = cli.command else {
            panic!("expected launch");
        };
        let launch::LaunchCommands::Relax(relax) = args.command;
        assert_eq!(relax.input.parameters, vec!["ecutwfc", "80", "scf_thr", "1e-7"]);
        assert_eq!(relax.pseudo.pseudo, vec!["Si=Si.upf"]);
        assert!(relax.clean_workdir);
        assert!(!relax.daemon);
        assert_eq!(relax.max_iterations, 3);
        assert_eq!(relax.input.parameters_name, "default");
        assert_eq!(relax.scheduler, launch::Scheduler::Local);
    }

    #[test]
    fn test_parse_prepare_mesh() {
        let cli = Cli::try_parse_from([
            "abacus-relax", "prepare", "-S", "STRU", "-k", "4", "4", "1", "--kpoints-offset",
            "0", "0.5", "0",
        ])
        .unwrap();
        let Commands::Prepare(args) = cli.command else {
            panic!("expected prepare");
        };
        assert_eq!(args.kpoints_mesh, Some(vec![4, 4, 1]));
        assert_eq!(args.kpoints_offset, Some(vec![0.0, 0.5, 0.0]));
    }

    #[test]
    fn test_parse_data_del() {
        let cli = Cli::try_parse_from(["abacus-relax", "data", "del", "a", "2"]).unwrap();
        let Commands::Data(args) = cli.command else {
            panic!("expected data");
        };
        assert!(matches!(
            args.command,
            data::DataCommands::Del { ref identifiers } if identifiers == &["a", "2"]
        ));
    }
}
