//! # Slurm 工具
//!
//! 生成 sbatch 提交脚本，解析 `sbatch` / `sacct` 输出。
//!
//! ## 依赖关系
//! - 被 `substrate/slurm.rs` 使用
//! - 使用 `regex` 解析命令输出

use crate::error::{RelaxError, Result};
use crate::models::JobState;
use regex::Regex;
use std::path::Path;

/// Slurm 作业配置
#[derive(Debug, Clone)]
pub struct SlurmConfig {
    pub job_name: String,
    pub partition: Option<String>,
    pub constraint: Option<String>,
    pub nodes: u32,
    pub ntasks: u32,
    pub cpus_per_task: u32,
    pub mem_per_cpu: String,
    pub time_limit: String,
    pub modules: Vec<String>,
}

impl Default for SlurmConfig {
    fn default() -> Self {
        SlurmConfig {
            job_name: "abacus".to_string(),
            partition: None,
            constraint: None,
            nodes: 1,
            ntasks: 1,
            cpus_per_task: 1,
            mem_per_cpu: "2G".to_string(),
            time_limit: "24:00:00".to_string(),
            modules: vec![],
        }
    }
}

/// 生成 sbatch 脚本内容
pub fn generate_sbatch_script(config: &SlurmConfig, workdir: &Path, exec_cmd: &str) -> String {
    let mut directives = Vec::new();
    if let Some(constraint) = &config.constraint {
        directives.push(format!("#SBATCH --constraint \"{}\"", constraint));
    }
    if let Some(partition) = &config.partition {
        directives.push(format!("#SBATCH --partition {}", partition));
    }

    let module_loads = if config.modules.is_empty() {
        String::new()
    } else {
        let loads = config
            .modules
            .iter()
            .map(|m| format!("module load {}", m))
            .collect::<Vec<_>>()
            .join("\n");
        format!("module purge 2>&1\n{}\necho \"Loaded modules\"\n", loads)
    };

    format!(
        r#"#!/bin/bash
{}
#SBATCH --nodes={}
#SBATCH --mem-per-cpu {}
#SBATCH --time {}
#SBATCH -c {}
#SBATCH -n {}
#SBATCH -J {}
#SBATCH -o slurm_logs/%x.out
#SBATCH -e slurm_logs/%x.err

set -euo pipefail

{}
cd "{}"
echo "PWD=$(pwd)"
echo "Running: {}"
{}

echo "Timings:"
sacct -o JobID,Submit,Start,End,CPUTime,State -j $SLURM_JOBID
"#,
        directives.join("\n"),
        config.nodes,
        config.mem_per_cpu,
        config.time_limit,
        config.cpus_per_task,
        config.ntasks,
        config.job_name,
        module_loads,
        workdir.display(),
        exec_cmd,
        exec_cmd,
    )
}

/// 从 `sbatch` 输出中提取作业编号
///
/// 同时支持 `--parsable` 输出 (`12345` 或 `12345;cluster`) 和默认的
/// `Submitted batch job 12345`。
pub fn parse_sbatch_output(stdout: &str) -> Result<Option<String>> {
    let pattern = Regex::new(r"(?m)^\s*(?:Submitted batch job\s+)?(\d+)(?:;\S+)?\s*$")
        .map_err(|e| RelaxError::Other(e.to_string()))?;
    Ok(pattern.captures(stdout).map(|c| c[1].to_string()))
}

/// 解析 `sacct -n -P -X -o State,ExitCode` 的一行
///
/// 未终止（PENDING、RUNNING 等）返回 None。
pub fn parse_sacct_state(line: &str) -> Option<JobState> {
    let mut fields = line.trim().split('|');
    let state = fields.next()?.trim();
    let exit_code = fields.next().unwrap_or("0:0").trim();

    // "CANCELLED by 1234" 之类的状态只取第一个词
    let keyword = state.split_whitespace().next()?;
    let code = exit_code
        .split(':')
        .next()
        .and_then(|c| c.parse::<i32>().ok())
        .unwrap_or(0);

    match keyword {
        "COMPLETED" => Some(JobState::Finished { exit_status: code }),
        "FAILED" => Some(JobState::Finished {
            exit_status: if code == 0 { 1 } else { code },
        }),
        "CANCELLED" | "TIMEOUT" | "PREEMPTED" | "NODE_FAIL" | "OUT_OF_MEMORY" | "DEADLINE" => {
            Some(JobState::Killed {
                reason: state.to_string(),
            })
        }
        "BOOT_FAIL" => Some(JobState::Excepted {
            reason: state.to_string(),
        }),
        _ => None,
    }
}
