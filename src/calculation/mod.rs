//! # 计算作业适配器
//!
//! 将一次 ABACUS 计算的输入写入暂存目录，并组装成 `JobDescriptor`
//! 交给作业底座执行。
//!
//! ## 流程
//! 1. 写出 STRU（同时得到需要复制的赝势文件列表）
//! 2. 写出 KPT
//! 3. 写出 INPUT
//! 4. 组装可执行文件、暂存文件、取回列表
//!
//! ## 依赖关系
//! - 被 `workflow/relax.rs` 和 `commands/prepare.rs` 使用
//! - 使用 `deck/`, `models/`

use crate::deck::{self, StruSettings, INPUT_FILE, KPT_FILE, STRU_FILE};
use crate::error::{write_error, Result};
use crate::models::{JobDescriptor, KpointSpec, ParameterSet, PseudoMap, Resources, Structure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 程序标准输出文件名
pub const DEFAULT_OUTPUT_FILE: &str = "abacus.out";

/// 计算结束后取回的文件
pub fn default_retrieve_list() -> Vec<String> {
    vec![
        format!("OUT.{}", deck::SUFFIX),
        INPUT_FILE.to_string(),
        DEFAULT_OUTPUT_FILE.to_string(),
    ]
}

/// 作业运行选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalcOptions {
    pub resources: Resources,
    pub with_mpi: bool,
    pub output_filename: String,
}

impl Default for CalcOptions {
    fn default() -> Self {
        CalcOptions {
            resources: Resources::default(),
            with_mpi: true,
            output_filename: DEFAULT_OUTPUT_FILE.to_string(),
        }
    }
}

/// 单次计算的全部输入
#[derive(Debug, Clone)]
pub struct CalcInputs {
    /// ABACUS 可执行文件
    pub code: String,
    pub structure: Structure,
    pub kpoints: KpointSpec,
    pub parameters: ParameterSet,
    pub pseudos: PseudoMap,
    pub settings: StruSettings,
    pub options: CalcOptions,
    /// 调用标签，如 iteration_01
    pub label: String,
}

/// 写出输入文件并生成作业描述
pub fn prepare_for_submission(inputs: &CalcInputs, staging_dir: &Path) -> Result<JobDescriptor> {
    fs::create_dir_all(staging_dir).map_err(write_error(staging_dir))?;

    let local_copy_list = deck::stru::write_stru(
        &staging_dir.join(STRU_FILE),
        &inputs.structure,
        &inputs.pseudos,
        &inputs.settings,
    )?;
    deck::kpt::write_kpt(&staging_dir.join(KPT_FILE), &inputs.kpoints)?;
    deck::input::write_input(
        &staging_dir.join(INPUT_FILE),
        &inputs.parameters,
        &inputs.structure,
    )?;

    Ok(JobDescriptor {
        label: inputs.label.clone(),
        executable: inputs.code.clone(),
        cmdline_params: Vec::new(),
        stdout_name: inputs.options.output_filename.clone(),
        with_mpi: inputs.options.with_mpi,
        resources: inputs.options.resources,
        staging_dir: staging_dir.to_path_buf(),
        staged_files: vec![
            STRU_FILE.to_string(),
            KPT_FILE.to_string(),
            INPUT_FILE.to_string(),
        ],
        local_copy_list,
        retrieve_list: default_retrieve_list(),
    })
}
