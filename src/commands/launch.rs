//! # launch 命令实现
//!
//! ## 功能
//! - `relax`: 组装工作流输入，选择作业底座（本地 / Slurm），运行迭代弛豫
//! - `--daemon`: 以相同参数在后台重新启动自身，输出写入日志文件
//!
//! ## 依赖关系
//! - 使用 `cli/launch.rs` 定义的参数
//! - 使用 `workflow/`, `substrate/`, `store/`, `utils/output.rs`

use super::common::{collect_overrides, explicit_pseudos, load_structure, pseudo_families};
use crate::calculation::CalcOptions;
use crate::cli::launch::{LaunchArgs, LaunchCommands, RelaxArgs, Scheduler};
use crate::error::{write_error, RelaxError, Result};
use crate::models::Resources;
use crate::store::JsonPresetStore;
use crate::substrate::{JobSubstrate, LocalRunner, SlurmRunner};
use crate::utils::output;
use crate::utils::slurm::SlurmConfig;
use crate::workflow::{RelaxInputs, RelaxOutcome, RelaxWorkflow};

use std::env;
use std::fs::{self, File};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;
use tabled::{Table, Tabled};

/// 后台子进程的标记环境变量
const DETACHED_ENV: &str = "ABACUS_RELAX_DETACHED";

/// 后台运行日志
const DAEMON_LOG: &str = "abacus-relax.log";

/// 作业表格行
#[derive(Debug, Clone, Tabled)]
struct CalculationRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Remote folder")]
    remote: String,
}

/// 执行 launch 命令
pub fn execute(args: LaunchArgs) -> Result<()> {
    match args.command {
        LaunchCommands::Relax(relax) => execute_relax(relax),
    }
}

fn execute_relax(args: RelaxArgs) -> Result<()> {
    if args.daemon && env::var_os(DETACHED_ENV).is_none() {
        return detach(&args.work_dir);
    }

    output::print_header("ABACUS Relax Workflow");

    let (structure, settings) = load_structure(&args.input)?;

    let mut inputs = RelaxInputs::new(structure, &args.code, &args.work_dir);
    inputs.parameters_name = args.input.parameters_name.clone();
    inputs.parameters = collect_overrides(&args.input.parameters)?;
    inputs.pseudo_family = args.pseudo.pseudo_family.clone();
    inputs.pseudos = explicit_pseudos(&args.pseudo.pseudo)?;
    inputs.system_2d = args.pseudo.system_2d;
    inputs.settings = settings;
    inputs.options = CalcOptions {
        resources: Resources {
            num_machines: args.max_num_machines,
            num_mpiprocs_per_machine: args.num_mpiprocs_per_machine,
        },
        with_mpi: !args.without_mpi,
        ..CalcOptions::default()
    };
    inputs.max_meta_convergence_iterations = args.max_iterations;
    inputs.clean_workdir = args.clean_workdir;

    let store = JsonPresetStore::open(&args.input.store)?;
    let families = pseudo_families(&args.pseudo);
    // 后台运行时输出写入日志文件，不绘制 spinner
    let mut substrate = build_substrate(&args, env::var_os(DETACHED_ENV).is_some());

    output::print_info(&format!(
        "Preset '{}', {} override(s), up to {} iteration(s), {:?} scheduler",
        inputs.parameters_name,
        inputs.parameters.len(),
        inputs.max_meta_convergence_iterations,
        args.scheduler
    ));

    let mut workflow = RelaxWorkflow::new(&store, &families, substrate.as_mut());
    let outcome = workflow.run(&inputs)?;

    print_summary(&outcome);
    let outcome = outcome.into_result()?;

    output::print_done(&format!(
        "Relax workflow finished: {} after {} iteration(s)",
        outcome.final_state, outcome.iterations
    ));
    Ok(())
}

fn build_substrate(args: &RelaxArgs, quiet: bool) -> Box<dyn JobSubstrate> {
    let scratch = args
        .scratch
        .clone()
        .unwrap_or_else(|| args.work_dir.join("jobs"));

    match args.scheduler {
        Scheduler::Local => {
            let runner = LocalRunner::new(scratch).with_mpirun(&args.mpirun);
            if quiet {
                Box::new(runner.quiet())
            } else {
                Box::new(runner)
            }
        }
        Scheduler::Slurm => {
            let template = SlurmConfig {
                partition: args.partition.clone(),
                constraint: args.constraint.clone(),
                mem_per_cpu: args.mem_per_cpu.clone(),
                time_limit: args.time.clone(),
                modules: args
                    .modules
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                ..SlurmConfig::default()
            };
            let runner = SlurmRunner::new(scratch, template)
                .with_poll_interval(Duration::from_secs(args.poll_interval))
                .with_mpirun(&args.mpirun);
            if quiet {
                Box::new(runner.quiet())
            } else {
                Box::new(runner)
            }
        }
    }
}

/// 以相同参数在后台启动自身
fn detach(work_dir: &Path) -> Result<()> {
    fs::create_dir_all(work_dir).map_err(write_error(work_dir))?;
    let log_path = work_dir.join(DAEMON_LOG);
    let log = File::create(&log_path).map_err(write_error(&log_path))?;
    let log_err = log.try_clone().map_err(write_error(&log_path))?;

    let exe = env::current_exe()
        .map_err(|e| RelaxError::Other(format!("Cannot locate own executable: {}", e)))?;

    let child = Command::new(exe)
        .args(env::args_os().skip(1))
        .env(DETACHED_ENV, "1")
        .env("CLICOLOR", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(log_err))
        .spawn()
        .map_err(|e| RelaxError::Other(format!("Failed to start background process: {}", e)))?;

    output::print_success(&format!(
        "Relax workflow running in background (pid {})",
        child.id()
    ));
    output::print_info(&format!("Log: {}", log_path.display()));
    Ok(())
}

fn print_summary(outcome: &RelaxOutcome) {
    output::print_separator();

    let rows: Vec<CalculationRow> = outcome
        .handles
        .iter()
        .flat_map(|h| std::iter::once(h).chain(h.descendants()))
        .map(|h| CalculationRow {
            id: h.id.to_string(),
            label: h.label.clone(),
            state: h.state.to_string(),
            remote: h
                .remote_folder()
                .map(|f| f.path().display().to_string())
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    if rows.is_empty() {
        output::print_info("No calculations were launched");
    } else {
        println!("{}", Table::new(&rows));
    }

    let history: Vec<String> = outcome.history.iter().map(|s| s.to_string()).collect();
    output::print_info(&format!("States: {}", history.join(" -> ")));
    if let Some(volume) = outcome.cell_volume {
        output::print_info(&format!("Cell volume: {:.4} A^3", volume));
    }
    if !outcome.cleaned.is_empty() {
        output::print_info(&format!(
            "Cleaned {} remote folder(s)",
            outcome.cleaned.len()
        ));
    }
}
