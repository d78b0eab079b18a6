//! # 弛豫工作流状态
//!
//! ```text
//! Initializing ──> Iterating ──┬──> Converged ──┐
//!       │             │        ├──> Failed ─────┼──> Terminated
//!       │             │        └──> Exhausted ──┘
//!       └─────────────┴──────────────────────────────> Terminated (出错时)
//! ```
//!
//! `RelaxContext` 保存整个运行期间的可变状态，按引用传给各步骤函数。
//!
//! ## 依赖关系
//! - 被 `workflow/relax.rs` 使用
//! - 使用 `utils/output.rs` 输出报告

use crate::calculation::CalcInputs;
use crate::error::{RelaxError, Result};
use crate::models::{JobHandle, JobId, KpointSpec, ParameterSet, Structure};
use crate::utils::output;
use std::fmt;

/// 工作流退出码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    SubProcessFailedRelax,
    SubProcessFailedFinalScf,
}

impl ExitCode {
    pub fn status(self) -> u32 {
        match self {
            ExitCode::SubProcessFailedRelax => 401,
            ExitCode::SubProcessFailedFinalScf => 402,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            ExitCode::SubProcessFailedRelax => "the relax BaseCalculation sub process failed",
            ExitCode::SubProcessFailedFinalScf => {
                "the final scf BaseCalculation sub process failed"
            }
        }
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status(), self.message())
    }
}

/// 工作流状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelaxState {
    Initializing,
    Iterating,
    Converged,
    Failed(ExitCode),
    Exhausted,
    Terminated,
}

impl RelaxState {
    /// 是否允许从当前状态转移到 `next`
    pub fn can_transition_to(&self, next: &RelaxState) -> bool {
        use RelaxState::*;
        matches!(
            (self, next),
            (Initializing, Iterating)
                | (Iterating, Converged)
                | (Iterating, Failed(_))
                | (Iterating, Exhausted)
                | (Initializing, Terminated)
                | (Iterating, Terminated)
                | (Converged, Terminated)
                | (Failed(_), Terminated)
                | (Exhausted, Terminated)
        )
    }

    /// Converged / Failed / Exhausted
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            RelaxState::Converged | RelaxState::Failed(_) | RelaxState::Exhausted
        )
    }
}

impl fmt::Display for RelaxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelaxState::Initializing => write!(f, "initializing"),
            RelaxState::Iterating => write!(f, "iterating"),
            RelaxState::Converged => write!(f, "converged"),
            RelaxState::Failed(code) => write!(f, "failed {}", code),
            RelaxState::Exhausted => write!(f, "exhausted"),
            RelaxState::Terminated => write!(f, "terminated"),
        }
    }
}

/// 运行期上下文
#[derive(Debug)]
pub struct RelaxContext {
    pub current_structure: Structure,
    pub current_number_of_bands: Option<u32>,
    pub current_cell_volume: Option<f64>,
    pub is_converged: bool,
    pub iteration: u32,
    pub parameters: ParameterSet,
    pub kpoints: Option<KpointSpec>,
    pub relax_inputs: Option<CalcInputs>,
    /// 按提交顺序排列的作业句柄
    pub handles: Vec<JobHandle>,
    pub cleaned: Vec<JobId>,
    state: RelaxState,
    history: Vec<RelaxState>,
    reports: Vec<String>,
    quiet: bool,
}

impl RelaxContext {
    pub fn new(structure: Structure, quiet: bool) -> Self {
        RelaxContext {
            current_structure: structure,
            current_number_of_bands: None,
            current_cell_volume: None,
            is_converged: false,
            iteration: 0,
            parameters: ParameterSet::new(),
            kpoints: None,
            relax_inputs: None,
            handles: Vec::new(),
            cleaned: Vec::new(),
            state: RelaxState::Initializing,
            history: vec![RelaxState::Initializing],
            reports: Vec::new(),
            quiet,
        }
    }

    pub fn state(&self) -> RelaxState {
        self.state
    }

    #[cfg(test)]
    pub fn history(&self) -> &[RelaxState] {
        &self.history
    }

    pub fn transition(&mut self, next: RelaxState) -> Result<()> {
        if !self.state.can_transition_to(&next) {
            return Err(RelaxError::Other(format!(
                "Invalid workflow transition {:?} -> {:?}",
                self.state, next
            )));
        }
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    /// 记录并输出一条工作流报告
    pub fn report(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        if !self.quiet {
            output::print_report(&msg);
        }
        self.reports.push(msg);
    }

    #[cfg(test)]
    pub fn reports(&self) -> &[String] {
        &self.reports
    }

    /// 结束运行，转换为结果
    pub fn into_outcome(self) -> RelaxOutcome {
        let final_state = self
            .history
            .iter()
            .rev()
            .find(|s| s.is_final())
            .copied()
            .unwrap_or(self.state);
        let exit_status = match final_state {
            RelaxState::Failed(_) => self.handles.last().and_then(|h| h.exit_status()),
            _ => None,
        };

        RelaxOutcome {
            final_state,
            history: self.history,
            iterations: self.iteration,
            cell_volume: self.current_cell_volume,
            handles: self.handles,
            cleaned: self.cleaned,
            reports: self.reports,
            exit_status,
        }
    }
}

/// 工作流运行结果
#[derive(Debug)]
pub struct RelaxOutcome {
    /// Converged / Failed / Exhausted 之一
    pub final_state: RelaxState,
    pub history: Vec<RelaxState>,
    pub iterations: u32,
    /// 当前结构的晶胞体积 (Å³)
    pub cell_volume: Option<f64>,
    pub handles: Vec<JobHandle>,
    /// 已清理远程目录的作业
    pub cleaned: Vec<JobId>,
    pub reports: Vec<String>,
    /// 失败作业的退出码（若有）
    pub exit_status: Option<i32>,
}

impl RelaxOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self.final_state, RelaxState::Failed(_))
    }

    /// 失败状态转换为 `SubProcessFailure` 错误
    pub fn into_result(self) -> Result<Self> {
        match self.final_state {
            RelaxState::Failed(code) => {
                let message = match self.exit_status {
                    Some(status) => format!("{} (exit status {})", code.message(), status),
                    None => code.message().to_string(),
                };
                Err(RelaxError::SubProcessFailure {
                    status: code.status(),
                    message,
                    exit_status: self.exit_status,
                })
            }
            _ => Ok(self),
        }
    }
}
