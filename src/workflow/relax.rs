//! # 迭代弛豫工作流
//!
//! ## 流程
//! 1. 预检：赝势族与显式赝势必须二选一
//! 2. setup：解析命名参数、生成 k 点、确定计算模式与赝势
//! 3. 循环：未收敛且迭代次数未达上限时提交一次计算并检查结果
//! 4. results：报告完成的迭代数
//! 5. 终止钩子：按需清理所有作业（含子作业）的远程目录，无论前面是否出错
//!
//! ## 依赖关系
//! - 被 `commands/launch.rs` 使用
//! - 使用 `resolve/`, `calculation/`, `substrate/`, `store/`

use super::context::{ExitCode, RelaxContext, RelaxOutcome, RelaxState};
use crate::calculation::{prepare_for_submission, CalcInputs, CalcOptions};
use crate::deck::StruSettings;
use crate::error::{write_error, RelaxError, Result};
use crate::models::{ParameterSet, PseudoMap, Structure};
use crate::resolve::pseudos::pseudo_source_error;
use crate::resolve::{resolve_kpoints, resolve_parameters, select_pseudos, PseudoFamily};
use crate::store::PresetStore;
use crate::substrate::JobSubstrate;
use std::fs;
use std::path::PathBuf;

/// 支持的弛豫模式
pub const RELAX_SCHEMES: [&str; 2] = ["relax", "cell-relax"];

/// 工作流输入
#[derive(Debug, Clone)]
pub struct RelaxInputs {
    pub structure: Structure,
    /// ABACUS 可执行文件
    pub code: String,
    /// 命名预设
    pub parameters_name: String,
    /// 覆盖预设的参数
    pub parameters: ParameterSet,
    pub pseudo_family: Option<String>,
    pub pseudos: Option<PseudoMap>,
    pub system_2d: bool,
    pub settings: StruSettings,
    pub options: CalcOptions,
    pub max_meta_convergence_iterations: u32,
    pub clean_workdir: bool,
    /// 每次迭代的暂存目录位于 `<work_root>/iteration_NN`
    pub work_root: PathBuf,
}

impl RelaxInputs {
    pub fn new(structure: Structure, code: impl Into<String>, work_root: impl Into<PathBuf>) -> Self {
        RelaxInputs {
            structure,
            code: code.into(),
            parameters_name: "default".to_string(),
            parameters: ParameterSet::new(),
            pseudo_family: None,
            pseudos: None,
            system_2d: false,
            settings: StruSettings::default(),
            options: CalcOptions::default(),
            max_meta_convergence_iterations: 1,
            clean_workdir: false,
            work_root: work_root.into(),
        }
    }
}

/// 弛豫工作流，协作者由调用方注入
pub struct RelaxWorkflow<'a> {
    store: &'a dyn PresetStore,
    families: &'a dyn PseudoFamily,
    substrate: &'a mut dyn JobSubstrate,
    quiet: bool,
}

impl<'a> RelaxWorkflow<'a> {
    pub fn new(
        store: &'a dyn PresetStore,
        families: &'a dyn PseudoFamily,
        substrate: &'a mut dyn JobSubstrate,
    ) -> Self {
        RelaxWorkflow {
            store,
            families,
            substrate,
            quiet: false,
        }
    }

    /// 不向终端输出报告（仍记录在结果中）
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// 运行工作流
    ///
    /// 作业失败体现为 `RelaxState::Failed`；解析或提交过程中的错误在执行
    /// 终止钩子之后返回。
    pub fn run(&mut self, inputs: &RelaxInputs) -> Result<RelaxOutcome> {
        validate_pseudo_sources(inputs)?;

        let mut ctx = RelaxContext::new(inputs.structure.clone(), self.quiet);
        let result = self.drive(inputs, &mut ctx);

        self.on_terminated(inputs, &mut ctx);
        // Initializing / Iterating / 最终状态都可以转到 Terminated
        ctx.transition(RelaxState::Terminated)?;

        result.map(|_| ctx.into_outcome())
    }

    fn drive(&mut self, inputs: &RelaxInputs, ctx: &mut RelaxContext) -> Result<()> {
        self.setup(inputs, ctx)?;
        ctx.transition(RelaxState::Iterating)?;

        while self.should_run_relax(inputs, ctx) {
            self.run_relax(inputs, ctx)?;
            if let Some(code) = self.inspect_relax(ctx) {
                ctx.transition(RelaxState::Failed(code))?;
                return Ok(());
            }
        }

        if ctx.is_converged {
            ctx.transition(RelaxState::Converged)?;
        } else {
            ctx.report(format!(
                "reached the maximum number of meta convergence iterations {}",
                inputs.max_meta_convergence_iterations
            ));
            ctx.transition(RelaxState::Exhausted)?;
        }

        self.results(ctx);
        Ok(())
    }

    fn setup(&mut self, inputs: &RelaxInputs, ctx: &mut RelaxContext) -> Result<()> {
        ctx.parameters = resolve_parameters(self.store, &inputs.parameters_name, &inputs.parameters)?;
        ctx.current_cell_volume = Some(ctx.current_structure.cell_volume());

        let resolution = resolve_kpoints(&mut ctx.parameters, &ctx.current_structure, inputs.system_2d)?;
        if let Some(offset) = resolution.ignored_offset {
            ctx.report(format!("kpoints_mesh_offset `{}` is not supported and ignored", offset));
        }
        ctx.kpoints = Some(resolution.kpoints);

        self.prepare_for_relax(inputs, ctx)
    }

    fn prepare_for_relax(&mut self, inputs: &RelaxInputs, ctx: &mut RelaxContext) -> Result<()> {
        let requested = ctx
            .parameters
            .get("calculation")
            .map(|v| v.to_string())
            .unwrap_or_else(|| "relax".to_string());
        let calculation = if RELAX_SCHEMES.contains(&requested.as_str()) {
            requested
        } else {
            ctx.report(format!(
                "calculation `{}` is not a relax scheme, falling back to `relax`",
                requested
            ));
            "relax".to_string()
        };
        ctx.parameters.insert("calculation", calculation);

        let pseudos = select_pseudos(
            inputs.pseudos.as_ref(),
            inputs.pseudo_family.as_deref(),
            self.families,
            &ctx.current_structure,
        )?;

        let kpoints = ctx
            .kpoints
            .clone()
            .ok_or_else(|| RelaxError::Other("k-points were not resolved".to_string()))?;

        ctx.relax_inputs = Some(CalcInputs {
            code: inputs.code.clone(),
            structure: ctx.current_structure.clone(),
            kpoints,
            parameters: ctx.parameters.clone(),
            pseudos,
            settings: inputs.settings.clone(),
            options: inputs.options.clone(),
            label: String::new(),
        });
        Ok(())
    }

    fn should_run_relax(&self, inputs: &RelaxInputs, ctx: &RelaxContext) -> bool {
        !ctx.is_converged && ctx.iteration < inputs.max_meta_convergence_iterations
    }

    fn run_relax(&mut self, inputs: &RelaxInputs, ctx: &mut RelaxContext) -> Result<()> {
        ctx.iteration += 1;

        let mut calc = ctx
            .relax_inputs
            .clone()
            .ok_or_else(|| RelaxError::Other("relax inputs were not prepared".to_string()))?;
        calc.structure = ctx.current_structure.clone();
        if let Some(nbnd) = ctx.current_number_of_bands {
            calc.parameters.insert("nbnd", nbnd);
        }
        calc.label = format!("iteration_{:02}", ctx.iteration);

        let staging = inputs.work_root.join(&calc.label);
        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(write_error(&staging))?;
        }
        let job = prepare_for_submission(&calc, &staging)?;

        let handle = self.substrate.submit(&job)?;
        ctx.report(format!("launching BaseCalculation<{}>", handle.id));
        ctx.handles.push(handle.clone());

        let finished = self.substrate.wait(handle)?;
        if let Some(last) = ctx.handles.last_mut() {
            *last = finished;
        }
        Ok(())
    }

    /// 检查最近一次计算；失败时返回退出码
    ///
    /// 成功的计算不会更新结构、能带数或收敛标志。
    fn inspect_relax(&mut self, ctx: &mut RelaxContext) -> Option<ExitCode> {
        let (excepted_or_killed, failed, exit_status) = match ctx.handles.last() {
            Some(h) => (h.is_excepted() || h.is_killed(), h.is_failed(), h.exit_status()),
            None => return None,
        };

        if excepted_or_killed {
            ctx.report("relax BaseCalculation was excepted or killed");
            return Some(ExitCode::SubProcessFailedRelax);
        }

        if failed {
            ctx.report(format!(
                "relax BaseCalculation failed with exit status {}",
                exit_status.unwrap_or_default()
            ));
            return Some(ExitCode::SubProcessFailedRelax);
        }

        None
    }

    fn results(&mut self, ctx: &mut RelaxContext) {
        ctx.report(format!("workchain completed after {} iterations", ctx.iteration));
    }

    /// 清理远程工作目录；单个目录的失败只报告不升级
    ///
    /// 尚未终止的作业（如等待过程中出错）保留其工作目录。
    fn on_terminated(&mut self, inputs: &RelaxInputs, ctx: &mut RelaxContext) {
        if !inputs.clean_workdir {
            ctx.report("remote folders will not be cleaned");
            return;
        }

        let mut cleaned = Vec::new();
        let mut failures = Vec::new();
        for handle in &ctx.handles {
            for node in std::iter::once(handle).chain(handle.descendants()) {
                let Some(folder) = node.remote_folder() else {
                    continue;
                };
                if !node.is_terminated() {
                    failures.push(format!(
                        "remote folder of calculation {} was not cleaned: calculation has not terminated",
                        node.id
                    ));
                    continue;
                }
                match folder.release() {
                    Ok(()) => cleaned.push(node.id),
                    Err(e) => failures.push(format!(
                        "failed to clean remote folder of calculation {}: {}",
                        node.id, e
                    )),
                }
            }
        }

        for msg in failures {
            ctx.report(msg);
        }
        if !cleaned.is_empty() {
            let ids: Vec<String> = cleaned.iter().map(|id| id.to_string()).collect();
            ctx.report(format!(
                "cleaned remote folders of calculations: {}",
                ids.join(" ")
            ));
        }
        ctx.cleaned = cleaned;
    }
}

/// 赝势族与显式赝势必须恰好提供一个
pub fn validate_pseudo_sources(inputs: &RelaxInputs) -> Result<()> {
    match (&inputs.pseudo_family, &inputs.pseudos) {
        (Some(_), None) | (None, Some(_)) => Ok(()),
        _ => Err(pseudo_source_error()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::tests::si_ge_inputs;
    use crate::models::{JobDescriptor, JobHandle, JobId, JobState, ParamValue, RemoteFolder};
    use crate::resolve::parameters::tests::MemoryStore;
    use std::collections::VecDeque;
    use std::path::Path;

    /// 按脚本给出终止状态的作业底座
    struct ScriptedSubstrate {
        root: PathBuf,
        outcomes: VecDeque<JobState>,
        /// 每个作业派生的子作业数
        children: usize,
        fail_wait_at: Option<u64>,
        submitted: Vec<JobDescriptor>,
    }

    impl ScriptedSubstrate {
        fn new(root: &Path, outcomes: Vec<JobState>) -> Self {
            ScriptedSubstrate {
                root: root.to_path_buf(),
                outcomes: outcomes.into(),
                children: 0,
                fail_wait_at: None,
                submitted: Vec::new(),
            }
        }

        fn folder(&self, id: u64) -> RemoteFolder {
            let path = self.root.join(format!("remote-{}", id));
            fs::create_dir_all(&path).unwrap();
            RemoteFolder::new(path)
        }
    }

    impl JobSubstrate for ScriptedSubstrate {
        fn submit(&mut self, job: &JobDescriptor) -> Result<JobHandle> {
            self.submitted.push(job.clone());
            let id = self.submitted.len() as u64 * 10;
            let mut handle = JobHandle::new(JobId(id), &job.label);
            handle.remote_folder = Some(self.folder(id));

            // 子作业链：id+1 -> id+2 -> ...
            let mut chain: Option<JobHandle> = None;
            for k in (1..=self.children as u64).rev() {
                let mut child = JobHandle::new(JobId(id + k), "child");
                child.remote_folder = Some(self.folder(id + k));
                if let Some(inner) = chain.take() {
                    child.called.push(inner);
                }
                chain = Some(child);
            }
            handle.called.extend(chain);
            Ok(handle)
        }

        fn wait(&mut self, mut handle: JobHandle) -> Result<JobHandle> {
            if self.fail_wait_at == Some(handle.id.0) {
                return Err(RelaxError::CommandFailed {
                    command: "wait".to_string(),
                    stderr: "lost connection".to_string(),
                });
            }
            handle.state = self
                .outcomes
                .pop_front()
                .unwrap_or(JobState::Finished { exit_status: 0 });
            finish_children(&mut handle);
            Ok(handle)
        }
    }

    fn finish_children(handle: &mut JobHandle) {
        for child in &mut handle.called {
            child.state = JobState::Finished { exit_status: 0 };
            finish_children(child);
        }
    }

    /// 不应被调用的赝势族
    struct NoFamily;

    impl PseudoFamily for NoFamily {
        fn resolve(&self, _: &Structure, family: &str) -> Result<PseudoMap> {
            Err(RelaxError::ResolutionError(format!("unexpected family {}", family)))
        }
    }

    fn store() -> MemoryStore {
        let p: ParameterSet = [("ecutwfc", 60.0)].into_iter().collect();
        MemoryStore::with(&[("default", p)])
    }

    fn relax_inputs(dir: &Path, max_iterations: u32) -> RelaxInputs {
        let calc = si_ge_inputs(dir);
        let mut inputs = RelaxInputs::new(calc.structure, "abacus", dir.join("work"));
        inputs.pseudos = Some(calc.pseudos);
        inputs.max_meta_convergence_iterations = max_iterations;
        inputs
    }

    fn ok() -> JobState {
        JobState::Finished { exit_status: 0 }
    }

    #[test]
    fn test_successful_iterations_exhaust_budget() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = relax_inputs(dir.path(), 3);
        let store = store();
        let mut substrate = ScriptedSubstrate::new(&dir.path().join("remote"), vec![]);

        let outcome = RelaxWorkflow::new(&store, &NoFamily, &mut substrate)
            .quiet()
            .run(&inputs)
            .unwrap();

        assert_eq!(outcome.final_state, RelaxState::Exhausted);
        assert_eq!(outcome.iterations, 3);
        assert_eq!(outcome.cell_volume, Some(inputs.structure.cell_volume()));
        assert_eq!(
            outcome.history,
            vec![
                RelaxState::Initializing,
                RelaxState::Iterating,
                RelaxState::Exhausted,
                RelaxState::Terminated
            ]
        );
        assert!(outcome.reports.contains(&"launching BaseCalculation<10>".to_string()));
        assert_eq!(
            outcome.reports.last().map(String::as_str),
            Some("remote folders will not be cleaned")
        );
        assert!(outcome
            .reports
            .contains(&"workchain completed after 3 iterations".to_string()));

        let labels: Vec<&str> = substrate.submitted.iter().map(|j| j.label.as_str()).collect();
        assert_eq!(labels, vec!["iteration_01", "iteration_02", "iteration_03"]);

        // 成功的迭代不更新结构也不注入能带数
        let first = fs::read_to_string(dir.path().join("work/iteration_01/STRU")).unwrap();
        let third = fs::read_to_string(dir.path().join("work/iteration_03/STRU")).unwrap();
        assert_eq!(first, third);
        let input = fs::read_to_string(dir.path().join("work/iteration_03/INPUT")).unwrap();
        assert!(!input.contains("nbnd"));
        assert!(input.contains("calculation         relax\n"));
        assert_eq!(
            fs::read_to_string(dir.path().join("work/iteration_01/KPT")).unwrap(),
            "K_POINTS\n0\nGamma\n7 7 7 0 0 0\n"
        );
    }

    #[test]
    fn test_non_zero_exit_fails_with_401() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = relax_inputs(dir.path(), 3);
        let store = store();
        let mut substrate = ScriptedSubstrate::new(
            &dir.path().join("remote"),
            vec![ok(), JobState::Finished { exit_status: 2 }],
        );

        let outcome = RelaxWorkflow::new(&store, &NoFamily, &mut substrate)
            .quiet()
            .run(&inputs)
            .unwrap();

        assert_eq!(
            outcome.final_state,
            RelaxState::Failed(ExitCode::SubProcessFailedRelax)
        );
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.exit_status, Some(2));
        assert!(outcome
            .reports
            .contains(&"relax BaseCalculation failed with exit status 2".to_string()));
        assert!(!outcome.reports.iter().any(|r| r.starts_with("workchain completed")));
        assert_eq!(substrate.submitted.len(), 2);
    }

    #[test]
    fn test_excepted_and_killed_fail_with_401() {
        for state in [
            JobState::Excepted {
                reason: "spawn".to_string(),
            },
            JobState::Killed {
                reason: "TIMEOUT".to_string(),
            },
        ] {
            let dir = tempfile::tempdir().unwrap();
            let inputs = relax_inputs(dir.path(), 2);
            let store = store();
            let mut substrate = ScriptedSubstrate::new(&dir.path().join("remote"), vec![state]);

            let outcome = RelaxWorkflow::new(&store, &NoFamily, &mut substrate)
                .quiet()
                .run(&inputs)
                .unwrap();

            assert!(outcome.is_failed());
            assert_eq!(outcome.iterations, 1);
            assert_eq!(outcome.exit_status, None);
            assert!(matches!(
                outcome.into_result(),
                Err(RelaxError::SubProcessFailure { status: 401, .. })
            ));
        }
    }

    #[test]
    fn test_pseudo_sources_must_be_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();

        let mut both = relax_inputs(dir.path(), 1);
        both.pseudo_family = Some("SSSP".to_string());
        let mut neither = relax_inputs(dir.path(), 1);
        neither.pseudos = None;

        for inputs in [both, neither] {
            let mut substrate = ScriptedSubstrate::new(&dir.path().join("remote"), vec![]);
            let err = RelaxWorkflow::new(&store, &NoFamily, &mut substrate)
                .quiet()
                .run(&inputs)
                .unwrap_err();
            assert!(matches!(err, RelaxError::ResolutionError(_)));
            assert!(substrate.submitted.is_empty());
        }
    }

    #[test]
    fn test_unsupported_calculation_falls_back_to_relax() {
        let dir = tempfile::tempdir().unwrap();
        let mut inputs = relax_inputs(dir.path(), 1);
        inputs.parameters.insert("calculation", "scf");
        let store = store();
        let mut substrate = ScriptedSubstrate::new(&dir.path().join("remote"), vec![]);

        let outcome = RelaxWorkflow::new(&store, &NoFamily, &mut substrate)
            .quiet()
            .run(&inputs)
            .unwrap();

        assert!(outcome.reports.iter().any(|r| r.contains("falling back to `relax`")));
        assert_eq!(substrate.submitted[0].label, "iteration_01");
        let input = fs::read_to_string(dir.path().join("work/iteration_01/INPUT")).unwrap();
        assert!(input.contains("calculation         relax\n"));
    }

    #[test]
    fn test_cell_relax_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let mut inputs = relax_inputs(dir.path(), 1);
        inputs.parameters.insert("calculation", "cell-relax");
        inputs.parameters.insert("kpoints_mesh_density", ParamValue::Float(0.4));
        inputs.system_2d = true;
        let store = store();
        let mut substrate = ScriptedSubstrate::new(&dir.path().join("remote"), vec![]);

        RelaxWorkflow::new(&store, &NoFamily, &mut substrate)
            .quiet()
            .run(&inputs)
            .unwrap();

        let work = dir.path().join("work/iteration_01");
        let input = fs::read_to_string(work.join("INPUT")).unwrap();
        assert!(input.contains("calculation         cell-relax\n"));
        assert!(!input.contains("kpoints_mesh_density"));
        assert_eq!(
            fs::read_to_string(work.join("KPT")).unwrap(),
            "K_POINTS\n0\nGamma\n4 4 1 0 0 0\n"
        );
    }

    #[test]
    fn test_zero_iterations_exhausts_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = relax_inputs(dir.path(), 0);
        let store = store();
        let mut substrate = ScriptedSubstrate::new(&dir.path().join("remote"), vec![]);

        let outcome = RelaxWorkflow::new(&store, &NoFamily, &mut substrate)
            .quiet()
            .run(&inputs)
            .unwrap();

        assert_eq!(outcome.final_state, RelaxState::Exhausted);
        assert_eq!(outcome.iterations, 0);
        assert!(substrate.submitted.is_empty());
    }

    #[test]
    fn test_clean_workdir_walks_descendants() {
        let dir = tempfile::tempdir().unwrap();
        let remote = dir.path().join("remote");
        let mut inputs = relax_inputs(dir.path(), 2);
        inputs.clean_workdir = true;
        let store = store();
        let mut substrate = ScriptedSubstrate::new(&remote, vec![]);
        substrate.children = 2;

        let outcome = RelaxWorkflow::new(&store, &NoFamily, &mut substrate)
            .quiet()
            .run(&inputs)
            .unwrap();

        let ids: Vec<u64> = outcome.cleaned.iter().map(|id| id.0).collect();
        assert_eq!(ids, vec![10, 11, 12, 20, 21, 22]);
        assert!(outcome
            .reports
            .contains(&"cleaned remote folders of calculations: 10 11 12 20 21 22".to_string()));
        for id in ids {
            assert!(!remote.join(format!("remote-{}", id)).exists());
        }
    }

    #[test]
    fn test_missing_remote_folder_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let mut inputs = relax_inputs(dir.path(), 1);
        inputs.clean_workdir = true;
        let store = store();
        let mut substrate = ScriptedSubstrate::new(&dir.path().join("remote"), vec![]);
        substrate.children = 1;

        let mut outcome = RelaxWorkflow::new(&store, &NoFamily, &mut substrate)
            .quiet()
            .run(&inputs)
            .unwrap();
        assert_eq!(outcome.cleaned.len(), 2);

        // 目录已被删除，再次清理同一批句柄只产生 NotFound 报告
        let handles = std::mem::take(&mut outcome.handles);
        let mut ctx = RelaxContext::new(inputs.structure.clone(), true);
        ctx.handles = handles;
        let mut substrate = ScriptedSubstrate::new(&dir.path().join("remote2"), vec![]);
        RelaxWorkflow::new(&store, &NoFamily, &mut substrate)
            .quiet()
            .on_terminated(&inputs, &mut ctx);

        assert!(ctx.cleaned.is_empty());
        let failures: Vec<&String> = ctx
            .reports()
            .iter()
            .filter(|r| r.starts_with("failed to clean remote folder"))
            .collect();
        assert_eq!(failures.len(), 2);
        assert!(failures[0].contains("does not exist"));
    }

    #[test]
    fn test_error_mid_loop_cleans_only_terminated_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let remote = dir.path().join("remote");
        let mut inputs = relax_inputs(dir.path(), 3);
        inputs.clean_workdir = true;
        let store = store();
        let mut substrate = ScriptedSubstrate::new(&remote, vec![]);
        substrate.children = 1;
        substrate.fail_wait_at = Some(20);

        let err = RelaxWorkflow::new(&store, &NoFamily, &mut substrate)
            .quiet()
            .run(&inputs)
            .unwrap_err();

        assert!(matches!(err, RelaxError::CommandFailed { .. }));
        assert_eq!(substrate.submitted.len(), 2);
        assert!(!remote.join("remote-10").exists());
        assert!(!remote.join("remote-11").exists());
        // 等待失败的作业仍处于 Submitted，目录保留
        assert!(remote.join("remote-20").exists());
        assert!(remote.join("remote-21").exists());
    }

    #[test]
    fn test_unterminated_job_is_reported_not_cleaned() {
        let dir = tempfile::tempdir().unwrap();
        let remote = dir.path().join("remote");
        let inputs = {
            let mut inputs = relax_inputs(dir.path(), 1);
            inputs.clean_workdir = true;
            inputs
        };
        let store = store();
        let mut substrate = ScriptedSubstrate::new(&remote, vec![]);

        let mut ctx = RelaxContext::new(inputs.structure.clone(), true);
        let mut running = JobHandle::new(JobId(7), "iteration_01");
        running.remote_folder = Some(substrate.folder(7));
        ctx.handles.push(running);

        RelaxWorkflow::new(&store, &NoFamily, &mut substrate)
            .quiet()
            .on_terminated(&inputs, &mut ctx);

        assert!(ctx.cleaned.is_empty());
        assert!(remote.join("remote-7").exists());
        assert!(ctx.reports().contains(
            &"remote folder of calculation 7 was not cleaned: calculation has not terminated"
                .to_string()
        ));
    }

    #[test]
    fn test_missing_preset_fails_before_submission() {
        let dir = tempfile::tempdir().unwrap();
        let mut inputs = relax_inputs(dir.path(), 1);
        inputs.parameters_name = "unknown".to_string();
        let store = store();
        let mut substrate = ScriptedSubstrate::new(&dir.path().join("remote"), vec![]);

        let err = RelaxWorkflow::new(&store, &NoFamily, &mut substrate)
            .quiet()
            .run(&inputs)
            .unwrap_err();
        assert!(matches!(err, RelaxError::ResolutionError(_)));
        assert!(substrate.submitted.is_empty());
    }
}
