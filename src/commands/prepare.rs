//! # prepare 命令实现
//!
//! 按与 `launch relax` 相同的规则解析参数、k 点和赝势，
//! 把 KPT / STRU / INPUT 写入输出目录并复制赝势到 `pseudo/`，但不提交作业。
//!
//! ## 依赖关系
//! - 使用 `cli/prepare.rs` 定义的参数
//! - 使用 `resolve/`, `calculation/`, `store/`, `utils/output.rs`

use super::common::{collect_overrides, explicit_pseudos, load_structure, pseudo_families};
use crate::calculation::{prepare_for_submission, CalcInputs, CalcOptions};
use crate::cli::prepare::PrepareArgs;
use crate::error::{write_error, RelaxError, Result};
use crate::models::{KpointSpec, Structure};
use crate::resolve::{mesh_from_density, resolve_kpoints, resolve_parameters, select_pseudos};
use crate::store::JsonPresetStore;
use crate::utils::output;

use std::fs;

/// 执行 prepare 命令
pub fn execute(args: PrepareArgs) -> Result<()> {
    output::print_header("Prepare ABACUS Inputs");

    let (structure, settings) = load_structure(&args.input)?;

    let store = JsonPresetStore::open(&args.input.store)?;
    let overrides = collect_overrides(&args.input.parameters)?;
    let mut parameters = resolve_parameters(&store, &args.input.parameters_name, &overrides)?;

    let resolution = resolve_kpoints(&mut parameters, &structure, args.pseudo.system_2d)?;
    if let Some(offset) = &resolution.ignored_offset {
        output::print_warning(&format!(
            "kpoints_mesh_offset `{}` is not supported and ignored",
            offset
        ));
    }
    let kpoints = choose_kpoints(&args, &structure, resolution.kpoints, resolution.distance)?;

    let explicit = explicit_pseudos(&args.pseudo.pseudo)?;
    let families = pseudo_families(&args.pseudo);
    let pseudos = select_pseudos(
        explicit.as_ref(),
        args.pseudo.pseudo_family.as_deref(),
        &families,
        &structure,
    )?;

    if let Some((mesh, offset)) = kpoints.get_mesh() {
        output::print_info(&format!(
            "k-point mesh {} {} {} (offset {} {} {})",
            mesh[0], mesh[1], mesh[2], offset[0], offset[1], offset[2]
        ));
    }

    let calc = CalcInputs {
        code: "abacus".to_string(),
        structure,
        kpoints,
        parameters,
        pseudos,
        settings,
        options: CalcOptions::default(),
        label: "prepare".to_string(),
    };

    let job = prepare_for_submission(&calc, &args.output)?;

    for copy in &job.local_copy_list {
        let target = args.output.join(&copy.destination);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(write_error(parent))?;
        }
        fs::copy(&copy.source, &target).map_err(write_error(&target))?;
    }

    for name in &job.staged_files {
        output::print_success(&format!("Wrote {}", args.output.join(name).display()));
    }
    if !job.local_copy_list.is_empty() {
        output::print_info(&format!(
            "Copied {} pseudopotential file(s)",
            job.local_copy_list.len()
        ));
    }

    output::print_done(&format!("Inputs ready in {}", args.output.display()));
    Ok(())
}

/// 显式网格 > 命令行间距 > 参数中的密度
fn choose_kpoints(
    args: &PrepareArgs,
    structure: &Structure,
    from_parameters: KpointSpec,
    distance: f64,
) -> Result<KpointSpec> {
    if let Some(mesh) = &args.kpoints_mesh {
        let mesh: [u32; 3] = mesh.as_slice().try_into().map_err(|_| {
            RelaxError::InvalidArgument("k-point mesh needs three values".to_string())
        })?;
        let offset: [f64; 3] = match &args.kpoints_offset {
            Some(offset) => offset.as_slice().try_into().map_err(|_| {
                RelaxError::InvalidArgument("k-point offset needs three values".to_string())
            })?,
            None => [0.0; 3],
        };
        return Ok(KpointSpec::with_offset(mesh, offset));
    }

    if let Some(distance) = args.kpoints_distance {
        return mesh_from_density(structure, distance, args.force_parity, args.pseudo.system_2d);
    }

    if args.force_parity {
        return mesh_from_density(structure, distance, true, args.pseudo.system_2d);
    }

    Ok(from_parameters)
}
