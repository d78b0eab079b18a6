//! # data 命令实现
//!
//! 命名参数预设的增删查与导出。
//!
//! ## 依赖关系
//! - 使用 `cli/data.rs` 定义的参数
//! - 使用 `store/json.rs`, `deck/input.rs`, `utils/output.rs`

use super::common::collect_overrides;
use crate::cli::data::{AddArgs, DataArgs, DataCommands};
use crate::deck::input::render_input;
use crate::error::{read_error, write_error, RelaxError, Result};
use crate::models::{NamedPreset, ParameterSet};
use crate::store::JsonPresetStore;
use crate::utils::output;

use std::fs;
use std::path::Path;
use tabled::{Table, Tabled};

/// 预设列表行
#[derive(Debug, Clone, Tabled)]
struct PresetRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "User")]
    username: String,
    #[tabled(rename = "Keys")]
    keys: usize,
    #[tabled(rename = "ecutwfc")]
    ecutwfc: String,
}

impl From<&NamedPreset> for PresetRow {
    fn from(preset: &NamedPreset) -> Self {
        PresetRow {
            id: preset.id,
            name: preset.name.clone(),
            username: preset.username.clone(),
            keys: preset.parameters.len(),
            ecutwfc: preset
                .parameters
                .get("ecutwfc")
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// 执行 data 命令
pub fn execute(args: DataArgs) -> Result<()> {
    let mut store = JsonPresetStore::open(&args.store)?;

    match args.command {
        DataCommands::List => list(&store),
        DataCommands::Show { identifier } => show(&store, &identifier),
        DataCommands::Add(add_args) => add(&mut store, add_args),
        DataCommands::Export { identifier, output } => {
            export(&store, &identifier, output.as_deref())
        }
        DataCommands::Del { identifiers } => delete(&mut store, &identifiers),
    }
}

fn lookup<'a>(store: &'a JsonPresetStore, identifier: &str) -> Result<&'a NamedPreset> {
    store.get(identifier).ok_or_else(|| {
        RelaxError::ResolutionError(format!(
            "No parameters named or numbered '{}' in {}",
            identifier,
            store.path().display()
        ))
    })
}

fn list(store: &JsonPresetStore) -> Result<()> {
    if store.list().is_empty() {
        output::print_info(&format!("No presets in {}", store.path().display()));
        return Ok(());
    }

    let rows: Vec<PresetRow> = store.list().iter().map(PresetRow::from).collect();
    println!("{}", Table::new(&rows));
    Ok(())
}

fn show(store: &JsonPresetStore, identifier: &str) -> Result<()> {
    let preset = lookup(store, identifier)?;
    output::print_header(&format!("Preset {} <{}>", preset.name, preset.id));
    print!("{}", render_input(&preset.parameters));
    Ok(())
}

fn add(store: &mut JsonPresetStore, args: AddArgs) -> Result<()> {
    let mut parameters = match &args.file {
        Some(path) => read_parameters(path)?,
        None => ParameterSet::new(),
    };
    parameters.merge(&collect_overrides(&args.parameters)?);

    if parameters.is_empty() {
        return Err(RelaxError::InvalidArgument(
            "No parameters given; use --file and/or -p KEY VALUE".to_string(),
        ));
    }
    if !parameters.contains("ecutwfc") {
        output::print_warning("Preset has no `ecutwfc`; it cannot be used for a calculation");
    }

    let preset = store.add(&args.name, &args.username, parameters)?;
    output::print_success(&format!(
        "Stored preset {} <{}> with {} parameter(s)",
        preset.name,
        preset.id,
        preset.parameters.len()
    ));
    Ok(())
}

fn read_parameters(path: &Path) -> Result<ParameterSet> {
    if !path.exists() {
        return Err(RelaxError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let content = fs::read_to_string(path).map_err(read_error(path))?;
    serde_json::from_str(&content).map_err(|e| RelaxError::ParseError {
        format: "parameters".to_string(),
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn export(store: &JsonPresetStore, identifier: &str, target: Option<&Path>) -> Result<()> {
    let preset = lookup(store, identifier)?;
    let content = serde_json::to_string_pretty(&preset.parameters)?;

    match target {
        Some(path) => {
            fs::write(path, format!("{}\n", content)).map_err(write_error(path))?;
            output::print_success(&format!("Exported {} to {}", preset.name, path.display()));
        }
        None => println!("{}", content),
    }
    Ok(())
}

fn delete(store: &mut JsonPresetStore, identifiers: &[String]) -> Result<()> {
    for identifier in identifiers {
        let removed = store.remove(identifier)?;
        output::print_success(&format!("Deleted preset {} <{}>", removed.name, removed.id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ParamValue;
    use tempfile::TempDir;

    fn add_args(name: &str, file: Option<&Path>, pairs: &[&str]) -> AddArgs {
        AddArgs {
            name: name.to_string(),
            file: file.map(Path::to_path_buf),
            parameters: pairs.iter().map(|s| s.to_string()).collect(),
            username: "tester".to_string(),
        }
    }

    #[test]
    fn test_add_from_file_and_pairs() {
        let dir = TempDir::new().unwrap();
        let json = dir.path().join("params.json");
        fs::write(&json, r#"{"ecutwfc": 50, "smearing_method": "gauss"}"#).unwrap();

        let mut store = JsonPresetStore::open(&dir.path().join("presets.json")).unwrap();
        add(&mut store, add_args("si", Some(&json), &["ecutwfc", "80"])).unwrap();

        let preset = store.get("si").unwrap();
        assert_eq!(preset.parameters.get("ecutwfc"), Some(&ParamValue::Int(80)));
        assert_eq!(
            preset.parameters.get("smearing_method"),
            Some(&ParamValue::from("gauss"))
        );
    }

    #[test]
    fn test_add_requires_parameters() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonPresetStore::open(&dir.path().join("presets.json")).unwrap();
        assert!(matches!(
            add(&mut store, add_args("empty", None, &[])),
            Err(RelaxError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_export_and_delete() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonPresetStore::open(&dir.path().join("presets.json")).unwrap();
        add(&mut store, add_args("si", None, &["ecutwfc", "60"])).unwrap();

        let out = dir.path().join("si.json");
        export(&store, "1", Some(&out)).unwrap();
        let exported: ParameterSet =
            serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(exported.get("ecutwfc"), Some(&ParamValue::Int(60)));

        delete(&mut store, &["si".to_string()]).unwrap();
        assert!(store.list().is_empty());
        assert!(matches!(
            show(&store, "si"),
            Err(RelaxError::ResolutionError(_))
        ));
    }
}
