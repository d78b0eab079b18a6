//! # 命名参数解析
//!
//! 按名称取出唯一预设，叠加覆盖项，再检查必需参数。
//!
//! ## 依赖关系
//! - 被 `workflow/relax.rs` 使用
//! - 使用 `store/`, `models/parameters.rs`

use crate::error::{RelaxError, Result};
use crate::models::ParameterSet;
use crate::store::PresetStore;

/// 当前唯一支持的基组
const SUPPORTED_BASIS: &str = "pw";

/// 解析命名预设并合并覆盖项
///
/// - 名称必须恰好匹配一条记录
/// - `ecutwfc` 必须存在
/// - `basis_type` 缺省为 `pw`，其他值不支持
/// - `nbands_factor` 被移除，目前不参与计算
pub fn resolve_parameters(
    store: &dyn PresetStore,
    name: &str,
    overrides: &ParameterSet,
) -> Result<ParameterSet> {
    let mut matches = store.find(name)?;
    if matches.len() != 1 {
        return Err(RelaxError::ResolutionError(format!(
            "Invalid name {} of parameters preset. Matched {}.",
            name,
            matches.len()
        )));
    }

    let mut parameters = matches.remove(0).parameters;
    parameters.merge(overrides);

    parameters.require("ecutwfc")?;

    let basis_ok = match parameters.get("basis_type") {
        None => true,
        Some(value) => value.as_str() == Some(SUPPORTED_BASIS),
    };
    if !basis_ok {
        return Err(RelaxError::ValidationError(format!(
            "Only supports basis_type `{}` currently.",
            SUPPORTED_BASIS
        )));
    }

    parameters.pop("nbands_factor");

    Ok(parameters)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{NamedPreset, ParamValue};

    /// 内存预设存储
    pub(crate) struct MemoryStore(pub Vec<NamedPreset>);

    impl MemoryStore {
        pub(crate) fn with(presets: &[(&str, ParameterSet)]) -> Self {
            MemoryStore(
                presets
                    .iter()
                    .enumerate()
                    .map(|(i, (name, parameters))| NamedPreset {
                        id: i as u64 + 1,
                        name: name.to_string(),
                        username: "tester".to_string(),
                        parameters: parameters.clone(),
                    })
                    .collect(),
            )
        }
    }

    impl PresetStore for MemoryStore {
        fn find(&self, name: &str) -> Result<Vec<NamedPreset>> {
            Ok(self.0.iter().filter(|p| p.name == name).cloned().collect())
        }
    }

    #[test]
    fn test_overrides_win() {
        let preset: ParameterSet = [("ecutwfc", 60.0), ("scf_thr", 1e-6)].into_iter().collect();
        let store = MemoryStore::with(&[("default", preset)]);
        let overrides: ParameterSet = [("ecutwfc", 80.0)].into_iter().collect();

        let resolved = resolve_parameters(&store, "default", &overrides).unwrap();
        assert_eq!(resolved.get("ecutwfc"), Some(&ParamValue::Float(80.0)));
        assert_eq!(resolved.get("scf_thr"), Some(&ParamValue::Float(1e-6)));
    }

    #[test]
    fn test_missing_and_ambiguous_names() {
        let p: ParameterSet = [("ecutwfc", 60.0)].into_iter().collect();
        let store = MemoryStore::with(&[("a", p.clone()), ("a", p)]);

        let err = resolve_parameters(&store, "missing", &ParameterSet::new()).unwrap_err();
        assert!(matches!(err, RelaxError::ResolutionError(ref m) if m.contains("Matched 0")));

        let err = resolve_parameters(&store, "a", &ParameterSet::new()).unwrap_err();
        assert!(matches!(err, RelaxError::ResolutionError(ref m) if m.contains("Matched 2")));
    }

    #[test]
    fn test_ecutwfc_required() {
        let store = MemoryStore::with(&[("default", ParameterSet::new())]);
        let err = resolve_parameters(&store, "default", &ParameterSet::new()).unwrap_err();
        assert!(matches!(err, RelaxError::ValidationError(ref m) if m.contains("ecutwfc")));
    }

    #[test]
    fn test_basis_type_must_be_pw() {
        let p: ParameterSet = [("ecutwfc", 60.0)].into_iter().collect();
        let store = MemoryStore::with(&[("default", p)]);

        let pw: ParameterSet = [("basis_type", "pw")].into_iter().collect();
        assert!(resolve_parameters(&store, "default", &pw).is_ok());

        let lcao: ParameterSet = [("basis_type", "lcao")].into_iter().collect();
        assert!(matches!(
            resolve_parameters(&store, "default", &lcao),
            Err(RelaxError::ValidationError(_))
        ));
    }

    #[test]
    fn test_nbands_factor_is_dropped() {
        let p: ParameterSet = [("ecutwfc", 60.0), ("nbands_factor", 1.5)].into_iter().collect();
        let store = MemoryStore::with(&[("default", p)]);
        let resolved = resolve_parameters(&store, "default", &ParameterSet::new()).unwrap();
        assert!(!resolved.contains("nbands_factor"));
        assert!(!resolved.contains("nbnd"));
    }
}
