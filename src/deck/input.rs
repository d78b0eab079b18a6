//! # INPUT 文件生成
//!
//! ```text
//! INPUT_PARAMETERS
//! calculation         relax
//! ecutwfc             80.0
//! ntype               2
//! pseudo_dir          ./pseudo
//! suffix              ABACUS
//! ```
//!
//! key 按字典序输出，左对齐 18 字符。
//!
//! ## 依赖关系
//! - 被 `calculation/` 使用
//! - 使用 `models/parameters.rs`

use super::{PSEUDO_SUBFOLDER, SUFFIX};
use crate::error::{write_error, Result};
use crate::models::{ParameterSet, Structure};
use std::fs;
use std::path::Path;

/// 补全强制参数：suffix 与 pseudo_dir 总是覆盖，ntype 仅在缺失时推导
pub fn finalize_parameters(parameters: &ParameterSet, structure: &Structure) -> ParameterSet {
    let mut finalized = parameters.clone();
    finalized.insert("suffix", SUFFIX);
    finalized.insert("pseudo_dir", format!("./{}", PSEUDO_SUBFOLDER));
    finalized.set_default("ntype", structure.kinds().len());
    finalized
}

/// 生成 INPUT 文件内容
pub fn render_input(parameters: &ParameterSet) -> String {
    let mut text = String::from("INPUT_PARAMETERS\n");
    for (key, value) in parameters.iter() {
        text.push_str(&format!("{:<18}  {}\n", key, value));
    }
    text
}

/// 写出 INPUT 文件
pub fn write_input(path: &Path, parameters: &ParameterSet, structure: &Structure) -> Result<()> {
    let content = render_input(&finalize_parameters(parameters, structure));
    fs::write(path, content).map_err(write_error(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Lattice, ParamValue};

    fn two_kinds() -> Structure {
        let lattice = Lattice::from_vectors([[5.0, 0.0, 0.0], [0.0, 5.0, 0.0], [0.0, 0.0, 5.0]]);
        let mut s = Structure::new("SiGe", lattice);
        s.append_atom("Si", [0.0; 3]).unwrap();
        s.append_atom("Ge", [0.5; 3]).unwrap();
        s
    }

    #[test]
    fn test_forced_keys_override_user_values() {
        let params: ParameterSet = [("suffix", "mine"), ("pseudo_dir", "/elsewhere")]
            .into_iter()
            .collect();
        let finalized = finalize_parameters(&params, &two_kinds());
        assert_eq!(finalized.get("suffix"), Some(&ParamValue::from("ABACUS")));
        assert_eq!(finalized.get("pseudo_dir"), Some(&ParamValue::from("./pseudo")));
        assert_eq!(finalized.get("ntype"), Some(&ParamValue::Int(2)));
    }

    #[test]
    fn test_user_ntype_is_kept() {
        let params: ParameterSet = [("ntype", 5)].into_iter().collect();
        let finalized = finalize_parameters(&params, &two_kinds());
        assert_eq!(finalized.get("ntype"), Some(&ParamValue::Int(5)));
    }

    #[test]
    fn test_render_is_sorted_and_padded() {
        let mut params = ParameterSet::new();
        params.insert("ecutwfc", 80.0);
        params.insert("calculation", "relax");
        let text = render_input(&finalize_parameters(&params, &two_kinds()));
        assert_eq!(
            text,
            concat!(
                "INPUT_PARAMETERS\n",
                "calculation         relax\n",
                "ecutwfc             80.0\n",
                "ntype               2\n",
                "pseudo_dir          ./pseudo\n",
                "suffix              ABACUS\n",
            )
        );
    }

    #[test]
    fn test_render_independent_of_insertion_order() {
        let mut a = ParameterSet::new();
        a.insert("scf_thr", 1e-7);
        a.insert("ecutwfc", 60);
        a.insert("basis_type", "pw");

        let mut b = ParameterSet::new();
        b.insert("basis_type", "pw");
        b.insert("ecutwfc", 60);
        b.insert("scf_thr", 1e-7);

        let s = two_kinds();
        let first = render_input(&finalize_parameters(&a, &s));
        let second = render_input(&finalize_parameters(&b, &s));
        assert_eq!(first, second);

        let keys: Vec<&str> = first
            .lines()
            .skip(1)
            .map(|l| l.split_whitespace().next().unwrap())
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }
}
