//! Argument vectors for the tool's subcommands.

use std::fmt;
use std::path::Path;

use crate::error::Result;
use crate::results::OutputFormat;
use crate::variables::VariableSet;

/// A subcommand of the external tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subcommand {
    Detect,
    Compile,
    Run,
    Parse,
}

impl Subcommand {
    /// Python module implementing the subcommand.
    pub fn module(self) -> &'static str {
        match self {
            Self::Detect => "fzi",
            Self::Compile => "fzc",
            Self::Run => "fzr",
            Self::Parse => "fzo",
        }
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Detect => "detect",
            Self::Compile => "compile",
            Self::Run => "run",
            Self::Parse => "parse",
        }
    }
}

impl fmt::Display for Subcommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fully built call: subcommand plus its argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub subcommand: Subcommand,
    pub args: Vec<String>,
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl Invocation {
    /// `[file, --model, model, --format, json]`
    pub fn detect(file: &Path, model: &str) -> Self {
        Self {
            subcommand: Subcommand::Detect,
            args: vec![
                path_arg(file),
                "--model".to_string(),
                model.to_string(),
                "--format".to_string(),
                "json".to_string(),
            ],
        }
    }

    /// `[template, --model, model, --variables, JSON, --output, dir]`
    pub fn compile(
        template: &Path,
        model: &str,
        variables: &VariableSet,
        output_dir: &Path,
    ) -> Result<Self> {
        Ok(Self {
            subcommand: Subcommand::Compile,
            args: vec![
                path_arg(template),
                "--model".to_string(),
                model.to_string(),
                "--variables".to_string(),
                variables.to_json()?,
                "--output".to_string(),
                path_arg(output_dir),
            ],
        })
    }

    /// `[template, --model, model, --variables, JSON, --calculator, calc, --results, dir]`
    pub fn run(
        template: &Path,
        model: &str,
        variables: &VariableSet,
        calculator: &str,
        results_dir: &Path,
    ) -> Result<Self> {
        Ok(Self {
            subcommand: Subcommand::Run,
            args: vec![
                path_arg(template),
                "--model".to_string(),
                model.to_string(),
                "--variables".to_string(),
                variables.to_json()?,
                "--calculator".to_string(),
                calculator.to_string(),
                "--results".to_string(),
                path_arg(results_dir),
            ],
        })
    }

    /// `[results_dir, --model, model, --format, format]`
    pub fn parse(results_dir: &Path, model: &str, format: OutputFormat) -> Self {
        Self {
            subcommand: Subcommand::Parse,
            args: vec![
                path_arg(results_dir),
                "--model".to_string(),
                model.to_string(),
                "--format".to_string(),
                format.as_str().to_string(),
            ],
        }
    }

    /// Interpreter arguments: `-m <namespace>.<module>` followed by `args`.
    pub fn interpreter_args(&self, namespace: &str) -> Vec<String> {
        let mut full = Vec::with_capacity(self.args.len() + 2);
        full.push("-m".to_string());
        full.push(format!("{}.{}", namespace, self.subcommand.module()));
        full.extend(self.args.iter().cloned());
        full
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn vars() -> VariableSet {
        let mut set = VariableSet::new();
        set.insert("T_celsius", json!([20, 30]));
        set.insert("n_mol", json!(1));
        set
    }

    #[test]
    fn test_detect_args() {
        let inv = Invocation::detect(Path::new("input.txt"), "perfectgas");
        assert_eq!(inv.subcommand, Subcommand::Detect);
        assert_eq!(
            inv.args,
            vec!["input.txt", "--model", "perfectgas", "--format", "json"]
        );
    }

    #[test]
    fn test_compile_args() {
        let inv = Invocation::compile(
            Path::new("input.txt"),
            "perfectgas",
            &vars(),
            Path::new("results_compiled"),
        )
        .unwrap();
        assert_eq!(
            inv.args,
            vec![
                "input.txt",
                "--model",
                "perfectgas",
                "--variables",
                r#"{"T_celsius":[20,30],"n_mol":1}"#,
                "--output",
                "results_compiled",
            ]
        );
    }

    #[test]
    fn test_run_args() {
        let inv = Invocation::run(
            Path::new("input.txt"),
            "perfectgas",
            &vars(),
            "sh://bash calc.sh",
            Path::new("results"),
        )
        .unwrap();
        assert_eq!(inv.subcommand, Subcommand::Run);
        assert_eq!(
            inv.args,
            vec![
                "input.txt",
                "--model",
                "perfectgas",
                "--variables",
                r#"{"T_celsius":[20,30],"n_mol":1}"#,
                "--calculator",
                "sh://bash calc.sh",
                "--results",
                "results",
            ]
        );
    }

    #[test]
    fn test_parse_args_for_each_format() {
        for (format, name) in [
            (OutputFormat::Json, "json"),
            (OutputFormat::Csv, "csv"),
            (OutputFormat::Table, "table"),
        ] {
            let inv = Invocation::parse(Path::new("/r"), "M", format);
            assert_eq!(inv.args, vec!["/r", "--model", "M", "--format", name]);
        }
    }

    #[test]
    fn test_interpreter_args_prefix_module() {
        let inv = Invocation::parse(Path::new("/r"), "M", OutputFormat::Csv);
        assert_eq!(
            inv.interpreter_args("fz"),
            vec!["-m", "fz.fzo", "/r", "--model", "M", "--format", "csv"]
        );
    }

    #[test]
    fn test_subcommand_modules() {
        assert_eq!(Subcommand::Detect.module(), "fzi");
        assert_eq!(Subcommand::Compile.module(), "fzc");
        assert_eq!(Subcommand::Run.module(), "fzr");
        assert_eq!(Subcommand::Parse.module(), "fzo");
        assert_eq!(Subcommand::Run.to_string(), "run");
    }
}
