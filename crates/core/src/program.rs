// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`Program`] configuration attached to exactly one [`crate::Queue`].

use serde::{Deserialize, Serialize};

/// How a program's command line is assembled (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LaunchSyntax {
    Custom,
    Plain,
    InputArg,
    InputArgNoExt,
    Redirect,
    InputArgOutputRedirect,
}

crate::simple_display! {
    LaunchSyntax {
        Custom => "CUSTOM",
        Plain => "PLAIN",
        InputArg => "INPUT_ARG",
        InputArgNoExt => "INPUT_ARG_NO_EXT",
        Redirect => "REDIRECT",
        InputArgOutputRedirect => "INPUT_ARG_OUTPUT_REDIRECT",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub name: String,
    pub executable: String,
    #[serde(default)]
    pub arguments: String,
    /// May embed `$$...$$` keywords, rendered the same as a launch
    /// script (§4.5).
    pub output_filename: String,
    pub launch_syntax: LaunchSyntax,
    /// Overrides the owning queue's default template when
    /// `launch_syntax == Custom`.
    #[serde(default)]
    pub custom_launch_template: Option<String>,
}

impl Program {
    pub fn new(name: impl Into<String>, executable: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            executable: executable.into(),
            arguments: String::new(),
            output_filename: "$$inputFileBaseName$$.out".to_string(),
            launch_syntax: LaunchSyntax::Plain,
            custom_launch_template: None,
        }
    }

    /// The line this program's launch syntax produces, before the
    /// queue's `$$programExecution$$` keyword substitution and before
    /// any custom-template override is considered by the caller.
    pub fn execution_line(&self, input_file_name: &str, input_file_base_name: &str) -> String {
        let exe = &self.executable;
        let args = &self.arguments;
        let out = &self.output_filename;
        match self.launch_syntax {
            LaunchSyntax::Custom => String::new(),
            LaunchSyntax::Plain => format!("{exe} {args}").trim().to_string(),
            LaunchSyntax::InputArg => format!("{exe} {args} {input_file_name}").trim().to_string(),
            LaunchSyntax::InputArgNoExt => {
                format!("{exe} {args} {input_file_base_name}").trim().to_string()
            }
            LaunchSyntax::Redirect => {
                format!("{exe} {args} < {input_file_name} > {out}").trim().to_string()
            }
            LaunchSyntax::InputArgOutputRedirect => {
                format!("{exe} {args} {input_file_name} > {out}").trim().to_string()
            }
        }
    }

    /// The program's portion of a queue export file (`spec.md` §6): a
    /// `Program` carries no instance-specific state, so this is a
    /// clone, kept as its own named seam the way [`crate::Queue::to_export`]
    /// is.
    pub fn to_export(&self) -> Program {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_syntax_joins_executable_and_arguments() {
        let p = Program { arguments: "-v".into(), ..Program::new("echo", "echo") };
        assert_eq!(p.execution_line("in.dat", "in"), "echo -v");
    }

    #[test]
    fn input_arg_appends_filename() {
        let mut p = Program::new("psi4", "psi4");
        p.launch_syntax = LaunchSyntax::InputArg;
        assert_eq!(p.execution_line("in.dat", "in"), "psi4 in.dat");
    }

    #[test]
    fn input_arg_no_ext_appends_basename() {
        let mut p = Program::new("psi4", "psi4");
        p.launch_syntax = LaunchSyntax::InputArgNoExt;
        assert_eq!(p.execution_line("in.dat", "in"), "psi4 in");
    }

    #[test]
    fn redirect_wires_stdin_and_stdout() {
        let mut p = Program::new("cat", "cat");
        p.output_filename = "out.log".into();
        p.launch_syntax = LaunchSyntax::Redirect;
        assert_eq!(p.execution_line("in.dat", "in"), "cat < in.dat > out.log");
    }

    #[test]
    fn input_arg_output_redirect_combines_both() {
        let mut p = Program::new("cat", "cat");
        p.output_filename = "out.log".into();
        p.launch_syntax = LaunchSyntax::InputArgOutputRedirect;
        assert_eq!(p.execution_line("in.dat", "in"), "cat in.dat > out.log");
    }

    #[test]
    fn custom_syntax_produces_no_line_of_its_own() {
        let mut p = Program::new("x", "x");
        p.launch_syntax = LaunchSyntax::Custom;
        assert_eq!(p.execution_line("in.dat", "in"), "");
    }
}
