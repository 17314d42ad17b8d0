// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Launch-script template rendering (§4.5).
//!
//! Grounded on `examples/original_source/molequeue/app/queue.cpp`'s
//! `replaceKeywords`: compose `$$programExecution$$` and
//! `$$outputFileName$$` first since other keywords may be nested
//! inside them, then run the generic double-dollar substitution pass
//! over the whole script, then the triple-dollar line-conditional
//! pass, then strip anything left unhandled.

use mq_core::{JobId, Program};
use regex::Regex;
use std::collections::HashMap;

/// Per-job values available to keyword substitution. Built by the
/// caller (local executor or remote pipeline) from the job and its
/// queue/program configuration.
pub struct RenderContext {
    pub molequeue_id: JobId,
    pub input_file_name: String,
    pub input_file_base_name: String,
    pub number_of_cores: u32,
    pub remote_working_dir: Option<String>,
    /// Values available to `$$$name$$$` tokens. A name with no entry
    /// here causes the line containing it to be dropped.
    pub optional_values: HashMap<String, String>,
}

/// A keyword left unreplaced after both substitution passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnhandledKeyword(pub String);

/// Result of rendering: the script text plus any keywords that had to
/// be stripped, for the caller to log (keeping this module free of a
/// logging dependency).
pub struct Rendered {
    pub script: String,
    pub unhandled: Vec<UnhandledKeyword>,
}

/// Format a whole-minutes duration as `HH:MM:SS`, the shape PBS/SGE/
/// SLURM walltime directives expect.
pub fn format_wall_time_minutes(minutes: u32) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;
    format!("{hours:02}:{mins:02}:00")
}

pub fn render(template: &str, program: &Program, ctx: &RenderContext, add_trailing_newline: bool) -> Rendered {
    let execution_line = program.execution_line(&ctx.input_file_name, &ctx.input_file_base_name);
    let mut script = template.replace("$$programExecution$$", &execution_line);
    script = script.replace("$$outputFileName$$", &program.output_filename);

    let keywords = build_keyword_map(ctx);
    script = substitute_double_dollar(&script, &keywords);
    script = substitute_triple_dollar(&script, &ctx.optional_values);

    let unhandled = find_unhandled_keywords(&script);
    script = strip_unhandled_keywords(&script);

    if add_trailing_newline && !script.is_empty() && !script.ends_with('\n') {
        script.push('\n');
    }

    Rendered { script, unhandled }
}

fn build_keyword_map(ctx: &RenderContext) -> HashMap<&'static str, String> {
    let mut map = HashMap::new();
    map.insert("inputFileName", ctx.input_file_name.clone());
    map.insert("inputFileBaseName", ctx.input_file_base_name.clone());
    map.insert("moleQueueId", ctx.molequeue_id.to_string());
    map.insert("numberOfCores", ctx.number_of_cores.to_string());
    if let Some(dir) = &ctx.remote_working_dir {
        map.insert("remoteWorkingDir", dir.clone());
    }
    map
}

fn substitute_double_dollar(script: &str, keywords: &HashMap<&str, String>) -> String {
    let mut out = script.to_string();
    for (name, value) in keywords {
        out = out.replace(&format!("$${name}$$"), value);
    }
    out
}

fn triple_dollar_regex() -> Regex {
    Regex::new(r"\$\$\$([^$\s]+)\$\$\$").expect("static regex")
}

fn substitute_triple_dollar(script: &str, values: &HashMap<String, String>) -> String {
    let re = triple_dollar_regex();
    let had_trailing_newline = script.ends_with('\n');
    let mut kept_lines = Vec::new();
    for line in script.split('\n') {
        match re.captures(line) {
            Some(caps) => {
                let name = &caps[1];
                if let Some(value) = values.get(name) {
                    kept_lines.push(re.replace(line, value.as_str()).into_owned());
                }
                // else: drop the whole line
            }
            None => kept_lines.push(line.to_string()),
        }
    }
    let mut joined = kept_lines.join("\n");
    if !had_trailing_newline {
        while joined.ends_with('\n') {
            joined.pop();
        }
    }
    joined
}

fn unhandled_keyword_regex() -> Regex {
    Regex::new(r"\${2,3}[^$\s]+\${2,3}").expect("static regex")
}

fn find_unhandled_keywords(script: &str) -> Vec<UnhandledKeyword> {
    unhandled_keyword_regex()
        .find_iter(script)
        .map(|m| UnhandledKeyword(m.as_str().to_string()))
        .collect()
}

fn strip_unhandled_keywords(script: &str) -> String {
    unhandled_keyword_regex().replace_all(script, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mq_core::LaunchSyntax;

    fn ctx() -> RenderContext {
        RenderContext {
            molequeue_id: JobId::from_raw(7),
            input_file_name: "job.inp".into(),
            input_file_base_name: "job".into(),
            number_of_cores: 4,
            remote_working_dir: Some("/scratch/u1/7".into()),
            optional_values: HashMap::new(),
        }
    }

    fn program() -> Program {
        let mut p = Program::new("psi4", "psi4");
        p.launch_syntax = LaunchSyntax::InputArg;
        p.output_filename = "$$inputFileBaseName$$.out".into();
        p
    }

    #[test]
    fn composes_execution_line_and_output_filename() {
        let template = "#!/bin/sh\n$$programExecution$$ > $$outputFileName$$\n";
        let rendered = render(template, &program(), &ctx(), true);
        assert_eq!(rendered.script, "#!/bin/sh\npsi4 job.inp > job.out\n");
        assert!(rendered.unhandled.is_empty());
    }

    #[test]
    fn substitutes_generic_keywords() {
        let template = "#PBS -l nodes=1:ppn=$$numberOfCores$$\ncd $$remoteWorkingDir$$\n";
        let rendered = render(template, &program(), &ctx(), true);
        assert_eq!(rendered.script, "#PBS -l nodes=1:ppn=4\ncd /scratch/u1/7\n");
    }

    #[test]
    fn three_dollar_line_survives_when_value_present() {
        let mut c = ctx();
        c.optional_values.insert("maxWallTime".into(), format_wall_time_minutes(60));
        let template = "#PBS -l walltime=$$$maxWallTime$$$\necho hi\n";
        let rendered = render(template, &program(), &c, true);
        assert_eq!(rendered.script, "#PBS -l walltime=01:00:00\necho hi\n");
    }

    #[test]
    fn three_dollar_line_dropped_when_value_absent() {
        let template = "#PBS -l walltime=$$$maxWallTime$$$\necho hi\n";
        let rendered = render(template, &program(), &ctx(), true);
        assert_eq!(rendered.script, "echo hi\n");
    }

    #[test]
    fn unhandled_keyword_is_stripped_and_reported() {
        let template = "echo $$notAKeyword$$\n";
        let rendered = render(template, &program(), &ctx(), true);
        assert_eq!(rendered.script, "echo \n");
        assert_eq!(rendered.unhandled, vec![UnhandledKeyword("$$notAKeyword$$".into())]);
    }

    #[test]
    fn trailing_newline_added_when_requested_and_absent() {
        let rendered = render("echo hi", &program(), &ctx(), true);
        assert!(rendered.script.ends_with('\n'));
    }

    #[test]
    fn trailing_newline_not_added_when_not_requested() {
        let rendered = render("echo hi", &program(), &ctx(), false);
        assert_eq!(rendered.script, "echo hi");
    }

    #[test]
    fn wall_time_formats_as_hh_mm_ss() {
        assert_eq!(format_wall_time_minutes(90), "01:30:00");
        assert_eq!(format_wall_time_minutes(5), "00:05:00");
    }
}
