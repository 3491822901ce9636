//! External command used as the benchmark workload.

use dc_types::{BatchSize, ObjectId};
use std::process::{Command, Stdio};

pub const OBJECT_PLACEHOLDER: &str = "{object}";
pub const BATCH_SIZE_PLACEHOLDER: &str = "{batch_size}";

/// Program plus argument templates, run once per batch size.
#[derive(Debug, Clone)]
pub struct CommandWorkload {
    program: String,
    args: Vec<String>,
}

impl CommandWorkload {
    /// `argv[0]` is the program; the rest are argument templates.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    pub fn render_args(&self, object: &ObjectId, batch_size: BatchSize) -> Vec<String> {
        let batch_size = batch_size.to_string();
        self.args
            .iter()
            .map(|arg| render(arg, object.as_str(), &batch_size))
            .collect()
    }

    /// Run the command to completion; a non-zero exit is a failure.
    pub fn run(&mut self, object: &ObjectId, batch_size: BatchSize) -> Result<(), String> {
        let status = Command::new(&self.program)
            .args(self.render_args(object, batch_size))
            .env("DATA_COCKPIT_OBJECT", object.as_str())
            .env("DATA_COCKPIT_BATCH_SIZE", batch_size.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .status()
            .map_err(|e| format!("failed to start {}: {}", self.program, e))?;

        if status.success() {
            Ok(())
        } else {
            Err(format!("{} exited with {}", self.program, status))
        }
    }
}

/// Substitute both placeholders in one left-to-right pass, so substituted
/// text is never scanned again.
fn render(template: &str, object: &str, batch_size: &str) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        rendered.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(after) = tail.strip_prefix(OBJECT_PLACEHOLDER) {
            rendered.push_str(object);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(BATCH_SIZE_PLACEHOLDER) {
            rendered.push_str(batch_size);
            rest = after;
        } else {
            rendered.push('{');
            rest = &tail[1..];
        }
    }
    rendered.push_str(rest);
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_argv_has_no_workload() {
        assert!(CommandWorkload::from_argv(&[]).is_none());
    }

    #[test]
    fn placeholders_are_substituted() {
        let workload = CommandWorkload::from_argv(&argv(&[
            "partition",
            "--input={object}",
            "--chunks",
            "{batch_size}",
        ]))
        .unwrap();

        let args = workload.render_args(&ObjectId::from("s3://bucket/a.csv"), 16);
        assert_eq!(args, argv(&["--input=s3://bucket/a.csv", "--chunks", "16"]));
    }

    #[test]
    fn substituted_object_is_not_rescanned() {
        let workload = CommandWorkload::from_argv(&argv(&[
            "partition",
            "{object}:{batch_size}",
            "{unknown} {batch_size",
        ]))
        .unwrap();

        let args = workload.render_args(&ObjectId::from("s3://b/{batch_size}.csv"), 7);
        assert_eq!(args, argv(&["s3://b/{batch_size}.csv:7", "{unknown} {batch_size"]));
    }

    #[cfg(unix)]
    #[test]
    fn exit_status_decides_success() {
        let object = ObjectId::from("s3://bucket/a.csv");

        let mut ok = CommandWorkload::from_argv(&argv(&["true"])).unwrap();
        assert!(ok.run(&object, 1).is_ok());

        let mut failing = CommandWorkload::from_argv(&argv(&["false"])).unwrap();
        let err = failing.run(&object, 1).unwrap_err();
        assert!(err.starts_with("false exited with"));
    }

    #[test]
    fn missing_program_is_a_failure() {
        let mut workload =
            CommandWorkload::from_argv(&argv(&["data-cockpit-no-such-program-xyz"])).unwrap();
        let err = workload.run(&ObjectId::from("x"), 1).unwrap_err();
        assert!(err.contains("failed to start"));
    }
}
