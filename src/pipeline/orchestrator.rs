use std::io::Write;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::time::Instant;

use anyhow::{Result, bail};

use crate::config::Config;
use crate::docker::{self, CancelToken, ContainerCommand, ContainerResult, OutputLine};
use crate::paths::{self, ResolvedPaths};

use super::commands::preprocess_command;
use super::types::{ExtractInput, ExtractReport, RunStatus};

pub const START_BANNER: &str = "extracting text features...";
pub const DONE_BANNER: &str = "done";

/// Everything needed to launch, computed without touching the filesystem.
#[derive(Debug, Clone)]
pub struct Plan {
    pub paths: ResolvedPaths,
    pub annotation_dir: PathBuf,
    pub out_dir: PathBuf,
    pub command: ContainerCommand,
}

pub fn plan(input: &ExtractInput) -> Result<Plan> {
    let resolved = ResolvedPaths::from_work_dir(&input.work_dir);
    let annotation_dir = paths::absolutize(&input.work_dir, &input.annotation_dir);
    let out_dir = paths::absolutize(&input.work_dir, &input.out_dir);
    let command = preprocess_command(
        &input.config,
        &resolved,
        &annotation_dir,
        &out_dir,
        &input.source_split,
    )?;
    Ok(Plan {
        paths: resolved,
        annotation_dir,
        out_dir,
        command,
    })
}

/// Run the preprocessing step: prepare the output directory, launch the
/// container and forward its output.
///
/// Both banners are written to `stdout` whatever the container's outcome. A
/// failing container, or a runtime that cannot be started, is reported in the
/// returned [`ExtractReport`] rather than as an error, unless the config asks
/// for `strict`.
pub fn run_extraction(
    input: &ExtractInput,
    cancel: CancelToken,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<ExtractReport> {
    writeln!(stdout, "{START_BANNER}")?;

    let cfg = &input.config;
    let plan = plan(input)?;
    paths::prepare_output_dir(&plan.out_dir)?;

    tracing::info!(
        split = %input.source_split,
        image = %cfg.image,
        out_dir = %plan.out_dir.display(),
        "launching preprocessing container"
    );
    tracing::debug!(command = %plan.command.to_shell_line(), "container command");

    let started = Instant::now();
    let result = match launch(cfg, plan.command, cancel) {
        Ok(rx) => forward(rx, stdout, stderr)?,
        Err(err) if !cfg.strict => {
            tracing::error!("failed to launch preprocessing container: {err:#}");
            ContainerResult {
                success: false,
                exit_code: None,
                cancelled: false,
                timed_out: false,
            }
        }
        Err(err) => return Err(err),
    };

    let status = if result.cancelled {
        RunStatus::Cancelled
    } else if result.timed_out {
        RunStatus::Timeout
    } else if result.success {
        RunStatus::Pass
    } else {
        RunStatus::Fail
    };

    let report = ExtractReport {
        source_split: input.source_split.clone(),
        image: cfg.image.clone(),
        annotation_dir: plan.annotation_dir.display().to_string(),
        out_dir: plan.out_dir.display().to_string(),
        pretrained_dir: plan.paths.pretrained_dir.display().to_string(),
        status,
        exit_code: result.exit_code,
        duration_secs: started.elapsed().as_secs_f64(),
    };

    if !report.succeeded() {
        tracing::warn!(
            status = status.as_str(),
            exit_code = ?result.exit_code,
            "preprocessing container did not succeed"
        );
        if cfg.strict {
            bail!(
                "preprocessing for split `{}` ended with status {} (exit code {:?})",
                input.source_split,
                status.as_str(),
                result.exit_code
            );
        }
    }

    writeln!(stdout, "{DONE_BANNER}")?;
    Ok(report)
}

/// Optionally probe the runtime daemon, then start the container.
fn launch(
    cfg: &Config,
    command: ContainerCommand,
    cancel: CancelToken,
) -> Result<Receiver<OutputLine>> {
    if cfg.check_runtime {
        docker::ensure_available(&docker::parse_runtime(&cfg.runtime)?)?;
    }
    docker::spawn(command, cancel)
}

/// Copy streamed container output to the caller until the final result arrives.
fn forward(
    rx: Receiver<OutputLine>,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<ContainerResult> {
    for line in rx {
        match line {
            OutputLine::Stdout(l) => writeln!(stdout, "{l}")?,
            OutputLine::Stderr(l) => writeln!(stderr, "{l}")?,
            OutputLine::Done(result) => return Ok(result),
        }
    }
    bail!("container runner exited without a result")
}

#[cfg(all(test, unix))]
mod tests {
    use std::path::Path;

    use super::*;

    /// Runtime stub run through `sh`: prints each argument, then runs `tail`.
    fn stub_input(dir: &Path, tail: &str) -> ExtractInput {
        let stub = dir.join("stub.sh");
        std::fs::write(
            &stub,
            format!("for a in \"$@\"; do echo \"arg:$a\"; done\n{tail}\n"),
        )
        .unwrap();
        let config = Config {
            runtime: format!("sh {}", shell_words::quote(&stub.to_string_lossy())),
            check_runtime: false,
            ..Config::default()
        };
        ExtractInput {
            config,
            annotation_dir: PathBuf::from("annotations"),
            source_split: "chid_dev".into(),
            out_dir: PathBuf::from("out/txt"),
            work_dir: dir.to_path_buf(),
        }
    }

    fn run(input: &ExtractInput) -> (Result<ExtractReport>, String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let res = run_extraction(input, CancelToken::new(), &mut out, &mut err);
        (
            res,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn plan_absolutizes_relative_paths() {
        let input = ExtractInput {
            config: Config::default(),
            annotation_dir: PathBuf::from("annotations"),
            source_split: "val".into(),
            out_dir: PathBuf::from("out/txt"),
            work_dir: PathBuf::from("/home/user/proj"),
        };
        let plan = plan(&input).unwrap();
        assert_eq!(plan.out_dir, PathBuf::from("/home/user/proj/out/txt"));
        let args = &plan.command.args;
        assert!(args.contains(&"type=bind,src=/home/user/proj/out/txt,dst=/txt".to_string()));
        assert!(args.contains(
            &"type=bind,src=/home/user/proj/annotations,dst=/annotations,readonly".to_string()
        ));
    }

    #[test]
    fn successful_run_forwards_output_between_banners() {
        let dir = tempfile::tempdir().unwrap();
        let input = stub_input(dir.path(), "echo warn >&2; exit 0");
        let (res, out, err) = run(&input);
        let report = res.unwrap();
        assert_eq!(report.status, RunStatus::Pass);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.first(), Some(&START_BANNER));
        assert_eq!(lines.last(), Some(&DONE_BANNER));
        assert!(lines.contains(&"arg:--annotation"));
        assert!(lines.contains(&"arg:chid_dev"));
        assert_eq!(err, "warn\n");
        assert!(dir.path().join("out/txt").is_dir());
    }

    #[test]
    fn failing_run_still_prints_done() {
        let dir = tempfile::tempdir().unwrap();
        let input = stub_input(dir.path(), "exit 4");
        let (res, out, _) = run(&input);
        let report = res.unwrap();
        assert_eq!(report.status, RunStatus::Fail);
        assert_eq!(report.exit_code, Some(4));
        assert_eq!(report.process_exit_code(), 4);
        assert!(out.starts_with(START_BANNER));
        assert!(out.ends_with("done\n"));
    }

    #[test]
    fn strict_run_fails_without_done() {
        let dir = tempfile::tempdir().unwrap();
        let mut input = stub_input(dir.path(), "exit 4");
        input.config.strict = true;
        let (res, out, _) = run(&input);
        let err = res.unwrap_err();
        assert!(err.to_string().contains("chid_dev"));
        assert!(!out.lines().any(|l| l == DONE_BANNER));
    }

    #[test]
    fn missing_runtime_is_a_failed_run_with_done() {
        let dir = tempfile::tempdir().unwrap();
        let mut input = stub_input(dir.path(), "exit 0");
        input.config.runtime = "txtprep-no-such-runtime".into();
        let (res, out, _) = run(&input);
        let report = res.unwrap();
        assert_eq!(report.status, RunStatus::Fail);
        assert_eq!(report.exit_code, None);
        assert_eq!(report.process_exit_code(), 1);
        assert_eq!(out, format!("{START_BANNER}\n{DONE_BANNER}\n"));
        // Output directory is prepared before launch.
        assert!(dir.path().join("out/txt").is_dir());
    }

    #[test]
    fn unreachable_daemon_is_a_failed_run_with_done() {
        let dir = tempfile::tempdir().unwrap();
        // The stub fails `version` as well as `run`.
        let mut input = stub_input(dir.path(), "exit 1");
        input.config.check_runtime = true;
        let (res, out, _) = run(&input);
        let report = res.unwrap();
        assert_eq!(report.status, RunStatus::Fail);
        assert_eq!(report.exit_code, None);
        assert_eq!(out, format!("{START_BANNER}\n{DONE_BANNER}\n"));
    }

    #[test]
    fn strict_launch_failure_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut input = stub_input(dir.path(), "exit 1");
        input.config.check_runtime = true;
        input.config.strict = true;
        let (res, out, _) = run(&input);
        let err = res.unwrap_err();
        assert!(err.to_string().contains("daemon is not running"));
        assert_eq!(out, format!("{START_BANNER}\n"));
    }

    #[test]
    fn timeout_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut input = stub_input(dir.path(), "exec sleep 30");
        input.config.timeout_secs = Some(0);
        let (res, out, _) = run(&input);
        let report = res.unwrap();
        assert_eq!(report.status, RunStatus::Timeout);
        assert_eq!(report.process_exit_code(), 1);
        assert!(out.ends_with("done\n"));
    }
}
