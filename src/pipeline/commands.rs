use std::path::Path;
use std::time::Duration;

use anyhow::Result;

use crate::config::Config;
use crate::docker::{self, ContainerCommand, Mount};
use crate::paths::ResolvedPaths;

/// The four bind mounts, in launch order: work dir, pretrained, annotations, output.
pub fn preprocess_mounts(
    cfg: &Config,
    paths: &ResolvedPaths,
    annotation_dir: &Path,
    out_dir: &Path,
) -> Vec<Mount> {
    let targets = &cfg.mounts;
    vec![
        Mount::read_write(&paths.work_dir, &targets.work_dir),
        Mount::read_only(&paths.pretrained_dir, &targets.pretrained),
        Mount::read_only(annotation_dir, &targets.annotations),
        Mount::read_write(out_dir, &targets.output),
    ]
}

/// Build the `docker run` command for the text-feature preprocessing step.
pub fn preprocess_command(
    cfg: &Config,
    paths: &ResolvedPaths,
    annotation_dir: &Path,
    out_dir: &Path,
    source_split: &str,
) -> Result<ContainerCommand> {
    let mut runtime = docker::parse_runtime(&cfg.runtime)?;
    let program = runtime.remove(0);
    let mut args = runtime;
    args.push("run".into());
    if cfg.ipc_host {
        args.push("--ipc=host".into());
    }
    args.push("--rm".into());
    if cfg.run_as_user {
        args.extend(docker::user_args());
    }

    for mount in preprocess_mounts(cfg, paths, annotation_dir, out_dir) {
        args.push("--mount".into());
        args.push(mount.to_arg());
    }

    args.extend([
        "-w".into(),
        cfg.mounts.work_dir.clone(),
        cfg.image.clone(),
        cfg.interpreter.clone(),
        cfg.program.clone(),
        "--annotation".into(),
        source_split.to_string(),
    ]);
    if let Some(preprocess_config) = &cfg.preprocess_config {
        args.extend(["--config".into(), preprocess_config.clone()]);
    }

    Ok(ContainerCommand {
        program,
        args,
        timeout: cfg.timeout_secs.map(Duration::from_secs),
        log_path: cfg.log_file.clone(),
    })
}
