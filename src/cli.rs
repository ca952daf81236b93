use std::path::PathBuf;

use clap::{Args, Parser};

use crate::config::Config;
use crate::pipeline::ExtractInput;

/// Extract text features for one annotation split inside the preprocessing container.
#[derive(Parser, Debug)]
#[command(name = "txtprep", version, about)]
pub struct Cli {
    /// Host directory with the annotation files, mounted read-only
    pub annotation_dir: PathBuf,

    /// Split to preprocess, forwarded verbatim as `--annotation` (e.g. `chid_dev`)
    pub source_split: String,

    /// Host directory receiving the text databases; created if missing
    pub out_dir: PathBuf,

    #[command(flatten)]
    pub overrides: Overrides,

    /// Write a JSON run report to this path
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Print the container command instead of running it
    #[arg(long)]
    pub dry_run: bool,
}

/// Flags that take precedence over `.txtprep.yaml`.
#[derive(Args, Debug, Default)]
pub struct Overrides {
    /// Container image to run
    #[arg(long)]
    pub image: Option<String>,

    /// Container runtime command line, e.g. `docker` or `sudo docker`
    #[arg(long)]
    pub runtime: Option<String>,

    /// Config file for the preprocessing program, as seen inside the container
    #[arg(long, value_name = "PATH")]
    pub preprocess_config: Option<String>,

    /// Kill the container after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Also write the container's combined output to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Fail without printing `done` when the container does not succeed
    #[arg(long)]
    pub strict: bool,

    /// Skip the runtime daemon check before launching
    #[arg(long)]
    pub no_runtime_check: bool,

    /// Run the container as the invoking user (Unix)
    #[arg(long)]
    pub as_user: bool,
}

impl Overrides {
    pub fn apply(self, mut cfg: Config) -> Config {
        if let Some(image) = self.image {
            cfg.image = image;
        }
        if let Some(runtime) = self.runtime {
            cfg.runtime = runtime;
        }
        if self.preprocess_config.is_some() {
            cfg.preprocess_config = self.preprocess_config;
        }
        if self.timeout.is_some() {
            cfg.timeout_secs = self.timeout;
        }
        if self.log_file.is_some() {
            cfg.log_file = self.log_file;
        }
        cfg.strict |= self.strict;
        cfg.run_as_user |= self.as_user;
        if self.no_runtime_check {
            cfg.check_runtime = false;
        }
        cfg
    }
}

/// A parsed command line merged with the loaded config.
#[derive(Debug)]
pub struct Invocation {
    pub input: ExtractInput,
    pub report: Option<PathBuf>,
    pub dry_run: bool,
}

impl Cli {
    pub fn into_invocation(self, config: Config, work_dir: PathBuf) -> Invocation {
        Invocation {
            input: ExtractInput {
                config: self.overrides.apply(config),
                annotation_dir: self.annotation_dir,
                source_split: self.source_split,
                out_dir: self.out_dir,
                work_dir,
            },
            report: self.report,
            dry_run: self.dry_run,
        }
    }
}
