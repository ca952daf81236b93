use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};

/// Split a runtime command line such as `docker` or `sudo docker` into words.
pub fn parse_runtime(runtime: &str) -> Result<Vec<String>> {
    let words = shell_words::split(runtime)
        .with_context(|| format!("invalid container runtime command `{runtime}`"))?;
    if words.is_empty() {
        bail!("container runtime command is empty");
    }
    Ok(words)
}

/// Verify that the container runtime's daemon is reachable.
pub fn ensure_available(runtime: &[String]) -> Result<()> {
    let (program, prefix) = runtime
        .split_first()
        .context("container runtime command is empty")?;
    let status = Command::new(program)
        .args(prefix)
        .args(["version", "--format", "{{.Server.Version}}"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .with_context(|| format!("failed to invoke `{program}`, is it installed and on PATH?"))?;

    if !status.success() {
        bail!("`{}` daemon is not running ({status})", runtime.join(" "));
    }
    Ok(())
}

/// Returns `["--user", "uid:gid"]` on Unix so containers write files
/// as the invoking user. Empty on other platforms.
pub fn user_args() -> Vec<String> {
    #[cfg(unix)]
    {
        // SAFETY: geteuid() and getegid() are simple POSIX getters that always succeed and have no side effects.
        let uid = unsafe { libc::geteuid() };
        let gid = unsafe { libc::getegid() };
        vec!["--user".into(), format!("{uid}:{gid}")]
    }

    #[cfg(not(unix))]
    {
        Vec::new()
    }
}
