// Version command for reporting the installed toolchain

use crate::config::Config;
use crate::ui;
use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use std::process::Command;

lazy_static! {
    static ref GO_VERSION_OUTPUT: Regex =
        Regex::new(r"go version (\S+) \S+/\S+").expect("version output pattern is valid");
}

pub fn version(config: &Config) -> anyhow::Result<()> {
    let go = config
        .install_dir
        .join("bin")
        .join(if cfg!(windows) { "go.exe" } else { "go" });

    let output = Command::new(&go)
        .arg("version")
        .output()
        .with_context(|| format!("Failed to run {}", go.display()))?;
    if !output.status.success() {
        anyhow::bail!("{} version exited with {}", go.display(), output.status);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let installed = parse_go_version(&stdout)
        .with_context(|| format!("Unrecognised output from {}: {}", go.display(), stdout.trim()))?;
    ui::line(installed);
    Ok(())
}

/// Pull `go1.21.0` out of `go version go1.21.0 linux/amd64`.
pub fn parse_go_version(output: &str) -> Option<&str> {
    GO_VERSION_OUTPUT
        .captures(output)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}
