// Init command for copying the project template into the current directory

use crate::config::Config;
use crate::ui;
use anyhow::Context;
use log::debug;
use std::fs;
use std::path::Path;

pub fn init(config: &Config) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("Failed to read the current directory")?;
    let copied = copy_template(&config.template_dir(), &cwd)?;
    ui::success(&format!("Initialized project with {} file(s)", copied));
    Ok(())
}

/// Copy each regular file of `template_dir` into `dest`, keeping files that
/// already exist there. Returns how many files were written.
pub fn copy_template(template_dir: &Path, dest: &Path) -> anyhow::Result<usize> {
    let entries = fs::read_dir(template_dir)
        .with_context(|| format!("Template directory {} not found", template_dir.display()))?;

    let mut copied = 0;
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read {}", template_dir.display()))?;
        let file_type = entry.file_type()?;
        if !file_type.is_file() {
            debug!("Skipping {}: not a regular file", entry.path().display());
            continue;
        }

        let target = dest.join(entry.file_name());
        if target.exists() {
            ui::warning(&format!(
                "{} already exists, skipping",
                entry.file_name().to_string_lossy()
            ));
            continue;
        }

        fs::copy(entry.path(), &target)
            .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
        ui::action(&format!("Created {}", entry.file_name().to_string_lossy()));
        copied += 1;
    }
    Ok(copied)
}
