// Install command for placing a prebuilt toolchain into the install directory

use crate::config::Config;
use crate::install::{Installer, normalize_version};
use crate::releases::ReleaseFetcher;
use crate::ui;
use anyhow::Context;

/// Alias resolved to the newest release in the listing.
const LATEST: &str = "latest";

pub async fn install(
    config: &Config,
    source: bool,
    version: Option<&str>,
    sha256: Option<&str>,
) -> anyhow::Result<()> {
    if source {
        ui::warning("Installing from source is unimplemented");
        return Ok(());
    }

    let requested = version.context("--version is required with --binary")?;
    let version = if requested.trim() == LATEST {
        latest_release(config).await?
    } else {
        normalize_version(requested)?
    };

    ui::action(&format!(
        "Installing {} into {}",
        version,
        config.install_dir.display()
    ));

    let outcome = Installer::new(config)?.install(&version, sha256).await?;

    ui::success(&format!(
        "Installed {} ({})",
        outcome.version, outcome.platform
    ));
    ui::dim(&format!(
        "  {} entries, {} bytes, sha256:{}",
        outcome.entries, outcome.bytes, outcome.sha256
    ));
    ui::action(&format!(
        "Update PATH to include {}",
        outcome.install_dir.join("bin").display()
    ));
    Ok(())
}

async fn latest_release(config: &Config) -> anyhow::Result<String> {
    let pb = ui::spinner("Resolving latest release...");
    let releases = match ReleaseFetcher::new(config)?.fetch(false).await {
        Ok(releases) => releases,
        Err(e) => {
            ui::clear_bar(&pb);
            return Err(e.into());
        }
    };

    let Some(latest) = releases.last() else {
        ui::clear_bar(&pb);
        anyhow::bail!("The release listing is empty");
    };
    ui::finish_spinner_success(&pb, &format!("Latest release is {}", latest));
    Ok(latest.name().to_string())
}
