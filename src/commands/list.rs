// List command for printing every known release, oldest first

use crate::config::Config;
use crate::releases::ReleaseFetcher;
use crate::ui;

pub async fn list(config: &Config, refresh: bool) -> anyhow::Result<()> {
    let fetcher = ReleaseFetcher::new(config)?;

    let pb = ui::spinner("Fetching releases...");
    let result = fetcher.fetch(refresh).await;
    ui::clear_bar(&pb);

    for release in result? {
        ui::line(release.name());
    }
    Ok(())
}
