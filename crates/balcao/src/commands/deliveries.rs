//! Show the latest catalog deliveries.

use anyhow::{Context, Result};

use balcao::store::DeliveryLog;
use balcao::store::file::FileDeliveryLog;

pub async fn run(config_path: &str, limit: usize) -> Result<()> {
    let loaded = super::load_config(config_path).await?;
    let log = FileDeliveryLog::new(&loaded.delivery_log_path);

    let records = log
        .load_recent(limit)
        .await
        .with_context(|| format!("Failed to read {}", log.path().display()))?;

    if records.is_empty() {
        println!("No deliveries recorded in {}", log.path().display());
        return Ok(());
    }

    for record in records {
        let name = if record.display_name.is_empty() {
            "-"
        } else {
            record.display_name.as_str()
        };
        println!(
            "{}  {:<24} {:<20} {}{}",
            record.delivered_at.format("%Y-%m-%d %H:%M:%S"),
            record.contact_id,
            name,
            record.item,
            if record.bulk { "  (all)" } else { "" },
        );
    }
    Ok(())
}
