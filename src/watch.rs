use crate::models::{SellWatchEntry, TriggeredAlert};
use crate::pricing::PriceSource;

/// Delivery channel for triggered sell-watch alerts. Injected so the caller
/// decides whether alerts go to a log, a UI banner or somewhere else.
pub trait Notifier: Send + Sync {
    fn notify(&self, alert: &TriggeredAlert);
}

/// Writes alerts to the structured log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, alert: &TriggeredAlert) {
        tracing::info!(
            item = %alert.name,
            current_price = alert.current_price,
            threshold = alert.threshold,
            "sell-watch threshold met"
        );
    }
}

/// Looks up each entry's current price and returns the entries whose price is
/// at or above their threshold. Unavailable lookups are logged and skipped;
/// they never abort the batch.
pub fn check_sell_watch(entries: &[SellWatchEntry], source: &dyn PriceSource) -> Vec<TriggeredAlert> {
    let mut triggered = Vec::new();
    for entry in entries {
        match source.lookup(&entry.item.name) {
            Some(price) if price >= entry.threshold => {
                triggered.push(TriggeredAlert {
                    name: entry.item.name.clone(),
                    current_price: price,
                    threshold: entry.threshold,
                });
            }
            Some(price) => {
                tracing::debug!(
                    item = %entry.item.name,
                    current_price = price,
                    threshold = entry.threshold,
                    "price below threshold"
                );
            }
            None => {
                tracing::warn!(item = %entry.item.name, "price unavailable, skipping entry");
            }
        }
    }
    triggered
}
