use crate::db::Database;
use crate::errors::AppResult;
use crate::models::{Collection, Item, ItemForm, SellWatchEntry, TriggeredAlert};
use crate::pricing::PriceSource;
use crate::watch::{check_sell_watch, Notifier};

/// View-model over the persistence gateway. A UI surface renders the plain
/// data these methods return and calls them one at a time; no business rules
/// live above this layer. The price source and notifier are injected.
pub struct TrackerCore {
    db: Database,
    price_source: Box<dyn PriceSource>,
    notifier: Box<dyn Notifier>,
}

impl TrackerCore {
    pub fn new(db: Database, price_source: Box<dyn PriceSource>, notifier: Box<dyn Notifier>) -> Self {
        Self {
            db,
            price_source,
            notifier,
        }
    }

    /// Validates the form before the gateway is contacted. For the sell-watch
    /// collection the form must carry a threshold.
    pub fn add_item(&self, collection: Collection, form: &ItemForm) -> AppResult<Item> {
        let item = form.parse_new()?;
        match collection {
            Collection::SellWatch => {
                let threshold = form.parse_threshold()?;
                let entry = self.db.insert_sell_watch(&item, threshold)?;
                tracing::info!(item = %entry.item.name, threshold, "added sell-watch entry");
                Ok(entry.item)
            }
            Collection::Inventory | Collection::Wanted => {
                let inserted = self.db.insert_item(collection, &item)?;
                tracing::info!(item = %inserted.name, collection = collection.as_str(), "added item");
                Ok(inserted)
            }
        }
    }

    pub fn remove_item(&self, collection: Collection, name: &str) -> AppResult<bool> {
        let removed = self.db.remove_item(collection, name)?;
        if removed {
            tracing::info!(item = name, collection = collection.as_str(), "removed item");
        }
        Ok(removed)
    }

    /// Partial update: blank form fields keep their prior values.
    pub fn update_item(&self, collection: Collection, name: &str, form: &ItemForm) -> AppResult<Item> {
        let update = form.parse_update()?;
        self.db.update_item(collection, name, &update)
    }

    pub fn list_items(&self, collection: Collection) -> AppResult<Vec<Item>> {
        self.db.list_items(collection)
    }

    pub fn list_sell_watch(&self) -> AppResult<Vec<SellWatchEntry>> {
        self.db.list_sell_watch()
    }

    pub fn get_item(&self, collection: Collection, name: &str) -> AppResult<Option<Item>> {
        self.db.get_item(collection, name)
    }

    pub fn move_wanted_to_inventory(&self, name: &str) -> AppResult<Item> {
        let moved = self.db.move_wanted_to_inventory(name)?;
        tracing::info!(item = %moved.name, "moved wanted item into inventory");
        Ok(moved)
    }

    /// Looks up a fresh price for every wanted item and stores the ones that
    /// resolve. Returns the names that were updated; unavailable lookups are
    /// skipped.
    pub fn refresh_wanted_prices(&self) -> AppResult<Vec<String>> {
        let mut updated = Vec::new();
        for item in self.db.list_items(Collection::Wanted)? {
            match self.price_source.lookup(&item.name) {
                Some(price) => {
                    self.db.set_item_price(Collection::Wanted, &item.name, price)?;
                    tracing::info!(item = %item.name, price, "refreshed wanted price");
                    updated.push(item.name);
                }
                None => {
                    tracing::warn!(item = %item.name, "no price found, keeping previous value");
                }
            }
        }
        Ok(updated)
    }

    /// Checks every sell-watch entry against the price source. Triggered
    /// entries are both returned and pushed through the notifier.
    pub fn check_sell_watch(&self) -> AppResult<Vec<TriggeredAlert>> {
        let entries = self.db.list_sell_watch()?;
        let triggered = check_sell_watch(&entries, self.price_source.as_ref());
        for alert in &triggered {
            self.notifier.notify(alert);
        }
        Ok(triggered)
    }

    pub fn total_inventory_value(&self) -> AppResult<f64> {
        self.db.total_inventory_value()
    }
}
