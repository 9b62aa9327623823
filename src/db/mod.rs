use crate::errors::{AppError, AppResult};
use crate::models::{Collection, Item, ItemUpdate, NewItem, SellWatchEntry};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

const SCHEMA_SQL: &str = include_str!("schema.sql");

const ITEM_COLUMNS: &str = "id, name, category, quantity, price, image_path, year, location, created_at";

/// Persistence gateway over the three collection tables. One connection,
/// one caller; every public method is a single statement or one transaction.
#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl Database {
    pub fn new(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(AppError::from)?;
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Inserts into inventory or wanted. Sell-watch rows carry a threshold
    /// and go through [`Database::insert_sell_watch`].
    pub fn insert_item(&self, collection: Collection, item: &NewItem) -> AppResult<Item> {
        if collection == Collection::SellWatch {
            return Err(AppError::Internal(
                "sell-watch inserts require a threshold; use insert_sell_watch".to_string(),
            ));
        }
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let conn = self.lock_conn()?;
        conn.execute(
            &format!(
                "INSERT INTO {} (id, name, category, quantity, price, image_path, year, location, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                collection.as_str()
            ),
            params![
                id,
                item.name,
                item.category,
                item.quantity,
                item.price,
                item.image_path,
                item.year,
                item.location,
                now.to_rfc3339()
            ],
        )?;

        Ok(materialize(id, item, now))
    }

    pub fn insert_sell_watch(&self, item: &NewItem, threshold: f64) -> AppResult<SellWatchEntry> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO sell_watch (id, name, category, quantity, price, image_path, year, location, threshold, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                id,
                item.name,
                item.category,
                item.quantity,
                item.price,
                item.image_path,
                item.year,
                item.location,
                threshold,
                now.to_rfc3339()
            ],
        )?;

        Ok(SellWatchEntry {
            item: materialize(id, item, now),
            threshold,
        })
    }

    /// Returns false when no row carried that name.
    pub fn remove_item(&self, collection: Collection, name: &str) -> AppResult<bool> {
        let conn = self.lock_conn()?;
        let changed = conn.execute(
            &format!("DELETE FROM {} WHERE name = ?1", collection.as_str()),
            [name],
        )?;
        Ok(changed > 0)
    }

    /// Applies only the supplied fields; the rest keep their prior values.
    pub fn update_item(&self, collection: Collection, name: &str, update: &ItemUpdate) -> AppResult<Item> {
        if update.threshold.is_some() && collection != Collection::SellWatch {
            return Err(AppError::Validation(
                "threshold only applies to the sell-watch list".to_string(),
            ));
        }
        if update.is_empty() {
            return self.require_item(collection, name);
        }

        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(category) = &update.category {
            sets.push("category = ?");
            values.push(Value::Text(category.clone()));
        }
        if let Some(quantity) = update.quantity {
            sets.push("quantity = ?");
            values.push(Value::Integer(i64::from(quantity)));
        }
        if let Some(price) = update.price {
            sets.push("price = ?");
            values.push(Value::Real(price));
        }
        if let Some(image_path) = &update.image_path {
            sets.push("image_path = ?");
            values.push(Value::Text(image_path.clone()));
        }
        if let Some(year) = &update.year {
            sets.push("year = ?");
            values.push(Value::Text(year.clone()));
        }
        if let Some(location) = &update.location {
            sets.push("location = ?");
            values.push(Value::Text(location.clone()));
        }
        if let Some(threshold) = update.threshold {
            sets.push("threshold = ?");
            values.push(Value::Real(threshold));
        }
        values.push(Value::Text(name.to_string()));

        {
            let conn = self.lock_conn()?;
            let changed = conn.execute(
                &format!(
                    "UPDATE {} SET {} WHERE name = ?",
                    collection.as_str(),
                    sets.join(", ")
                ),
                rusqlite::params_from_iter(values),
            )?;
            if changed == 0 {
                return Err(AppError::NotFound(format!(
                    "no item named '{}' in {}",
                    name,
                    collection.as_str()
                )));
            }
        }

        self.require_item(collection, name)
    }

    /// Inventory comes back sorted by (category, year, name); the other
    /// collections keep insertion order.
    pub fn list_items(&self, collection: Collection) -> AppResult<Vec<Item>> {
        let order = match collection {
            Collection::Inventory => "category ASC, year ASC, name ASC",
            Collection::Wanted | Collection::SellWatch => "created_at ASC, id ASC",
        };

        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} ORDER BY {}",
            ITEM_COLUMNS,
            collection.as_str(),
            order
        ))?;
        let rows = stmt.query_map([], parse_item_row)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    pub fn list_sell_watch(&self) -> AppResult<Vec<SellWatchEntry>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {}, threshold FROM sell_watch ORDER BY created_at ASC, id ASC",
            ITEM_COLUMNS
        ))?;
        let rows = stmt.query_map([], parse_sell_watch_row)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    pub fn get_item(&self, collection: Collection, name: &str) -> AppResult<Option<Item>> {
        let conn = self.lock_conn()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM {} WHERE name = ?1",
                ITEM_COLUMNS,
                collection.as_str()
            ),
            [name],
            parse_item_row,
        )
        .optional()
        .map_err(AppError::from)
    }

    pub fn get_sell_watch(&self, name: &str) -> AppResult<Option<SellWatchEntry>> {
        let conn = self.lock_conn()?;
        conn.query_row(
            &format!(
                "SELECT {}, threshold FROM sell_watch WHERE name = ?1",
                ITEM_COLUMNS
            ),
            [name],
            parse_sell_watch_row,
        )
        .optional()
        .map_err(AppError::from)
    }

    /// Insert into inventory and delete from wanted under one transaction:
    /// either both happen or neither does.
    pub fn move_wanted_to_inventory(&self, name: &str) -> AppResult<Item> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        let item: Option<Item> = tx
            .query_row(
                &format!("SELECT {} FROM wanted WHERE name = ?1", ITEM_COLUMNS),
                [name],
                parse_item_row,
            )
            .optional()?;
        let item = item.ok_or_else(|| {
            AppError::NotFound(format!("no item named '{}' in wanted", name))
        })?;

        let now = Utc::now();
        tx.execute(
            "INSERT INTO inventory (id, name, category, quantity, price, image_path, year, location, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                item.id,
                item.name,
                item.category,
                item.quantity,
                item.price,
                item.image_path,
                item.year,
                item.location,
                now.to_rfc3339()
            ],
        )?;
        tx.execute("DELETE FROM wanted WHERE name = ?1", [name])?;
        tx.commit()?;

        Ok(Item { created_at: now, ..item })
    }

    /// Sum of quantity × price over the inventory.
    pub fn total_inventory_value(&self) -> AppResult<f64> {
        let conn = self.lock_conn()?;
        let total: f64 = conn.query_row(
            "SELECT COALESCE(SUM(quantity * price), 0.0) FROM inventory",
            [],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// Used by the wanted-list price refresh.
    pub fn set_item_price(&self, collection: Collection, name: &str, price: f64) -> AppResult<()> {
        let conn = self.lock_conn()?;
        let changed = conn.execute(
            &format!("UPDATE {} SET price = ?1 WHERE name = ?2", collection.as_str()),
            params![price, name],
        )?;
        if changed == 0 {
            return Err(AppError::NotFound(format!(
                "no item named '{}' in {}",
                name,
                collection.as_str()
            )));
        }
        Ok(())
    }

    fn require_item(&self, collection: Collection, name: &str) -> AppResult<Item> {
        self.get_item(collection, name)?.ok_or_else(|| {
            AppError::NotFound(format!("no item named '{}' in {}", name, collection.as_str()))
        })
    }

    fn lock_conn(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("database mutex poisoned".to_string()))
    }
}

fn materialize(id: String, item: &NewItem, created_at: DateTime<Utc>) -> Item {
    Item {
        id,
        name: item.name.clone(),
        category: item.category.clone(),
        quantity: item.quantity,
        price: item.price,
        image_path: item.image_path.clone(),
        year: item.year.clone(),
        location: item.location.clone(),
        created_at,
    }
}

fn parse_item_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        quantity: row.get(3)?,
        price: row.get(4)?,
        image_path: row.get(5)?,
        year: row.get(6)?,
        location: row.get(7)?,
        created_at: parse_time(&row.get::<_, String>(8)?)?,
    })
}

fn parse_sell_watch_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SellWatchEntry> {
    Ok(SellWatchEntry {
        item: parse_item_row(row)?,
        threshold: row.get(9)?,
    })
}

fn parse_time(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, error.to_string())),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::Database;
    use crate::errors::AppError;
    use crate::models::{Collection, ItemUpdate, NewItem};

    fn open_db(dir: &tempfile::TempDir) -> Database {
        Database::new(&dir.path().join("test.db")).expect("db")
    }

    fn stamp(name: &str) -> NewItem {
        NewItem {
            name: name.to_string(),
            category: "Stamps".to_string(),
            quantity: 2,
            price: 10.0,
            image_path: None,
            year: Some("1990".to_string()),
            location: None,
        }
    }

    #[test]
    fn insert_then_list_returns_identical_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = open_db(&dir);

        let inserted = db.insert_item(Collection::Inventory, &stamp("Stamp A")).expect("insert");
        let listed = db.list_items(Collection::Inventory).expect("list");

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0], inserted);
        assert_eq!(listed[0].quantity, 2);
        assert_eq!(listed[0].price, 10.0);
        assert_eq!(listed[0].year.as_deref(), Some("1990"));
    }

    #[test]
    fn duplicate_name_in_same_collection_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = open_db(&dir);

        db.insert_item(Collection::Inventory, &stamp("Stamp A")).expect("insert");
        let err = db.insert_item(Collection::Inventory, &stamp("Stamp A")).unwrap_err();
        assert!(matches!(err, AppError::DuplicateKey(_)));
    }

    #[test]
    fn same_name_may_live_in_every_collection() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = open_db(&dir);

        db.insert_item(Collection::Inventory, &stamp("Stamp A")).expect("inventory");
        db.insert_item(Collection::Wanted, &stamp("Stamp A")).expect("wanted");
        db.insert_sell_watch(&stamp("Stamp A"), 25.0).expect("sell watch");

        assert!(db.get_item(Collection::Inventory, "Stamp A").expect("get").is_some());
        assert!(db.get_item(Collection::Wanted, "Stamp A").expect("get").is_some());
        assert!(db.get_sell_watch("Stamp A").expect("get").is_some());
    }

    #[test]
    fn remove_then_get_returns_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = open_db(&dir);

        db.insert_item(Collection::Wanted, &stamp("Stamp A")).expect("insert");
        assert!(db.remove_item(Collection::Wanted, "Stamp A").expect("remove"));
        assert!(db.get_item(Collection::Wanted, "Stamp A").expect("get").is_none());

        // removing again is a quiet no-op
        assert!(!db.remove_item(Collection::Wanted, "Stamp A").expect("remove"));
    }

    #[test]
    fn partial_update_touches_only_supplied_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = open_db(&dir);

        db.insert_item(Collection::Inventory, &stamp("Stamp A")).expect("insert");
        let updated = db
            .update_item(
                Collection::Inventory,
                "Stamp A",
                &ItemUpdate {
                    price: Some(12.5),
                    ..ItemUpdate::default()
                },
            )
            .expect("update");

        assert_eq!(updated.price, 12.5);
        assert_eq!(updated.quantity, 2);
        assert_eq!(updated.category, "Stamps");
        assert_eq!(updated.year.as_deref(), Some("1990"));
    }

    #[test]
    fn update_of_absent_name_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = open_db(&dir);

        let err = db
            .update_item(
                Collection::Inventory,
                "Ghost",
                &ItemUpdate {
                    price: Some(1.0),
                    ..ItemUpdate::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn threshold_update_is_rejected_outside_sell_watch() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = open_db(&dir);

        db.insert_item(Collection::Inventory, &stamp("Stamp A")).expect("insert");
        let err = db
            .update_item(
                Collection::Inventory,
                "Stamp A",
                &ItemUpdate {
                    threshold: Some(50.0),
                    ..ItemUpdate::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn inventory_listing_is_sorted_by_category_year_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = open_db(&dir);

        let mut coin = stamp("Old Penny");
        coin.category = "Coins".to_string();
        coin.year = Some("1890".to_string());

        let mut late_stamp = stamp("Stamp Z");
        late_stamp.year = Some("2001".to_string());

        db.insert_item(Collection::Inventory, &late_stamp).expect("insert");
        db.insert_item(Collection::Inventory, &stamp("Stamp B")).expect("insert");
        db.insert_item(Collection::Inventory, &coin).expect("insert");
        db.insert_item(Collection::Inventory, &stamp("Stamp A")).expect("insert");

        let names: Vec<String> = db
            .list_items(Collection::Inventory)
            .expect("list")
            .into_iter()
            .map(|item| item.name)
            .collect();
        assert_eq!(names, vec!["Old Penny", "Stamp A", "Stamp B", "Stamp Z"]);
    }

    #[test]
    fn sell_watch_round_trip_keeps_threshold() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = open_db(&dir);

        let entry = db.insert_sell_watch(&stamp("Coin X"), 50.0).expect("insert");
        assert_eq!(entry.threshold, 50.0);

        let listed = db.list_sell_watch().expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0], entry);

        let updated = db
            .update_item(
                Collection::SellWatch,
                "Coin X",
                &ItemUpdate {
                    threshold: Some(60.0),
                    ..ItemUpdate::default()
                },
            )
            .expect("update");
        assert_eq!(updated.name, "Coin X");
        let reread = db.get_sell_watch("Coin X").expect("get").expect("entry");
        assert_eq!(reread.threshold, 60.0);
    }

    #[test]
    fn move_wanted_to_inventory_moves_exactly_one_row() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = open_db(&dir);

        db.insert_item(Collection::Wanted, &stamp("Stamp A")).expect("insert");
        let moved = db.move_wanted_to_inventory("Stamp A").expect("move");
        assert_eq!(moved.name, "Stamp A");

        assert!(db.get_item(Collection::Wanted, "Stamp A").expect("get").is_none());
        assert!(db.get_item(Collection::Inventory, "Stamp A").expect("get").is_some());
    }

    #[test]
    fn failed_move_leaves_wanted_row_in_place() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = open_db(&dir);

        db.insert_item(Collection::Inventory, &stamp("Stamp A")).expect("insert inventory");
        db.insert_item(Collection::Wanted, &stamp("Stamp A")).expect("insert wanted");

        let err = db.move_wanted_to_inventory("Stamp A").unwrap_err();
        assert!(matches!(err, AppError::DuplicateKey(_)));

        // the transaction rolled back; the wanted row survived
        assert!(db.get_item(Collection::Wanted, "Stamp A").expect("get").is_some());
    }

    #[test]
    fn move_of_absent_name_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = open_db(&dir);

        let err = db.move_wanted_to_inventory("Ghost").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn total_inventory_value_sums_quantity_times_price() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = open_db(&dir);

        assert_eq!(db.total_inventory_value().expect("empty"), 0.0);

        db.insert_item(Collection::Inventory, &stamp("Stamp A")).expect("insert");
        let mut coin = stamp("Coin X");
        coin.quantity = 1;
        coin.price = 5.5;
        db.insert_item(Collection::Inventory, &coin).expect("insert");

        let total = db.total_inventory_value().expect("total");
        assert!((total - 25.5).abs() < 1e-9);
    }

    #[test]
    fn set_item_price_updates_single_column() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = open_db(&dir);

        db.insert_item(Collection::Wanted, &stamp("Stamp A")).expect("insert");
        db.set_item_price(Collection::Wanted, "Stamp A", 42.0).expect("set price");

        let item = db.get_item(Collection::Wanted, "Stamp A").expect("get").expect("item");
        assert_eq!(item.price, 42.0);
        assert_eq!(item.quantity, 2);

        let err = db.set_item_price(Collection::Wanted, "Ghost", 1.0).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
