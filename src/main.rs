use anyhow::Context;
use collection_tracker::{
    AppConfig, Collection, Database, Item, ItemForm, LogNotifier, SellWatchEntry, TrackerCore,
    WebPriceSource,
};
use std::io::{self, BufRead, Write};

fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env();

    let data_dir = config
        .db_path
        .parent()
        .map(std::path::Path::to_path_buf)
        .unwrap_or_else(collection_tracker::config::default_data_dir);
    if let Err(error) = collection_tracker::init_tracing(&data_dir) {
        eprintln!("warning: logging unavailable: {}", error);
    }

    let db = Database::new(&config.db_path)
        .with_context(|| format!("open database at {}", config.db_path.display()))?;
    let price_source =
        WebPriceSource::new(&config.price_url, config.price_timeout).context("build price source")?;
    let core = TrackerCore::new(db, Box::new(price_source), Box::new(LogNotifier));

    println!("collection tracker — type 'help' for commands");
    repl(&core)
}

fn repl(core: &TrackerCore) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (command, rest) = match line.split_once(' ') {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        let outcome = match command {
            "help" => {
                print_help();
                Ok(())
            }
            "quit" | "exit" => return Ok(()),
            "list" => cmd_list(core, rest),
            "get" => cmd_get(core, rest),
            "add" => cmd_add(core, rest),
            "update" => cmd_update(core, rest),
            "remove" => cmd_remove(core, rest),
            "move" => cmd_move(core, rest),
            "check" => cmd_check(core),
            "refresh" => cmd_refresh(core),
            "value" => cmd_value(core),
            other => {
                println!("unknown command '{}'; type 'help'", other);
                Ok(())
            }
        };

        if let Err(error) = outcome {
            println!("error: {}", error);
        }
    }
}

fn print_help() {
    println!("commands:");
    println!("  list <inventory|wanted|sell>");
    println!("  get <inventory|wanted|sell> <name>");
    println!("  add <inventory|wanted|sell> name=.., category=.., quantity=.., price=..");
    println!("      optional: image=.., year=.., location=.., threshold=.. (sell only)");
    println!("  update <inventory|wanted|sell> name=.., <field>=.. (blank fields keep prior values)");
    println!("  remove <inventory|wanted|sell> <name>");
    println!("  move <name>            move a wanted item into inventory");
    println!("  refresh                look up fresh prices for the wanted list");
    println!("  check                  check sell-watch entries against their thresholds");
    println!("  value                  total inventory value");
    println!("  quit");
}

fn cmd_list(core: &TrackerCore, rest: &str) -> anyhow::Result<()> {
    let collection = Collection::parse(rest)?;
    if collection == Collection::SellWatch {
        print_sell_watch(&core.list_sell_watch()?);
    } else {
        print_items(&core.list_items(collection)?);
    }
    Ok(())
}

fn cmd_get(core: &TrackerCore, rest: &str) -> anyhow::Result<()> {
    let (collection, name) = split_collection_and_name(rest)?;
    match core.get_item(collection, name)? {
        Some(item) => print_items(std::slice::from_ref(&item)),
        None => println!("no item named '{}' in {}", name, collection.as_str()),
    }
    Ok(())
}

fn cmd_add(core: &TrackerCore, rest: &str) -> anyhow::Result<()> {
    let (collection, pairs) = rest
        .split_once(' ')
        .context("usage: add <collection> name=.., ..")?;
    let collection = Collection::parse(collection)?;
    let (_, form) = parse_form_pairs(pairs)?;
    let item = core.add_item(collection, &form)?;
    println!("added '{}' to {}", item.name, collection.as_str());
    Ok(())
}

fn cmd_update(core: &TrackerCore, rest: &str) -> anyhow::Result<()> {
    let (collection, pairs) = rest
        .split_once(' ')
        .context("usage: update <collection> name=.., <field>=..")?;
    let collection = Collection::parse(collection)?;
    let (name, form) = parse_form_pairs(pairs)?;
    let name = name.context("update needs a name=.. pair to identify the item")?;
    let item = core.update_item(collection, &name, &form)?;
    println!("updated '{}'", item.name);
    Ok(())
}

fn cmd_remove(core: &TrackerCore, rest: &str) -> anyhow::Result<()> {
    let (collection, name) = split_collection_and_name(rest)?;
    if core.remove_item(collection, name)? {
        println!("removed '{}' from {}", name, collection.as_str());
    } else {
        println!("no item named '{}' in {}", name, collection.as_str());
    }
    Ok(())
}

fn cmd_move(core: &TrackerCore, rest: &str) -> anyhow::Result<()> {
    if rest.is_empty() {
        anyhow::bail!("usage: move <name>");
    }
    let item = core.move_wanted_to_inventory(rest)?;
    println!("moved '{}' into inventory", item.name);
    Ok(())
}

fn cmd_check(core: &TrackerCore) -> anyhow::Result<()> {
    let triggered = core.check_sell_watch()?;
    if triggered.is_empty() {
        println!("no sell-watch entries triggered");
    } else {
        for alert in &triggered {
            println!(
                "{} is now ${:.2}, meeting the ${:.2} threshold",
                alert.name, alert.current_price, alert.threshold
            );
        }
    }
    Ok(())
}

fn cmd_refresh(core: &TrackerCore) -> anyhow::Result<()> {
    let updated = core.refresh_wanted_prices()?;
    if updated.is_empty() {
        println!("no wanted prices could be refreshed");
    } else {
        println!("refreshed prices for: {}", updated.join(", "));
    }
    Ok(())
}

fn cmd_value(core: &TrackerCore) -> anyhow::Result<()> {
    println!("total inventory value: ${:.2}", core.total_inventory_value()?);
    Ok(())
}

fn split_collection_and_name(rest: &str) -> anyhow::Result<(Collection, &str)> {
    let (collection, name) = rest
        .split_once(' ')
        .context("expected: <collection> <name>")?;
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("expected: <collection> <name>");
    }
    Ok((Collection::parse(collection)?, name))
}

/// Parses "key=value, key=value" pairs into an ItemForm. Unknown keys are an
/// error so typos do not silently drop a field.
fn parse_form_pairs(pairs: &str) -> anyhow::Result<(Option<String>, ItemForm)> {
    let mut form = ItemForm::default();
    let mut name = None;

    for pair in pairs.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("expected key=value, got '{}'", pair))?;
        let value = value.trim().to_string();
        match key.trim() {
            "name" => {
                name = Some(value.clone());
                form.name = value;
            }
            "category" => form.category = value,
            "quantity" => form.quantity = value,
            "price" => form.price = value,
            "image" | "image_path" => form.image_path = value,
            "year" => form.year = value,
            "location" => form.location = value,
            "threshold" => form.threshold = value,
            other => anyhow::bail!("unknown field '{}'", other),
        }
    }

    Ok((name, form))
}

fn print_items(items: &[Item]) {
    if items.is_empty() {
        println!("(empty)");
        return;
    }
    println!(
        "{:<28} {:<16} {:>8} {:>10}  {:<6} {:<14} {}",
        "name", "category", "qty", "price", "year", "location", "image"
    );
    for item in items {
        println!(
            "{:<28} {:<16} {:>8} {:>10.2}  {:<6} {:<14} {}",
            item.name,
            item.category,
            item.quantity,
            item.price,
            item.year.as_deref().unwrap_or("-"),
            item.location.as_deref().unwrap_or("-"),
            item.image_path.as_deref().unwrap_or("-"),
        );
    }
}

fn print_sell_watch(entries: &[SellWatchEntry]) {
    if entries.is_empty() {
        println!("(empty)");
        return;
    }
    println!(
        "{:<28} {:<16} {:>8} {:>10} {:>10}",
        "name", "category", "qty", "price", "threshold"
    );
    for entry in entries {
        println!(
            "{:<28} {:<16} {:>8} {:>10.2} {:>10.2}",
            entry.item.name, entry.item.category, entry.item.quantity, entry.item.price, entry.threshold
        );
    }
}
