//! Read-only book commands. Each run fetches the sheet fresh; the CLI keeps
//! no cache between invocations.

use anyhow::Context;
use rack_core::{
    filter, filter_by_identifier, suggest, AppConfig, ConfigStore, EmptyQuery, MappedRow,
    RawTable, Scope, StoredConfig,
};
use rack_source::{SheetClient, SheetRef};

const NAME_WIDTH: usize = 40;

pub(crate) fn sheet_client(config: &AppConfig) -> anyhow::Result<SheetClient> {
    SheetClient::with_base_url(
        config.fetch_timeout_secs,
        &config.fetch_user_agent,
        config.fetch_max_retries,
        config.fetch_retry_backoff_base_ms,
        &config.sheets_base_url,
    )
    .context("failed to build sheet client")
}

/// Loads the stored config and fetches the sheet it points at.
pub(crate) async fn load_table(
    config: &AppConfig,
    store: &impl ConfigStore,
) -> anyhow::Result<(StoredConfig, RawTable)> {
    let stored = store.load()?;
    let sheet = SheetRef::from_config(&stored)
        .context("no usable sheet source; set one with `config source`")?;
    let table = sheet_client(config)?.fetch_sheet(&sheet).await?;
    tracing::debug!(
        sheet_id = %sheet.sheet_id,
        rows = table.len(),
        "fetched sheet"
    );
    Ok((stored, table))
}

async fn load_rows(config: &AppConfig, store: &impl ConfigStore) -> anyhow::Result<Vec<MappedRow>> {
    let (stored, table) = load_table(config, store).await?;
    config
        .field_mapper()
        .apply(&table, &stored.mapping)
        .context("stored mapping does not fit the sheet; fix it with `config map`")
}

/// Shortens `text` to `width` characters, marking the cut with `...`.
pub(crate) fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{kept}...")
}

pub(crate) fn book_header() -> String {
    format!(
        "{:<8}{:<w$}  {:<10}{}",
        "NUMBER",
        "NAME",
        "PRICE",
        "LOCATION",
        w = NAME_WIDTH
    )
}

pub(crate) fn book_line(row: &MappedRow) -> String {
    let price = if row.price().is_empty() {
        "-"
    } else {
        row.price()
    };
    format!(
        "{:<8}{:<w$}  {:<10}{}",
        row.identifier(),
        truncate(row.display_name(), NAME_WIDTH),
        price,
        row.location(),
        w = NAME_WIDTH
    )
}

fn print_books<'a>(rows: impl IntoIterator<Item = &'a MappedRow>) {
    println!("{}", book_header());
    for row in rows {
        println!("{}", book_line(row));
    }
}

pub(crate) async fn run_search(
    config: &AppConfig,
    store: &impl ConfigStore,
    query: &str,
    scope: Scope,
    show_all: bool,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let empty_query = if show_all {
        EmptyQuery::ShowAll
    } else {
        config.empty_query
    };
    let rows = load_rows(config, store).await?;
    let results = filter(&rows, query, scope, empty_query);
    let page = config.page_window(limit).page(&results);

    if page.total == 0 {
        println!("no books found");
        return Ok(());
    }

    print_books(page.items.iter().copied());
    println!();
    println!("showing {} of {} books", page.items.len(), page.total);
    if let Some(next) = page.next_limit {
        println!("run again with --limit {next} to see more");
    }
    Ok(())
}

pub(crate) async fn run_lookup(
    config: &AppConfig,
    store: &impl ConfigStore,
    identifier: &str,
) -> anyhow::Result<()> {
    let rows = load_rows(config, store).await?;
    let found = filter_by_identifier(&rows, identifier);
    if found.is_empty() {
        println!("no book with number {identifier}");
        return Ok(());
    }

    for row in found {
        println!("Number:   {}", row.identifier());
        println!("Name:     {}", row.display_name());
        println!("Price:    {}", row.price());
        println!("Location: {}", row.location());
        if !row.image_ref().is_empty() {
            println!("Image:    {}", row.image_ref());
        }
        println!();
    }
    Ok(())
}

pub(crate) async fn run_suggest(
    config: &AppConfig,
    store: &impl ConfigStore,
    query: &str,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let rows = load_rows(config, store).await?;
    let limit = limit.unwrap_or(config.suggestion_limit);
    for suggestion in suggest(&rows, query, limit) {
        println!("{} - {}", suggestion.identifier, suggestion.display_name);
    }
    Ok(())
}

pub(crate) async fn run_columns(
    config: &AppConfig,
    store: &impl ConfigStore,
) -> anyhow::Result<()> {
    let (stored, table) = load_table(config, store).await?;
    println!("{} columns, {} rows", table.columns().len(), table.len());
    for column in table.columns() {
        let used_by: Vec<&str> = stored
            .mapping
            .assigned()
            .filter(|(_, c)| *c == column.as_str())
            .map(|(field, _)| field.as_str())
            .collect();
        if used_by.is_empty() {
            println!("  {column}");
        } else {
            println!("  {column}  <- {}", used_by.join(", "));
        }
    }
    Ok(())
}

pub(crate) async fn run_raw(
    config: &AppConfig,
    store: &impl ConfigStore,
    limit: usize,
) -> anyhow::Result<()> {
    let (_, table) = load_table(config, store).await?;
    println!("{}", table.columns().join("\t"));
    for row in table.head(limit).rows() {
        println!("{}", row.join("\t"));
    }
    if table.len() > limit {
        println!("... {} more rows", table.len() - limit);
    }
    Ok(())
}

pub(crate) async fn run_preview(
    config: &AppConfig,
    store: &impl ConfigStore,
    limit: usize,
) -> anyhow::Result<()> {
    let rows = load_rows(config, store).await?;
    print_books(rows.iter().take(limit));
    println!();
    println!("{} books mapped", rows.len());
    Ok(())
}
