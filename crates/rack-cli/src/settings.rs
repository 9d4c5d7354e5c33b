//! `config` sub-commands: the same edits the admin page makes, from a shell.

use clap::{Subcommand, ValueEnum};
use rack_core::store::DEFAULT_SHEET_NAME;
use rack_core::{
    check_columns, duplicate_columns, AppConfig, ConfigStore, SemanticField, StoredConfig,
};
use rack_source::SheetRef;

use crate::books::sheet_client;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FieldArg {
    Identifier,
    Name,
    Price,
    Location,
    Image,
}

impl From<FieldArg> for SemanticField {
    fn from(arg: FieldArg) -> Self {
        match arg {
            FieldArg::Identifier => SemanticField::Identifier,
            FieldArg::Name => SemanticField::DisplayName,
            FieldArg::Price => SemanticField::Price,
            FieldArg::Location => SemanticField::Location,
            FieldArg::Image => SemanticField::ImageRef,
        }
    }
}

/// Sub-commands available under `config`.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the stored source and mapping
    Show,
    /// Point the lookup at a spreadsheet
    Source {
        /// Share URL of the spreadsheet
        #[arg(long)]
        url: String,
        /// Tab to read
        #[arg(long, default_value = DEFAULT_SHEET_NAME)]
        sheet: String,
    },
    /// Assign sheet columns to book fields; fields not given keep their column
    Map {
        #[arg(long)]
        identifier: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        price: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        image: Option<String>,
    },
    /// Clear the column assigned to a book field
    Unmap {
        #[arg(value_enum)]
        field: FieldArg,
    },
}

pub(crate) async fn run(
    config: &AppConfig,
    store: &impl ConfigStore,
    command: ConfigCommands,
) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Show => {
            let stored = store.load()?;
            println!("{}", serde_json::to_string_pretty(&stored)?);
            for warning in mapping_warnings(config, &stored) {
                eprintln!("warning: {warning}");
            }
        }
        ConfigCommands::Source { url, sheet } => {
            let sheet_ref = SheetRef::from_url(&url, &sheet)?;
            let mut stored = store.load()?;
            stored.sheet_url = url;
            stored.sheet_name = sheet_ref.sheet_name.clone();

            match sheet_client(config)?.fetch_sheet(&sheet_ref).await {
                Ok(table) => println!("sheet columns: {}", table.columns().join(", ")),
                Err(e) => eprintln!("warning: could not read the sheet yet: {e}"),
            }
            store.save(&stored)?;
            tracing::info!(sheet_id = %sheet_ref.sheet_id, "sheet source saved");
            println!("source saved");
        }
        ConfigCommands::Map {
            identifier,
            name,
            price,
            location,
            image,
        } => {
            let assignments = [
                (SemanticField::Identifier, identifier),
                (SemanticField::DisplayName, name),
                (SemanticField::Price, price),
                (SemanticField::Location, location),
                (SemanticField::ImageRef, image),
            ];
            if assignments.iter().all(|(_, column)| column.is_none()) {
                anyhow::bail!(
                    "give at least one of --identifier, --name, --price, --location, --image"
                );
            }

            let mut stored = store.load()?;
            for (field, column) in assignments {
                if column.is_some() {
                    stored.mapping.set(field, column);
                }
            }
            verify_columns(config, &stored).await?;
            store.save(&stored)?;
            println!("mapping saved");
            for warning in mapping_warnings(config, &stored) {
                eprintln!("warning: {warning}");
            }
        }
        ConfigCommands::Unmap { field } => {
            let mut stored = store.load()?;
            stored.mapping.set(field.into(), None);
            store.save(&stored)?;
            println!("mapping saved");
            for warning in mapping_warnings(config, &stored) {
                eprintln!("warning: {warning}");
            }
        }
    }
    Ok(())
}

/// Rejects a mapping naming a column the sheet does not have. An unreachable
/// sheet only warns.
async fn verify_columns(config: &AppConfig, stored: &StoredConfig) -> anyhow::Result<()> {
    let Ok(sheet) = SheetRef::from_config(stored) else {
        return Ok(());
    };
    match sheet_client(config)?.fetch_sheet(&sheet).await {
        Ok(table) => check_columns(&table, &stored.mapping)?,
        Err(e) => eprintln!("warning: could not verify columns: {e}"),
    }
    Ok(())
}

pub(crate) fn mapping_warnings(config: &AppConfig, stored: &StoredConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let missing: Vec<&str> = config
        .field_mapper()
        .mandatory_fields()
        .into_iter()
        .filter(|f| stored.mapping.column(*f).is_none())
        .map(SemanticField::as_str)
        .collect();
    if !missing.is_empty() {
        warnings.push(format!("no column set for {}", missing.join(", ")));
    }
    let dupes = duplicate_columns(&stored.mapping);
    if !dupes.is_empty() {
        warnings.push(format!(
            "column used for several fields: {}",
            dupes.join(", ")
        ));
    }
    warnings
}
