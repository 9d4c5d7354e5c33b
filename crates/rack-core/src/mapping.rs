//! Field mapper: turns a schema-less [`RawTable`] into typed [`MappedRow`]s
//! according to an admin-chosen [`FieldMapping`].
//!
//! Validation happens before any row is touched, in two passes:
//!
//! 1. every mandatory field has a column assigned, else
//!    [`MappingError::MappingIncomplete`];
//! 2. every assigned column exists in the table, else
//!    [`MappingError::ColumnNotFound`].
//!
//! Rows keep their input order and count. Each cell is cleaned with
//! [`clean_cell`]; the image field is also passed through the
//! [`HostLinkRewriter`].

use std::collections::BTreeMap;

use crate::error::MappingError;
use crate::fields::{FieldMapping, SemanticField};
use crate::host_link::HostLinkRewriter;
use crate::normalize::clean_cell;
use crate::row::MappedRow;
use crate::table::RawTable;

/// Applies field mappings with a fixed policy.
#[derive(Debug, Clone, Default)]
pub struct FieldMapper {
    price_required: bool,
    rewriter: HostLinkRewriter,
}

impl FieldMapper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes [`SemanticField::Price`] mandatory.
    #[must_use]
    pub fn price_required(mut self, required: bool) -> Self {
        self.price_required = required;
        self
    }

    #[must_use]
    pub fn image_host(mut self, rewriter: HostLinkRewriter) -> Self {
        self.rewriter = rewriter;
        self
    }

    /// Mandatory fields in canonical order.
    #[must_use]
    pub fn mandatory_fields(&self) -> Vec<SemanticField> {
        SemanticField::ALL
            .into_iter()
            .filter(|f| match f {
                SemanticField::Identifier
                | SemanticField::DisplayName
                | SemanticField::Location => true,
                SemanticField::Price => self.price_required,
                SemanticField::ImageRef => false,
            })
            .collect()
    }

    /// Validates `mapping` against `raw` and maps every row.
    ///
    /// # Errors
    ///
    /// - [`MappingError::MappingIncomplete`] naming every unset mandatory field.
    /// - [`MappingError::ColumnNotFound`] for the first assigned column absent
    ///   from `raw`, listing all of `raw`'s columns.
    pub fn apply(
        &self,
        raw: &RawTable,
        mapping: &FieldMapping,
    ) -> Result<Vec<MappedRow>, MappingError> {
        let missing: Vec<SemanticField> = self
            .mandatory_fields()
            .into_iter()
            .filter(|f| mapping.column(*f).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(MappingError::MappingIncomplete { missing });
        }

        let indices = column_indices(raw, mapping)?;

        let rows = (0..raw.len())
            .map(|row| {
                let value = |slot: usize| -> String {
                    indices[slot].map_or_else(String::new, |col| clean_cell(raw.cell(row, col)))
                };
                let image = self.rewriter.rewrite(&value(4));
                MappedRow::new(value(0), value(1), value(2), value(3), image)
            })
            .collect();

        Ok(rows)
    }
}

/// Checks that every assigned column exists in `raw`, without requiring the
/// mandatory fields to be set. Used when saving a partially built mapping.
///
/// # Errors
///
/// [`MappingError::ColumnNotFound`] for the first assigned column absent from
/// `raw`.
pub fn check_columns(raw: &RawTable, mapping: &FieldMapping) -> Result<(), MappingError> {
    column_indices(raw, mapping).map(|_| ())
}

/// Column position for each field slot, in [`SemanticField::ALL`] order.
fn column_indices(
    raw: &RawTable,
    mapping: &FieldMapping,
) -> Result<[Option<usize>; 5], MappingError> {
    let mut indices: [Option<usize>; 5] = [None; 5];
    for (slot, field) in SemanticField::ALL.into_iter().enumerate() {
        let Some(column) = mapping.column(field) else {
            continue;
        };
        let idx = raw
            .column_index(column)
            .ok_or_else(|| MappingError::ColumnNotFound {
                field,
                column: column.to_owned(),
                available: raw.columns().to_vec(),
            })?;
        indices[slot] = Some(idx);
    }
    Ok(indices)
}

/// Maps `raw` with the default policy: Price optional, images rewritten
/// against the default host.
///
/// # Errors
///
/// See [`FieldMapper::apply`].
pub fn apply_mapping(
    raw: &RawTable,
    mapping: &FieldMapping,
) -> Result<Vec<MappedRow>, MappingError> {
    FieldMapper::default().apply(raw, mapping)
}

/// Source columns assigned to more than one field, sorted by name.
///
/// Not an error; admin surfaces show it as a warning.
#[must_use]
pub fn duplicate_columns(mapping: &FieldMapping) -> Vec<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for (_, column) in mapping.assigned() {
        *counts.entry(column).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(column, _)| column.to_owned())
        .collect()
}

#[cfg(test)]
#[path = "mapping_test.rs"]
mod tests;
