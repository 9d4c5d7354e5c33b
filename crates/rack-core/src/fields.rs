use serde::{Deserialize, Serialize};

/// The fixed set of fields every mapped row carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticField {
    Identifier,
    DisplayName,
    Price,
    Location,
    ImageRef,
}

impl SemanticField {
    /// All fields in canonical order. Error messages and validation follow
    /// this order.
    pub const ALL: [SemanticField; 5] = [
        SemanticField::Identifier,
        SemanticField::DisplayName,
        SemanticField::Price,
        SemanticField::Location,
        SemanticField::ImageRef,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SemanticField::Identifier => "identifier",
            SemanticField::DisplayName => "display_name",
            SemanticField::Price => "price",
            SemanticField::Location => "location",
            SemanticField::ImageRef => "image_ref",
        }
    }

    /// Human-readable label for admin surfaces.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            SemanticField::Identifier => "Book Number",
            SemanticField::DisplayName => "Book Name",
            SemanticField::Price => "Price",
            SemanticField::Location => "Rack / Row / Location",
            SemanticField::ImageRef => "Image URL",
        }
    }
}

impl std::fmt::Display for SemanticField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Admin-chosen source column for each semantic field.
///
/// An empty or whitespace-only column name counts as unset. Older config
/// files used the `BK_*` keys, which are still accepted on read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    #[serde(default, alias = "BK_Number", skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, alias = "BK_name", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, alias = "BK_rate", skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, alias = "BK_row", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, alias = "BK_image", skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}

impl FieldMapping {
    /// Returns the trimmed source column for `field`, or `None` when unset.
    #[must_use]
    pub fn column(&self, field: SemanticField) -> Option<&str> {
        let raw = match field {
            SemanticField::Identifier => self.identifier.as_deref(),
            SemanticField::DisplayName => self.display_name.as_deref(),
            SemanticField::Price => self.price.as_deref(),
            SemanticField::Location => self.location.as_deref(),
            SemanticField::ImageRef => self.image_ref.as_deref(),
        };
        raw.map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn set(&mut self, field: SemanticField, column: Option<String>) {
        let slot = match field {
            SemanticField::Identifier => &mut self.identifier,
            SemanticField::DisplayName => &mut self.display_name,
            SemanticField::Price => &mut self.price,
            SemanticField::Location => &mut self.location,
            SemanticField::ImageRef => &mut self.image_ref,
        };
        *slot = column.filter(|c| !c.trim().is_empty());
    }

    /// Iterates the assigned fields in canonical order.
    pub fn assigned(&self) -> impl Iterator<Item = (SemanticField, &str)> + '_ {
        SemanticField::ALL
            .into_iter()
            .filter_map(|field| self.column(field).map(|col| (field, col)))
    }
}
