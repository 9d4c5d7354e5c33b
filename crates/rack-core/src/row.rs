use serde::Serialize;

use crate::fields::SemanticField;
use crate::normalize::search_key;

/// A book row in the fixed internal schema.
///
/// `search_key` is derived in [`MappedRow::new`] from identifier, display
/// name, price and location, and has no setter, so it always matches the
/// fields it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappedRow {
    identifier: String,
    display_name: String,
    price: String,
    location: String,
    image_ref: String,
    search_key: String,
}

impl MappedRow {
    #[must_use]
    pub fn new(
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        price: impl Into<String>,
        location: impl Into<String>,
        image_ref: impl Into<String>,
    ) -> Self {
        let identifier = identifier.into();
        let display_name = display_name.into();
        let price = price.into();
        let location = location.into();
        let search_key = search_key(&[&identifier, &display_name, &price, &location]);
        Self {
            identifier,
            display_name,
            price,
            location,
            image_ref: image_ref.into(),
            search_key,
        }
    }

    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn price(&self) -> &str {
        &self.price
    }

    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    #[must_use]
    pub fn image_ref(&self) -> &str {
        &self.image_ref
    }

    #[must_use]
    pub fn search_key(&self) -> &str {
        &self.search_key
    }

    #[must_use]
    pub fn field(&self, field: SemanticField) -> &str {
        match field {
            SemanticField::Identifier => &self.identifier,
            SemanticField::DisplayName => &self.display_name,
            SemanticField::Price => &self.price,
            SemanticField::Location => &self.location,
            SemanticField::ImageRef => &self.image_ref,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_key_is_lowercase_single_spaced() {
        let row = MappedRow::new("7", "Atlas Shrugged", "250", "A3", "");
        assert_eq!(row.search_key(), "7 atlas shrugged 250 a3");
    }

    #[test]
    fn search_key_excludes_image() {
        let row = MappedRow::new("7", "Atlas", "", "A3", "https://img.example.com/x.png");
        assert!(!row.search_key().contains("img"));
        assert_eq!(row.search_key(), "7 atlas a3");
    }
}
