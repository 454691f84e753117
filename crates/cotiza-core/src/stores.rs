use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// A retailer the engine knows how to scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Store {
    Siman,
    Curacao,
    Walmart,
    PrismaModa,
    Selectos,
    Vidri,
}

impl Store {
    pub const ALL: [Store; 6] = [
        Store::Siman,
        Store::Curacao,
        Store::Walmart,
        Store::PrismaModa,
        Store::Selectos,
        Store::Vidri,
    ];

    /// Path segment used in `/scrape/{store}`.
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Store::Siman => "siman",
            Store::Curacao => "curacao",
            Store::Walmart => "walmart",
            Store::PrismaModa => "prismamoda",
            Store::Selectos => "selectos",
            Store::Vidri => "vidri",
        }
    }

    /// Human-readable retailer name written into every result's `store` field.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Store::Siman => "Simán",
            Store::Curacao => "La Curacao",
            Store::Walmart => "Walmart",
            Store::PrismaModa => "PrismaModa",
            Store::Selectos => "Super Selectos",
            Store::Vidri => "Vidrí",
        }
    }

    #[must_use]
    pub fn is_multi_branch(self) -> bool {
        matches!(self, Store::Walmart)
    }
}

impl std::fmt::Display for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Store {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Store::ALL
            .into_iter()
            .find(|store| store.slug() == wanted)
            .ok_or_else(|| CoreError::UnknownStore(s.to_string()))
    }
}
