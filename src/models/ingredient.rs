use serde::{Deserialize, Serialize};

/// A named ingredient that reviews can list and searches can match.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
}

/// A named kitchen utensil, same shape as [`Ingredient`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Utensil {
    pub id: i64,
    pub name: String,
}

/// The two reference tables share one storage layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Ingredient,
    Utensil,
}

impl RefKind {
    pub fn table(self) -> &'static str {
        match self {
            RefKind::Ingredient => "ingredients",
            RefKind::Utensil => "utensils",
        }
    }

    pub fn link_table(self) -> &'static str {
        match self {
            RefKind::Ingredient => "review_ingredients",
            RefKind::Utensil => "review_utensils",
        }
    }

    pub fn link_column(self) -> &'static str {
        match self {
            RefKind::Ingredient => "ingredient_id",
            RefKind::Utensil => "utensil_id",
        }
    }
}
