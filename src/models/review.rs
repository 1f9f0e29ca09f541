// src/models/review.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::ingredient::{Ingredient, Utensil};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    #[default]
    Draft,
    Published,
}

impl ReviewStatus {
    pub fn as_i64(self) -> i64 {
        match self {
            ReviewStatus::Draft => 0,
            ReviewStatus::Published => 1,
        }
    }

    pub fn from_i64(value: i64) -> Self {
        if value == 1 {
            ReviewStatus::Published
        } else {
            ReviewStatus::Draft
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Review {
    pub id: i64,
    pub title: String,
    pub recipe: String,       // name of the recipe being reviewed
    pub content: String,
    pub author_id: i64,
    pub author: String,       // author's username
    pub slug: String,         // unique, used in every review URL
    pub status: ReviewStatus,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
    pub upvotes: i64,
    pub downvotes: i64,
    pub net_votes: i64,
    pub comment_count: i64,   // approved comments only
    pub ingredients: Vec<Ingredient>,
    pub utensils: Vec<Utensil>,
}

/// Validated field values for creating or editing a review.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewDraft {
    pub title: String,
    pub recipe: String,
    pub content: String,
    pub slug: String,
    pub status: Option<ReviewStatus>, // None keeps the stored status on update
    pub ingredient_ids: Vec<i64>,
    pub new_ingredients: Vec<String>,
    pub utensil_ids: Vec<i64>,
    pub new_utensils: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReviewSort {
    #[default]
    Newest,
    NetVotes,
}

impl ReviewSort {
    /// Unknown or missing values fall back to newest first.
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some("total_votes") => ReviewSort::NetVotes,
            _ => ReviewSort::Newest,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Up,
    Down,
}

impl VoteKind {
    pub fn as_str(self) -> &'static str {
        match self {
            VoteKind::Up => "up",
            VoteKind::Down => "down",
        }
    }
}

impl FromStr for VoteKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upvote" | "up" => Ok(VoteKind::Up),
            "downvote" | "down" => Ok(VoteKind::Down),
            other => Err(format!("Unknown vote type: {other}")),
        }
    }
}
