//! Form parsing and validation for review, comment and account submissions.
use std::collections::BTreeMap;

use serde::Serialize;

use crate::db::Database;
use crate::models::ingredient::RefKind;
use crate::models::review::{Review, ReviewDraft, ReviewStatus};
use crate::utils::slug::{is_valid_slug, slugify};

pub const TITLE_MAX: usize = 200;
pub const RECIPE_MAX: usize = 200;
pub const NAME_MAX: usize = 80;
pub const COMMENT_MAX: usize = 2000;
pub const USERNAME_MAX: usize = 150;
pub const PASSWORD_MIN: usize = 8;

pub const SLUG_TAKEN: &str = "Review with this Slug already exists.";

/// Decoded `application/x-www-form-urlencoded` body. Keys may repeat.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    pairs: Vec<(String, String)>,
}

impl FormData {
    pub fn parse(body: &[u8]) -> Self {
        Self {
            pairs: url::form_urlencoded::parse(body).into_owned().collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_or_empty(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }

    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }
}

/// Field name to messages; `__all__` holds errors not tied to one field.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

impl FieldErrors {
    /// The error shown when a review's slug belongs to another review.
    pub fn slug_taken() -> Self {
        let mut errors = Self::default();
        errors.add("slug", SLUG_TAKEN);
        errors
    }
}

pub enum Validated<T> {
    Valid(T),
    Invalid(FieldErrors),
}

fn check_length(errors: &mut FieldErrors, field: &str, value: &str, max: usize) {
    let len = value.chars().count();
    if len > max {
        errors.add(
            field,
            format!("Ensure this value has at most {max} characters (it has {len})."),
        );
    }
}

fn split_names(raw: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            names.push(name.to_string());
        }
    }
    names
}

fn parse_ids(errors: &mut FieldErrors, field: &str, raw: &[String]) -> Vec<i64> {
    let mut ids = Vec::new();
    for value in raw.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
        match value.parse::<i64>() {
            Ok(id) if !ids.contains(&id) => ids.push(id),
            Ok(_) => {}
            Err(_) => errors.add(field, format!("\"{value}\" is not a valid value.")),
        }
    }
    ids
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct ReviewForm {
    pub title: String,
    pub recipe: String,
    pub content: String,
    pub slug: String,
    pub status: Option<String>,
    pub ingredients: Vec<String>,
    pub utensils: Vec<String>,
    pub new_ingredient: String,
    pub new_utensil: String,
}

impl ReviewForm {
    pub fn from_form(data: &FormData) -> Self {
        Self {
            title: data.get_or_empty("title"),
            recipe: data.get_or_empty("recipe"),
            content: data.get_or_empty("content"),
            slug: data.get_or_empty("slug"),
            status: data.get("status").map(str::to_string),
            ingredients: data.get_all("ingredients"),
            utensils: data.get_all("utensils"),
            new_ingredient: data.get_or_empty("new_ingredient"),
            new_utensil: data.get_or_empty("new_utensil"),
        }
    }

    /// Current values of a stored review, for the edit page.
    pub fn from_review(review: &Review) -> Self {
        Self {
            title: review.title.clone(),
            recipe: review.recipe.clone(),
            content: review.content.clone(),
            slug: review.slug.clone(),
            status: Some(review.status.as_i64().to_string()),
            ingredients: review.ingredients.iter().map(|i| i.id.to_string()).collect(),
            utensils: review.utensils.iter().map(|u| u.id.to_string()).collect(),
            new_ingredient: String::new(),
            new_utensil: String::new(),
        }
    }

    /// Checks that need no database access.
    pub fn validate(&self) -> Result<ReviewDraft, FieldErrors> {
        let mut errors = FieldErrors::default();

        let title = self.title.trim().to_string();
        if title.is_empty() {
            errors.add("title", "This field is required.");
        }
        check_length(&mut errors, "title", &title, TITLE_MAX);

        let recipe = self.recipe.trim().to_string();
        check_length(&mut errors, "recipe", &recipe, RECIPE_MAX);

        let slug = match self.slug.trim() {
            "" => slugify(&title),
            given if is_valid_slug(given) => given.to_string(),
            _ => {
                errors.add(
                    "slug",
                    "Enter a valid slug consisting of letters, numbers, underscores or hyphens.",
                );
                String::new()
            }
        };
        if slug.is_empty() && !title.is_empty() && errors.get("slug").is_none() {
            errors.add("slug", "Could not derive a slug from the title; please provide one.");
        }
        check_length(&mut errors, "slug", &slug, TITLE_MAX);

        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some("0") => Some(ReviewStatus::Draft),
            Some("1") => Some(ReviewStatus::Published),
            Some(other) => {
                errors.add(
                    "status",
                    format!("Select a valid choice. {other} is not one of the available choices."),
                );
                None
            }
        };

        let ingredient_ids = parse_ids(&mut errors, "ingredients", &self.ingredients);
        let utensil_ids = parse_ids(&mut errors, "utensils", &self.utensils);
        let new_ingredients = split_names(&self.new_ingredient);
        let new_utensils = split_names(&self.new_utensil);
        for name in &new_ingredients {
            check_length(&mut errors, "new_ingredient", name, NAME_MAX);
        }
        for name in &new_utensils {
            check_length(&mut errors, "new_utensil", name, NAME_MAX);
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(ReviewDraft {
            title,
            recipe,
            content: self.content.trim().to_string(),
            slug,
            status,
            ingredient_ids,
            new_ingredients,
            utensil_ids,
            new_utensils,
        })
    }

    /// Full validation, including slug uniqueness and reference ids.
    /// `exclude_id` is the review being edited, if any.
    pub async fn clean(
        &self,
        db: &Database,
        exclude_id: Option<i64>,
    ) -> Result<Validated<ReviewDraft>, rusqlite::Error> {
        let draft = match self.validate() {
            Ok(draft) => draft,
            Err(errors) => return Ok(Validated::Invalid(errors)),
        };

        let mut errors = FieldErrors::default();
        if db.slug_taken(&draft.slug, exclude_id).await? {
            errors.add("slug", SLUG_TAKEN);
        }
        for id in db.unknown_ref_ids(RefKind::Ingredient, &draft.ingredient_ids).await? {
            errors.add(
                "ingredients",
                format!("Select a valid choice. {id} is not one of the available choices."),
            );
        }
        for id in db.unknown_ref_ids(RefKind::Utensil, &draft.utensil_ids).await? {
            errors.add(
                "utensils",
                format!("Select a valid choice. {id} is not one of the available choices."),
            );
        }

        if errors.is_empty() {
            Ok(Validated::Valid(draft))
        } else {
            Ok(Validated::Invalid(errors))
        }
    }
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct CommentForm {
    pub body: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleanComment {
    pub body: String,
    pub name: Option<String>,
}

impl CommentForm {
    pub fn from_form(data: &FormData) -> Self {
        Self {
            body: data.get_or_empty("body"),
            name: data.get_or_empty("name"),
        }
    }

    pub fn validate(&self) -> Result<CleanComment, FieldErrors> {
        let mut errors = FieldErrors::default();
        let body = self.body.trim().to_string();
        if body.is_empty() {
            errors.add("body", "This field is required.");
        }
        check_length(&mut errors, "body", &body, COMMENT_MAX);
        let name = self.name.trim().to_string();
        check_length(&mut errors, "name", &name, NAME_MAX);

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(CleanComment {
            body,
            name: (!name.is_empty()).then_some(name),
        })
    }
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct SignupForm {
    pub username: String,
    #[serde(skip_serializing)]
    pub password1: String,
    #[serde(skip_serializing)]
    pub password2: String,
}

impl SignupForm {
    pub fn from_form(data: &FormData) -> Self {
        Self {
            username: data.get_or_empty("username"),
            password1: data.get_or_empty("password1"),
            password2: data.get_or_empty("password2"),
        }
    }

    pub fn validate(&self) -> Result<(String, String), FieldErrors> {
        let mut errors = FieldErrors::default();
        let username = self.username.trim().to_string();

        if username.is_empty() {
            errors.add("username", "This field is required.");
        } else if !username
            .chars()
            .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
        {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }
        check_length(&mut errors, "username", &username, USERNAME_MAX);

        if self.password1.is_empty() {
            errors.add("password1", "This field is required.");
        } else if self.password1.chars().count() < PASSWORD_MIN {
            errors.add(
                "password1",
                format!("This password is too short. It must contain at least {PASSWORD_MIN} characters."),
            );
        }
        if self.password1 != self.password2 {
            errors.add("password2", "You must type the same password each time.");
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok((username, self.password1.clone()))
    }

    pub async fn clean(&self, db: &Database) -> Result<Validated<(String, String)>, rusqlite::Error> {
        let (username, password) = match self.validate() {
            Ok(clean) => clean,
            Err(errors) => return Ok(Validated::Invalid(errors)),
        };
        if db.get_user_by_username(&username).await?.is_some() {
            let mut errors = FieldErrors::default();
            errors.add("username", "A user with that username already exists.");
            return Ok(Validated::Invalid(errors));
        }
        Ok(Validated::Valid((username, password)))
    }
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct LoginForm {
    pub login: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub next: String,
}

impl LoginForm {
    pub fn from_form(data: &FormData) -> Self {
        Self {
            login: data.get_or_empty("login"),
            password: data.get_or_empty("password"),
            next: data.get_or_empty("next"),
        }
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        if self.login.trim().is_empty() {
            errors.add("login", "This field is required.");
        }
        if self.password.is_empty() {
            errors.add("password", "This field is required.");
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Only same-site absolute paths are honoured as post-login targets.
pub fn safe_next(next: &str) -> &str {
    if next.starts_with('/')
        && !next.starts_with("//")
        && !next.contains('\\')
        && !next.chars().any(|c| c.is_ascii_control())
    {
        next
    } else {
        "/"
    }
}
