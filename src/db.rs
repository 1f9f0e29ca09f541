use crate::models::comment::{Comment, NewComment};
use crate::models::ingredient::{Ingredient, RefKind, Utensil};
use crate::models::review::{Review, ReviewDraft, ReviewSort, ReviewStatus, VoteKind};
use crate::models::user::User;
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, Error, OptionalExtension, Row};
use std::sync::Arc;
use thiserror::Error as ThisError;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

// Shared projection for every review query. Vote and comment counts are
// derived live from their tables.
const REVIEW_SELECT: &str = "
    SELECT
        r.id,
        r.title,
        r.recipe,
        r.content,
        r.author_id,
        u.username AS author,
        r.slug,
        r.status,
        r.created_on,
        r.updated_on,
        (SELECT COUNT(*) FROM review_votes v WHERE v.review_id = r.id AND v.kind = 'up') AS upvotes,
        (SELECT COUNT(*) FROM review_votes v WHERE v.review_id = r.id AND v.kind = 'down') AS downvotes,
        (SELECT COUNT(*) FROM comments c WHERE c.review_id = r.id AND c.approved = 1) AS comment_count
    FROM reviews r
    JOIN users u ON u.id = r.author_id";

/// Why a review could not be written.
#[derive(ThisError, Debug)]
pub enum ReviewWriteError {
    #[error("Slug '{0}' is already taken")]
    SlugTaken(String),
    #[error(transparent)]
    Database(#[from] Error),
}

// Define a struct to represent a database connection
#[derive(Debug, Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    // Create a new database connection
    pub fn new(db_path: &str) -> Result<Self, Error> {
        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        info!("Database connection established at: {}", db_path);
        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // Create the database schema
    pub async fn create_schema(&self) -> Result<(), Error> {
        let conn = self.conn.lock().await;

        // 1. Users and their sessions
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                is_staff INTEGER NOT NULL DEFAULT 0,
                date_joined TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL,
                created_on TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );",
        )?;

        // 2. Reviews
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS reviews (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                recipe TEXT NOT NULL DEFAULT '',
                content TEXT NOT NULL DEFAULT '',
                author_id INTEGER NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                status INTEGER NOT NULL DEFAULT 0,
                created_on TEXT NOT NULL,
                updated_on TEXT NOT NULL,
                FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_reviews_status_created
                ON reviews (status, created_on);",
        )?;

        // 3. Comments
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY,
                review_id INTEGER NOT NULL,
                author_id INTEGER,
                name TEXT,
                body TEXT NOT NULL,
                approved INTEGER NOT NULL DEFAULT 0,
                created_on TEXT NOT NULL,
                FOREIGN KEY (review_id) REFERENCES reviews(id) ON DELETE CASCADE,
                FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE SET NULL
            );",
        )?;

        // 4. Votes. One row per (review, user) keeps up and down votes disjoint.
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS review_votes (
                review_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('up', 'down')),
                voted_on TEXT NOT NULL,
                PRIMARY KEY (review_id, user_id),
                FOREIGN KEY (review_id) REFERENCES reviews(id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );",
        )?;

        // 5. Ingredients, utensils and their junction tables
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS ingredients (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE COLLATE NOCASE
            );
            CREATE TABLE IF NOT EXISTS utensils (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE COLLATE NOCASE
            );
            CREATE TABLE IF NOT EXISTS review_ingredients (
                review_id INTEGER NOT NULL,
                ingredient_id INTEGER NOT NULL,
                PRIMARY KEY (review_id, ingredient_id),
                FOREIGN KEY (review_id) REFERENCES reviews(id) ON DELETE CASCADE,
                FOREIGN KEY (ingredient_id) REFERENCES ingredients(id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS review_utensils (
                review_id INTEGER NOT NULL,
                utensil_id INTEGER NOT NULL,
                PRIMARY KEY (review_id, utensil_id),
                FOREIGN KEY (review_id) REFERENCES reviews(id) ON DELETE CASCADE,
                FOREIGN KEY (utensil_id) REFERENCES utensils(id) ON DELETE CASCADE
            );",
        )?;

        debug!("[DB] Schema ready");
        Ok(())
    }

    // ----- users & sessions -----

    pub async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        is_staff: bool,
    ) -> Result<User, Error> {
        let conn = self.conn.lock().await;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO users (username, password_hash, is_staff, date_joined) VALUES (?, ?, ?, ?)",
            params![username, password_hash, is_staff, now],
        )?;
        let id = conn.last_insert_rowid();
        info!("User created: {} (ID: {})", username, id);
        Ok(User {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            is_staff,
            date_joined: now,
        })
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<User>, Error> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, username, password_hash, is_staff, date_joined FROM users WHERE id = ?",
            [id],
            user_from_row,
        )
        .optional()
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, username, password_hash, is_staff, date_joined FROM users WHERE username = ?",
            [username],
            user_from_row,
        )
        .optional()
    }

    /// Opens a session for `user_id` and returns its opaque token.
    pub async fn create_session(&self, user_id: i64) -> Result<String, Error> {
        let conn = self.conn.lock().await;
        let token = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO sessions (token, user_id, created_on) VALUES (?, ?, ?)",
            params![token, user_id, Utc::now()],
        )?;
        debug!("[DB] Session opened for user {}", user_id);
        Ok(token)
    }

    pub async fn get_session_user(&self, token: &str) -> Result<Option<User>, Error> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT u.id, u.username, u.password_hash, u.is_staff, u.date_joined
             FROM sessions s
             JOIN users u ON u.id = s.user_id
             WHERE s.token = ?",
            [token],
            user_from_row,
        )
        .optional()
    }

    pub async fn delete_session(&self, token: &str) -> Result<(), Error> {
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM sessions WHERE token = ?", [token])?;
        Ok(())
    }

    // ----- ingredients & utensils -----

    pub async fn list_ingredients(&self) -> Result<Vec<Ingredient>, Error> {
        let conn = self.conn.lock().await;
        let rows = list_refs(&conn, RefKind::Ingredient, None)?;
        Ok(rows
            .into_iter()
            .map(|(id, name)| Ingredient { id, name })
            .collect())
    }

    pub async fn list_utensils(&self) -> Result<Vec<Utensil>, Error> {
        let conn = self.conn.lock().await;
        let rows = list_refs(&conn, RefKind::Utensil, None)?;
        Ok(rows
            .into_iter()
            .map(|(id, name)| Utensil { id, name })
            .collect())
    }

    pub async fn search_ingredients(&self, query: &str) -> Result<Vec<Ingredient>, Error> {
        let conn = self.conn.lock().await;
        let rows = list_refs(&conn, RefKind::Ingredient, Some(query))?;
        Ok(rows
            .into_iter()
            .map(|(id, name)| Ingredient { id, name })
            .collect())
    }

    pub async fn search_utensils(&self, query: &str) -> Result<Vec<Utensil>, Error> {
        let conn = self.conn.lock().await;
        let rows = list_refs(&conn, RefKind::Utensil, Some(query))?;
        Ok(rows
            .into_iter()
            .map(|(id, name)| Utensil { id, name })
            .collect())
    }

    pub async fn get_or_create_ingredient(&self, name: &str) -> Result<Ingredient, Error> {
        let conn = self.conn.lock().await;
        let (id, name) = get_or_create_ref(&conn, RefKind::Ingredient, name)?;
        Ok(Ingredient { id, name })
    }

    pub async fn get_or_create_utensil(&self, name: &str) -> Result<Utensil, Error> {
        let conn = self.conn.lock().await;
        let (id, name) = get_or_create_ref(&conn, RefKind::Utensil, name)?;
        Ok(Utensil { id, name })
    }

    /// Returns the ids from `ids` that have no row in the given reference table.
    pub async fn unknown_ref_ids(&self, kind: RefKind, ids: &[i64]) -> Result<Vec<i64>, Error> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!("SELECT 1 FROM {} WHERE id = ?", kind.table()))?;
        let mut missing = Vec::new();
        for id in ids {
            if !stmt.exists([id])? {
                missing.push(*id);
            }
        }
        Ok(missing)
    }

    // ----- reviews -----

    pub async fn count_published(&self) -> Result<i64, Error> {
        let conn = self.conn.lock().await;
        conn.query_row("SELECT COUNT(*) FROM reviews WHERE status = 1", [], |row| {
            row.get(0)
        })
    }

    /// One page of published reviews in the requested order.
    pub async fn list_published(
        &self,
        sort: ReviewSort,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Review>, Error> {
        let conn = self.conn.lock().await;
        let order = match sort {
            ReviewSort::Newest => "created_on DESC, id DESC",
            ReviewSort::NetVotes => "upvotes - downvotes DESC, created_on DESC, id DESC",
        };
        let sql = format!(
            "SELECT * FROM ({REVIEW_SELECT} WHERE r.status = 1) ORDER BY {order} LIMIT ? OFFSET ?"
        );
        let mut reviews = query_reviews(&conn, &sql, params![limit, offset])?;
        attach_links(&conn, &mut reviews)?;
        debug!("[DB] Listed {} published reviews ({:?})", reviews.len(), sort);
        Ok(reviews)
    }

    pub async fn get_review_by_slug(&self, slug: &str) -> Result<Option<Review>, Error> {
        let conn = self.conn.lock().await;
        fetch_review(&conn, "r.slug = ?", slug)
    }

    pub async fn get_review(&self, id: i64) -> Result<Option<Review>, Error> {
        let conn = self.conn.lock().await;
        fetch_review(&conn, "r.id = ?", id)
    }

    /// Whether `slug` is already used by a review other than `exclude_id`.
    pub async fn slug_taken(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool, Error> {
        let conn = self.conn.lock().await;
        slug_exists(&conn, slug, exclude_id)
    }

    pub async fn insert_review(
        &self,
        author_id: i64,
        draft: &ReviewDraft,
        created_on: DateTime<Utc>,
    ) -> Result<Review, ReviewWriteError> {
        debug!("[DB] Inserting review '{}' for author {}", draft.slug, author_id);
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        // Checked again under the lock; form validation ran without it.
        if slug_exists(&tx, &draft.slug, None)? {
            warn!("Slug '{}' taken before insert", draft.slug);
            return Err(ReviewWriteError::SlugTaken(draft.slug.clone()));
        }

        tx.execute(
            "INSERT INTO reviews (title, recipe, content, author_id, slug, status, created_on, updated_on)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                draft.title,
                draft.recipe,
                draft.content,
                author_id,
                draft.slug,
                draft.status.unwrap_or_default().as_i64(),
                created_on,
                created_on
            ],
        )?;
        let review_id = tx.last_insert_rowid();
        sync_links(&tx, review_id, draft)?;

        let review = fetch_review(&tx, "r.id = ?", review_id)?.ok_or(Error::QueryReturnedNoRows)?;
        tx.commit()?;
        info!("Review created: {} (ID: {})", review.slug, review.id);
        Ok(review)
    }

    pub async fn update_review(
        &self,
        review_id: i64,
        draft: &ReviewDraft,
    ) -> Result<Review, ReviewWriteError> {
        debug!("[DB] Updating review {}", review_id);
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        if slug_exists(&tx, &draft.slug, Some(review_id))? {
            warn!("Slug '{}' taken before update of review {}", draft.slug, review_id);
            return Err(ReviewWriteError::SlugTaken(draft.slug.clone()));
        }

        let changed = tx.execute(
            "UPDATE reviews SET
                title = ?,
                recipe = ?,
                content = ?,
                slug = ?,
                status = COALESCE(?, status),
                updated_on = ?
             WHERE id = ?",
            params![
                draft.title,
                draft.recipe,
                draft.content,
                draft.slug,
                draft.status.map(ReviewStatus::as_i64),
                Utc::now(),
                review_id
            ],
        )?;
        if changed == 0 {
            return Err(Error::QueryReturnedNoRows.into());
        }

        tx.execute("DELETE FROM review_ingredients WHERE review_id = ?", [review_id])?;
        tx.execute("DELETE FROM review_utensils WHERE review_id = ?", [review_id])?;
        sync_links(&tx, review_id, draft)?;

        let review = fetch_review(&tx, "r.id = ?", review_id)?.ok_or(Error::QueryReturnedNoRows)?;
        tx.commit()?;
        info!("Review updated: {} (ID: {})", review.slug, review.id);
        Ok(review)
    }

    /// Deletes a review; comments, votes and links go with it.
    pub async fn delete_review(&self, review_id: i64) -> Result<bool, Error> {
        let conn = self.conn.lock().await;
        let deleted = conn.execute("DELETE FROM reviews WHERE id = ?", [review_id])?;
        info!("Review deleted: {}", review_id);
        Ok(deleted > 0)
    }

    pub async fn latest_published(&self, limit: i64) -> Result<Vec<Review>, Error> {
        self.list_published(ReviewSort::Newest, limit, 0).await
    }

    /// Published reviews mentioning `query` in their text or their
    /// ingredient/utensil names, newest first.
    pub async fn search_reviews(&self, query: &str) -> Result<Vec<Review>, Error> {
        let conn = self.conn.lock().await;
        let pattern = like_pattern(query);
        let sql = format!(
            "SELECT * FROM ({REVIEW_SELECT}
                WHERE r.status = 1 AND (
                    r.title LIKE ?1 ESCAPE '\\'
                    OR r.recipe LIKE ?1 ESCAPE '\\'
                    OR r.content LIKE ?1 ESCAPE '\\'
                    OR EXISTS (
                        SELECT 1 FROM review_ingredients ri
                        JOIN ingredients i ON i.id = ri.ingredient_id
                        WHERE ri.review_id = r.id AND i.name LIKE ?1 ESCAPE '\\'
                    )
                    OR EXISTS (
                        SELECT 1 FROM review_utensils ru
                        JOIN utensils t ON t.id = ru.utensil_id
                        WHERE ru.review_id = r.id AND t.name LIKE ?1 ESCAPE '\\'
                    )
                ))
             ORDER BY created_on DESC, id DESC"
        );
        let mut reviews = query_reviews(&conn, &sql, [pattern])?;
        attach_links(&conn, &mut reviews)?;
        debug!("[DB] Search '{}' matched {} reviews", query, reviews.len());
        Ok(reviews)
    }

    // ----- comments -----

    pub async fn insert_comment(&self, comment: &NewComment) -> Result<Comment, Error> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO comments (review_id, author_id, name, body, approved, created_on)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                comment.review_id,
                comment.author_id,
                comment.name,
                comment.body,
                comment.approved,
                comment.created_on
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!("[DB] Comment {} stored on review {}", id, comment.review_id);
        Ok(Comment {
            id,
            review_id: comment.review_id,
            author_id: comment.author_id,
            name: comment.name.clone(),
            body: comment.body.clone(),
            approved: comment.approved,
            created_on: comment.created_on,
        })
    }

    pub async fn get_comment(&self, id: i64) -> Result<Option<Comment>, Error> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, review_id, author_id, name, body, approved, created_on
             FROM comments WHERE id = ?",
            [id],
            comment_from_row,
        )
        .optional()
    }

    /// Approved comments of a review, oldest first.
    pub async fn approved_comments(&self, review_id: i64) -> Result<Vec<Comment>, Error> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, review_id, author_id, name, body, approved, created_on
             FROM comments
             WHERE review_id = ? AND approved = 1
             ORDER BY created_on ASC, id ASC",
        )?;
        let rows = stmt.query_map([review_id], comment_from_row)?;
        rows.collect()
    }

    /// Comments by `author_id` on a review that still wait for approval.
    pub async fn pending_comments(
        &self,
        review_id: i64,
        author_id: i64,
    ) -> Result<Vec<Comment>, Error> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, review_id, author_id, name, body, approved, created_on
             FROM comments
             WHERE review_id = ? AND author_id = ? AND approved = 0
             ORDER BY created_on ASC, id ASC",
        )?;
        let rows = stmt.query_map([review_id, author_id], comment_from_row)?;
        rows.collect()
    }

    pub async fn approve_comment(&self, id: i64) -> Result<bool, Error> {
        let conn = self.conn.lock().await;
        let changed = conn.execute("UPDATE comments SET approved = 1 WHERE id = ?", [id])?;
        info!("Comment approved: {}", id);
        Ok(changed > 0)
    }

    pub async fn delete_comment(&self, id: i64) -> Result<bool, Error> {
        let conn = self.conn.lock().await;
        let deleted = conn.execute("DELETE FROM comments WHERE id = ?", [id])?;
        info!("Comment deleted: {}", id);
        Ok(deleted > 0)
    }

    // ----- votes -----

    /// Applies a vote and returns the user's resulting vote. Voting the
    /// opposite way moves the user across; repeating the held vote clears it.
    pub async fn apply_vote(
        &self,
        review_id: i64,
        user_id: i64,
        kind: VoteKind,
    ) -> Result<Option<VoteKind>, Error> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let current: Option<String> = tx
            .query_row(
                "SELECT kind FROM review_votes WHERE review_id = ? AND user_id = ?",
                [review_id, user_id],
                |row| row.get(0),
            )
            .optional()?;

        let result = if current.as_deref() == Some(kind.as_str()) {
            tx.execute(
                "DELETE FROM review_votes WHERE review_id = ? AND user_id = ?",
                [review_id, user_id],
            )?;
            None
        } else {
            tx.execute(
                "INSERT INTO review_votes (review_id, user_id, kind, voted_on)
                 VALUES (?, ?, ?, ?)
                 ON CONFLICT(review_id, user_id) DO UPDATE SET
                    kind = excluded.kind,
                    voted_on = excluded.voted_on",
                params![review_id, user_id, kind.as_str(), Utc::now()],
            )?;
            Some(kind)
        };

        tx.commit()?;
        debug!(
            "[DB] Vote on review {} by user {}: {:?} -> {:?}",
            review_id, user_id, current, result
        );
        Ok(result)
    }

    pub async fn vote_of(&self, review_id: i64, user_id: i64) -> Result<Option<VoteKind>, Error> {
        let conn = self.conn.lock().await;
        let kind: Option<String> = conn
            .query_row(
                "SELECT kind FROM review_votes WHERE review_id = ? AND user_id = ?",
                [review_id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(match kind.as_deref() {
            Some("up") => Some(VoteKind::Up),
            Some("down") => Some(VoteKind::Down),
            _ => None,
        })
    }
}

fn user_from_row(row: &Row<'_>) -> Result<User, Error> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        is_staff: row.get(3)?,
        date_joined: row.get(4)?,
    })
}

fn comment_from_row(row: &Row<'_>) -> Result<Comment, Error> {
    Ok(Comment {
        id: row.get(0)?,
        review_id: row.get(1)?,
        author_id: row.get(2)?,
        name: row.get(3)?,
        body: row.get(4)?,
        approved: row.get(5)?,
        created_on: row.get(6)?,
    })
}

fn review_from_row(row: &Row<'_>) -> Result<Review, Error> {
    let upvotes: i64 = row.get("upvotes")?;
    let downvotes: i64 = row.get("downvotes")?;
    Ok(Review {
        id: row.get("id")?,
        title: row.get("title")?,
        recipe: row.get("recipe")?,
        content: row.get("content")?,
        author_id: row.get("author_id")?,
        author: row.get("author")?,
        slug: row.get("slug")?,
        status: ReviewStatus::from_i64(row.get("status")?),
        created_on: row.get("created_on")?,
        updated_on: row.get("updated_on")?,
        upvotes,
        downvotes,
        net_votes: upvotes - downvotes,
        comment_count: row.get("comment_count")?,
        ingredients: Vec::new(),
        utensils: Vec::new(),
    })
}

fn query_reviews<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<Review>, Error> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, review_from_row)?;
    rows.collect()
}

fn fetch_review<T: rusqlite::ToSql>(
    conn: &Connection,
    condition: &str,
    value: T,
) -> Result<Option<Review>, Error> {
    let sql = format!("{REVIEW_SELECT} WHERE {condition}");
    let review = conn.query_row(&sql, [value], review_from_row).optional()?;
    match review {
        Some(review) => {
            let mut reviews = vec![review];
            attach_links(conn, &mut reviews)?;
            Ok(reviews.pop())
        }
        None => Ok(None),
    }
}

fn linked_refs(conn: &Connection, kind: RefKind, review_id: i64) -> Result<Vec<(i64, String)>, Error> {
    let sql = format!(
        "SELECT t.id, t.name FROM {table} t
         JOIN {link} l ON l.{column} = t.id
         WHERE l.review_id = ?
         ORDER BY t.name",
        table = kind.table(),
        link = kind.link_table(),
        column = kind.link_column()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([review_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

fn attach_links(conn: &Connection, reviews: &mut [Review]) -> Result<(), Error> {
    for review in reviews.iter_mut() {
        review.ingredients = linked_refs(conn, RefKind::Ingredient, review.id)?
            .into_iter()
            .map(|(id, name)| Ingredient { id, name })
            .collect();
        review.utensils = linked_refs(conn, RefKind::Utensil, review.id)?
            .into_iter()
            .map(|(id, name)| Utensil { id, name })
            .collect();
    }
    Ok(())
}

fn list_refs(
    conn: &Connection,
    kind: RefKind,
    query: Option<&str>,
) -> Result<Vec<(i64, String)>, Error> {
    let mut sql = format!("SELECT id, name FROM {}", kind.table());
    let mut args = Vec::new();
    if let Some(query) = query {
        sql.push_str(" WHERE name LIKE ? ESCAPE '\\'");
        args.push(like_pattern(query));
    }
    sql.push_str(" ORDER BY name");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(args.iter()), |row| {
        Ok((row.get(0)?, row.get(1)?))
    })?;
    rows.collect()
}

// Names are matched case-insensitively; the stored spelling wins.
fn get_or_create_ref(
    conn: &Connection,
    kind: RefKind,
    name: &str,
) -> Result<(i64, String), Error> {
    let name = name.trim();
    match conn.query_row(
        &format!("SELECT id, name FROM {} WHERE name = ?", kind.table()),
        [name],
        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
    ) {
        Ok(found) => Ok(found),
        Err(Error::QueryReturnedNoRows) => {
            conn.execute(&format!("INSERT INTO {} (name) VALUES (?)", kind.table()), [name])?;
            debug!("[DB] Created {} '{}'", kind.table(), name);
            Ok((conn.last_insert_rowid(), name.to_string()))
        }
        Err(e) => Err(e),
    }
}

fn sync_links(conn: &Connection, review_id: i64, draft: &ReviewDraft) -> Result<(), Error> {
    let groups = [
        (RefKind::Ingredient, &draft.ingredient_ids, &draft.new_ingredients),
        (RefKind::Utensil, &draft.utensil_ids, &draft.new_utensils),
    ];
    for (kind, ids, new_names) in groups {
        let mut all_ids = ids.clone();
        for name in new_names {
            all_ids.push(get_or_create_ref(conn, kind, name)?.0);
        }
        let sql = format!(
            "INSERT OR IGNORE INTO {} (review_id, {}) VALUES (?, ?)",
            kind.link_table(),
            kind.link_column()
        );
        for id in all_ids {
            conn.execute(&sql, [review_id, id])?;
        }
    }
    Ok(())
}

fn slug_exists(conn: &Connection, slug: &str, exclude_id: Option<i64>) -> Result<bool, Error> {
    let mut stmt = conn.prepare("SELECT 1 FROM reviews WHERE slug = ? AND id != ?")?;
    stmt.exists(params![slug, exclude_id.unwrap_or(-1)])
}

/// Case-insensitive substring pattern with LIKE wildcards escaped.
fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
