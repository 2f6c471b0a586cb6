use sqlx::SqlitePool;

use crate::db::PostWithTopic;
use crate::error::StoreError;

/// Hard cap on rows a single search returns.
pub const MAX_SEARCH_LIMIT: i64 = 100;
/// Page size used when a search does not ask for one.
pub const DEFAULT_SEARCH_LIMIT: i64 = 25;

/// Filters for a post search. All filters are optional and combine with
/// AND; build one with struct update syntax from `default()`.
#[derive(Debug, Clone, Default)]
pub struct PostSearch {
    /// Substring match against post bodies. LIKE wildcards in the input are
    /// escaped, so `100%` matches the literal text.
    pub text: Option<String>,
    pub topic_id: Option<i64>,
    pub creator_id: Option<i64>,
    /// Include soft-deleted posts and posts of deleted topics.
    pub include_deleted: bool,
    /// Zero or negative means `DEFAULT_SEARCH_LIMIT`; values above
    /// `MAX_SEARCH_LIMIT` are clamped.
    pub limit: i64,
    pub offset: i64,
}

/// Search posts, newest first, each row joined with its topic title.
pub async fn search_posts(
    pool: &SqlitePool,
    search: &PostSearch,
) -> Result<Vec<PostWithTopic>, StoreError> {
    let text_pattern = search
        .text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(like_pattern);

    let mut where_clauses: Vec<String> = Vec::new();
    if !search.include_deleted {
        where_clauses.push("p.is_deleted = 0 AND t.is_deleted = 0".to_string());
    }
    if search.topic_id.is_some() {
        where_clauses.push("p.topic_id = ?".to_string());
    }
    if search.creator_id.is_some() {
        where_clauses.push("p.creator_id = ?".to_string());
    }
    if text_pattern.is_some() {
        where_clauses.push(r"p.body LIKE ? ESCAPE '\'".to_string());
    }

    let where_clause = if where_clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", where_clauses.join(" AND "))
    };

    let query_str = format!(
        r"
        SELECT
            p.id, p.topic_id, t.title AS topic_title, p.body,
            p.creator_id, p.updater_id, p.is_deleted, p.is_sticky,
            p.created_at, p.updated_at
        FROM posts p
        JOIN topics t ON t.id = p.topic_id
        {where_clause}
        ORDER BY p.created_at DESC, p.id DESC
        LIMIT ? OFFSET ?
        "
    );

    // Binds must line up with the ? order in the clauses above.
    let mut query = sqlx::query_as(&query_str);
    if let Some(topic_id) = search.topic_id {
        query = query.bind(topic_id);
    }
    if let Some(creator_id) = search.creator_id {
        query = query.bind(creator_id);
    }
    if let Some(pattern) = &text_pattern {
        query = query.bind(pattern.clone());
    }

    let rows: Vec<PostWithTopic> = query
        .bind(effective_limit(search.limit))
        .bind(search.offset.max(0))
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

fn effective_limit(limit: i64) -> i64 {
    if limit <= 0 {
        DEFAULT_SEARCH_LIMIT
    } else {
        limit.min(MAX_SEARCH_LIMIT)
    }
}

/// Escape LIKE wildcards in user text and wrap it for substring matching.
fn like_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', r"\\")
        .replace('%', r"\%")
        .replace('_', r"\_");
    format!("%{escaped}%")
}
