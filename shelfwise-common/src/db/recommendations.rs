use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;
use tracing::{debug, info, warn};

use super::Database;
use crate::recommend::{self, Candidate, CandidateSources, Recommendation};
use crate::Result;

const AFFINITY_SIZE: i64 = 3;
const HIGHLY_RATED_THRESHOLD: f64 = 4.0;

// ?1 is always the requesting user.
const NOT_ALREADY_KNOWN: &str = r#"
    b.id NOT IN (SELECT book_id FROM reading_progress WHERE user_id = ?1)
    AND b.id NOT IN (
        SELECT sb.book_id FROM shelf_books sb
        JOIN shelves s ON s.id = sb.shelf_id
        WHERE s.user_id = ?1
    )
"#;

#[derive(Debug, Clone, Default)]
pub struct RecommendationRequest {
    pub user_id: i64,
    pub limit: Option<usize>,
    pub exclude: Vec<i64>,
    pub refresh: bool,
}

#[derive(Debug, Clone, Copy)]
enum Affinity {
    Genre,
    Author,
}

impl Affinity {
    fn name(self) -> &'static str {
        match self {
            Affinity::Genre => "genre",
            Affinity::Author => "author",
        }
    }

    fn top_sql(self) -> &'static str {
        match self {
            Affinity::Genre => {
                r#"
                SELECT g.id FROM reading_progress rp
                JOIN book_genres bg ON bg.book_id = rp.book_id
                JOIN genres g ON g.id = bg.genre_id
                WHERE rp.user_id = ? AND rp.status IN ('reading', 'read')
                GROUP BY g.id
                ORDER BY COUNT(*) DESC, g.name
                LIMIT ?
                "#
            }
            Affinity::Author => {
                r#"
                SELECT a.id FROM reading_progress rp
                JOIN book_authors ba ON ba.book_id = rp.book_id
                JOIN authors a ON a.id = ba.author_id
                WHERE rp.user_id = ? AND rp.status IN ('reading', 'read')
                GROUP BY a.id
                ORDER BY COUNT(*) DESC, a.name
                LIMIT ?
                "#
            }
        }
    }

    fn candidates_sql(self, placeholders: &str) -> String {
        let join = match self {
            Affinity::Genre => {
                "JOIN book_genres link ON link.book_id = b.id JOIN genres m ON m.id = link.genre_id"
            }
            Affinity::Author => {
                "JOIN book_authors link ON link.book_id = b.id JOIN authors m ON m.id = link.author_id"
            }
        };

        format!(
            r#"
            SELECT b.id AS book_id, b.title, b.cover_url, m.name AS matched,
                   (SELECT AVG(rp.rating) FROM reading_progress rp WHERE rp.book_id = b.id) AS average_rating
            FROM books b
            {join}
            WHERE m.id IN ({placeholders}) AND {NOT_ALREADY_KNOWN}
            ORDER BY average_rating IS NULL, average_rating DESC, b.id
            LIMIT ?2
            "#
        )
    }
}

impl Database {
    async fn top_affinities(&self, user_id: i64, affinity: Affinity) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(affinity.top_sql())
            .bind(user_id)
            .bind(AFFINITY_SIZE)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn affinity_candidates(
        &self,
        user_id: i64,
        affinity: Affinity,
        fetch: i64,
    ) -> Result<Vec<Candidate>> {
        let ids = self.top_affinities(user_id, affinity).await?;
        if ids.is_empty() {
            debug!("No {} affinity for user {user_id}", affinity.name());
            return Ok(vec![]);
        }

        let placeholders = (3..3 + ids.len()).map(|i| format!("?{i}")).join(", ");
        let sql = affinity.candidates_sql(&placeholders);

        let mut query = sqlx::query_as::<_, Candidate>(&sql).bind(user_id).bind(fetch);
        for id in ids {
            query = query.bind(id);
        }

        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn highly_rated_candidates(&self, user_id: i64, fetch: i64) -> Result<Vec<Candidate>> {
        let sql = format!(
            r#"
            SELECT b.id AS book_id, b.title, b.cover_url, NULL AS matched,
                   AVG(rp.rating) AS average_rating
            FROM books b
            JOIN reading_progress rp ON rp.book_id = b.id
            WHERE rp.rating IS NOT NULL AND {NOT_ALREADY_KNOWN}
            GROUP BY b.id
            HAVING AVG(rp.rating) >= ?3
            ORDER BY average_rating DESC, COUNT(rp.rating) DESC, b.id
            LIMIT ?2
            "#
        );

        let candidates = sqlx::query_as::<_, Candidate>(&sql)
            .bind(user_id)
            .bind(fetch)
            .bind(HIGHLY_RATED_THRESHOLD)
            .fetch_all(&self.pool)
            .await?;

        Ok(candidates)
    }

    /// Books the user already has progress for or keeps on a shelf.
    async fn known_books(&self, user_id: i64) -> Result<HashSet<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT book_id FROM reading_progress WHERE user_id = ?1
            UNION
            SELECT sb.book_id FROM shelf_books sb
            JOIN shelves s ON s.id = sb.shelf_id
            WHERE s.user_id = ?1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().collect())
    }

    async fn cached_recommendations(&self, user_id: i64) -> Result<Option<(usize, Vec<Recommendation>)>> {
        let row: Option<(i64, String, DateTime<Utc>)> = sqlx::query_as(
            "SELECT request_limit, payload, expires_at FROM recommendation_cache WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((limit, payload, expires_at)) = row else {
            return Ok(None);
        };
        if expires_at <= Utc::now() {
            debug!("Recommendation cache for user {user_id} expired at {expires_at}");
            return Ok(None);
        }

        match serde_json::from_str::<Vec<Recommendation>>(&payload) {
            Ok(list) => Ok(Some((limit.max(0) as usize, list))),
            Err(e) => {
                warn!("Discarding unreadable recommendation cache for user {user_id}: {e}");
                Ok(None)
            }
        }
    }

    async fn store_recommendations(
        &self,
        user_id: i64,
        limit: usize,
        list: &[Recommendation],
        ttl: Duration,
    ) -> Result<()> {
        let payload = serde_json::to_string(list).map_err(|e| crate::Error::invalid(e.to_string()))?;
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO recommendation_cache (user_id, request_limit, payload, generated_at, expires_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                request_limit = excluded.request_limit,
                payload = excluded.payload,
                generated_at = excluded.generated_at,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .bind(payload)
        .bind(now)
        .bind(now + ttl)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Best-effort recommendations: failing sources contribute nothing and
    /// cache problems are logged, so this never returns an error.
    pub async fn recommendations(
        &self,
        request: &RecommendationRequest,
        ttl: Duration,
    ) -> Vec<Recommendation> {
        let user_id = request.user_id;
        let limit = recommend::clamp_limit(request.limit);
        let exclude: HashSet<i64> = request.exclude.iter().copied().collect();

        if !request.refresh {
            match self.cached_recommendations(user_id).await {
                Ok(Some((cached_limit, list))) if cached_limit >= limit => {
                    match self.known_books(user_id).await {
                        Ok(known) => {
                            debug!("Serving recommendations for user {user_id} from cache");
                            let excluded: HashSet<i64> = exclude.union(&known).copied().collect();
                            return recommend::narrow(list, limit, &excluded);
                        }
                        Err(e) => warn!("Failed to load known books for user {user_id}: {e}"),
                    }
                }
                Ok(_) => {}
                Err(e) => warn!("Failed to read recommendation cache for user {user_id}: {e}"),
            }
        }

        let fetch = (limit * 2 + exclude.len()) as i64;
        let (by_genre, by_author, highly_rated) = futures::join!(
            self.affinity_candidates(user_id, Affinity::Genre, fetch),
            self.affinity_candidates(user_id, Affinity::Author, fetch),
            self.highly_rated_candidates(user_id, fetch),
        );

        let or_empty = |source: &str, result: Result<Vec<Candidate>>| {
            result.unwrap_or_else(|e| {
                warn!("Recommendation source {source} failed for user {user_id}: {e}");
                vec![]
            })
        };
        let sources = CandidateSources {
            by_genre: or_empty("genre", by_genre),
            by_author: or_empty("author", by_author),
            highly_rated: or_empty("highly_rated", highly_rated),
        };

        let list = recommend::rank(sources, limit, &exclude);
        info!("Generated {} recommendations for user {user_id}", list.len());

        if let Err(e) = self.store_recommendations(user_id, limit, &list, ttl).await {
            warn!("Failed to cache recommendations for user {user_id}: {e}");
        }

        list
    }
}
