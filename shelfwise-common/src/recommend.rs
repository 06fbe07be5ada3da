//! Recommendation scoring.
//!
//! Three candidate passes (genre affinity, author affinity, highly rated) are
//! capped, deduplicated against an exclusion set, concatenated and ordered by
//! score. Scores are kept in hundredths so that equal scores compare equal and
//! the stable sort leaves genre picks ahead of author picks ahead of fallbacks.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 50;

const GENRE_BASE: u32 = 80;
const AUTHOR_BASE: u32 = 75;
const FALLBACK_BASE: u32 = 60;

// Shares of the limit, in tenths.
const GENRE_SHARE: usize = 4;
const AUTHOR_SHARE: usize = 3;

/// A book surfaced by one of the candidate queries.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Candidate {
    pub book_id: i64,
    pub title: String,
    pub cover_url: Option<String>,
    /// Genre or author name that produced the match.
    pub matched: Option<String>,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct CandidateSources {
    pub by_genre: Vec<Candidate>,
    pub by_author: Vec<Candidate>,
    pub highly_rated: Vec<Candidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Reason {
    Genre { genre: String },
    Author { author: String },
    HighlyRated,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub rank: usize,
    pub book_id: i64,
    pub title: String,
    pub cover_url: Option<String>,
    pub average_rating: Option<f64>,
    pub score: f64,
    pub reason: Reason,
}

pub fn clamp_limit(requested: Option<usize>) -> usize {
    requested.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

pub fn genre_cap(limit: usize) -> usize {
    (limit * GENRE_SHARE).div_ceil(10)
}

pub fn author_cap(limit: usize) -> usize {
    (limit * AUTHOR_SHARE).div_ceil(10)
}

struct Scored {
    hundredths: u32,
    recommendation: Recommendation,
}

fn take_pass(
    candidates: Vec<Candidate>,
    cap: usize,
    base: u32,
    reason: impl Fn(&Candidate) -> Reason,
    seen: &mut HashSet<i64>,
    out: &mut Vec<Scored>,
) {
    let picked = candidates
        .into_iter()
        .filter(|c| seen.insert(c.book_id))
        .take(cap);

    for (index, candidate) in picked.enumerate() {
        let hundredths = base.saturating_sub(index as u32);
        out.push(Scored {
            hundredths,
            recommendation: Recommendation {
                rank: 0,
                reason: reason(&candidate),
                book_id: candidate.book_id,
                title: candidate.title,
                cover_url: candidate.cover_url,
                average_rating: candidate.average_rating,
                score: f64::from(hundredths) / 100.0,
            },
        });
    }
}

/// Merges the candidate passes into a ranked list of at most `limit` books.
pub fn rank(sources: CandidateSources, limit: usize, exclude: &HashSet<i64>) -> Vec<Recommendation> {
    let mut seen = exclude.clone();
    let mut scored = Vec::with_capacity(limit);

    take_pass(
        sources.by_genre,
        genre_cap(limit),
        GENRE_BASE,
        |c| Reason::Genre {
            genre: c.matched.clone().unwrap_or_default(),
        },
        &mut seen,
        &mut scored,
    );
    take_pass(
        sources.by_author,
        author_cap(limit),
        AUTHOR_BASE,
        |c| Reason::Author {
            author: c.matched.clone().unwrap_or_default(),
        },
        &mut seen,
        &mut scored,
    );
    let remaining = limit.saturating_sub(scored.len());
    take_pass(
        sources.highly_rated,
        remaining,
        FALLBACK_BASE,
        |_| Reason::HighlyRated,
        &mut seen,
        &mut scored,
    );

    // sort_by is stable, so equal scores keep pass order
    scored.sort_by(|a, b| b.hundredths.cmp(&a.hundredths));
    scored.truncate(limit);

    scored
        .into_iter()
        .enumerate()
        .map(|(index, s)| Recommendation {
            rank: index + 1,
            ..s.recommendation
        })
        .collect()
}

/// Reuses a cached list for a smaller request: drops excluded books, truncates and re-ranks.
pub fn narrow(
    cached: Vec<Recommendation>,
    limit: usize,
    exclude: &HashSet<i64>,
) -> Vec<Recommendation> {
    cached
        .into_iter()
        .filter(|r| !exclude.contains(&r.book_id))
        .take(limit)
        .enumerate()
        .map(|(index, r)| Recommendation {
            rank: index + 1,
            ..r
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(ids: impl IntoIterator<Item = i64>, matched: &str) -> Vec<Candidate> {
        ids.into_iter()
            .map(|id| Candidate {
                book_id: id,
                title: format!("Book {id}"),
                cover_url: None,
                matched: Some(matched.to_string()),
                average_rating: Some(4.2),
            })
            .collect()
    }

    #[test]
    fn passes_are_capped_by_share_of_limit() {
        let sources = CandidateSources {
            by_genre: candidates(1..=20, "Fantasy"),
            by_author: candidates(101..=120, "Le Guin"),
            highly_rated: candidates(201..=220, ""),
        };

        let result = rank(sources, 10, &HashSet::new());

        assert_eq!(result.len(), 10);
        let genre = result.iter().filter(|r| matches!(r.reason, Reason::Genre { .. })).count();
        let author = result.iter().filter(|r| matches!(r.reason, Reason::Author { .. })).count();
        let fallback = result.iter().filter(|r| r.reason == Reason::HighlyRated).count();
        assert_eq!((genre, author, fallback), (4, 3, 3));
    }

    #[test]
    fn excluded_and_duplicate_books_are_skipped() {
        let sources = CandidateSources {
            by_genre: candidates([1, 2, 3], "Mystery"),
            by_author: candidates([2, 3, 4], "Christie"),
            highly_rated: candidates([4, 5, 6], ""),
        };
        let exclude = HashSet::from([1]);

        let result = rank(sources, 10, &exclude);
        let ids: Vec<i64> = result.iter().map(|r| r.book_id).collect();

        assert_eq!(ids, vec![2, 3, 4, 5, 6]);
        assert_eq!(result[2].reason, Reason::Author { author: "Christie".into() });
    }

    #[test]
    fn ties_keep_genre_before_author() {
        let sources = CandidateSources {
            by_genre: candidates(1..=8, "Sci-Fi"),
            by_author: candidates(101..=106, "Banks"),
            highly_rated: vec![],
        };

        let result = rank(sources, 20, &HashSet::new());

        // sixth genre pick scores 0.75, same as the first author pick
        assert_eq!(result[5].book_id, 6);
        assert_eq!(result[5].score, 0.75);
        assert_eq!(result[6].book_id, 101);
        assert_eq!(result[6].score, 0.75);
        assert!(result.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(result.iter().map(|r| r.rank).collect::<Vec<_>>(), (1..=result.len()).collect::<Vec<_>>());
    }

    #[test]
    fn fallback_fills_what_affinity_passes_leave() {
        let sources = CandidateSources {
            by_genre: candidates([1], "Poetry"),
            by_author: vec![],
            highly_rated: candidates(10..=30, ""),
        };

        let result = rank(sources, 5, &HashSet::new());

        assert_eq!(result.len(), 5);
        assert_eq!(result[0].book_id, 1);
        assert_eq!(result[1].score, 0.6);
        assert_eq!(result[4].score, 0.57);
    }

    #[test]
    fn no_history_yields_empty_list() {
        assert!(rank(CandidateSources::default(), 10, &HashSet::new()).is_empty());
    }

    #[test]
    fn narrow_filters_and_reranks() {
        let sources = CandidateSources {
            highly_rated: candidates(1..=6, ""),
            ..Default::default()
        };
        let cached = rank(sources, 6, &HashSet::new());

        let narrowed = narrow(cached, 3, &HashSet::from([2]));

        assert_eq!(narrowed.iter().map(|r| r.book_id).collect::<Vec<_>>(), vec![1, 3, 4]);
        assert_eq!(narrowed[1].rank, 2);
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(clamp_limit(None), DEFAULT_LIMIT);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(500)), MAX_LIMIT);
    }
}
