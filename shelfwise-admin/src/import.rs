use std::path::Path;

use anyhow::Context;
use shelfwise_common::{Database, Error, NewBook};
use tracing::{info, warn};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

pub fn read_catalog(path: &Path) -> anyhow::Result<Vec<NewBook>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open catalog {}", path.display()))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("Failed to parse catalog {}", path.display()))
}

/// Adds every book, skipping duplicates and invalid entries.
pub async fn import_books(db: &Database, books: &[NewBook]) -> anyhow::Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    for book in books {
        match db.create_book(book).await {
            Ok(detail) => {
                summary.imported += 1;
                info!("Imported {} ({})", detail.book.title, detail.book.id);
            }
            Err(Error::Conflict(reason) | Error::Invalid(reason)) => {
                summary.skipped += 1;
                warn!("Skipping {:?}: {reason}", book.title);
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to import {:?}", book.title)),
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicates_and_untitled_books_are_skipped() {
        let db = Database::in_memory().await.unwrap();
        let catalog: Vec<NewBook> = serde_json::from_str(
            r#"[
                {"title": "Dune", "isbn": "9780441013593", "authors": ["Frank Herbert"], "genres": ["Science Fiction"]},
                {"title": "Dune (again)", "isbn": "9780441013593"},
                {"title": "   "},
                {"title": "Emma", "authors": ["Jane Austen"], "publisher": "John Murray"}
            ]"#,
        )
        .unwrap();

        let summary = import_books(&db, &catalog).await.unwrap();

        assert_eq!(summary, ImportSummary { imported: 2, skipped: 2 });
        let page = shelfwise_common::Page::default();
        assert_eq!(db.search_books(None, None, page).await.unwrap().len(), 2);
    }
}
