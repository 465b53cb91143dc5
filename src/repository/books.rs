//! Books repository for database operations

use chrono::Utc;
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, BookRow, BookStatus, CreateBook, UpdateBook},
};

use super::contains_pattern;

const DUPLICATE_TITLE: &str = "A book with this title already exists";

/// Book row for a bulk load; a borrower marks the book as borrowed
pub struct NewBook<'a> {
    pub title: &'a str,
    pub author: &'a str,
    pub borrower: Option<&'a str>,
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Number of books in the catalog
    pub async fn count(&self) -> AppResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, BookRow>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Book::from)
            .ok_or_else(|| AppError::BookNotFound(format!("Book with id {} not found", id)))
    }

    /// Check if a title is already used, optionally ignoring one book
    pub async fn title_exists(&self, title: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM books WHERE LOWER(title) = LOWER($1) AND ($2::INT IS NULL OR id != $2))",
        )
        .bind(title)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Search books with filters and pagination
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM books WHERE TRUE");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM books WHERE TRUE");
        push_filters(&mut select, query);
        select
            .push(" ORDER BY LOWER(title) LIMIT ")
            .push_bind(query.per_page())
            .push(" OFFSET ")
            .push_bind(query.offset());

        let books = select
            .build_query_as::<BookRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Book::from)
            .collect();

        Ok((books, total))
    }

    /// Insert a new available book
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        sqlx::query_as::<_, BookRow>(
            r#"
            INSERT INTO books (title, author, status)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(BookStatus::Available.as_str())
        .fetch_one(&self.pool)
        .await
        .map(Book::from)
        .map_err(|e| AppError::from_unique_violation(e, DUPLICATE_TITLE))
    }

    /// Update title and/or author
    pub async fn update(&self, id: i32, book: &UpdateBook) -> AppResult<Book> {
        sqlx::query_as::<_, BookRow>(
            r#"
            UPDATE books
            SET title = COALESCE($2, title),
                author = COALESCE($3, author),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&book.title)
        .bind(&book.author)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, DUPLICATE_TITLE))?
        .map(Book::from)
        .ok_or_else(|| AppError::BookNotFound(format!("Book with id {} not found", id)))
    }

    /// Delete a book
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::BookNotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }

    /// Flip an available book to borrowed.
    ///
    /// Returns `None` when the book does not exist or is not available; the
    /// status check and the write happen in one statement.
    pub async fn mark_borrowed(&self, id: i32, borrower: &str) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, BookRow>(
            r#"
            UPDATE books
            SET status = $2, borrower = $3, borrowed_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = $4
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(BookStatus::Borrowed.as_str())
        .bind(borrower)
        .bind(BookStatus::Available.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(book.map(Book::from))
    }

    /// Flip a borrowed book back to available, clearing the borrower
    pub async fn mark_returned(&self, id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, BookRow>(
            r#"
            UPDATE books
            SET status = $2, borrower = NULL, borrowed_at = NULL, updated_at = NOW()
            WHERE id = $1 AND status = $3
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(BookStatus::Available.as_str())
        .bind(BookStatus::Borrowed.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(book.map(Book::from))
    }

    /// Insert `books` only if the catalog is empty, all or nothing.
    ///
    /// The table lock makes concurrent loaders queue up; those that find rows
    /// after acquiring it insert nothing and return 0.
    pub async fn load_if_empty(&self, books: &[NewBook<'_>]) -> AppResult<usize> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("LOCK TABLE books IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&mut *tx)
            .await?;
        if existing > 0 {
            return Ok(0);
        }

        for book in books {
            let (status, borrowed_at) = match book.borrower {
                Some(_) => (BookStatus::Borrowed, Some(Utc::now())),
                None => (BookStatus::Available, None),
            };
            sqlx::query(
                r#"
                INSERT INTO books (title, author, status, borrower, borrowed_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(book.title)
            .bind(book.author)
            .bind(status.as_str())
            .bind(book.borrower)
            .bind(borrowed_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::from_unique_violation(e, DUPLICATE_TITLE))?;
        }

        tx.commit().await?;
        Ok(books.len())
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &BookQuery) {
    if let Some(ref title) = query.title {
        builder.push(" AND title ILIKE ").push_bind(contains_pattern(title));
    }
    if let Some(ref author) = query.author {
        builder.push(" AND author ILIKE ").push_bind(contains_pattern(author));
    }
    if let Some(ref q) = query.q {
        let pattern = contains_pattern(q);
        builder
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR author ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(status) = query.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
}
