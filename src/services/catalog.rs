//! Catalog management service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery, CreateBook, UpdateBook},
        Session,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// All books, or those matching the search terms
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        self.repository.books.search(&query.normalized()).await
    }

    /// Get book by ID
    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Add a book; titles are unique
    pub async fn add_book(&self, book: CreateBook) -> AppResult<Book> {
        let book = book.normalized();
        book.validate()?;

        if self.repository.books.title_exists(&book.title, None).await? {
            return Err(AppError::Conflict(format!(
                "A book titled '{}' already exists",
                book.title
            )));
        }

        let created = self.repository.books.create(&book).await?;
        tracing::info!(book_id = created.id, title = %created.title, "Book added");
        Ok(created)
    }

    /// Edit title and/or author
    pub async fn edit_book(&self, id: i32, book: UpdateBook) -> AppResult<Book> {
        let book = book.normalized();
        book.validate()?;

        // 404 before 409
        self.repository.books.get_by_id(id).await?;

        if let Some(ref title) = book.title {
            if self.repository.books.title_exists(title, Some(id)).await? {
                return Err(AppError::Conflict(format!(
                    "A book titled '{}' already exists",
                    title
                )));
            }
        }

        let updated = self.repository.books.update(id, &book).await?;
        tracing::info!(book_id = id, "Book updated");
        Ok(updated)
    }

    /// Delete a book
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        let book = self.repository.books.get_by_id(id).await?;
        if let Some(ref borrower) = book.borrower {
            tracing::warn!(book_id = id, borrower = %borrower, "Deleting a borrowed book");
        }

        self.repository.books.delete(id).await?;
        tracing::info!(book_id = id, title = %book.title, "Book deleted");
        Ok(())
    }

    /// Borrow an available book under the given name
    pub async fn borrow_book(&self, id: i32, borrower: &str) -> AppResult<Book> {
        match self.repository.books.mark_borrowed(id, borrower).await? {
            Some(book) => {
                tracing::info!(book_id = id, borrower = %borrower, "Book borrowed");
                Ok(book)
            }
            None => {
                let book = self.repository.books.get_by_id(id).await?;
                Err(AppError::NotAvailable(format!(
                    "'{}' is already borrowed",
                    book.title
                )))
            }
        }
    }

    /// Return a borrowed book on behalf of the session's member
    pub async fn return_book(&self, id: i32, session: &Session) -> AppResult<Book> {
        let book = self.repository.books.get_by_id(id).await?;
        if book.is_available() {
            return Err(AppError::NotBorrowed(format!("'{}' is not borrowed", book.title)));
        }
        session.require_can_return(&book)?;

        let returned = self
            .repository
            .books
            .mark_returned(id)
            .await?
            .ok_or_else(|| AppError::NotBorrowed(format!("'{}' is not borrowed", book.title)))?;

        tracing::info!(book_id = id, member_id = session.member.id, "Book returned");
        Ok(returned)
    }
}
