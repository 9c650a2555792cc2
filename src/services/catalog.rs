//! Catalog management service: books, authors, genres and languages

use std::collections::{HashMap, HashSet};

use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, AuthorFields, AuthorInput, AuthorQuery, AuthorView},
        book::{search_terms, Book, BookFields, BookInput, BookQuery, BookView, RelatedBook},
        book_instance::BookInstanceView,
        genre::{Genre, GenreInput, GenreName},
        language::{Language, LanguageInput},
        media_url,
        review::ReviewView,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    media_prefix: String,
}

impl CatalogService {
    pub fn new(repository: Repository, media_prefix: String) -> Self {
        Self {
            repository,
            media_prefix,
        }
    }

    // ---- Books ----

    pub async fn list_books(&self, query: &BookQuery) -> AppResult<Vec<BookView>> {
        let books = self.repository.books.list(query).await?;
        self.book_views(books).await
    }

    pub async fn get_book(&self, id: i32) -> AppResult<BookView> {
        let book = self.repository.books.get_by_id(id).await?;
        self.book_view(book).await
    }

    pub async fn create_book(&self, input: BookInput) -> AppResult<BookView> {
        input.validate()?;
        input.require_full()?;

        let mut fields = BookFields::default();
        fields.apply(input);
        self.check_book(&fields, None).await?;

        let id = self.repository.books.create(&fields).await?;
        tracing::info!(book_id = id, isbn = %fields.isbn, "Book created");
        self.get_book(id).await
    }

    /// Full (`partial == false`) or partial update. Absent fields keep their value.
    pub async fn update_book(&self, id: i32, input: BookInput, partial: bool) -> AppResult<BookView> {
        input.validate()?;
        if !partial {
            input.require_full()?;
        }

        let book = self.repository.books.get_by_id(id).await?;
        let author_ids = self.repository.books.author_ids(id).await?;
        let genre_ids = self.repository.books.genre_ids(id).await?;

        let mut fields = BookFields::from_book(&book, author_ids, genre_ids);
        fields.apply(input);
        self.check_book(&fields, Some(id)).await?;

        self.repository.books.update(id, &fields).await?;
        self.get_book(id).await
    }

    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }

    async fn check_book(&self, fields: &BookFields, exclude_id: Option<i32>) -> AppResult<()> {
        fields.validate()?;

        if !self.repository.languages.exists(fields.language_id).await? {
            return Err(invalid_pk("language", fields.language_id));
        }
        let found = self.repository.authors.existing_ids(&fields.author_ids).await?;
        if let Some(missing) = first_missing(&fields.author_ids, &found) {
            return Err(invalid_pk("authors", missing));
        }
        let found = self.repository.genres.existing_ids(&fields.genre_ids).await?;
        if let Some(missing) = first_missing(&fields.genre_ids, &found) {
            return Err(invalid_pk("genre", missing));
        }
        if self.repository.books.isbn_exists(&fields.isbn, exclude_id).await? {
            return Err(AppError::field("isbn", "book with this isbn already exists."));
        }
        Ok(())
    }

    async fn book_view(&self, book: Book) -> AppResult<BookView> {
        self.book_views(vec![book])
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal("Book projection is empty".to_string()))
    }

    /// Full projections for `books`, loading every nested collection in
    /// one query per relation
    async fn book_views(&self, books: Vec<Book>) -> AppResult<Vec<BookView>> {
        if books.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = books.iter().map(|b| b.id).collect();

        let book_authors = self.repository.authors.by_books(&ids).await?;
        let author_ids: Vec<i32> = book_authors
            .iter()
            .map(|(_, a)| a.id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let related = self.related_books(&author_ids).await?;

        let mut authors: HashMap<i32, Vec<AuthorView>> = HashMap::new();
        for (book_id, author) in book_authors {
            let book_set = related.get(&author.id).cloned().unwrap_or_default();
            authors
                .entry(book_id)
                .or_default()
                .push(self.author_view(author, book_set));
        }

        let mut genres: HashMap<i32, Vec<GenreName>> = HashMap::new();
        for (book_id, name) in self.repository.genres.names_by_books(&ids).await? {
            genres.entry(book_id).or_default().push(GenreName { name });
        }

        let mut copies: HashMap<i32, Vec<BookInstanceView>> = HashMap::new();
        for copy in self.repository.book_instances.by_books(&ids).await? {
            copies.entry(copy.book_id).or_default().push(copy.into());
        }

        let mut reviews: HashMap<i32, Vec<ReviewView>> = HashMap::new();
        for review in self.repository.reviews.by_books(&ids).await? {
            reviews.entry(review.book_id).or_default().push(review.into());
        }

        Ok(books
            .into_iter()
            .map(|book| BookView {
                id: book.id,
                title: book.title,
                authors: authors.remove(&book.id).unwrap_or_default(),
                image: media_url(&self.media_prefix, &book.image),
                summary: book.summary,
                isbn: book.isbn,
                bbk: book.bbk,
                copy_sign: book.copy_sign,
                pages: book.pages,
                language: book.language,
                genre: genres.remove(&book.id).unwrap_or_default(),
                bookinstance_set: copies.remove(&book.id).unwrap_or_default(),
                review_set: reviews.remove(&book.id).unwrap_or_default(),
            })
            .collect())
    }

    /// Book summaries per author id
    async fn related_books(&self, author_ids: &[i32]) -> AppResult<HashMap<i32, Vec<RelatedBook>>> {
        if author_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let pairs = self.repository.books.by_authors(author_ids).await?;

        let book_ids: Vec<i32> = pairs
            .iter()
            .map(|(_, b)| b.id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let mut copy_ids: HashMap<i32, Vec<Uuid>> = HashMap::new();
        for copy in self.repository.book_instances.by_books(&book_ids).await? {
            copy_ids.entry(copy.book_id).or_default().push(copy.id);
        }

        let mut related: HashMap<i32, Vec<RelatedBook>> = HashMap::new();
        for (author_id, book) in pairs {
            related.entry(author_id).or_default().push(RelatedBook {
                id: book.id,
                title: book.title,
                image: media_url(&self.media_prefix, &book.image),
                summary: book.summary,
                bookinstance_set: copy_ids.get(&book.id).cloned().unwrap_or_default(),
            });
        }
        Ok(related)
    }

    // ---- Authors ----

    pub async fn list_authors(&self, query: &AuthorQuery) -> AppResult<Vec<AuthorView>> {
        let authors = self
            .repository
            .authors
            .list(&search_terms(query.search.as_deref()))
            .await?;
        self.author_views(authors).await
    }

    pub async fn get_author(&self, id: i32) -> AppResult<AuthorView> {
        let author = self.repository.authors.get_by_id(id).await?;
        self.author_views(vec![author])
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal("Author projection is empty".to_string()))
    }

    pub async fn create_author(&self, input: AuthorInput) -> AppResult<AuthorView> {
        input.require_full()?;

        let mut fields = AuthorFields::default();
        fields.apply(input);
        fields.check()?;

        let author = self.repository.authors.create(&fields).await?;
        tracing::info!(author_id = author.id, "Author created");
        self.get_author(author.id).await
    }

    pub async fn update_author(&self, id: i32, input: AuthorInput, partial: bool) -> AppResult<AuthorView> {
        if !partial {
            input.require_full()?;
        }

        let author = self.repository.authors.get_by_id(id).await?;
        let mut fields = author.fields();
        fields.apply(input);
        fields.check()?;

        self.repository.authors.update(id, &fields).await?;
        self.get_author(id).await
    }

    pub async fn delete_author(&self, id: i32) -> AppResult<()> {
        self.repository.authors.delete(id).await?;
        tracing::info!(author_id = id, "Author deleted");
        Ok(())
    }

    async fn author_views(&self, authors: Vec<Author>) -> AppResult<Vec<AuthorView>> {
        let ids: Vec<i32> = authors.iter().map(|a| a.id).collect();
        let mut related = self.related_books(&ids).await?;
        Ok(authors
            .into_iter()
            .map(|author| {
                let book_set = related.remove(&author.id).unwrap_or_default();
                self.author_view(author, book_set)
            })
            .collect())
    }

    fn author_view(&self, author: Author, book_set: Vec<RelatedBook>) -> AuthorView {
        AuthorView {
            id: author.id,
            first_name: author.first_name,
            last_name: author.last_name,
            middle_name: author.middle_name,
            date_of_birth: author.date_of_birth,
            date_of_death: author.date_of_death,
            image: media_url(&self.media_prefix, &author.image),
            book_set,
        }
    }

    // ---- Genres ----

    pub async fn list_genres(&self) -> AppResult<Vec<Genre>> {
        self.repository.genres.list().await
    }

    pub async fn get_genre(&self, id: i32) -> AppResult<Genre> {
        self.repository.genres.get_by_id(id).await
    }

    pub async fn create_genre(&self, mut input: GenreInput) -> AppResult<Genre> {
        input.normalize();
        input.validate()?;
        if self.repository.genres.name_exists(&input.name, None).await? {
            return Err(AppError::field("name", "genre with this name already exists."));
        }
        self.repository.genres.create(&input.name).await
    }

    pub async fn update_genre(&self, id: i32, mut input: GenreInput) -> AppResult<Genre> {
        input.normalize();
        input.validate()?;
        self.repository.genres.get_by_id(id).await?;
        if self.repository.genres.name_exists(&input.name, Some(id)).await? {
            return Err(AppError::field("name", "genre with this name already exists."));
        }
        self.repository.genres.update(id, &input.name).await
    }

    pub async fn delete_genre(&self, id: i32) -> AppResult<()> {
        self.repository.genres.delete(id).await
    }

    // ---- Languages ----

    pub async fn list_languages(&self) -> AppResult<Vec<Language>> {
        self.repository.languages.list().await
    }

    pub async fn get_language(&self, id: i32) -> AppResult<Language> {
        self.repository.languages.get_by_id(id).await
    }

    pub async fn create_language(&self, mut input: LanguageInput) -> AppResult<Language> {
        input.normalize();
        input.validate()?;
        if self.repository.languages.name_exists(&input.name, None).await? {
            return Err(AppError::field("name", "language with this name already exists."));
        }
        self.repository.languages.create(&input.name).await
    }

    pub async fn update_language(&self, id: i32, mut input: LanguageInput) -> AppResult<Language> {
        input.normalize();
        input.validate()?;
        self.repository.languages.get_by_id(id).await?;
        if self.repository.languages.name_exists(&input.name, Some(id)).await? {
            return Err(AppError::field("name", "language with this name already exists."));
        }
        self.repository.languages.update(id, &input.name).await
    }

    /// Delete a language and the books written in it
    pub async fn delete_language(&self, id: i32) -> AppResult<()> {
        let books = self.repository.languages.delete(id).await?;
        tracing::info!(language_id = id, books_deleted = books, "Language deleted");
        Ok(())
    }
}

/// Field error for a reference to a row that does not exist
pub(crate) fn invalid_pk(field: &str, id: impl std::fmt::Display) -> AppError {
    AppError::field(field, format!("Invalid pk \"{}\" - object does not exist.", id))
}

fn first_missing(wanted: &[i32], found: &[i32]) -> Option<i32> {
    wanted.iter().copied().find(|id| !found.contains(id))
}
