//! Paper repository for database operations on papers

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::{Type, Value, ValueRef};
use rusqlite::{params, params_from_iter, Row};
use tracing::debug;

use crate::models::paper::Paper;
use super::db::{Database, DatabaseError, DatabaseResult};

const PAPER_COLUMNS: &str = "id, title, authors, year, venue, abstract, doi, url, \
                             pdf_path, keywords, notes, created_at, updated_at";

/// Newest first, then alphabetical. Rows without a year always come last.
const ORDER_BY: &str = "ORDER BY year IS NULL, year DESC, title ASC, id ASC";

/// Same format the column defaults in schema.sql produce
const NOW_SQL: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

/// Optional search constraints, combined with AND.
///
/// Text filters are literal substring matches using SQLite `LIKE`, which
/// ignores case for ASCII letters only. Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaperFilter {
    /// Matched against title or abstract
    pub query: Option<String>,
    pub author: Option<String>,
    pub year: Option<i64>,
    pub venue: Option<String>,
    pub keywords: Option<String>,
}

impl PaperFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn year(mut self, year: i64) -> Self {
        self.year = Some(year);
        self
    }

    pub fn venue(mut self, venue: impl Into<String>) -> Self {
        self.venue = Some(venue.into());
        self
    }

    pub fn keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = Some(keywords.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        build_predicates(self).is_empty()
    }
}

/// One condition of a search and the values bound to its placeholders
#[derive(Debug, Clone, PartialEq)]
struct Predicate {
    clause: &'static str,
    values: Vec<Value>,
}

/// Each supplied filter contributes exactly one predicate, in a fixed order.
fn build_predicates(filter: &PaperFilter) -> Vec<Predicate> {
    let mut predicates = Vec::new();

    if let Some(query) = non_empty(&filter.query) {
        let pattern = like_pattern(query);
        predicates.push(Predicate {
            clause: r"(title LIKE ? ESCAPE '\' OR abstract LIKE ? ESCAPE '\')",
            values: vec![Value::Text(pattern.clone()), Value::Text(pattern)],
        });
    }

    if let Some(author) = non_empty(&filter.author) {
        predicates.push(Predicate {
            clause: r"authors LIKE ? ESCAPE '\'",
            values: vec![Value::Text(like_pattern(author))],
        });
    }

    if let Some(year) = filter.year {
        predicates.push(Predicate {
            clause: "year = ?",
            values: vec![Value::Integer(year)],
        });
    }

    if let Some(venue) = non_empty(&filter.venue) {
        predicates.push(Predicate {
            clause: r"venue LIKE ? ESCAPE '\'",
            values: vec![Value::Text(like_pattern(venue))],
        });
    }

    if let Some(keywords) = non_empty(&filter.keywords) {
        predicates.push(Predicate {
            clause: r"keywords LIKE ? ESCAPE '\'",
            values: vec![Value::Text(like_pattern(keywords))],
        });
    }

    predicates
}

/// ` WHERE a AND b ...` (empty when there is nothing to filter on) plus
/// the bound values in placeholder order
fn build_where(filter: &PaperFilter) -> (String, Vec<Value>) {
    let predicates = build_predicates(filter);
    if predicates.is_empty() {
        return (String::new(), Vec::new());
    }

    let clauses: Vec<&str> = predicates.iter().map(|p| p.clause).collect();
    let values = predicates.into_iter().flat_map(|p| p.values).collect();
    (format!(" WHERE {}", clauses.join(" AND ")), values)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// `%needle%` with LIKE wildcards in the needle escaped
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Append LIMIT/OFFSET. An offset without a limit still applies.
fn push_pagination(sql: &mut String, values: &mut Vec<Value>, limit: Option<u32>, offset: Option<u32>) {
    if limit.is_none() && offset.is_none() {
        return;
    }

    sql.push_str(" LIMIT ? OFFSET ?");
    values.push(Value::Integer(limit.map(i64::from).unwrap_or(-1)));
    values.push(Value::Integer(offset.map(i64::from).unwrap_or(0)));
}

/// Presence only; whitespace-only values are accepted as given.
fn validate_required(paper: &Paper) -> DatabaseResult<()> {
    if paper.title.is_empty() {
        return Err(DatabaseError::ConstraintViolation("title must not be empty".to_string()));
    }
    if paper.authors.is_empty() {
        return Err(DatabaseError::ConstraintViolation("authors must not be empty".to_string()));
    }
    Ok(())
}

/// Repository for Paper operations.
///
/// Every method runs as one transaction on the owning [`Database`].
pub struct PaperRepo<'a> {
    db: &'a mut Database,
}

impl<'a> PaperRepo<'a> {
    pub fn new(db: &'a mut Database) -> Self {
        Self { db }
    }

    /// Insert a new paper and return its id.
    ///
    /// Any id or timestamps on `paper` are ignored; the store assigns them.
    pub fn create(&mut self, paper: &Paper) -> DatabaseResult<i64> {
        validate_required(paper)?;

        let id = self.db.transaction(|tx| {
            tx.execute(
                "INSERT INTO papers (
                    title, authors, year, venue, abstract, doi, url, pdf_path, keywords, notes
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    paper.title,
                    paper.authors,
                    paper.year,
                    paper.venue,
                    paper.r#abstract,
                    paper.doi,
                    paper.url,
                    paper.pdf_path,
                    paper.keywords,
                    paper.notes,
                ],
            )?;
            Ok(tx.last_insert_rowid())
        })?;

        debug!(id, "Created paper");
        Ok(id)
    }

    /// Get a paper by id
    pub fn get_by_id(&mut self, id: i64) -> DatabaseResult<Option<Paper>> {
        let sql = format!("SELECT {} FROM papers WHERE id = ?", PAPER_COLUMNS);

        self.db.transaction(|tx| {
            match tx.query_row(&sql, [id], row_to_paper) {
                Ok(paper) => Ok(Some(paper)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(DatabaseError::from(e)),
            }
        })
    }

    /// List papers in catalog order, optionally paginated
    pub fn list_all(&mut self, limit: Option<u32>, offset: Option<u32>) -> DatabaseResult<Vec<Paper>> {
        let mut sql = format!("SELECT {} FROM papers {}", PAPER_COLUMNS, ORDER_BY);
        let mut values = Vec::new();
        push_pagination(&mut sql, &mut values, limit, offset);

        self.query_papers(&sql, values)
    }

    /// Rewrite every mutable field of an existing paper and refresh `updated_at`.
    ///
    /// Returns false when `paper.id` is unset or matches no row.
    pub fn update(&mut self, paper: &Paper) -> DatabaseResult<bool> {
        validate_required(paper)?;

        let Some(id) = paper.id else {
            debug!("Update skipped for unpersisted paper");
            return Ok(false);
        };

        let sql = format!(
            "UPDATE papers SET
                title = ?, authors = ?, year = ?, venue = ?, abstract = ?,
                doi = ?, url = ?, pdf_path = ?, keywords = ?, notes = ?,
                updated_at = {}
            WHERE id = ?",
            NOW_SQL
        );

        let changed = self.db.transaction(|tx| {
            let count = tx.execute(
                &sql,
                params![
                    paper.title,
                    paper.authors,
                    paper.year,
                    paper.venue,
                    paper.r#abstract,
                    paper.doi,
                    paper.url,
                    paper.pdf_path,
                    paper.keywords,
                    paper.notes,
                    id,
                ],
            )?;
            Ok(count > 0)
        })?;

        debug!(id, changed, "Updated paper");
        Ok(changed)
    }

    /// Delete a paper by id. Returns false when no row had that id.
    pub fn delete(&mut self, id: i64) -> DatabaseResult<bool> {
        let deleted = self.db.transaction(|tx| {
            let count = tx.execute("DELETE FROM papers WHERE id = ?", [id])?;
            Ok(count > 0)
        })?;

        debug!(id, deleted, "Deleted paper");
        Ok(deleted)
    }

    /// Search papers; all supplied filters must match
    pub fn search(&mut self, filter: &PaperFilter) -> DatabaseResult<Vec<Paper>> {
        let (where_sql, values) = build_where(filter);
        let sql = format!("SELECT {} FROM papers{} {}", PAPER_COLUMNS, where_sql, ORDER_BY);

        self.query_papers(&sql, values)
    }

    /// Total number of papers
    pub fn count(&mut self) -> DatabaseResult<i64> {
        self.count_matching(&PaperFilter::default())
    }

    /// Number of papers `search` would return for `filter`
    pub fn count_matching(&mut self, filter: &PaperFilter) -> DatabaseResult<i64> {
        let (where_sql, values) = build_where(filter);
        let sql = format!("SELECT COUNT(*) FROM papers{}", where_sql);

        self.db.transaction(|tx| {
            let count = tx.query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
            Ok(count)
        })
    }

    /// Check if a paper exists
    pub fn exists(&mut self, id: i64) -> DatabaseResult<bool> {
        self.db.transaction(|tx| {
            let found = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM papers WHERE id = ?)",
                [id],
                |row| row.get(0),
            )?;
            Ok(found)
        })
    }

    fn query_papers(&mut self, sql: &str, values: Vec<Value>) -> DatabaseResult<Vec<Paper>> {
        self.db.transaction(|tx| {
            let mut stmt = tx.prepare(sql)?;
            let rows = stmt.query_map(params_from_iter(values.iter()), row_to_paper)?;

            let mut papers = Vec::new();
            for row in rows {
                papers.push(row?);
            }
            Ok(papers)
        })
    }
}

// Row mapping

fn row_to_paper(row: &Row<'_>) -> rusqlite::Result<Paper> {
    Ok(Paper {
        id: row.get("id")?,
        title: row.get("title")?,
        authors: row.get("authors")?,
        year: row.get("year")?,
        venue: row.get("venue")?,
        r#abstract: row.get("abstract")?,
        doi: row.get("doi")?,
        url: row.get("url")?,
        pdf_path: row.get("pdf_path")?,
        keywords: row.get("keywords")?,
        notes: row.get("notes")?,
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
    })
}

/// TEXT timestamps are parsed; INTEGER ones are unix seconds.
fn timestamp_column(row: &Row<'_>, name: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let index = row.as_ref().column_index(name)?;

    match row.get_ref(index)? {
        ValueRef::Null => Ok(None),
        ValueRef::Text(bytes) => {
            let raw = std::str::from_utf8(bytes)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))?;
            parse_timestamp(raw)
                .map(Some)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
        }
        ValueRef::Integer(secs) => DateTime::from_timestamp(secs, 0)
            .map(Some)
            .ok_or(rusqlite::Error::IntegralValueOutOfRange(index, secs)),
        other => Err(rusqlite::Error::InvalidColumnType(
            index,
            name.to_string(),
            other.data_type(),
        )),
    }
}

/// RFC 3339, or SQLite's `CURRENT_TIMESTAMP` form (`YYYY-MM-DD HH:MM:SS`) read as UTC
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(_) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").map(|naive| naive.and_utc()),
    }
}
