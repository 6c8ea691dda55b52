//! Local catalog of academic paper records backed by SQLite.
//!
//! A front end opens the store, uses the repository and closes it again:
//!
//! ```no_run
//! use paperdb::{open_database, Paper, PaperFilter};
//!
//! # fn main() -> Result<(), paperdb::DatabaseError> {
//! let mut db = open_database(std::path::Path::new("papers.db"))?;
//!
//! let mut paper = Paper::new("Attention Is All You Need", "Vaswani, Shazeer, Parmar");
//! paper.year = Some(2017);
//! let id = db.papers().create(&paper)?;
//!
//! let hits = db.papers().search(&PaperFilter::new().query("attention").year(2017))?;
//! assert!(hits.iter().any(|p| p.id == Some(id)));
//!
//! db.close()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod logging;
pub mod models;
pub mod storage;

pub use config::{DatabaseConfig, Settings};
pub use models::Paper;
pub use storage::{open_database, Database, DatabaseError, DatabaseResult, PaperFilter, PaperRepo};
