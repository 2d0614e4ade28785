//! One-time migration of legacy sub-column layouts to grid columns.
//!
//! Legacy CMS installs express multi-column layouts as triplets of marker
//! elements (a start, zero or more parts, an end) whose widths live either
//! in a PHP globals config or in a `tl_columnset` database table. This crate
//! converts those rows into grid definitions plus `bs_grid*`-linked wrapper
//! elements, with three commands layered on one storage seam:
//!
//! * `fix` repairs or cleanses structurally broken element groups,
//! * `migrate` extracts column-set definitions, inserts grid definitions and
//!   rewrites every well-formed group inside one transaction, a savepoint
//!   per group,
//! * `rollback` undoes a previous run using the provenance tag left in each
//!   migrated definition's description.
//!
//! # Example
//! ```no_run
//! use subcolumns2grid::migrate::{run_migration, MigrateOptions};
//! use subcolumns2grid::storage::MySqlStorage;
//!
//! async fn example() -> subcolumns2grid::Result<()> {
//!     let mut storage = MySqlStorage::connect("mysql://root@localhost/cms").await?;
//!     let log = run_migration(&mut storage, MigrateOptions::default()).await?;
//!     for note in log.notes() {
//!         println!("{note}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod fix;
pub mod migrate;
pub mod model;
pub mod parser;
pub mod report;
pub mod rollback;
pub mod storage;

pub use error::{GroupError, MigrationError, Result};
pub use report::MigrationLog;
