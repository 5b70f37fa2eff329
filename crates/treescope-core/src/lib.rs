/// TreeScope Core: scanning, aggregation, persistence, and treemap layout.
///
/// This crate contains all business logic with zero UI dependencies.
/// A host shell drives it through [`scanner::ScanController`] and renders
/// the rectangles produced by [`treemap`].
///
/// # Modules
///
/// - [`model`]: Entries, rollups, sessions, and per-item scan errors.
/// - [`scanner`]: Iterative traversal plus the background scan pipeline.
/// - [`aggregate`]: Streaming per-directory rollups.
/// - [`store`]: SQLite persistence with versioned migrations.
/// - [`treemap`]: Squarified treemap layout and hit-testing.
/// - [`dataset`]: Host-side copy of one scan's entries and rollups.
/// - [`config`]: Scan and store settings.
/// - [`error`]: Store and scan-start error types.
pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod error;
pub mod model;
pub mod scanner;
pub mod store;
pub mod treemap;
