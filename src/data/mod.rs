/// Data layer: record parsing, loading, indexing and range queries.
///
/// Architecture:
/// ```text
///  master.dat ──► sub-files (one record kind each)
///        │
///        ▼
///   ┌──────────┐
///   │  parser   │  one text line → typed record (natural keys)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  read manifest + sub-files, link keys → indices
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ catalog   │  tables + SortIndex per line/edge table
///   └──────────┘
///        │
///        ├──► validate   monotonic tables, non-empty ions
///        └──► filter     frequency window over a SortIndex
/// ```

pub mod catalog;
pub mod filter;
pub mod index;
pub mod loader;
pub mod model;
pub mod parser;
pub mod validate;
