//! Read-only engine for multi-file plain-text atomic data.
//!
//! A master file names sub-files of elements, ions, levels, lines,
//! photoionization and inner-shell edges, and collision strengths. Loading
//! links them into an immutable [`Catalog`], builds frequency-ordered
//! [`SortIndex`]es and validates the sampled tables. Queries then narrow the
//! line list to a frequency window, interpolate cross-sections and collision
//! strengths, and derive Einstein coefficients.
//!
//! ```no_run
//! let catalog = atomix::load("data/standard")?;
//! let window = catalog.restrict(1.0e15, 3.0e15)?;
//! for (i, line) in catalog.lines_in(window)? {
//!     println!("{i}: {:.3} A  A21={:.3e}", line.wavelength(), line.a21);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod interp;
pub mod physics;
pub mod state;

pub use config::LoadConfig;
pub use data::catalog::{Catalog, CatalogSummary};
pub use data::filter::QueryWindow;
pub use data::index::SortIndex;
pub use data::loader::{load, load_with, CancelToken};
pub use data::validate::validate;
pub use error::{ConsistencyError, LoadError, QueryError};
pub use interp::{interpolate, locate, Bracket, InterpMode};
pub use physics::{einstein_a, upsilon};
pub use state::CatalogState;
