//! XBRL Standardization Core: maps filer-specific XBRL concept tags (e.g.
//! `us-gaap:AccountsPayableCurrent`) to a canonical concept vocabulary, so
//! the same line item reads the same way across filers that chose
//! different tags for it.
//!
//! Five pieces, each with a single responsibility:
//! - [`reverse_index`] — O(1) tag → standard-concept(s) lookup plus the
//!   context disambiguation rules for tags that map to more than one.
//! - [`section_membership`] — which statement section a standard concept
//!   belongs to (Current Assets, Operating Expenses, ...), the context
//!   `reverse_index` disambiguates against.
//! - [`concept_mapper`] — layers per-company overrides and entity-detection
//!   boosts on top of the reverse index, with its own result cache.
//! - [`standardizer`] — the bottom-up pass that assigns a `section` to each
//!   row of a statement before handing it to the concept mapper.
//! - [`unmapped_logger`] — records what standardization couldn't (or could
//!   only ambiguously) resolve, for later CSV-based review.
//!
//! All five read-mostly singletons are process-wide (`OnceLock`), matching
//! how the rest of this crate treats data that's expensive to build and
//! never mutated after construction — see `config::ConfigRegistry` for the
//! same shape applied to per-form settings.

pub mod concept_mapper;
pub mod reverse_index;
pub mod section_membership;
pub mod standardizer;
pub mod unmapped_logger;

pub use concept_mapper::{ConceptMapper, MapperContext};
pub use reverse_index::{MappingResult, ReverseIndex};
pub use section_membership::SectionMembership;
pub use standardizer::{standardize_statement, StatementRow, Standardizer};
pub use unmapped_logger::UnmappedTagLogger;
