//! # Query Composer
//!
//! Turns an open-ended bag of client query parameters into a bounded,
//! injection-safe catalog query.
//!
//! ```text
//! ┌────────────────────┐   parse    ┌──────────────────┐
//! │ ?keyword=lamp&     │ ─────────► │ QueryParameters  │
//! │  price[gte]=10&... │            │ (reserved split) │
//! └────────────────────┘            └────────┬─────────┘
//!                                            │ build_search / build_filter / build_page
//!                                            ▼
//!                                   ┌──────────────────┐
//!                                   │  ComposedQuery   │
//!                                   └──┬────────────┬──┘
//!                     to_document()    │            │   matches()
//!                     (feature mongodb)▼            ▼   (in-memory)
//!                              ┌────────────┐  ┌────────────┐
//!                              │  MongoDB   │  │ JSON docs  │
//!                              └────────────┘  └────────────┘
//! ```
//!
//! Reserved parameters are `keyword`, `page` and `limit`. Every other
//! parameter is a filter field: a scalar means equality, a mapping with
//! `gt`/`gte`/`lt`/`lte` keys means a range. Any other mapping key and any
//! field name starting with `$` is discarded and reported in
//! [`FilterClause::dropped`]. The keyword is always matched literally.
//!
//! ## Features
//!
//! - `mongodb` - BSON filter documents and `FindOptions`
//! - `axum` - [`QueryParams`] extractor

pub mod clause;
pub mod composer;
pub mod error;
mod eval;
pub mod params;

#[cfg(feature = "mongodb")]
pub mod mongo;

#[cfg(feature = "axum")]
mod extract;

pub use clause::{FieldCondition, FilterClause, PageSpec, RangeOperator, Scalar, SearchClause};
pub use composer::{
    build_filter, build_page, build_search, compose, parse_page_size, ComposedQuery,
    QueryComposer,
};
pub use error::{QueryError, QueryResult};
pub use params::{QueryParameters, RESERVED_KEYS};

#[cfg(feature = "mongodb")]
pub use mongo::uuid_to_bson;

#[cfg(feature = "axum")]
pub use extract::QueryParams;
