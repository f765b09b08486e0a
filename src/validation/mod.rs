//! Request validation stage.
//!
//! # Data Flow
//! ```text
//! RequestContext (raw sections + live state)
//!     → options.rs (merge live state under configured context)
//!     → validator.rs (one schema validation per section, all in flight)
//!     → context.rs (rebind each section as it succeeds)
//!     → all succeeded: continuation
//!     → any failed: first ValidationError to complete
//! ```
//!
//! # Design Decisions
//! - Schema map and option template are immutable once the validator exists
//! - Sections are a closed enum; `params` lives on the context, the rest on
//!   the request
//! - Partial rebinding on failure is visible to error handlers

pub mod context;
pub mod error;
pub mod options;
pub mod section;
pub mod validator;

pub use context::{RequestContext, RequestData};
pub use error::{BuildError, ErrorDetail, ValidationError};
pub use options::ValidationOptions;
pub use section::{SchemaMap, Section, Source};
pub use validator::{Rejected, Validator};
