//! HTTP integration of the validation stage.
//!
//! # Data Flow
//! ```text
//! Incoming request (earlier stages may attach ContextState)
//!     → middleware.rs (read sections, run validator)
//!     → rebind.rs (write validated query/headers/body back)
//!     → extract.rs (ValidatedRequest + typed section extractors)
//!     → handler
//!
//! On rejection:
//!     → 400 JSON body, ValidationError in response extensions
//! ```

pub mod extract;
pub mod middleware;
pub mod rebind;
pub mod server;

pub use extract::{
    ContextState, ExtractRejection, ValidBody, ValidHeaders, ValidParams, ValidQuery, ValidatedRequest,
};
pub use middleware::{validate_request, StageError, ValidateRequest, DEFAULT_BODY_LIMIT};
pub use server::{ServerError, ValidationServer};
