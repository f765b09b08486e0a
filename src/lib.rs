//! Request validation stage for axum pipelines.
//!
//! Validates the query string, headers, body and path parameters of a
//! request against per-section schemas, concurrently, and rebinds each
//! section to its validated form so everything downstream only observes
//! validated data.
//!
//! ```ignore
//! use request_validator::{Field, ObjectSchema, SchemaMap, ValidationOptions, Validator};
//! use request_validator::http::{validate_request, ValidateRequest};
//!
//! let validator = Validator::new(
//!     SchemaMap::new().body(
//!         ObjectSchema::new()
//!             .field("username", Field::string().required())
//!             .field("age", Field::number().default_context("defaultAge")),
//!     ),
//!     ValidationOptions::new().strip_unknown(true),
//! );
//! let app = Router::new()
//!     .route("/users", post(create_user))
//!     .route_layer(axum::middleware::from_fn_with_state(
//!         ValidateRequest::new(validator),
//!         validate_request,
//!     ));
//! ```

pub mod config;
pub mod http;
pub mod observability;
pub mod schema;
pub mod validation;

pub use config::AppConfig;
pub use http::{ValidateRequest, ValidatedRequest, ValidationServer};
pub use schema::{schema_fn, Field, ObjectSchema, Schema};
pub use validation::{
    RequestContext, Rejected, SchemaMap, Section, ValidationError, ValidationOptions, Validator,
};
