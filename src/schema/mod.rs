//! Schema contract used by the validation stage.
//!
//! # Responsibilities
//! - Define the asynchronous `validate(value, options)` contract
//! - Adapt async closures into schemas
//! - Provide a compact built-in object schema (`object.rs`) and its
//!   serde-declarable form (`config.rs`)
//!
//! # Design Decisions
//! - Validation is always asynchronous; synchronous schemas return a
//!   ready future
//! - A schema returns the coerced value; the caller decides where it goes

pub mod config;
pub mod object;

use std::fmt;
use std::future::Future;

use futures_util::future::{BoxFuture, FutureExt};
use serde_json::Value;

use crate::validation::{ValidationError, ValidationOptions};

pub use config::{DefaultConfig, FieldConfig, FieldType, ObjectSchemaConfig};
pub use object::{DefaultValue, Field, FieldKind, ObjectSchema};

/// Declarative description of an accepted value.
pub trait Schema: Send + Sync + 'static {
    /// Validate `value`, returning its coerced and cleaned form.
    fn validate<'a>(
        &'a self,
        value: Value,
        options: &'a ValidationOptions,
    ) -> BoxFuture<'a, Result<Value, ValidationError>>;
}

/// Schema backed by an async closure.
pub struct FnSchema<F> {
    f: F,
}

/// Wrap an async closure as a [`Schema`].
pub fn schema_fn<F, Fut>(f: F) -> FnSchema<F>
where
    F: Fn(Value, &ValidationOptions) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ValidationError>> + Send + 'static,
{
    FnSchema { f }
}

impl<F, Fut> Schema for FnSchema<F>
where
    F: Fn(Value, &ValidationOptions) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ValidationError>> + Send + 'static,
{
    fn validate<'a>(
        &'a self,
        value: Value,
        options: &'a ValidationOptions,
    ) -> BoxFuture<'a, Result<Value, ValidationError>> {
        (self.f)(value, options).boxed()
    }
}

impl<F> fmt::Debug for FnSchema<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSchema").finish_non_exhaustive()
    }
}
