//! Decision Templates
//!
//! A template is a questionnaire a tenant reviews submissions against. When
//! it carries an approval rank, approving a submission requests that rank for
//! the submitting subject.

pub mod data;
pub mod errors;
pub mod records;
pub(crate) mod repository;
pub mod service;

pub use errors::TemplatesServiceError;
pub use service::*;
