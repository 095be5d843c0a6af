pub mod domain;
pub mod error;
pub mod form;
pub mod introspect;
pub mod output;
pub mod ports;

pub use domain::*;
pub use error::{Error, FieldError, Result};
