pub mod analyse;
pub mod error;
pub mod expr;
pub mod range;
pub mod span;
pub mod symbols;
pub mod system;
pub mod types;
pub mod warning;

pub use analyse::{analyse_expression, analyse_system};
pub use error::{Error, Errors, Handler};
pub use system::System;
