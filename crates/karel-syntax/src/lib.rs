pub mod ast;
pub mod error;
pub mod suggest;
pub mod token;

pub use ast::*;
pub use error::*;
pub use token::*;
