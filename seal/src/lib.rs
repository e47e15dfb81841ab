//! Seal Compiler Library
//!
//! A small class-based language with sealed classes: closed variant types
//! whose `when` expressions are checked for exhaustiveness at compile time.

pub mod ast;
pub mod build;
pub mod config;
pub mod error;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod types;
pub mod util;

pub use ast::Span;
pub use error::{CompileError, Result};
