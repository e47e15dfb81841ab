//! Tree-walking interpreter for Seal programs

mod env;
mod error;
mod eval;
mod value;

pub use env::{child_env, EnvRef, Environment};
pub use error::{ErrorKind, InterpResult, RuntimeError};
pub use eval::Interpreter;
pub use value::{Instance, Value};
