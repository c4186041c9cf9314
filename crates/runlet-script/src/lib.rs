//! Embedded script language for the Runlet invocation harness.
//!
//! A small dynamically-typed language whose data model is JSON plus
//! first-class functions. A source file parses to a flat statement list
//! that the interpreter runs as the body of a synthesized zero-argument
//! callable, which makes a top-level `return` legal and gives the harness a
//! single capturable return value.
//!
//! ```
//! use runlet_script::{install_builtins, Interp, Scope, Value};
//!
//! let program = runlet_script::parse("return 2 + 2").unwrap();
//! let scope = Scope::root();
//! install_builtins(&scope);
//! let mut out = Vec::new();
//! let result = Interp::new(&mut out).run(&program, &scope).unwrap();
//! assert_eq!(result, Some(Value::Num(4.0)));
//! ```

pub mod ast;
pub mod error;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod value;

pub use ast::Program;
pub use error::{ParseError, RuntimeError};
pub use interp::{install_builtins, Interp};
pub use parser::parse;
pub use value::{Scope, Unrepresentable, Value};
