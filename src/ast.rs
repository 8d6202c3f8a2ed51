//! # reqexpr - Abstract Syntax Tree
//!
//! This module defines the tokens and tree nodes of the reqexpr condition
//! language: a small expression language evaluated against per-request or
//! per-reload variables.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[expressions]** - Expression nodes (literals, variables, operations, calls)
//! - **[operators]** - Comparison and logical operators
//!
//! ## Quick Start
//!
//! ```text
//! %{HTTP_HOST} == "example.com" && %{REQUEST_URI} =~ m#^/api/(v\d+)/#
//! ```
//!
//! ## Core Concepts
//!
//! ### Operator Families
//!
//! - **String comparison** `== != < <= > >=` - byte-wise on string forms
//! - **Numeric comparison** `-eq -ne -lt -le -gt -ge` - operands coerced to numbers
//! - **Regex** `=~ !~` - against a literal compiled at parse time
//! - **Membership** `in {a, b}` - string equality against each element
//! - **Tests** `-n word`, `word -strmatch word` - dispatched through the function table
//!
//! ### Interpolation
//!
//! Strings may embed variables (`%{NAME}`, `%{NAME:arg}`) and backreferences
//! (`$0`..`$9`) to the groups of the most recent regex match in the same
//! evaluation.
//!
//! ## Examples
//!
//! ```text
//! -n %{QUERY_STRING} || %{REQUEST_METHOD} in {"GET", "HEAD"}
//! %{HTTP:Content-Length} -gt 1048576
//! %{HTTP_HOST} =~ /^(www\.)?(.+)$/ && "$2" != "localhost"
//! ```
pub mod expressions;
pub mod operators;
pub mod tokens;

pub use expressions::{Expr, RegexLiteral, StringPart};
pub use operators::{CmpOp, LogicalOp};
pub use tokens::Token;
