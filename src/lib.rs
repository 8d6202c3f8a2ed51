pub mod ast;
pub mod cli;
pub mod context;
pub mod diagnostics;
pub mod evaluator;
pub mod expression;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod value;

pub use ast::{CmpOp, Expr, LogicalOp, RegexLiteral, StringPart, Token};
pub use context::{Lookup, MapContext, RuntimeContext};
pub use diagnostics::{ErrorKind, EvalError, LexError, ParseError};
pub use evaluator::{Captures, Evaluator};
pub use expression::{Expression, ExpressionKind, ParseOptions};
pub use functions::{Function, FunctionTable};
pub use lexer::Lexer;
pub use parser::Parser;
pub use value::Value;
