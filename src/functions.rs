//! Function table for calls, unary tests and binary word operators.
//!
//! Function calls (`tolower(x)`), single-letter tests (`-f x`) and word
//! operators (`x -strmatch y`) all dispatch by name through a
//! [`FunctionTable`]. Operators are registered under their spelled form,
//! leading dash included, so they never collide with function names.
//! Unknown names and wrong argument counts are evaluation errors.

use std::{
    collections::HashMap,
    fmt,
    fs,
    net::IpAddr,
    path::Path,
    sync::{Arc, OnceLock},
};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use rust_decimal::Decimal;

use crate::{diagnostics::EvalError, value::Value};

/// A function implementation that takes already-evaluated arguments.
pub type FunctionImpl = Arc<dyn Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync>;

/// A named entry in the function table.
#[derive(Clone)]
pub struct Function {
    /// The name as written in expressions (`tolower`, `-f`, `-ipmatch`).
    pub name: String,
    /// Exact number of arguments.
    pub arity: usize,
    implementation: FunctionImpl,
}

impl Function {
    pub fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        if args.len() != self.arity {
            return Err(EvalError::arity(&self.name, self.arity, args.len()));
        }
        (self.implementation)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// Registry of callable functions and operators.
///
/// `FunctionTable::default()` contains the built-in set; hosts extend or
/// override it with [`FunctionTable::register`].
///
/// ```
/// use reqexpr::{Expression, FunctionTable, MapContext, Value};
///
/// let mut functions = FunctionTable::default();
/// functions.register("reverse", 1, |args| {
///     Ok(Value::String(args[0].as_string().chars().rev().collect()))
/// });
///
/// let expr = Expression::parse(r#"reverse("abc") == "cba""#).unwrap();
/// assert!(expr.evaluate_with(&MapContext::new(), &functions).unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct FunctionTable {
    functions: HashMap<String, Function>,
}

impl Default for FunctionTable {
    fn default() -> Self {
        let mut table = FunctionTable::empty();
        register_builtins(&mut table);
        table
    }
}

impl FunctionTable {
    /// A table with no entries.
    pub fn empty() -> Self {
        FunctionTable {
            functions: HashMap::new(),
        }
    }

    /// The shared built-in table.
    pub fn builtin() -> &'static FunctionTable {
        static BUILTIN: OnceLock<FunctionTable> = OnceLock::new();
        BUILTIN.get_or_init(FunctionTable::default)
    }

    /// Add or replace an entry.
    pub fn register<F>(&mut self, name: impl Into<String>, arity: usize, implementation: F)
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        let name = name.into();
        self.functions.insert(
            name.clone(),
            Function {
                name,
                arity,
                implementation: Arc::new(implementation),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Call `name` with `args`, checking that it exists and that the argument
    /// count matches.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, EvalError> {
        self.get(name)
            .ok_or_else(|| EvalError::unknown_function(name))?
            .call(args)
    }
}

fn register_builtins(table: &mut FunctionTable) {
    // String functions
    table.register("tolower", 1, |args| {
        Ok(Value::String(args[0].as_string().to_lowercase()))
    });
    table.register("toupper", 1, |args| {
        Ok(Value::String(args[0].as_string().to_uppercase()))
    });
    table.register("strlen", 1, |args| {
        let len = args[0].as_string().chars().count();
        Ok(Value::Number(Decimal::from(len)))
    });
    table.register("escape", 1, |args| Ok(Value::String(escape(&args[0].as_string()))));
    table.register("unescape", 1, |args| unescape(&args[0].as_string()).map(Value::String));

    // File functions
    table.register("file", 1, |args| {
        let path = args[0].as_string();
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Value::String(content)),
            Err(e) => {
                log::warn!("file({path:?}) failed: {e}");
                Ok(Value::String(String::new()))
            }
        }
    });
    table.register("filesize", 1, |args| {
        let size = fs::metadata(args[0].as_string())
            .map(|m| if m.is_file() { m.len() } else { 0 })
            .unwrap_or(0);
        Ok(Value::Number(Decimal::from(size)))
    });

    // Unary tests
    table.register("-n", 1, |args| Ok(Value::Boolean(!args[0].as_string().is_empty())));
    table.register("-z", 1, |args| Ok(Value::Boolean(args[0].as_string().is_empty())));
    table.register("-T", 1, |args| Ok(Value::Boolean(is_true_word(&args[0].as_string()))));
    table.register("-e", 1, |args| {
        Ok(Value::Boolean(Path::new(&args[0].as_string()).exists()))
    });
    table.register("-f", 1, |args| {
        Ok(Value::Boolean(Path::new(&args[0].as_string()).is_file()))
    });
    table.register("-d", 1, |args| {
        Ok(Value::Boolean(Path::new(&args[0].as_string()).is_dir()))
    });
    table.register("-s", 1, |args| {
        let non_empty = fs::metadata(args[0].as_string())
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false);
        Ok(Value::Boolean(non_empty))
    });
    table.register("-L", 1, |args| {
        let is_link = fs::symlink_metadata(args[0].as_string())
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);
        Ok(Value::Boolean(is_link))
    });

    // Binary word operators
    table.register("-strmatch", 2, |args| {
        let (text, pattern) = (args[0].as_string(), args[1].as_string());
        Ok(Value::Boolean(glob_match(&pattern, &text, false, false)))
    });
    table.register("-strcmatch", 2, |args| {
        let (text, pattern) = (args[0].as_string(), args[1].as_string());
        Ok(Value::Boolean(glob_match(&pattern, &text, true, false)))
    });
    table.register("-fnmatch", 2, |args| {
        let (text, pattern) = (args[0].as_string(), args[1].as_string());
        Ok(Value::Boolean(glob_match(&pattern, &text, false, true)))
    });
    table.register("-ipmatch", 2, |args| {
        ip_in_network(&args[0].as_string(), &args[1].as_string()).map(Value::Boolean)
    });
}

/// `-T`: false for empty, `0`, `off`, `false` and `no` (any case).
fn is_true_word(s: &str) -> bool {
    let lowered = s.trim().to_ascii_lowercase();
    !matches!(lowered.as_str(), "" | "0" | "off" | "false" | "no")
}

/// Everything except unreserved characters and `/` is percent-encoded.
const URL_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

fn escape(s: &str) -> String {
    utf8_percent_encode(s, URL_ESCAPE).to_string()
}

fn unescape(s: &str) -> Result<String, EvalError> {
    // percent_decode_str passes malformed sequences through unchanged
    let bytes = s.as_bytes();
    let malformed = bytes.iter().enumerate().any(|(i, &b)| {
        b == b'%'
            && !bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit))
    });
    if malformed {
        return Err(EvalError::type_mismatch(format!(
            "invalid percent-encoding in {s:?}"
        )));
    }

    percent_decode_str(s)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| EvalError::type_mismatch(format!("unescaped {s:?} is not valid UTF-8")))
}

/// One element of a compiled wildcard pattern.
enum GlobToken {
    Star,
    AnyChar,
    Literal(char),
    Class { negated: bool, ranges: Vec<(char, char)> },
}

impl GlobToken {
    fn matches(&self, c: char, pathname: bool) -> bool {
        match self {
            GlobToken::Star => false,
            GlobToken::AnyChar => !(pathname && c == '/'),
            GlobToken::Literal(l) => *l == c,
            GlobToken::Class { negated, ranges } => {
                !(pathname && c == '/')
                    && ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi) != *negated
            }
        }
    }
}

fn compile_glob(pattern: &[char]) -> Vec<GlobToken> {
    let mut tokens = vec![];
    let mut i = 0;

    while i < pattern.len() {
        match pattern[i] {
            '*' => {
                tokens.push(GlobToken::Star);
                i += 1;
            }
            '?' => {
                tokens.push(GlobToken::AnyChar);
                i += 1;
            }
            '\\' if i + 1 < pattern.len() => {
                tokens.push(GlobToken::Literal(pattern[i + 1]));
                i += 2;
            }
            '[' => match compile_class(pattern, i + 1) {
                Some((class, next)) => {
                    tokens.push(class);
                    i = next;
                }
                // An unclosed bracket is an ordinary character
                None => {
                    tokens.push(GlobToken::Literal('['));
                    i += 1;
                }
            },
            c => {
                tokens.push(GlobToken::Literal(c));
                i += 1;
            }
        }
    }
    tokens
}

/// Parses a bracket class body starting after `[`. Returns the class and the
/// index after its closing `]`, or `None` if the class is never closed.
fn compile_class(pattern: &[char], mut i: usize) -> Option<(GlobToken, usize)> {
    let negated = matches!(pattern.get(i), Some('!' | '^'));
    if negated {
        i += 1;
    }

    let mut ranges = vec![];
    let mut first = true;
    loop {
        let c = *pattern.get(i)?;
        if c == ']' && !first {
            return Some((GlobToken::Class { negated, ranges }, i + 1));
        }
        first = false;

        let lo = if c == '\\' {
            i += 1;
            *pattern.get(i)?
        } else {
            c
        };
        i += 1;

        if pattern.get(i) == Some(&'-') && pattern.get(i + 1).is_some_and(|&c| c != ']') {
            let mut hi = pattern[i + 1];
            i += 2;
            if hi == '\\' {
                hi = *pattern.get(i)?;
                i += 1;
            }
            ranges.push((lo, hi));
        } else {
            ranges.push((lo, lo));
        }
    }
}

/// Shell-style wildcard match: `*` any run, `?` any single character,
/// `[a-z]`/`[!a-z]` classes, and a backslash escapes the next character.
/// With `pathname`, no wildcard or class matches `/`.
fn glob_match(pattern: &str, text: &str, ignore_case: bool, pathname: bool) -> bool {
    let fold = |s: &str| -> Vec<char> {
        if ignore_case {
            s.chars().flat_map(char::to_lowercase).collect()
        } else {
            s.chars().collect()
        }
    };
    let p = compile_glob(&fold(pattern));
    let t = fold(text);

    let (mut pi, mut ti) = (0, 0);
    // Position of the last `*` in the pattern and the text index it resumes from
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        match p.get(pi) {
            Some(GlobToken::Star) => {
                star = Some((pi, ti));
                pi += 1;
            }
            Some(token) if token.matches(t[ti], pathname) => {
                pi += 1;
                ti += 1;
            }
            _ => match star {
                Some((star_pi, star_ti)) if !(pathname && t[star_ti] == '/') => {
                    pi = star_pi + 1;
                    ti = star_ti + 1;
                    star = Some((star_pi, star_ti + 1));
                }
                _ => return false,
            },
        }
    }

    p[pi..].iter().all(|token| matches!(token, GlobToken::Star))
}

/// `-ipmatch`: whether `addr` lies in `network` (`a.b.c.d/len`, `v6::/len`,
/// or a single address). A subject that is not an IP address never matches.
fn ip_in_network(addr: &str, network: &str) -> Result<bool, EvalError> {
    let Ok(addr) = addr.trim().parse::<IpAddr>() else {
        return Ok(false);
    };

    let invalid = || EvalError::type_mismatch(format!("invalid network {network:?}"));
    let (net, prefix) = match network.trim().split_once('/') {
        Some((net, len)) => (net, Some(len.parse::<u32>().map_err(|_| invalid())?)),
        None => (network.trim(), None),
    };
    let net = net.parse::<IpAddr>().map_err(|_| invalid())?;

    match (addr, net) {
        (IpAddr::V4(a), IpAddr::V4(n)) => {
            let len = prefix.unwrap_or(32);
            if len > 32 {
                return Err(invalid());
            }
            let mask = u32::MAX.checked_shl(32 - len).unwrap_or(0);
            Ok(u32::from(a) & mask == u32::from(n) & mask)
        }
        (IpAddr::V6(a), IpAddr::V6(n)) => {
            let len = prefix.unwrap_or(128);
            if len > 128 {
                return Err(invalid());
            }
            let mask = u128::MAX.checked_shl(128 - len).unwrap_or(0);
            Ok(u128::from(a) & mask == u128::from(n) & mask)
        }
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorKind;

    #[test]
    fn glob_wildcards() {
        assert!(glob_match("*.example.com", "www.example.com", false, false));
        assert!(glob_match("a?c", "abc", false, false));
        assert!(!glob_match("a?c", "abbc", false, false));
        assert!(glob_match("*", "", false, false));
        assert!(glob_match("WWW.*", "www.test", true, false));
        assert!(!glob_match("WWW.*", "www.test", false, false));
    }

    #[test]
    fn glob_classes_and_escapes() {
        assert!(glob_match("*.[ch]", "main.c", false, false));
        assert!(!glob_match("*.[ch]", "main.o", false, false));
        assert!(glob_match("file[0-9]", "file7", false, false));
        assert!(glob_match("file[!0-9]", "fileX", false, false));
        assert!(!glob_match("file[^0-9]", "file3", false, false));
        assert!(glob_match("[]x]", "]", false, false));
        assert!(glob_match(r"a\*b", "a*b", false, false));
        assert!(!glob_match(r"a\*b", "axxb", false, false));
        assert!(glob_match("[unclosed", "[unclosed", false, false));
        assert!(glob_match("[A-Z]*", "hello", true, false));
        assert!(!glob_match("/var/[a-z/]x", "/var//x", false, true));
    }

    #[test]
    fn fnmatch_stops_at_slash() {
        assert!(glob_match("/var/*/log", "/var/app/log", false, true));
        assert!(!glob_match("/var/*", "/var/app/log", false, true));
        assert!(glob_match("/var/*", "/var/app/log", false, false));
    }

    #[test]
    fn ip_networks() {
        assert!(ip_in_network("10.1.2.3", "10.0.0.0/8").unwrap());
        assert!(!ip_in_network("11.1.2.3", "10.0.0.0/8").unwrap());
        assert!(ip_in_network("192.168.1.1", "192.168.1.1").unwrap());
        assert!(ip_in_network("::1", "::/0").unwrap());
        assert!(!ip_in_network("not-an-ip", "10.0.0.0/8").unwrap());
        assert!(ip_in_network("1.2.3.4", "10.0.0.0/33").is_err());
    }

    #[test]
    fn escape_roundtrip_and_errors() {
        assert_eq!(escape("a b/c?d"), "a%20b/c%3Fd");
        assert_eq!(unescape("a%20b").unwrap(), "a b");
        assert_eq!(escape("héllo~"), "h%C3%A9llo~");
        assert_eq!(unescape("h%C3%A9llo").unwrap(), "héllo");
        assert_eq!(unescape("%zz").unwrap_err().kind, ErrorKind::TypeMismatch);
        assert_eq!(unescape("50%").unwrap_err().kind, ErrorKind::TypeMismatch);
        assert_eq!(unescape("%FF").unwrap_err().kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn unknown_and_arity() {
        let table = FunctionTable::default();
        assert_eq!(
            table.call("nope", &[]).unwrap_err().kind,
            ErrorKind::UnknownFunction
        );
        assert_eq!(
            table.call("tolower", &[]).unwrap_err().kind,
            ErrorKind::Arity
        );
        assert_eq!(
            table.call("toupper", &[Value::from("abc")]).unwrap(),
            Value::from("ABC")
        );
    }

    #[test]
    fn true_words() {
        for word in ["", "0", "off", "False", "NO"] {
            assert!(!is_true_word(word), "{word:?}");
        }
        assert!(is_true_word("on"));
        assert!(is_true_word("1"));
    }
}
