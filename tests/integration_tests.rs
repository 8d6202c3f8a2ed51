use reqexpr::{
    ErrorKind, EvalError, Expression, FunctionTable, Lookup, MapContext, Value,
};
use rust_decimal::Decimal;
use std::fs;
use std::path::PathBuf;

fn context(pairs: &[(&str, &str)]) -> MapContext {
    pairs.iter().map(|(k, v)| (*k, *v)).collect()
}

fn eval(expr_str: &str, pairs: &[(&str, &str)]) -> Result<bool, EvalError> {
    let expr = Expression::parse(expr_str).unwrap();
    expr.evaluate(&context(pairs))
}

fn check(expr_str: &str) -> bool {
    eval(expr_str, &[]).unwrap()
}

fn eval_err(expr_str: &str) -> EvalError {
    eval(expr_str, &[]).unwrap_err()
}

fn scratch_file(name: &str, content: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("reqexpr-tests-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

// ============================================================================
// Comparisons
// ============================================================================

#[test]
fn test_string_comparisons_are_bytewise() {
    assert!(check(r#""abc" == "abc""#));
    assert!(check(r#""abc" != "abd""#));
    assert!(check(r#""abc" < "abd""#));
    assert!(check(r#""B" < "a""#));
    assert!(check(r#""10" < "9""#));
    assert!(check(r#""b" >= "b""#));
}

#[test]
fn test_numeric_comparisons() {
    assert!(check(r#""10" -gt "9""#));
    assert!(check("1.50 -eq 1.5"));
    assert!(check("-3 -lt 2"));
    assert!(check("7 le 7"));
    assert!(!check("7 -ne 7"));
}

#[test]
fn test_numeric_comparison_with_variables() {
    assert!(eval("%{PORT} -ge 1024", &[("PORT", "8080")]).unwrap());
    assert!(!eval("%{PORT} -ge 1024", &[("PORT", "80")]).unwrap());
    assert!(eval("%{PORT} -ge 1024", &[("PORT", " 8080 ")]).unwrap());
}

#[test]
fn test_non_numeric_operand_coerces_to_zero() {
    assert!(eval("%{A} -eq 0", &[("A", "abc")]).unwrap());
    assert!(eval("%{MISSING} -eq 0", &[]).unwrap());
}

#[test]
fn test_out_of_range_operand_clamps() {
    assert!(check(r#""99999999999999999999999999999999" -gt 5"#));
    assert!(check(r#""-99999999999999999999999999999999" -lt 5"#));
}

#[test]
fn test_typed_bindings() {
    let mut ctx = MapContext::new();
    ctx.insert("COUNT", Value::from(5i64));
    ctx.insert("SECURE", true);

    let expr = Expression::parse("%{COUNT} -lt 10 && %{SECURE} == true").unwrap();
    assert!(expr.evaluate(&ctx).unwrap());
}

// ============================================================================
// Logic and truthiness
// ============================================================================

#[test]
fn test_truthiness_of_bare_operands() {
    assert!(!check(r#""""#));
    assert!(check(r#""x""#));
    assert!(check(r#""0""#));
    assert!(!check("0"));
    assert!(check("0.5"));
    assert!(!eval("%{EMPTY}", &[("EMPTY", "")]).unwrap());
    assert!(!eval("%{MISSING}", &[]).unwrap());
}

#[test]
fn test_logical_operators() {
    assert!(check("true && !false"));
    assert!(check("false || true"));
    assert!(!check("true and false"));
    assert!(check("not false or false"));
    assert!(check("!!true"));
}

// ============================================================================
// Regex and membership
// ============================================================================

#[test]
fn test_regex_match_and_negation() {
    let vars = [("URI", "/api/v2/users")];
    assert!(eval(r"%{URI} =~ m#^/api/v\d+/#", &vars).unwrap());
    assert!(!eval(r"%{URI} !~ m#^/api/#", &vars).unwrap());
    assert!(eval(r"%{URI} !~ /^\/static/", &vars).unwrap());
}

#[test]
fn test_regex_case_flag() {
    assert!(check(r#""HELLO" =~ /hello/i"#));
    assert!(!check(r#""HELLO" =~ /hello/"#));
}

#[test]
fn test_backreferences_in_strings_and_concat() {
    let vars = [("HOST", "www.example.com")];
    assert!(eval(r#"%{HOST} =~ /^www\.(.+)$/ && "$1" == "example.com""#, &vars).unwrap());
    assert!(eval(r#"%{HOST} =~ /^(w+)\.(.+)$/ && $2 . "/" . $1 == "example.com/www""#, &vars).unwrap());
    assert!(eval(r#"%{HOST} =~ /^(www)/ && $0 == "www""#, &vars).unwrap());
}

#[test]
fn test_membership() {
    let vars = [("METHOD", "HEAD")];
    assert!(eval(r#"%{METHOD} in {"GET", "HEAD"}"#, &vars).unwrap());
    assert!(!eval(r#"%{METHOD} in {"POST", "PUT"}"#, &vars).unwrap());
    assert!(!eval(r#"%{METHOD} in {}"#, &vars).unwrap());
    assert!(check(r#"1 in {"0", "1"}"#));
}

// ============================================================================
// Functions and test operators
// ============================================================================

#[test]
fn test_string_functions() {
    assert!(eval(r#"tolower(%{HOST}) == "example.com""#, &[("HOST", "Example.COM")]).unwrap());
    assert!(check(r#"toupper("abc") == "ABC""#));
    assert!(check(r#"strlen("héllo") -eq 5"#));
    assert!(check(r#"escape("a b&c") == "a%20b%26c""#));
    assert!(check(r#"unescape("a%20b") == "a b""#));
}

#[test]
fn test_unary_string_tests() {
    assert!(eval("-n %{Q}", &[("Q", "a=1")]).unwrap());
    assert!(eval("-z %{Q}", &[]).unwrap());
    assert!(check("-T on"));
    assert!(!check("-T off"));
    assert!(!check(r#"-T "No""#));
}

#[test]
fn test_glob_operators() {
    assert!(check(r#""www.example.com" -strmatch "*.example.com""#));
    assert!(!check(r#""WWW.EXAMPLE.COM" -strmatch "*.example.com""#));
    assert!(check(r#""WWW.EXAMPLE.COM" -strcmatch "*.example.com""#));
    assert!(check(r#""/var/www/index.html" -fnmatch "/var/www/*.html""#));
    assert!(!check(r#""/var/www/a/index.html" -fnmatch "/var/www/*.html""#));
    assert!(check(r#""main.c" -strmatch "*.[ch]""#));
    assert!(!check(r#""main.o" -strmatch "*.[ch]""#));
    assert!(check(r#""a*b" -strmatch "a\\*b""#));
    assert!(!check(r#""axb" -strmatch "a\\*b""#));
}

#[test]
fn test_ipmatch() {
    let vars = [("REMOTE_ADDR", "192.168.10.20")];
    assert!(eval(r#"%{REMOTE_ADDR} -ipmatch "192.168.0.0/16""#, &vars).unwrap());
    assert!(!eval(r#"%{REMOTE_ADDR} -ipmatch "10.0.0.0/8""#, &vars).unwrap());
    assert!(check(r#""2001:db8::1" -ipmatch "2001:db8::/32""#));

    let err = eval(r#"%{REMOTE_ADDR} -ipmatch "not-a-network""#, &vars).unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
}

#[test]
fn test_remote_addr_test() {
    let vars = [("REMOTE_ADDR", "10.20.30.40")];
    assert!(eval(r#"-R "10.0.0.0/8""#, &vars).unwrap());
    assert!(!eval(r#"-R "192.168.0.0/16""#, &vars).unwrap());
    assert!(eval(r#"-R m#^10\.(\d+)# && $1 -eq 20"#, &vars).unwrap());
    assert!(!eval(r#"-R "10.0.0.0/8""#, &[]).unwrap());

    let err = eval(r#"-R "bogus/net""#, &vars).unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
}

#[test]
fn test_file_operators() {
    let path = scratch_file("present.txt", "hello");
    let path = path.to_string_lossy().to_string();
    let dir = std::env::temp_dir().to_string_lossy().to_string();
    let missing = format!("{path}.missing");
    let vars = [("P", path.as_str()), ("D", dir.as_str()), ("M", missing.as_str())];

    assert!(eval("-f %{P} && -e %{P} && -s %{P}", &vars).unwrap());
    assert!(eval("-d %{D} && !-f %{D}", &vars).unwrap());
    assert!(eval("!-e %{M} && !-L %{M}", &vars).unwrap());
    assert!(eval("filesize(%{P}) -eq 5", &vars).unwrap());
    assert!(eval(r#"file(%{P}) == "hello""#, &vars).unwrap());
    assert!(eval(r#"file(%{M}) == """#, &vars).unwrap());
    assert!(eval("filesize(%{M}) -eq 0", &vars).unwrap());
}

#[test]
fn test_custom_function_table() {
    let mut functions = FunctionTable::default();
    functions.register("tolower", 1, |_args| Ok(Value::from("overridden")));
    functions.register("-x", 1, |args| Ok(Value::Boolean(args[0].as_string() == "x")));

    let ctx = MapContext::new();
    let expr = Expression::parse(r#"tolower("ABC") == "overridden" && -x x"#).unwrap();
    assert!(expr.evaluate_with(&ctx, &functions).unwrap());
    // the shared built-in table is unaffected
    assert!(!expr.evaluate(&ctx).unwrap());
}

#[test]
fn test_empty_function_table() {
    let expr = Expression::parse(r#"-n "x""#).unwrap();
    let err = expr
        .evaluate_with(&MapContext::new(), &FunctionTable::empty())
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownFunction);
}

// ============================================================================
// Evaluation errors
// ============================================================================

#[test]
fn test_unknown_function() {
    let err = eval_err("nope(1) == 1");
    assert_eq!(err.kind, ErrorKind::UnknownFunction);
    assert!(err.message.contains("nope"));

    assert_eq!(eval_err("-q x").kind, ErrorKind::UnknownFunction);
    assert_eq!(eval_err("a -nosuchop b").kind, ErrorKind::UnknownFunction);
}

#[test]
fn test_arity_mismatch() {
    let err = eval_err(r#"tolower("a", "b") == "a""#);
    assert_eq!(err.kind, ErrorKind::Arity);
    assert_eq!(err.to_string(), "arity error: 'tolower' takes 1 argument(s), got 2");
}

#[test]
fn test_unescape_type_error() {
    assert_eq!(eval_err(r#"unescape("%zz") == """#).kind, ErrorKind::TypeMismatch);
}

#[test]
fn test_strict_context_rejects_missing_variable() {
    let expr = Expression::parse(r#"%{NOPE} == """#).unwrap();
    let err = expr.evaluate(&MapContext::strict()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownVariable);
    assert!(err.message.contains("NOPE"));
}

#[test]
fn test_expression_survives_evaluation_error() {
    let expr = Expression::parse(r#"%{A} == "x" || nope()"#).unwrap();
    assert!(expr.evaluate(&context(&[("A", "y")])).is_err());
    assert!(expr.evaluate(&context(&[("A", "x")])).unwrap());
}

#[test]
fn test_argument_lookup_through_closure() {
    let ctx = |name: &str, args: &[String]| match (name, args) {
        ("HTTP", [header]) if header == "Accept" => Lookup::Resolved(Value::from("text/html")),
        _ => Lookup::Unresolved,
    };
    let expr = Expression::parse(r#"%{HTTP:Accept} =~ /html/ && -z %{HTTP:Other}"#).unwrap();
    assert!(expr.evaluate(&ctx).unwrap());
}

// ============================================================================
// Values, strings and templates
// ============================================================================

#[test]
fn test_evaluate_value() {
    let ctx = context(&[("A", "x")]);
    let expr = Expression::parse(r#"%{A} . "-" . 1.50"#).unwrap();
    assert_eq!(expr.evaluate_value(&ctx).unwrap(), Value::from("x-1.5"));

    let expr = Expression::parse("42").unwrap();
    assert_eq!(expr.evaluate_value(&ctx).unwrap(), Value::Number(Decimal::from(42)));

    let expr = Expression::parse("%{A} == x").unwrap();
    assert_eq!(expr.evaluate_value(&ctx).unwrap(), Value::Boolean(true));
}

#[test]
fn test_evaluate_value_with_custom_functions() {
    let mut functions = FunctionTable::default();
    functions.register("reverse", 1, |args| {
        Ok(Value::from(args[0].as_string().chars().rev().collect::<String>()))
    });

    let ctx = context(&[("A", "abc")]);
    let expr = Expression::parse("reverse(%{A})").unwrap();
    assert_eq!(expr.evaluate_value_with(&ctx, &functions).unwrap(), Value::from("cba"));
    assert_eq!(expr.evaluate_string_with(&ctx, &functions).unwrap(), "cba");
    assert_eq!(expr.evaluate_value(&ctx).unwrap_err().kind, ErrorKind::UnknownFunction);

    let template = Expression::parse_template("[%{A}]").unwrap();
    assert_eq!(template.evaluate_string_with(&ctx, &FunctionTable::empty()).unwrap(), "[abc]");
}

#[test]
fn test_evaluate_string() {
    let expr = Expression::parse("toupper(%{A})").unwrap();
    assert_eq!(expr.evaluate_string(&context(&[("A", "abc")])).unwrap(), "ABC");
}

#[test]
fn test_template_evaluation() {
    let expr = Expression::parse_template(r"%{HTTP:Host}%{URI} (100\% sure)").unwrap();
    let ctx = context(&[("HTTP:Host", "example.com"), ("URI", "/index")]);
    assert_eq!(expr.evaluate_string(&ctx).unwrap(), "example.com/index (100% sure)");
}

#[test]
fn test_template_backref_without_match_is_empty() {
    let expr = Expression::parse_template("[$1]").unwrap();
    assert_eq!(expr.evaluate_string(&MapContext::new()).unwrap(), "[]");
}

#[test]
fn test_evaluate_captured() {
    let expr = Expression::parse(r#"%{HOST} =~ /^(www\.)?(.+)$/"#).unwrap();
    let (matched, captures) = expr.evaluate_captured(&context(&[("HOST", "example.org")])).unwrap();
    assert!(matched);
    assert_eq!(captures.get(0), Some("example.org"));
    assert_eq!(captures.get(1), Some(""));
    assert_eq!(captures.get(2), Some("example.org"));
    assert_eq!(captures.get(3), None);
}
