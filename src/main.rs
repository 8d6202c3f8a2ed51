use clap::{Parser as ClapParser, Subcommand};
use reqexpr::cli::{self, CheckOptions, CheckResult, CliError};
use std::io::{self, Read};

#[derive(ClapParser)]
#[command(name = "reqexpr")]
#[command(about = "reqexpr - evaluate request conditions and string templates")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and evaluate an expression
    Check {
        /// The expression to evaluate
        expression: String,

        /// JSON object of variables (reads from stdin if not provided)
        #[arg(short, long)]
        vars: Option<String>,

        /// Treat the expression as a string template
        #[arg(short, long)]
        template: bool,

        /// Match regex literals case-insensitively
        #[arg(short = 'i', long)]
        icase: bool,

        /// Fail on variables missing from the input
        #[arg(long)]
        strict: bool,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Only validate syntax, don't evaluate
        #[arg(long)]
        syntax_only: bool,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check {
            expression,
            vars,
            template,
            icase,
            strict,
            pretty,
            syntax_only,
        } => {
            let options = CheckOptions {
                expression,
                variables: None,
                template,
                case_insensitive: icase,
                strict,
                syntax_only,
            };
            run_check(options, vars, pretty)
        }
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run_check(
    mut options: CheckOptions,
    vars: Option<String>,
    pretty: bool,
) -> Result<(), CliError> {
    options.variables = match vars {
        Some(s) => Some(s),
        None if !options.syntax_only && !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Some(buffer).filter(|b| !b.trim().is_empty())
        }
        None => None,
    };

    match cli::execute_check(&options)? {
        CheckResult::SyntaxValid => println!("Syntax is valid"),
        CheckResult::Success(output) => {
            let json = if pretty {
                serde_json::to_string_pretty(&output)
            } else {
                serde_json::to_string(&output)
            }?;
            println!("{}", json);
        }
    }
    Ok(())
}
