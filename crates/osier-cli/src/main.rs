use clap::{Parser, Subcommand};
use osier_exp::{El, Prog};
use osier_types::Type;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "osier", about = "The osier expression language")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse an expression and print the canonical element tree
    Parse {
        /// Path to a source file (or use -e)
        file: Option<PathBuf>,
        /// Inline expression
        #[arg(short = 'e', long = "expr")]
        expr: Option<String>,
    },
    /// Resolve an expression; unresolved symbols are reported, not fatal
    Resl {
        file: Option<PathBuf>,
        #[arg(short = 'e', long = "expr")]
        expr: Option<String>,
    },
    /// Evaluate an expression to a literal
    Eval {
        file: Option<PathBuf>,
        #[arg(short = 'e', long = "expr")]
        expr: Option<String>,
    },
}

fn read_source(file: Option<PathBuf>, expr: Option<String>) -> String {
    if let Some(expr) = expr {
        return expr;
    }
    let Some(file) = file else {
        eprintln!("error: pass a file or -e EXPR");
        std::process::exit(2);
    };
    match std::fs::read_to_string(&file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: could not read {}: {}", file.display(), e);
            std::process::exit(1);
        }
    }
}

fn parse_source(source: &str) -> El {
    match osier_parser::parse(source) {
        Ok(el) => el,
        Err(e) => {
            eprintln!("parse error: {e}");
            std::process::exit(1);
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Parse { file, expr } => {
            let el = parse_source(&read_source(file, expr));
            println!("{el}");
        }
        Command::Resl { file, expr } => {
            let el = parse_source(&read_source(file, expr));
            let env = osier_std::std_scope();
            let mut p = Prog::new();
            match p.resl(&env, el, &Type::VOID) {
                Ok(r) => {
                    println!("{r}");
                    if !p.unres.is_empty() {
                        eprintln!("unresolved: {}", p.unres.join(" "));
                    }
                }
                Err(e) => {
                    eprintln!("resolve error: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::Eval { file, expr } => {
            let el = parse_source(&read_source(file, expr));
            let env = osier_std::std_scope();
            let mut p = Prog::new();
            let r = match p.resl(&env, el, &Type::VOID) {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("resolve error: {e}");
                    std::process::exit(1);
                }
            };
            match p.eval(&env, r, &Type::VOID) {
                Ok(r) => println!("{r}"),
                Err(e) => {
                    eprintln!("eval error: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
