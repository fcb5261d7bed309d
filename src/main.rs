use std::fs;
use std::sync::atomic::Ordering;

use clap::{Arg, ArgAction, Command};

mod builtins;
mod error_formatting;
mod expr;
mod input;
mod line_reader;
mod parser;
mod repl;
mod resolver;
mod scanner;
mod treewalk_interpreter;
mod value;

// exit codes per sysexits: static errors and runtime errors are distinct
const EXIT_CODE_STATIC_ERROR: i32 = 65;
const EXIT_CODE_RUNTIME_ERROR: i32 = 70;

fn main() {
    let matches = Command::new("rlox")
        .version("0.1.0")
        .about("tree-walking interpreter for the lox scripting language")
        .arg(
            Arg::new("INPUT")
                .help("lox script to run; omit to start the REPL")
                .index(1),
        )
        .arg(
            Arg::new("show-tokens")
                .long("show-tokens")
                .action(ArgAction::SetTrue)
                .help("print the token stream instead of running"),
        )
        .arg(
            Arg::new("show-ast")
                .long("show-ast")
                .action(ArgAction::SetTrue)
                .help("print the syntax tree as JSON instead of running"),
        )
        .arg(
            Arg::new("show-resolution")
                .long("show-resolution")
                .action(ArgAction::SetTrue)
                .help("print resolved variable distances instead of running"),
        )
        .get_matches();

    match matches.get_one::<String>("INPUT") {
        Some(path) => run_file(path, &matches),
        None => repl::run(),
    }
}

fn run_file(path: &str, matches: &clap::ArgMatches) {
    let content = fs::read_to_string(path).expect("Could not read file");
    let input = input::Input {
        source: input::Source::File(path.to_string()),
        content: content.clone(),
    };

    let tokens = match scanner::scan_tokens(content) {
        Ok(tokens) => tokens,
        Err(err) => {
            error_formatting::format_lexical_error(&err, &input);
            std::process::exit(EXIT_CODE_STATIC_ERROR);
        }
    };

    if matches.get_flag("show-tokens") {
        for token in &tokens {
            println!("{:?}", token);
        }
        return;
    }

    let (statements, parse_errors) = parser::parse(tokens);
    if !parse_errors.is_empty() {
        for err in &parse_errors {
            error_formatting::format_parse_error(err, &input);
        }
        std::process::exit(EXIT_CODE_STATIC_ERROR);
    }

    if matches.get_flag("show-ast") {
        println!(
            "{}",
            serde_json::to_string_pretty(&statements).expect("Could not serialize syntax tree")
        );
        return;
    }

    let (resolutions, resolve_errors) = resolver::resolve(&statements);
    if !resolve_errors.is_empty() {
        for err in &resolve_errors {
            error_formatting::format_resolve_error(err, &input);
        }
        std::process::exit(EXIT_CODE_STATIC_ERROR);
    }

    if matches.get_flag("show-resolution") {
        let mut entries: Vec<_> = resolutions.iter().collect();
        entries.sort();
        for (id, distance) in entries {
            println!("{:?} -> {}", id, distance);
        }
        return;
    }

    let mut interpreter = treewalk_interpreter::Interpreter::default();
    let interrupted = interpreter.interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted.store(true, Ordering::Relaxed);
    })
    .expect("Could not install interrupt handler");

    interpreter.resolve(resolutions);
    if let Err(err) = interpreter.interpret(&statements) {
        error_formatting::format_interpreter_error(&err, &input);
        std::process::exit(EXIT_CODE_RUNTIME_ERROR);
    }
}
