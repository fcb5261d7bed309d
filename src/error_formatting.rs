use colored::Colorize;

use crate::input;
use crate::parser;
use crate::resolver;
use crate::scanner;
use crate::treewalk_interpreter;

// Prints the offending source line with a caret under the column, when
// the line is available in the input.
fn print_source_context(input: &input::Input, line: usize, col: i64) {
    if let input::Source::File(filename) = &input.source {
        eprintln!("in {}:", filename);
    }

    let maybe_source_line = input.content.lines().nth(line.saturating_sub(1));
    if let Some(source_line) = maybe_source_line {
        eprintln!("{:>4} | {}", line, source_line);
        if col > 0 {
            eprintln!("     | {}{}", " ".repeat((col - 1) as usize), "^".red().bold());
        }
    }
}

pub fn format_lexical_error(err: &scanner::Error, input: &input::Input) {
    eprintln!("{}: {}", "lexical error".red().bold(), err.what);
    print_source_context(input, err.line, err.col);
}

pub fn format_parse_error(err: &parser::Error, input: &input::Input) {
    eprintln!("{}: {}", "parse error".red().bold(), err);
    let (line, col) = err.position();
    print_source_context(input, line, col);
}

pub fn format_resolve_error(err: &resolver::Error, input: &input::Input) {
    eprintln!("{}: {}", "semantic error".red().bold(), err);
    let (line, col) = err.position();
    print_source_context(input, line, col);
}

pub fn format_interpreter_error(err: &treewalk_interpreter::InterpreterError, input: &input::Input) {
    eprintln!("{}: {}", "runtime error".red().bold(), err);
    if let input::Source::File(filename) = &input.source {
        eprintln!("in {}", filename);
    }
}
