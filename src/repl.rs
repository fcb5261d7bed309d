use crate::{
    error_formatting, expr, input, line_reader, parser, resolver, scanner, treewalk_interpreter,
};

pub fn run() {
    let mut line_reader = line_reader::LineReader::new(".repl-history.txt", ">>> ");
    let mut interpreter = treewalk_interpreter::Interpreter::default();
    let mut next_node_id: u64 = 0;

    println!(
        "===================================================\n\
         Welcome to the lox REPL\n\
         ===================================================\n",
    );

    loop {
        let readline = line_reader.readline();

        match readline {
            line_reader::LineReadStatus::Line(line) => match scanner::scan_tokens(line.clone()) {
                Ok(tokens) => {
                    next_node_id = eval_tokens(&mut interpreter, tokens, 0, &line, next_node_id)
                }
                Err(err) => {
                    error_formatting::format_lexical_error(&err, &literal_input(&line));
                }
            },
            line_reader::LineReadStatus::Done => break,
        }
    }
}

fn eval_tokens(
    interpreter: &mut treewalk_interpreter::Interpreter,
    mut tokens: Vec<scanner::Token>,
    recursion_depth: i64,
    line: &str,
    next_node_id: u64,
) -> u64 {
    let (statements, next_id, errors) = parser::parse_with_id_offset(tokens.clone(), next_node_id);

    if errors.is_empty() {
        run_statements(interpreter, &statements, line);
        return next_id;
    }

    // a line like `print 1 + 2` is only missing its terminating semicolon:
    // inject one before the end marker and retry once
    let missing_semicolon_at_eof = matches!(
        errors.as_slice(),
        [parser::Error::TokenMismatch {
            expected: scanner::TokenType::Semicolon,
            found: scanner::Token {
                ty: scanner::TokenType::Eof,
                ..
            },
            ..
        }]
    );

    if missing_semicolon_at_eof && recursion_depth == 0 {
        let expected_eof = tokens.pop().unwrap();
        tokens.push(scanner::Token {
            ty: scanner::TokenType::Semicolon,
            lexeme: String::new(),
            literal: None,
            line: 0,
            col: -1,
        });
        tokens.push(expected_eof);
        return eval_tokens(interpreter, tokens, recursion_depth + 1, line, next_node_id);
    }

    for err in &errors {
        error_formatting::format_parse_error(err, &literal_input(line));
    }
    next_node_id
}

fn run_statements(
    interpreter: &mut treewalk_interpreter::Interpreter,
    statements: &[expr::Stmt],
    line: &str,
) {
    let (resolutions, resolve_errors) = resolver::resolve(statements);
    if !resolve_errors.is_empty() {
        for err in &resolve_errors {
            error_formatting::format_resolve_error(err, &literal_input(line));
        }
        return;
    }

    interpreter.resolve(resolutions);
    if let Err(err) = interpreter.interpret(statements) {
        error_formatting::format_interpreter_error(&err, &literal_input(line));
    }
}

fn literal_input(line: &str) -> input::Input {
    input::Input {
        source: input::Source::Literal,
        content: line.to_string(),
    }
}
