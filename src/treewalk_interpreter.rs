use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::builtins;
use crate::expr;
use crate::value;

#[derive(Debug, Default)]
pub struct Environment {
    pub enclosing: Option<Rc<RefCell<Environment>>>,
    values: HashMap<String, value::Value>,
}

impl Environment {
    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Environment {
        Environment {
            enclosing: Some(enclosing),
            values: HashMap::new(),
        }
    }

    pub fn define(&mut self, name: String, val: value::Value) {
        self.values.insert(name, val);
    }

    pub fn get(&self, name: &str) -> Option<value::Value> {
        self.values.get(name).cloned()
    }

    pub fn assign(&mut self, name: &str, val: value::Value) -> bool {
        match self.values.get_mut(name) {
            Some(slot) => {
                *slot = val;
                true
            }
            None => false,
        }
    }

    // The resolver guarantees the chain is at least `distance` deep for
    // every recorded reference; a shorter chain is an interpreter defect.
    fn ancestor(env: &Rc<RefCell<Environment>>, distance: usize) -> Rc<RefCell<Environment>> {
        let mut current = env.clone();
        for _ in 0..distance {
            let next = current
                .borrow()
                .enclosing
                .clone()
                .expect("internal error in interpreter: environment chain shorter than resolved distance");
            current = next;
        }
        current
    }

    pub fn get_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
    ) -> Option<value::Value> {
        Environment::ancestor(env, distance).borrow().get(name)
    }

    pub fn assign_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        val: value::Value,
    ) -> bool {
        Environment::ancestor(env, distance).borrow_mut().assign(name, val)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InterpreterError {
    Runtime(String),
}

impl fmt::Display for InterpreterError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InterpreterError::Runtime(err) => write!(f, "Lox runtime error: {}", err),
        }
    }
}

// `return` unwinds through the recursive walk as an explicit result
// variant rather than by unwinding the Rust stack
enum Unwind {
    Return(value::Value),
    Error(InterpreterError),
}

fn runtime_error(what: String) -> Unwind {
    Unwind::Error(InterpreterError::Runtime(what))
}

pub struct Interpreter {
    pub globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<expr::NodeId, usize>,
    pub output: Vec<String>,
    pub interrupted: Arc<AtomicBool>,
}

impl Default for Interpreter {
    fn default() -> Interpreter {
        let globals = Rc::new(RefCell::new(Environment::default()));

        {
            let mut globals_env = globals.borrow_mut();
            globals_env.define(
                String::from("clock"),
                value::Value::NativeFunction(value::NativeFunction {
                    arity: 0,
                    name: String::from("clock"),
                    func: builtins::clock,
                }),
            );
            globals_env.define(
                String::from("exp"),
                value::Value::NativeFunction(value::NativeFunction {
                    arity: 1,
                    name: String::from("exp"),
                    func: builtins::exp,
                }),
            );
            globals_env.define(
                String::from("sqrt"),
                value::Value::NativeFunction(value::NativeFunction {
                    arity: 1,
                    name: String::from("sqrt"),
                    func: builtins::sqrt,
                }),
            );
        }

        Interpreter {
            environment: globals.clone(),
            globals,
            locals: HashMap::new(),
            output: Vec::new(),
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Interpreter {
    /// Merges the resolver's distance map. In the REPL this is called once
    /// per line; node ids never repeat across lines, so earlier entries
    /// stay valid for closures that are still alive.
    pub fn resolve(&mut self, resolutions: HashMap<expr::NodeId, usize>) {
        self.locals.extend(resolutions);
    }

    pub fn interpret(&mut self, statements: &[expr::Stmt]) -> Result<(), InterpreterError> {
        for stmt in statements {
            match self.execute(stmt) {
                Ok(()) => {}
                Err(Unwind::Return(_)) => {
                    panic!("internal error in interpreter: return unwound to top level")
                }
                Err(Unwind::Error(err)) => return Err(err),
            }
        }
        Ok(())
    }

    fn execute(&mut self, stmt: &expr::Stmt) -> Result<(), Unwind> {
        match stmt {
            expr::Stmt::Expr(e) => {
                self.evaluate(e)?;
                Ok(())
            }
            expr::Stmt::Print(e) => {
                let val = self.evaluate(e)?;
                self.print_val(&val);
                Ok(())
            }
            expr::Stmt::VarDecl(name, maybe_initializer) => {
                let val = match maybe_initializer {
                    Some(initializer) => self.evaluate(initializer)?,
                    None => value::Value::Nil,
                };
                self.environment
                    .borrow_mut()
                    .define(name.name.clone(), val);
                Ok(())
            }
            expr::Stmt::Block(statements) => {
                let env = Rc::new(RefCell::new(Environment::with_enclosing(
                    self.environment.clone(),
                )));
                self.execute_block(statements, env)
            }
            expr::Stmt::If(condition, then_branch, maybe_else_branch) => {
                let cond = self.evaluate(condition)?;
                if Interpreter::is_truthy(&cond) {
                    self.execute(then_branch)
                } else if let Some(else_branch) = maybe_else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(())
                }
            }
            expr::Stmt::While(condition, body) => {
                loop {
                    if self.interrupted.load(Ordering::Relaxed) {
                        return Err(runtime_error("Interrupted.".to_string()));
                    }
                    let cond = self.evaluate(condition)?;
                    if !Interpreter::is_truthy(&cond) {
                        break;
                    }
                    self.execute(body)?;
                }
                Ok(())
            }
            expr::Stmt::FunDecl(decl) => {
                let function = value::Value::Function(Rc::new(value::LoxFunction {
                    name: decl.name.clone(),
                    params: Rc::new(decl.params.clone()),
                    body: Rc::new(decl.body.clone()),
                    closure: self.environment.clone(),
                    is_initializer: false,
                }));
                self.environment
                    .borrow_mut()
                    .define(decl.name.name.clone(), function);
                Ok(())
            }
            expr::Stmt::Return(_, maybe_value) => {
                let val = match maybe_value {
                    Some(value) => self.evaluate(value)?,
                    None => value::Value::Nil,
                };
                Err(Unwind::Return(val))
            }
            expr::Stmt::ClassDecl(decl) => self.execute_class_decl(decl),
        }
    }

    fn execute_class_decl(&mut self, decl: &expr::ClassDecl) -> Result<(), Unwind> {
        let superclass = match &decl.superclass {
            Some((superclass_id, superclass_sym)) => {
                let val = self.lookup_variable(*superclass_id, superclass_sym)?;
                match val {
                    value::Value::Class(class) => Some(class),
                    other => {
                        return Err(runtime_error(format!(
                            "Superclass must be a class, found {:?} (line={})",
                            value::type_of(&other),
                            superclass_sym.line
                        )))
                    }
                }
            }
            None => None,
        };

        self.environment
            .borrow_mut()
            .define(decl.name.name.clone(), value::Value::Nil);

        // methods of a subclass close over an extra environment holding
        // `super`, matching the scope the resolver opened
        let method_closure = match &superclass {
            Some(superclass) => {
                let mut env = Environment::with_enclosing(self.environment.clone());
                env.define(
                    String::from("super"),
                    value::Value::Class(superclass.clone()),
                );
                Rc::new(RefCell::new(env))
            }
            None => self.environment.clone(),
        };

        let mut methods = HashMap::new();
        for method in &decl.methods {
            let function = Rc::new(value::LoxFunction {
                name: method.name.clone(),
                params: Rc::new(method.params.clone()),
                body: Rc::new(method.body.clone()),
                closure: method_closure.clone(),
                is_initializer: method.name.name == "init",
            });
            methods.insert(method.name.name.clone(), function);
        }

        let class = value::Value::Class(Rc::new(value::LoxClass {
            name: decl.name.name.clone(),
            superclass,
            methods,
        }));
        self.environment
            .borrow_mut()
            .define(decl.name.name.clone(), class);
        Ok(())
    }

    fn execute_block(
        &mut self,
        statements: &[expr::Stmt],
        env: Rc<RefCell<Environment>>,
    ) -> Result<(), Unwind> {
        let previous = std::mem::replace(&mut self.environment, env);
        let result = statements.iter().try_for_each(|stmt| self.execute(stmt));
        self.environment = previous;
        result
    }

    fn evaluate(&mut self, e: &expr::Expr) -> Result<value::Value, Unwind> {
        match e {
            expr::Expr::Literal(literal) => Ok(Interpreter::literal_value(literal)),
            expr::Expr::Grouping(inner) => self.evaluate(inner),
            expr::Expr::Unary(op, right) => {
                let right_val = self.evaluate(right)?;
                match op.ty {
                    expr::UnaryOpTy::Minus => match right_val {
                        value::Value::Number(n) => Ok(value::Value::Number(-n)),
                        other => Err(runtime_error(format!(
                            "invalid operand to unary op negate. Expected number, found {:?} at line {}",
                            value::type_of(&other),
                            op.line
                        ))),
                    },
                    expr::UnaryOpTy::Bang => {
                        Ok(value::Value::Bool(!Interpreter::is_truthy(&right_val)))
                    }
                }
            }
            expr::Expr::Binary(left, op, right) => {
                let left_val = self.evaluate(left)?;
                let right_val = self.evaluate(right)?;
                self.apply_binary_op(*op, left_val, right_val)
            }
            expr::Expr::Logical(left, op, right) => {
                let left_val = self.evaluate(left)?;
                match op.ty {
                    expr::LogicalOpTy::Or => {
                        if Interpreter::is_truthy(&left_val) {
                            return Ok(left_val);
                        }
                    }
                    expr::LogicalOpTy::And => {
                        if !Interpreter::is_truthy(&left_val) {
                            return Ok(left_val);
                        }
                    }
                }
                self.evaluate(right)
            }
            expr::Expr::Variable(id, sym) => self.lookup_variable(*id, sym),
            expr::Expr::Assign(id, sym, value) => {
                let val = self.evaluate(value)?;

                let assigned = match self.locals.get(id) {
                    Some(distance) => Environment::assign_at(
                        &self.environment,
                        *distance,
                        &sym.name,
                        val.clone(),
                    ),
                    None => self.globals.borrow_mut().assign(&sym.name, val.clone()),
                };

                if !assigned {
                    return Err(runtime_error(format!(
                        "Undefined variable '{}' (line={})",
                        sym.name, sym.line
                    )));
                }
                Ok(val)
            }
            expr::Expr::Call(callee, loc, arg_exprs) => {
                let callee_val = self.evaluate(callee)?;
                let mut args = Vec::with_capacity(arg_exprs.len());
                for arg_expr in arg_exprs {
                    args.push(self.evaluate(arg_expr)?);
                }
                self.call_value(callee_val, &args, loc)
            }
            expr::Expr::Get(object, name) => {
                let object_val = self.evaluate(object)?;
                match object_val {
                    value::Value::Instance(instance) => {
                        if let Some(field) = instance.borrow().fields.get(&name.name) {
                            return Ok(field.clone());
                        }
                        let maybe_method = instance.borrow().class.find_method(&name.name);
                        match maybe_method {
                            Some(method) => Ok(value::Value::Function(
                                Interpreter::bind_method(&method, instance.clone()),
                            )),
                            None => Err(runtime_error(format!(
                                "Undefined property '{}' (line={})",
                                name.name, name.line
                            ))),
                        }
                    }
                    other => Err(runtime_error(format!(
                        "Only instances have properties, found {:?} (line={})",
                        value::type_of(&other),
                        name.line
                    ))),
                }
            }
            expr::Expr::Set(object, name, value) => {
                let object_val = self.evaluate(object)?;
                match object_val {
                    value::Value::Instance(instance) => {
                        let val = self.evaluate(value)?;
                        instance
                            .borrow_mut()
                            .fields
                            .insert(name.name.clone(), val.clone());
                        Ok(val)
                    }
                    other => Err(runtime_error(format!(
                        "Only instances have fields, found {:?} (line={})",
                        value::type_of(&other),
                        name.line
                    ))),
                }
            }
            expr::Expr::This(id, loc) => {
                match self.locals.get(id) {
                    Some(distance) => Environment::get_at(&self.environment, *distance, "this")
                        .ok_or_else(|| {
                            runtime_error(format!("Undefined variable 'this' (line={})", loc.line))
                        }),
                    None => Err(runtime_error(format!(
                        "Undefined variable 'this' (line={})",
                        loc.line
                    ))),
                }
            }
            expr::Expr::Super(id, loc, method) => self.evaluate_super(*id, loc, method),
        }
    }

    fn evaluate_super(
        &mut self,
        id: expr::NodeId,
        loc: &expr::SourceLocation,
        method: &expr::Symbol,
    ) -> Result<value::Value, Unwind> {
        let distance = *self
            .locals
            .get(&id)
            .expect("internal error in interpreter: unresolved 'super' reference");

        let superclass = match Environment::get_at(&self.environment, distance, "super") {
            Some(value::Value::Class(class)) => class,
            other => panic!(
                "internal error in interpreter: expected class bound to 'super', found {:?}",
                other
            ),
        };
        // `this` lives in the scope just inside the one holding `super`
        let object = match Environment::get_at(&self.environment, distance - 1, "this") {
            Some(value::Value::Instance(instance)) => instance,
            other => panic!(
                "internal error in interpreter: expected instance bound to 'this', found {:?}",
                other
            ),
        };

        match superclass.find_method(&method.name) {
            Some(found) => Ok(value::Value::Function(Interpreter::bind_method(
                &found, object,
            ))),
            None => Err(runtime_error(format!(
                "Undefined property '{}' (line={})",
                method.name, loc.line
            ))),
        }
    }

    fn call_value(
        &mut self,
        callee: value::Value,
        args: &[value::Value],
        loc: &expr::SourceLocation,
    ) -> Result<value::Value, Unwind> {
        if self.interrupted.load(Ordering::Relaxed) {
            return Err(runtime_error("Interrupted.".to_string()));
        }

        match callee {
            value::Value::NativeFunction(native) => {
                if args.len() != usize::from(native.arity) {
                    return Err(runtime_error(format!(
                        "Expected {} arguments but got {} in call to native fn '{}' (line={})",
                        native.arity,
                        args.len(),
                        native.name,
                        loc.line
                    )));
                }
                (native.func)(self, args).map_err(|err| runtime_error(err))
            }
            value::Value::Function(function) => self.call_function(&function, args, loc),
            value::Value::Class(class) => {
                if args.len() != class.arity() {
                    return Err(runtime_error(format!(
                        "Expected {} arguments but got {} in call to '{}' (line={})",
                        class.arity(),
                        args.len(),
                        class.name,
                        loc.line
                    )));
                }
                let instance = Rc::new(RefCell::new(value::LoxInstance {
                    class: class.clone(),
                    fields: HashMap::new(),
                }));
                if let Some(initializer) = class.find_method("init") {
                    let bound = Interpreter::bind_method(&initializer, instance.clone());
                    self.call_function(&bound, args, loc)?;
                }
                Ok(value::Value::Instance(instance))
            }
            other => Err(runtime_error(format!(
                "Can only call functions and classes, found {:?} (line={})",
                value::type_of(&other),
                loc.line
            ))),
        }
    }

    fn call_function(
        &mut self,
        function: &Rc<value::LoxFunction>,
        args: &[value::Value],
        loc: &expr::SourceLocation,
    ) -> Result<value::Value, Unwind> {
        if args.len() != function.params.len() {
            return Err(runtime_error(format!(
                "Expected {} arguments but got {} in call to '{}' (line={})",
                function.params.len(),
                args.len(),
                function.name.name,
                loc.line
            )));
        }

        let mut env = Environment::with_enclosing(function.closure.clone());
        for (param, arg) in function.params.iter().zip(args.iter()) {
            env.define(param.name.clone(), arg.clone());
        }
        let env = Rc::new(RefCell::new(env));

        let previous = std::mem::replace(&mut self.environment, env);
        let result = function.body.iter().try_for_each(|stmt| self.execute(stmt));
        self.environment = previous;

        match result {
            Ok(()) => {
                if function.is_initializer {
                    Ok(Interpreter::initializer_this(function))
                } else {
                    Ok(value::Value::Nil)
                }
            }
            Err(Unwind::Return(val)) => {
                if function.is_initializer {
                    // the resolver rejects value-carrying returns in init,
                    // so this is always a bare `return;`
                    Ok(Interpreter::initializer_this(function))
                } else {
                    Ok(val)
                }
            }
            Err(err) => Err(err),
        }
    }

    fn initializer_this(function: &Rc<value::LoxFunction>) -> value::Value {
        Environment::get_at(&function.closure, 0, "this")
            .expect("internal error in interpreter: initializer closure without 'this'")
    }

    fn bind_method(
        method: &Rc<value::LoxFunction>,
        instance: Rc<RefCell<value::LoxInstance>>,
    ) -> Rc<value::LoxFunction> {
        let mut env = Environment::with_enclosing(method.closure.clone());
        env.define(String::from("this"), value::Value::Instance(instance));
        Rc::new(value::LoxFunction {
            name: method.name.clone(),
            params: method.params.clone(),
            body: method.body.clone(),
            closure: Rc::new(RefCell::new(env)),
            is_initializer: method.is_initializer,
        })
    }

    fn lookup_variable(
        &self,
        id: expr::NodeId,
        sym: &expr::Symbol,
    ) -> Result<value::Value, Unwind> {
        let looked_up = match self.locals.get(&id) {
            Some(distance) => Environment::get_at(&self.environment, *distance, &sym.name),
            None => self.globals.borrow().get(&sym.name),
        };

        looked_up.ok_or_else(|| {
            runtime_error(format!(
                "Undefined variable '{}' (line={})",
                sym.name, sym.line
            ))
        })
    }

    fn apply_binary_op(
        &mut self,
        op: expr::BinaryOp,
        left: value::Value,
        right: value::Value,
    ) -> Result<value::Value, Unwind> {
        match op.ty {
            expr::BinaryOpTy::EqualEqual => Ok(value::Value::Bool(Interpreter::equals(
                &left, &right,
            ))),
            expr::BinaryOpTy::NotEqual => Ok(value::Value::Bool(!Interpreter::equals(
                &left, &right,
            ))),
            expr::BinaryOpTy::Plus => match (&left, &right) {
                (value::Value::Number(n1), value::Value::Number(n2)) => {
                    Ok(value::Value::Number(n1 + n2))
                }
                (value::Value::Str(s1), value::Value::Str(s2)) => {
                    Ok(value::Value::Str(format!("{}{}", s1, s2)))
                }
                _ => Err(runtime_error(format!(
                    "invalid operands of type {:?} and {:?} in add expression: \
                     both operands must be number or string (line={})",
                    value::type_of(&left),
                    value::type_of(&right),
                    op.line
                ))),
            },
            expr::BinaryOpTy::Minus
            | expr::BinaryOpTy::Star
            | expr::BinaryOpTy::Slash
            | expr::BinaryOpTy::Less
            | expr::BinaryOpTy::LessEqual
            | expr::BinaryOpTy::Greater
            | expr::BinaryOpTy::GreaterEqual => match (&left, &right) {
                (value::Value::Number(n1), value::Value::Number(n2)) => Ok(match op.ty {
                    expr::BinaryOpTy::Minus => value::Value::Number(n1 - n2),
                    expr::BinaryOpTy::Star => value::Value::Number(n1 * n2),
                    expr::BinaryOpTy::Slash => value::Value::Number(n1 / n2),
                    expr::BinaryOpTy::Less => value::Value::Bool(n1 < n2),
                    expr::BinaryOpTy::LessEqual => value::Value::Bool(n1 <= n2),
                    expr::BinaryOpTy::Greater => value::Value::Bool(n1 > n2),
                    expr::BinaryOpTy::GreaterEqual => value::Value::Bool(n1 >= n2),
                    _ => panic!("internal error in interpreter: unreachable binary op"),
                }),
                _ => Err(runtime_error(format!(
                    "invalid operands of type {:?} and {:?} in binary op {:?}: \
                     both operands must be numbers (line={})",
                    value::type_of(&left),
                    value::type_of(&right),
                    op.ty,
                    op.line
                ))),
            },
        }
    }

    fn literal_value(literal: &expr::Literal) -> value::Value {
        match literal {
            expr::Literal::Number(n) => value::Value::Number(*n),
            expr::Literal::Str(s) => value::Value::Str(s.clone()),
            expr::Literal::True => value::Value::Bool(true),
            expr::Literal::False => value::Value::Bool(false),
            expr::Literal::Nil => value::Value::Nil,
        }
    }

    fn is_truthy(val: &value::Value) -> bool {
        !matches!(val, value::Value::Nil | value::Value::Bool(false))
    }

    fn equals(left: &value::Value, right: &value::Value) -> bool {
        match (left, right) {
            (value::Value::Number(n1), value::Value::Number(n2)) => n1 == n2,
            (value::Value::Str(s1), value::Value::Str(s2)) => s1 == s2,
            (value::Value::Bool(b1), value::Value::Bool(b2)) => b1 == b2,
            (value::Value::Nil, value::Value::Nil) => true,
            (value::Value::Function(f1), value::Value::Function(f2)) => Rc::ptr_eq(f1, f2),
            (value::Value::Class(c1), value::Value::Class(c2)) => Rc::ptr_eq(c1, c2),
            (value::Value::Instance(i1), value::Value::Instance(i2)) => Rc::ptr_eq(i1, i2),
            (_, _) => false,
        }
    }

    fn print_val(&mut self, val: &value::Value) {
        let output = format!("{}", val);
        println!("{}", output);
        self.output.push(output);
    }
}

#[cfg(test)]
mod tests {
    use crate::parser;
    use crate::resolver;
    use crate::scanner;
    use crate::treewalk_interpreter::*;

    fn evaluate_program(source: &str) -> Result<Vec<String>, String> {
        let tokens = scanner::scan_tokens(source.to_string()).unwrap();
        let (stmts, parse_errors) = parser::parse(tokens);
        assert!(
            parse_errors.is_empty(),
            "unexpected parse errors: {:?}",
            parse_errors
        );
        let (resolutions, resolve_errors) = resolver::resolve(&stmts);
        assert!(
            resolve_errors.is_empty(),
            "unexpected resolve errors: {:?}",
            resolve_errors
        );

        let mut interpreter = Interpreter::default();
        interpreter.resolve(resolutions);
        match interpreter.interpret(&stmts) {
            Ok(()) => Ok(interpreter.output),
            Err(err) => Err(format!("{}", err)),
        }
    }

    fn printed(source: &str) -> Vec<String> {
        evaluate_program(source).unwrap()
    }

    #[test]
    fn test_arithmetic_and_precedence() {
        assert_eq!(printed("print -2 * 3 + 10 / 2;"), vec!["-1"]);
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(printed("print \"foo\" + \"bar\";"), vec!["foobar"]);
    }

    #[test]
    fn test_variable_assignment() {
        assert_eq!(printed("var x = 1; x = x + 41; print x;"), vec!["42"]);
    }

    #[test]
    fn test_block_scoping_and_shadowing() {
        assert_eq!(
            printed("var a = 1; { var a = 2; print a; } print a;"),
            vec!["2", "1"]
        );
    }

    #[test]
    fn test_if_else() {
        assert_eq!(
            printed("if (1 > 2) print \"bigger\"; else print \"smaller\";"),
            vec!["smaller"]
        );
    }

    #[test]
    fn test_logical_short_circuit() {
        assert_eq!(printed("print \"hi\" or 2; print nil or \"yes\";"), vec!["hi", "yes"]);
        assert_eq!(printed("print nil and 2; print 1 and 2;"), vec!["nil", "2"]);
    }

    #[test]
    fn test_for_loop() {
        assert_eq!(
            printed("for (var i = 0; i < 3; i = i + 1) print i;"),
            vec!["0", "1", "2"]
        );
    }

    #[test]
    fn test_while_loop() {
        assert_eq!(
            printed("var i = 0; while (i < 2) { print i; i = i + 1; }"),
            vec!["0", "1"]
        );
    }

    #[test]
    fn test_function_call_and_return() {
        assert_eq!(
            printed("fun f(x) { if (x) return \"yes\"; return \"no\"; } print f(true);"),
            vec!["yes"]
        );
    }

    #[test]
    fn test_recursion() {
        let source = "fun fib(n) {\n\
                        if (n < 2) return n;\n\
                        return fib(n - 1) + fib(n - 2);\n\
                      }\n\
                      print fib(10);";
        assert_eq!(printed(source), vec!["55"]);
    }

    #[test]
    fn test_closure_keeps_state() {
        let source = "fun makeCounter() {\n\
                        var i = 0;\n\
                        fun count() { i = i + 1; print i; }\n\
                        return count;\n\
                      }\n\
                      var counter = makeCounter();\n\
                      counter();\n\
                      counter();";
        assert_eq!(printed(source), vec!["1", "2"]);
    }

    #[test]
    fn test_closure_binding_is_frozen_at_resolution() {
        // the recorded distance pins the first `showA` lookup to globals,
        // even after a shadowing declaration appears in the block
        let source = "var a = \"global\";\n\
                      {\n\
                        fun showA() { print a; }\n\
                        showA();\n\
                        var a = \"block\";\n\
                        showA();\n\
                      }";
        assert_eq!(printed(source), vec!["global", "global"]);
    }

    #[test]
    fn test_class_method_call() {
        assert_eq!(
            printed("class Bacon { eat() { print \"crunch\"; } } Bacon().eat();"),
            vec!["crunch"]
        );
    }

    #[test]
    fn test_fields_and_this() {
        let source = "class Cake {\n\
                        taste() { print \"The \" + this.flavor + \" cake is delicious!\"; }\n\
                      }\n\
                      var cake = Cake();\n\
                      cake.flavor = \"chocolate\";\n\
                      cake.taste();";
        assert_eq!(printed(source), vec!["The chocolate cake is delicious!"]);
    }

    #[test]
    fn test_initializer_sets_fields_and_returns_instance() {
        let source = "class Point {\n\
                        init(x, y) { this.x = x; this.y = y; }\n\
                      }\n\
                      var p = Point(3, 4);\n\
                      print p.x + p.y;";
        assert_eq!(printed(source), vec!["7"]);
    }

    #[test]
    fn test_bare_return_in_initializer_returns_instance() {
        let source = "class Foo {\n\
                        init() { this.x = 1; return; }\n\
                      }\n\
                      print Foo().x;";
        assert_eq!(printed(source), vec!["1"]);
    }

    #[test]
    fn test_method_bound_to_instance() {
        let source = "class Person {\n\
                        init(name) { this.name = name; }\n\
                        sayName() { print this.name; }\n\
                      }\n\
                      var jane = Person(\"Jane\");\n\
                      var method = jane.sayName;\n\
                      method();";
        assert_eq!(printed(source), vec!["Jane"]);
    }

    #[test]
    fn test_inheritance_and_super() {
        let source = "class Doughnut {\n\
                        cook() { print \"Fry until golden brown.\"; }\n\
                      }\n\
                      class BostonCream < Doughnut {\n\
                        cook() {\n\
                          super.cook();\n\
                          print \"Pipe full of custard.\";\n\
                        }\n\
                      }\n\
                      BostonCream().cook();";
        assert_eq!(
            printed(source),
            vec!["Fry until golden brown.", "Pipe full of custard."]
        );
    }

    #[test]
    fn test_inherited_method_found_through_chain() {
        let source = "class A { f() { print \"A.f\"; } }\n\
                      class B < A {}\n\
                      class C < B {}\n\
                      C().f();";
        assert_eq!(printed(source), vec!["A.f"]);
    }

    #[test]
    fn test_undefined_variable_is_runtime_error() {
        let err = evaluate_program("print missing;").unwrap_err();
        assert!(err.contains("Undefined variable 'missing'"));
    }

    #[test]
    fn test_assign_to_undefined_variable_is_runtime_error() {
        let err = evaluate_program("missing = 1;").unwrap_err();
        assert!(err.contains("Undefined variable 'missing'"));
    }

    #[test]
    fn test_add_number_to_string_is_runtime_error() {
        let err = evaluate_program("print 1 + \"one\";").unwrap_err();
        assert!(err.contains("add expression"));
    }

    #[test]
    fn test_calling_non_callable_is_runtime_error() {
        let err = evaluate_program("var x = 1; x();").unwrap_err();
        assert!(err.contains("Can only call functions and classes"));
    }

    #[test]
    fn test_arity_mismatch_is_runtime_error() {
        let err = evaluate_program("fun f(a, b) { } f(1);").unwrap_err();
        assert!(err.contains("Expected 2 arguments but got 1"));
    }

    #[test]
    fn test_property_on_non_instance_is_runtime_error() {
        let err = evaluate_program("print 4.x;").unwrap_err();
        assert!(err.contains("Only instances have properties"));
    }

    #[test]
    fn test_superclass_must_be_a_class() {
        let err = evaluate_program("var NotAClass = 1; class Sub < NotAClass {}").unwrap_err();
        assert!(err.contains("Superclass must be a class"));
    }

    #[test]
    fn test_native_function_sqrt() {
        assert_eq!(printed("print sqrt(16);"), vec!["4"]);
    }

    #[test]
    fn test_interrupted_flag_stops_loop() {
        use std::sync::atomic::Ordering;

        let tokens = scanner::scan_tokens("while (true) { }".to_string()).unwrap();
        let (stmts, parse_errors) = parser::parse(tokens);
        assert!(parse_errors.is_empty());
        let (resolutions, resolve_errors) = resolver::resolve(&stmts);
        assert!(resolve_errors.is_empty());

        let mut interpreter = Interpreter::default();
        interpreter.resolve(resolutions);
        interpreter.interrupted.store(true, Ordering::Relaxed);
        let err = interpreter.interpret(&stmts).unwrap_err();
        assert_eq!(err, InterpreterError::Runtime("Interrupted.".to_string()));
    }
}
