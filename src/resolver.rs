use std::collections::HashMap;
use std::fmt;

use crate::expr;

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
enum VarState {
    // occupies a slot in the scope but its initializer has not finished
    Declared,
    Defined,
}

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
enum ClassType {
    None,
    Class,
    Subclass,
}

#[derive(Debug, Clone)]
pub enum Error {
    ReadInInitializer {
        name: String,
        line: usize,
        col: i64,
    },
    Redeclaration {
        name: String,
        line: usize,
        col: i64,
    },
    ReturnOutsideFunction {
        line: usize,
        col: i64,
    },
    ReturnValueFromInitializer {
        line: usize,
        col: i64,
    },
    SelfInheritance {
        name: String,
        line: usize,
        col: i64,
    },
    ThisOutsideClass {
        line: usize,
        col: i64,
    },
    SuperOutsideClass {
        line: usize,
        col: i64,
    },
    SuperWithoutSuperclass {
        line: usize,
        col: i64,
    },
}

impl Error {
    pub fn position(&self) -> (usize, i64) {
        match self {
            Error::ReadInInitializer { line, col, .. }
            | Error::Redeclaration { line, col, .. }
            | Error::ReturnOutsideFunction { line, col }
            | Error::ReturnValueFromInitializer { line, col }
            | Error::SelfInheritance { line, col, .. }
            | Error::ThisOutsideClass { line, col }
            | Error::SuperOutsideClass { line, col }
            | Error::SuperWithoutSuperclass { line, col } => (*line, *col),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ReadInInitializer { name, line, col } => write!(
                f,
                "Can't read local variable '{}' in its own initializer at line={},col={}",
                name, line, col
            ),
            Error::Redeclaration { name, line, col } => write!(
                f,
                "Already a variable named '{}' in this scope at line={},col={}",
                name, line, col
            ),
            Error::ReturnOutsideFunction { line, col } => write!(
                f,
                "Can't return from top-level code at line={},col={}",
                line, col
            ),
            Error::ReturnValueFromInitializer { line, col } => write!(
                f,
                "Can't return a value from an initializer at line={},col={}",
                line, col
            ),
            Error::SelfInheritance { name, line, col } => write!(
                f,
                "Class '{}' can't inherit from itself at line={},col={}",
                name, line, col
            ),
            Error::ThisOutsideClass { line, col } => write!(
                f,
                "Can't use 'this' outside of a class at line={},col={}",
                line, col
            ),
            Error::SuperOutsideClass { line, col } => write!(
                f,
                "Can't use 'super' outside of a class at line={},col={}",
                line, col
            ),
            Error::SuperWithoutSuperclass { line, col } => write!(
                f,
                "Can't use 'super' in a class with no superclass at line={},col={}",
                line, col
            ),
        }
    }
}

/// One depth-first walk over the statements: records, for every local
/// reference, how many scopes separate it from its declaration, and
/// collects every semantic violation it can find without stopping. A
/// reference with no entry in the returned map lives in globals.
pub fn resolve(statements: &[expr::Stmt]) -> (HashMap<expr::NodeId, usize>, Vec<Error>) {
    let mut resolver = Resolver {
        scopes: Vec::new(),
        current_function: FunctionType::None,
        current_class: ClassType::None,
        resolutions: HashMap::new(),
        errors: Vec::new(),
    };
    resolver.resolve_stmts(statements);
    (resolver.resolutions, resolver.errors)
}

struct Resolver {
    scopes: Vec<HashMap<String, VarState>>,
    current_function: FunctionType,
    current_class: ClassType,
    resolutions: HashMap<expr::NodeId, usize>,
    errors: Vec<Error>,
}

impl Resolver {
    fn resolve_stmts(&mut self, statements: &[expr::Stmt]) {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    fn resolve_stmt(&mut self, stmt: &expr::Stmt) {
        match stmt {
            expr::Stmt::Expr(e) => self.resolve_expr(e),
            expr::Stmt::Print(e) => self.resolve_expr(e),
            expr::Stmt::VarDecl(name, maybe_initializer) => {
                self.declare(name);
                if let Some(initializer) = maybe_initializer {
                    self.resolve_expr(initializer);
                }
                self.define(name);
            }
            expr::Stmt::Block(statements) => {
                self.begin_scope();
                self.resolve_stmts(statements);
                self.end_scope();
            }
            expr::Stmt::If(condition, then_branch, maybe_else_branch) => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = maybe_else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            expr::Stmt::While(condition, body) => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }
            expr::Stmt::FunDecl(decl) => {
                // visible in the enclosing scope before the body resolves,
                // so the function can recurse
                self.declare(&decl.name);
                self.define(&decl.name);
                self.resolve_function(decl, FunctionType::Function);
            }
            expr::Stmt::Return(loc, maybe_value) => {
                if self.current_function == FunctionType::None {
                    self.errors.push(Error::ReturnOutsideFunction {
                        line: loc.line,
                        col: loc.col,
                    });
                }
                if let Some(value) = maybe_value {
                    if self.current_function == FunctionType::Initializer {
                        self.errors.push(Error::ReturnValueFromInitializer {
                            line: loc.line,
                            col: loc.col,
                        });
                    }
                    self.resolve_expr(value);
                }
            }
            expr::Stmt::ClassDecl(decl) => self.resolve_class(decl),
        }
    }

    fn resolve_class(&mut self, decl: &expr::ClassDecl) {
        let enclosing_class = self.current_class;
        self.current_class = ClassType::Class;

        self.declare(&decl.name);
        self.define(&decl.name);

        if let Some((superclass_id, superclass)) = &decl.superclass {
            if superclass.name == decl.name.name {
                self.errors.push(Error::SelfInheritance {
                    name: decl.name.name.clone(),
                    line: superclass.line,
                    col: superclass.col,
                });
            }
            self.current_class = ClassType::Subclass;
            self.resolve_variable_ref(*superclass_id, superclass);

            self.begin_scope();
            self.scopes
                .last_mut()
                .unwrap()
                .insert("super".to_string(), VarState::Defined);
        }

        self.begin_scope();
        self.scopes
            .last_mut()
            .unwrap()
            .insert("this".to_string(), VarState::Defined);

        for method in &decl.methods {
            let declaration = if method.name.name == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.resolve_function(method, declaration);
        }

        self.end_scope();
        if decl.superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    fn resolve_function(&mut self, decl: &expr::FunDecl, ty: FunctionType) {
        let enclosing_function = self.current_function;
        self.current_function = ty;

        self.begin_scope();
        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_stmts(&decl.body);
        self.end_scope();

        self.current_function = enclosing_function;
    }

    fn resolve_expr(&mut self, e: &expr::Expr) {
        match e {
            expr::Expr::Literal(_) => {}
            expr::Expr::Grouping(inner) => self.resolve_expr(inner),
            expr::Expr::Unary(_, right) => self.resolve_expr(right),
            expr::Expr::Binary(left, _, right) => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            expr::Expr::Logical(left, _, right) => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            expr::Expr::Variable(id, sym) => self.resolve_variable_ref(*id, sym),
            expr::Expr::Assign(id, sym, value) => {
                self.resolve_expr(value);
                self.resolve_local(*id, &sym.name, false);
            }
            expr::Expr::Call(callee, _, arguments) => {
                self.resolve_expr(callee);
                for argument in arguments {
                    self.resolve_expr(argument);
                }
            }
            expr::Expr::Get(object, _) => self.resolve_expr(object),
            expr::Expr::Set(object, _, value) => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }
            expr::Expr::This(id, loc) => {
                if self.current_class == ClassType::None {
                    self.errors.push(Error::ThisOutsideClass {
                        line: loc.line,
                        col: loc.col,
                    });
                    return;
                }
                self.resolve_local(*id, "this", false);
            }
            expr::Expr::Super(id, loc, _) => {
                match self.current_class {
                    ClassType::None => self.errors.push(Error::SuperOutsideClass {
                        line: loc.line,
                        col: loc.col,
                    }),
                    ClassType::Class => self.errors.push(Error::SuperWithoutSuperclass {
                        line: loc.line,
                        col: loc.col,
                    }),
                    ClassType::Subclass => {}
                }
                self.resolve_local(*id, "super", false);
            }
        }
    }

    fn resolve_variable_ref(&mut self, id: expr::NodeId, sym: &expr::Symbol) {
        let mut skip_innermost = false;
        if let Some(scope) = self.scopes.last() {
            if scope.get(&sym.name) == Some(&VarState::Declared) {
                self.errors.push(Error::ReadInInitializer {
                    name: sym.name.clone(),
                    line: sym.line,
                    col: sym.col,
                });
                // the half-initialized slot is unusable; bind the read to
                // an outer declaration (or globals) instead
                skip_innermost = true;
            }
        }
        self.resolve_local(id, &sym.name, skip_innermost);
    }

    fn resolve_local(&mut self, id: expr::NodeId, name: &str, skip_innermost: bool) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if depth == 0 && skip_innermost {
                continue;
            }
            if scope.contains_key(name) {
                self.resolutions.insert(id, depth);
                return;
            }
        }
        // not found in any enclosing scope: the evaluator falls back to
        // the global environment
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &expr::Symbol) {
        if self.scopes.is_empty() {
            return;
        }

        if self.scopes.last().unwrap().contains_key(&name.name) {
            self.errors.push(Error::Redeclaration {
                name: name.name.clone(),
                line: name.line,
                col: name.col,
            });
        }
        self.scopes
            .last_mut()
            .unwrap()
            .insert(name.name.clone(), VarState::Declared);
    }

    fn define(&mut self, name: &expr::Symbol) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.name.clone(), VarState::Defined);
        }
    }
}
