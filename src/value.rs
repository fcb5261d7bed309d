use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::expr;
use crate::treewalk_interpreter;

#[derive(Clone)]
pub struct NativeFunction {
    pub arity: u8,
    pub name: String,
    pub func: fn(&mut treewalk_interpreter::Interpreter, &[Value]) -> Result<Value, String>,
}

/// A user-defined function or method. Cheap to clone: the parameter list
/// and body are shared, and binding a method only wraps the closure in
/// one extra environment holding `this`.
pub struct LoxFunction {
    pub name: expr::Symbol,
    pub params: Rc<Vec<expr::Symbol>>,
    pub body: Rc<Vec<expr::Stmt>>,
    pub closure: Rc<RefCell<treewalk_interpreter::Environment>>,
    pub is_initializer: bool,
}

pub struct LoxClass {
    pub name: String,
    pub superclass: Option<Rc<LoxClass>>,
    pub methods: HashMap<String, Rc<LoxFunction>>,
}

impl LoxClass {
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        if let Some(method) = self.methods.get(name) {
            return Some(method.clone());
        }
        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }

    pub fn arity(&self) -> usize {
        match self.find_method("init") {
            Some(initializer) => initializer.params.len(),
            None => 0,
        }
    }
}

pub struct LoxInstance {
    pub class: Rc<LoxClass>,
    pub fields: HashMap<String, Value>,
}

#[derive(Clone)]
pub enum Value {
    Number(f64),
    Str(String),
    Bool(bool),
    Nil,
    NativeFunction(NativeFunction),
    Function(Rc<LoxFunction>),
    Class(Rc<LoxClass>),
    Instance(Rc<RefCell<LoxInstance>>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Nil => write!(f, "nil"),
            Value::NativeFunction(func) => write!(f, "<native fn {}>", func.name),
            Value::Function(func) => write!(f, "<fn '{}'>", func.name.name),
            Value::Class(class) => write!(f, "{}", class.name),
            Value::Instance(instance) => write!(f, "{} instance", instance.borrow().class.name),
        }
    }
}

// closures can make values cyclic through their environments, so Debug is
// a shallow rendering rather than a derive
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", type_of(self), self)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Type {
    Number,
    String,
    Bool,
    Nil,
    NativeFunction,
    Function,
    Class,
    Instance,
}

pub fn type_of(value: &Value) -> Type {
    match value {
        Value::Number(_) => Type::Number,
        Value::Str(_) => Type::String,
        Value::Bool(_) => Type::Bool,
        Value::Nil => Type::Nil,
        Value::NativeFunction(_) => Type::NativeFunction,
        Value::Function(_) => Type::Function,
        Value::Class(_) => Type::Class,
        Value::Instance(_) => Type::Instance,
    }
}
