//! Runtime values for the interpreter

use super::class::{Class, Method};
use super::env::EnvRef;
use super::error::InterpResult;
use super::iter::NativeIter;
use super::sentinel::{Sentinel, SENTINEL};
use super::Interpreter;
use crate::ast::FnDecl;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak};

/// Native function type: receives the interpreter and positional arguments
pub type NativeFn = fn(&mut Interpreter, Vec<Value>) -> InterpResult<Value>;

/// Runtime value
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    /// Iterator exhaustion marker
    Sentinel(Sentinel),
    /// Script function or closure
    Function(Rc<Function>),
    /// Built-in function
    Native(Rc<NativeFunction>),
    Class(Rc<Class>),
    Instance(Rc<Instance>),
    /// Method paired with its receiver
    BoundMethod(Rc<BoundMethod>),
    Vec(Rc<RefCell<Vec<Value>>>),
    /// Half-open integer range
    Range(i64, i64),
    /// Built-in iterator (VecIter, RangeIter, MapIter, FilterIter)
    Iter(Rc<NativeIter>),
}

/// A script function together with the environment it closes over
#[derive(Debug)]
pub struct Function {
    pub name: Rc<str>,
    pub decl: Rc<FnDecl>,
    pub env: EnvRef,
    /// Module the function was defined in, for stack traces
    pub module: Rc<str>,
    /// Class whose method body (lexically) contains this function; `super`
    /// resolves above it
    pub home: Option<Weak<Class>>,
}

impl Function {
    pub fn arity(&self) -> usize {
        self.decl.arity()
    }
}

/// A built-in function
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: NativeFn,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({}/{})", self.name, self.arity)
    }
}

/// An object created by calling a class
#[derive(Debug)]
pub struct Instance {
    pub class: Rc<Class>,
    pub fields: RefCell<HashMap<String, Value>>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Instance {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }

    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields.borrow().get(name).cloned()
    }

    pub fn set_field(&self, name: &str, value: Value) {
        self.fields.borrow_mut().insert(name.to_string(), value);
    }
}

/// Method bound to the receiver it was looked up on
#[derive(Debug)]
pub struct BoundMethod {
    pub receiver: Value,
    pub method: Rc<Method>,
}

impl Value {
    /// Create a string value
    pub fn str(s: &str) -> Value {
        Value::Str(Rc::from(s))
    }

    /// Create a new vec value
    pub fn vec(items: Vec<Value>) -> Value {
        Value::Vec(Rc::new(RefCell::new(items)))
    }

    /// The exhaustion marker as a value
    pub fn sentinel() -> Value {
        Value::Sentinel(SENTINEL)
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, Value::Sentinel(_))
    }

    /// `nil` and `false` are falsey, everything else is truthy
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Get type name for error messages
    pub fn type_name(&self) -> &str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Sentinel(_) => "sentinel",
            Value::Function(_) | Value::Native(_) => "function",
            Value::Class(_) => "class",
            Value::Instance(inst) => &inst.class.name,
            Value::BoundMethod(_) => "method",
            Value::Vec(_) => "Vec",
            Value::Range(..) => "Range",
            Value::Iter(it) => it.class_name(),
        }
    }

    /// Numbers with no fractional part that fit in an `i64`, as used for
    /// indices and range bounds
    pub fn as_int(&self) -> Option<i64> {
        match self {
            // i64::MAX rounds up to 2^63 as f64, so the upper bound is exclusive
            Value::Number(n)
                if n.fract() == 0.0 && *n >= i64::MIN as f64 && *n < i64::MAX as f64 =>
            {
                Some(*n as i64)
            }
            _ => None,
        }
    }
}

thread_local! {
    /// Vecs being rendered on this thread; a repeat visit prints as `[...]`
    static DISPLAYING: RefCell<HashSet<usize>> = RefCell::new(HashSet::new());
}

fn format_vec(f: &mut fmt::Formatter<'_>, items: &Rc<RefCell<Vec<Value>>>) -> fmt::Result {
    let key = Rc::as_ptr(items) as usize;
    if !DISPLAYING.with(|seen| seen.borrow_mut().insert(key)) {
        return f.write_str("[...]");
    }
    let result = format_items(f, &items.borrow());
    DISPLAYING.with(|seen| seen.borrow_mut().remove(&key));
    result
}

fn format_items(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    write!(f, "[")?;
    for (i, v) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{v}")?;
    }
    write!(f, "]")
}

fn format_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        write!(f, "{}", n as i64)
    } else {
        write!(f, "{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => format_number(f, *n),
            Value::Str(s) => write!(f, "{s}"),
            Value::Sentinel(s) => write!(f, "{s}"),
            Value::Function(func) => write!(f, "<fn {}>", func.name),
            Value::Native(native) => write!(f, "<native fn {}>", native.name),
            Value::Class(class) => write!(f, "<class {}>", class.name),
            Value::Instance(inst) => write!(f, "<{} instance>", inst.class.name),
            Value::BoundMethod(bound) => write!(f, "<fn {}>", bound.method.name),
            Value::Vec(items) => format_vec(f, items),
            Value::Range(begin, end) => write!(f, "{begin}..{end}"),
            Value::Iter(it) => write!(f, "<{}>", it.class_name()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Sentinel(_), Value::Sentinel(_)) => true,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::BoundMethod(a), Value::BoundMethod(b)) => Rc::ptr_eq(a, b),
            (Value::Vec(a), Value::Vec(b)) => Rc::ptr_eq(a, b),
            (Value::Range(a0, a1), Value::Range(b0, b1)) => a0 == b0 && a1 == b1,
            (Value::Iter(a), Value::Iter(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}
