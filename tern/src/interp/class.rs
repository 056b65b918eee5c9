//! Class records and method resolution
//!
//! A class is a shared immutable handle: its method table is filled in once
//! by [`ClassBuilder::build`] and never touched again. Each method keeps a
//! `Weak` back-reference to the class that declared it, which is what
//! `super` dispatch resolves from.

use super::env::EnvRef;
use super::error::InterpResult;
use super::value::{Function, NativeFunction, Value};
use super::Interpreter;
use crate::ast::FnDecl;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// Native method: receives the interpreter, the receiver and the arguments
pub type NativeMethod = fn(&mut Interpreter, Value, Vec<Value>) -> InterpResult<Value>;

/// Executable body of a method
pub enum MethodBody {
    Script(Rc<Function>),
    Native(NativeMethod),
}

impl fmt::Debug for MethodBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodBody::Script(func) => write!(f, "Script({})", func.name),
            MethodBody::Native(_) => f.write_str("Native"),
        }
    }
}

/// A method as stored in its declaring class
#[derive(Debug)]
pub struct Method {
    pub name: Rc<str>,
    /// Parameter count, excluding `self`
    pub arity: usize,
    pub owner: Weak<Class>,
    pub body: MethodBody,
}

impl Method {
    /// Name of the declaring class, or `?` if it has been dropped
    pub fn owner_name(&self) -> Rc<str> {
        self.owner
            .upgrade()
            .map_or_else(|| Rc::from("?"), |class| class.name.clone())
    }
}

/// A class record: name, at most one parent, and its own methods
pub struct Class {
    pub name: Rc<str>,
    pub parent: Option<Rc<Class>>,
    methods: HashMap<String, Rc<Method>>,
    /// Constructor for built-in classes whose instances are not plain objects
    pub native_init: Option<NativeFunction>,
}

impl Class {
    /// Walk the parent chain from this class (inclusive) and return the first
    /// method named `name`
    pub fn resolve(&self, name: &str) -> Option<Rc<Method>> {
        let mut current = Some(self);
        while let Some(class) = current {
            if let Some(method) = class.methods.get(name) {
                return Some(Rc::clone(method));
            }
            current = class.parent.as_deref();
        }
        None
    }

    /// True if `self` is `other` or inherits from it
    pub fn is_subclass_of(&self, other: &Class) -> bool {
        let mut current = Some(self);
        while let Some(class) = current {
            if std::ptr::eq(class, other) {
                return true;
            }
            current = class.parent.as_deref();
        }
        false
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.methods.keys().collect();
        names.sort();
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name.clone()))
            .field("methods", &names)
            .finish()
    }
}

enum PendingMethod {
    Script {
        decl: Rc<FnDecl>,
        env: EnvRef,
        module: Rc<str>,
    },
    Native {
        name: &'static str,
        arity: usize,
        func: NativeMethod,
    },
}

/// Collects a class's methods, then ties the owner back-references
#[must_use]
pub struct ClassBuilder {
    name: Rc<str>,
    parent: Option<Rc<Class>>,
    pending: Vec<PendingMethod>,
    native_init: Option<NativeFunction>,
}

impl ClassBuilder {
    pub fn new(name: &str) -> Self {
        ClassBuilder {
            name: Rc::from(name),
            parent: None,
            pending: Vec::new(),
            native_init: None,
        }
    }

    pub fn parent(mut self, parent: Option<Rc<Class>>) -> Self {
        self.parent = parent;
        self
    }

    /// Add a method declared in script source
    pub fn script_method(mut self, decl: Rc<FnDecl>, env: EnvRef, module: Rc<str>) -> Self {
        self.pending.push(PendingMethod::Script { decl, env, module });
        self
    }

    pub fn native_method(mut self, name: &'static str, arity: usize, func: NativeMethod) -> Self {
        self.pending.push(PendingMethod::Native { name, arity, func });
        self
    }

    pub fn native_init(mut self, init: NativeFunction) -> Self {
        self.native_init = Some(init);
        self
    }

    pub fn build(self) -> Rc<Class> {
        let ClassBuilder {
            name,
            parent,
            pending,
            native_init,
        } = self;
        Rc::new_cyclic(|owner: &Weak<Class>| {
            let mut methods = HashMap::new();
            for item in pending {
                let method = match item {
                    PendingMethod::Script { decl, env, module } => {
                        let name: Rc<str> = Rc::from(decl.display_name());
                        let function = Function {
                            name: name.clone(),
                            decl: Rc::clone(&decl),
                            env,
                            module,
                            home: Some(owner.clone()),
                        };
                        Method {
                            name,
                            arity: decl.arity(),
                            owner: owner.clone(),
                            body: MethodBody::Script(Rc::new(function)),
                        }
                    }
                    PendingMethod::Native { name, arity, func } => Method {
                        name: Rc::from(name),
                        arity,
                        owner: owner.clone(),
                        body: MethodBody::Native(func),
                    },
                };
                methods.insert(method.name.to_string(), Rc::new(method));
            }
            Class {
                name,
                parent,
                methods,
                native_init,
            }
        })
    }
}
