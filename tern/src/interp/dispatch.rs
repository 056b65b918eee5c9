//! Call dispatch: arity checks, frames, method and super resolution

use super::class::{Class, Method, MethodBody};
use super::env::{child_env, EnvRef};
use super::error::{InterpResult, RuntimeError};
use super::eval::{Flow, STACK_GROW_SIZE, STACK_RED_ZONE};
use super::frame::Frame;
use super::value::{Function, Instance, NativeFunction, Value};
use super::Interpreter;
use std::rc::Rc;

impl Interpreter {
    /// Call any callable value with positional arguments
    pub fn call_value(&mut self, callee: Value, args: Vec<Value>) -> InterpResult<Value> {
        match callee {
            Value::Function(func) => self.call_function(&func, args),
            Value::Native(native) => self.call_native(&native, args),
            Value::BoundMethod(bound) => {
                let receiver = bound.receiver.clone();
                self.call_method(receiver, &bound.method, args)
            }
            Value::Class(class) => self.construct(&class, args),
            _ => Err(RuntimeError::not_callable()),
        }
    }

    /// Look `name` up on `receiver` and call it. Instance fields shadow methods.
    pub fn invoke(&mut self, receiver: Value, name: &str, args: Vec<Value>) -> InterpResult<Value> {
        if let Value::Instance(instance) = &receiver {
            if let Some(field) = instance.field(name) {
                return self.call_value(field, args);
            }
        }
        let class = self
            .class_of(&receiver)
            .ok_or_else(|| RuntimeError::type_error("Only instances have properties."))?;
        let method = class
            .resolve(name)
            .ok_or_else(|| RuntimeError::no_such_method(name))?;
        self.call_method(receiver, &method, args)
    }

    /// `super.name(args)`: resolve above the class declaring the running
    /// method and call it on the current `self`
    pub fn invoke_super(&mut self, name: &str, args: Vec<Value>, env: &EnvRef) -> InterpResult<Value> {
        let (receiver, method) = self.resolve_super(name, env)?;
        self.call_method(receiver, &method, args)
    }

    pub(crate) fn resolve_super(&self, name: &str, env: &EnvRef) -> InterpResult<(Value, Rc<Method>)> {
        let home = self
            .frames
            .current()
            .and_then(Frame::home_class)
            .ok_or_else(|| RuntimeError::type_error("Can't use 'super' outside of a method."))?;
        let parent = home.parent.as_ref().ok_or_else(|| {
            RuntimeError::type_error("Can't use 'super' in a class with no superclass.")
        })?;
        let method = parent
            .resolve(name)
            .ok_or_else(|| RuntimeError::no_such_method(name))?;
        let receiver = env
            .borrow()
            .get("self")
            .ok_or_else(|| RuntimeError::type_error("Can't use 'super' outside of a method."))?;
        Ok((receiver, method))
    }

    /// Class used for method lookup on `value`
    pub fn class_of(&self, value: &Value) -> Option<Rc<Class>> {
        match value {
            Value::Instance(instance) => Some(Rc::clone(&instance.class)),
            Value::Vec(_) => Some(Rc::clone(&self.core.vec)),
            Value::Range(..) => Some(Rc::clone(&self.core.range)),
            Value::Iter(it) => Some(Rc::clone(it.class())),
            _ => None,
        }
    }

    /// Call a method already resolved for `receiver`
    pub fn call_method(&mut self, receiver: Value, method: &Rc<Method>, args: Vec<Value>) -> InterpResult<Value> {
        self.check_arity(&method.name, &method.owner_name(), method.arity, args.len())?;
        let line = self.frames.line();
        match &method.body {
            MethodBody::Script(func) => {
                let frame = Frame::call(
                    method.name.clone(),
                    func.home.clone(),
                    func.module.clone(),
                    line,
                );
                let func = Rc::clone(func);
                self.with_frame(frame, |interp| interp.run_body(&func, Some(receiver), args))
            }
            MethodBody::Native(native) => {
                let native = *native;
                let frame = Frame::call(
                    method.name.clone(),
                    Some(method.owner.clone()),
                    self.current_module(),
                    line,
                );
                self.with_frame(frame, |interp| native(interp, receiver, args))
            }
        }
    }

    pub(crate) fn call_function(&mut self, func: &Rc<Function>, args: Vec<Value>) -> InterpResult<Value> {
        self.check_arity(&func.name, &func.module, func.arity(), args.len())?;
        let frame = Frame::call(
            func.name.clone(),
            func.home.clone(),
            func.module.clone(),
            self.frames.line(),
        );
        self.with_frame(frame, |interp| interp.run_body(func, None, args))
    }

    fn call_native(&mut self, native: &NativeFunction, args: Vec<Value>) -> InterpResult<Value> {
        let module = self.current_module();
        self.check_arity(native.name, &module, native.arity, args.len())?;
        let frame = Frame::call(Rc::from(native.name), None, module, self.frames.line());
        let func = native.func;
        self.with_frame(frame, |interp| func(interp, args))
    }

    /// `ClassName(args)`: allocate an instance and run `__init__` if one resolves
    pub fn construct(&mut self, class: &Rc<Class>, args: Vec<Value>) -> InterpResult<Value> {
        if let Some(init) = &class.native_init {
            return self.call_native(init, args);
        }

        let instance = Value::Instance(Rc::new(Instance::new(Rc::clone(class))));
        match class.resolve("__init__") {
            Some(init) => {
                self.call_method(instance.clone(), &init, args)?;
            }
            None if !args.is_empty() => {
                return Err(RuntimeError::constructor_arity(&class.name, args.len()));
            }
            None => {}
        }
        Ok(instance)
    }

    fn check_arity(&self, callable: &str, owner: &str, expected: usize, found: usize) -> InterpResult<()> {
        if expected == found {
            Ok(())
        } else {
            Err(RuntimeError::arity(callable, owner, expected, found, self.frames.line()))
        }
    }

    /// Push `frame`, run `body`, pop. Errors pick up the popped frame on the
    /// way out so the finished trace reads innermost first.
    pub(crate) fn with_frame<T>(
        &mut self,
        frame: Frame,
        body: impl FnOnce(&mut Self) -> InterpResult<T>,
    ) -> InterpResult<T> {
        let context = frame.context.clone();
        self.frames.push(frame)?;
        if self.config.trace_calls {
            eprintln!("[call] depth={} {context}", self.frames.depth());
        }

        let result = body(self);

        if self.config.trace_calls {
            eprintln!("[ret ] depth={} {context}", self.frames.depth());
        }
        let frame = self.frames.pop();
        result.map_err(|mut err| {
            if let Some(frame) = frame {
                err.trace.push(frame.snapshot());
            }
            err
        })
    }

    /// Bind parameters and run a script function body
    fn run_body(&mut self, func: &Function, receiver: Option<Value>, args: Vec<Value>) -> InterpResult<Value> {
        let env = child_env(&func.env);
        {
            let mut scope = env.borrow_mut();
            if let Some(receiver) = receiver {
                scope.define("self", receiver);
            }
            for (param, arg) in func.decl.params.iter().zip(args) {
                scope.define(param.node.clone(), arg);
            }
        }

        let flow = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            self.exec_block(&func.decl.body, &env)
        })?;
        Ok(match flow {
            Flow::Return(value) => value,
            Flow::Normal => Value::Nil,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::{ClassBuilder, ErrorKind};

    fn ok_nil(_: &mut Interpreter, _: Value, _: Vec<Value>) -> InterpResult<Value> {
        Ok(Value::Nil)
    }

    fn echo_receiver(_: &mut Interpreter, receiver: Value, _: Vec<Value>) -> InterpResult<Value> {
        Ok(receiver)
    }

    #[test]
    fn test_arity_checked_before_frame_push() {
        let mut interp = Interpreter::new();
        let class = ClassBuilder::new("Base").native_method("foo", 2, ok_nil).build();
        let instance = interp.construct(&class, vec![]).unwrap();
        let err = interp
            .invoke(instance, "foo", vec![Value::Nil; 4])
            .unwrap_err();
        assert_eq!(err.message, "Expected 2 arguments but found 4.");
        assert!(err.trace.is_empty());
        assert_eq!(interp.frames.depth(), 0);
    }

    #[test]
    fn test_invoke_missing_method() {
        let mut interp = Interpreter::new();
        let class = ClassBuilder::new("Empty").build();
        let instance = interp.construct(&class, vec![]).unwrap();
        let err = interp.invoke(instance, "nope", vec![]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoSuchMethod);
        assert_eq!(err.message, "Undefined property 'nope'.");
    }

    #[test]
    fn test_invoke_on_non_object() {
        let mut interp = Interpreter::new();
        let err = interp.invoke(Value::Number(1.0), "foo", vec![]).unwrap_err();
        assert_eq!(err.message, "Only instances have properties.");
    }

    #[test]
    fn test_construct_without_init_rejects_args() {
        let mut interp = Interpreter::new();
        let class = ClassBuilder::new("Point").build();
        let err = interp
            .construct(&class, vec![Value::Number(1.0)])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConstructorArity);
        assert_eq!(err.expression.as_deref(), Some("Point()"));
    }

    #[test]
    fn test_inherited_native_method_receives_subclass_instance() {
        let mut interp = Interpreter::new();
        let base = ClassBuilder::new("Base")
            .native_method("me", 0, echo_receiver)
            .build();
        let derived = ClassBuilder::new("Derived").parent(Some(base)).build();
        let instance = interp.construct(&derived, vec![]).unwrap();
        let me = interp.invoke(instance.clone(), "me", vec![]).unwrap();
        assert_eq!(me, instance);
    }

    #[test]
    fn test_not_callable() {
        let mut interp = Interpreter::new();
        let err = interp.call_value(Value::Bool(true), vec![]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotCallable);
    }

    #[test]
    fn test_frames_popped_after_error() {
        fn fail(_: &mut Interpreter, _: Value, _: Vec<Value>) -> InterpResult<Value> {
            Err(RuntimeError::type_error("boom"))
        }
        let mut interp = Interpreter::new();
        let class = ClassBuilder::new("C").native_method("go", 0, fail).build();
        let instance = interp.construct(&class, vec![]).unwrap();
        let err = interp.invoke(instance, "go", vec![]).unwrap_err();
        assert_eq!(interp.frames.depth(), 0);
        assert_eq!(err.trace.len(), 1);
        assert_eq!(err.trace[0].to_string(), "[module \"main\", line 0] in go()");
    }
}
