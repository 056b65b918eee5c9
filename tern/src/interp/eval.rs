//! Statement executor and expression evaluator

use super::builtins::{self, CoreClasses};
use super::class::{Class, ClassBuilder};
use super::env::{child_env, EnvRef, Environment};
use super::error::{InterpResult, RuntimeError};
use super::frame::{CallStack, Frame};
use super::value::{BoundMethod, Function, Value};
use crate::ast::{BinOp, ClassDecl, Expr, FnDecl, LogicOp, Program, Spanned, Stmt, UnOp};
use crate::config::RunConfig;
use std::io::{self, Write};
use std::rc::{Rc, Weak};

/// Stack growth parameters for deep recursion
pub(super) const STACK_RED_ZONE: usize = 128 * 1024; // 128KB remaining triggers growth
pub(super) const STACK_GROW_SIZE: usize = 4 * 1024 * 1024; // Grow by 4MB each time

/// How a statement finished
#[derive(Debug)]
pub enum Flow {
    Normal,
    Return(Value),
}

/// The interpreter
pub struct Interpreter {
    /// Global environment
    globals: EnvRef,
    /// Explicit call-frame stack used for traces and `super`
    pub(crate) frames: CallStack,
    /// Built-in classes used for method lookup on non-instance values
    pub(crate) core: CoreClasses,
    pub(crate) config: RunConfig,
    /// Module name reported in stack frames
    module: Rc<str>,
    /// Sink for `print`
    out: Box<dyn Write>,
}

impl Interpreter {
    /// Create an interpreter with the default configuration, printing to stdout
    pub fn new() -> Self {
        Self::with_config(RunConfig::default())
    }

    pub fn with_config(config: RunConfig) -> Self {
        let globals = Environment::new().into_ref();
        let core = builtins::install(&mut globals.borrow_mut());
        Interpreter {
            globals,
            frames: CallStack::new(config.max_frames),
            core,
            module: Rc::from(config.module.as_str()),
            config,
            out: Box::new(io::stdout()),
        }
    }

    /// Redirect `print` output
    pub fn with_output(mut self, out: impl Write + 'static) -> Self {
        self.out = Box::new(out);
        self
    }

    pub fn global_env(&self) -> &EnvRef {
        &self.globals
    }

    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.globals.borrow().get(name)
    }

    /// Run top-level statements. Returns the value of the final statement
    /// when it is an expression statement, otherwise nil.
    pub fn run(&mut self, program: &Program) -> InterpResult<Value> {
        self.frames.clear();
        let globals = Rc::clone(&self.globals);
        let frame = Frame::script(self.module.clone());
        self.with_frame(frame, |interp| {
            let mut last = Value::Nil;
            for stmt in &program.stmts {
                last = Value::Nil;
                if let Stmt::Expr(expr) = &stmt.node {
                    interp.frames.set_line(stmt.span.line);
                    last = interp.eval(expr, &globals)?;
                    continue;
                }
                if let Flow::Return(value) = interp.exec(stmt, &globals)? {
                    return Ok(value);
                }
            }
            Ok(last)
        })
    }

    /// Write a line to the output sink
    pub(crate) fn write_line(&mut self, text: &str) -> InterpResult<()> {
        writeln!(self.out, "{text}").map_err(|e| RuntimeError::io_error(&e.to_string()))
    }

    /// Module of the innermost frame
    pub(crate) fn current_module(&self) -> Rc<str> {
        self.frames
            .current()
            .map_or_else(|| self.module.clone(), |frame| frame.module.clone())
    }

    fn current_home(&self) -> Option<Weak<Class>> {
        self.frames.current().and_then(|frame| frame.home.clone())
    }

    // ---------------------------------------------------------------------
    // Statements

    pub(crate) fn exec_block(&mut self, stmts: &[Spanned<Stmt>], env: &EnvRef) -> InterpResult<Flow> {
        for stmt in stmts {
            if let Flow::Return(value) = self.exec(stmt, env)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, stmt: &Spanned<Stmt>, env: &EnvRef) -> InterpResult<Flow> {
        self.frames.set_line(stmt.span.line);
        match &stmt.node {
            Stmt::Expr(expr) => {
                self.eval(expr, env)?;
            }

            Stmt::Var { name, init } => {
                let value = match init {
                    Some(init) => self.eval(init, env)?,
                    None => Value::Nil,
                };
                env.borrow_mut().define(name.node.clone(), value);
            }

            Stmt::Fn(decl) => {
                let func = self.make_function(decl, env);
                env.borrow_mut().define(decl.display_name(), func);
            }

            Stmt::Class(decl) => {
                let class = self.declare_class(decl, env)?;
                env.borrow_mut().define(decl.name.node.clone(), class);
            }

            Stmt::Block(stmts) => return self.exec_block(stmts, &child_env(env)),

            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.eval(cond, env)?.is_truthy() {
                    return self.exec_block(then_branch, &child_env(env));
                } else if let Some(else_branch) = else_branch {
                    return self.exec(else_branch, env);
                }
            }

            Stmt::While { cond, body } => {
                while self.eval(cond, env)?.is_truthy() {
                    if let Flow::Return(value) = self.exec_block(body, &child_env(env))? {
                        return Ok(Flow::Return(value));
                    }
                    self.frames.set_line(stmt.span.line);
                }
            }

            Stmt::For { var, iterable, body } => {
                let source = self.eval(iterable, env)?;
                let it = self.invoke(source, "iter", Vec::new())?;
                loop {
                    self.frames.set_line(stmt.span.line);
                    let value = self.invoke(it.clone(), "next", Vec::new())?;
                    if value.is_sentinel() {
                        break;
                    }
                    let scope = child_env(env);
                    scope.borrow_mut().define(var.node.clone(), value);
                    if let Flow::Return(value) = self.exec_block(body, &scope)? {
                        return Ok(Flow::Return(value));
                    }
                }
            }

            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr, env)?,
                    None => Value::Nil,
                };
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn make_function(&self, decl: &Rc<FnDecl>, env: &EnvRef) -> Value {
        Value::Function(Rc::new(Function {
            name: Rc::from(decl.display_name()),
            decl: Rc::clone(decl),
            env: Rc::clone(env),
            module: self.current_module(),
            home: self.current_home(),
        }))
    }

    fn declare_class(&mut self, decl: &ClassDecl, env: &EnvRef) -> InterpResult<Value> {
        let parent = match &decl.parent {
            Some(name) => match env.borrow().get(&name.node) {
                Some(Value::Class(class)) => Some(class),
                Some(_) => return Err(RuntimeError::type_error("Superclass must be a class.")),
                None => return Err(RuntimeError::undefined_variable(&name.node)),
            },
            None => None,
        };

        let module = self.current_module();
        let class = decl
            .methods
            .iter()
            .fold(
                ClassBuilder::new(&decl.name.node).parent(parent),
                |builder, method| {
                    builder.script_method(Rc::clone(method), Rc::clone(env), module.clone())
                },
            )
            .build();
        Ok(Value::Class(class))
    }

    // ---------------------------------------------------------------------
    // Expressions

    /// Evaluate an expression with automatic stack growth for deep recursion
    pub(crate) fn eval(&mut self, expr: &Spanned<Expr>, env: &EnvRef) -> InterpResult<Value> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_inner(expr, env))
    }

    fn eval_inner(&mut self, expr: &Spanned<Expr>, env: &EnvRef) -> InterpResult<Value> {
        match &expr.node {
            Expr::Nil => Ok(Value::Nil),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::str(s)),

            Expr::Var(name) => env
                .borrow()
                .get(name)
                .ok_or_else(|| RuntimeError::undefined_variable(name)),

            Expr::SelfRef => env
                .borrow()
                .get("self")
                .ok_or_else(|| RuntimeError::type_error("Can't use 'self' outside of a method.")),

            Expr::Super { method } => {
                let (receiver, method) = self.resolve_super(&method.node, env)?;
                Ok(Value::BoundMethod(Rc::new(BoundMethod { receiver, method })))
            }

            Expr::Assign { name, value } => {
                let value = self.eval(value, env)?;
                if env.borrow_mut().assign(&name.node, value.clone()) {
                    Ok(value)
                } else {
                    Err(RuntimeError::undefined_variable(&name.node))
                }
            }

            Expr::Get { object, field } => {
                let object = self.eval(object, env)?;
                self.get_property(object, &field.node)
            }

            Expr::Set {
                object,
                field,
                value,
            } => {
                let object = self.eval(object, env)?;
                let Value::Instance(instance) = object else {
                    return Err(RuntimeError::type_error("Only instances have fields."));
                };
                let value = self.eval(value, env)?;
                instance.set_field(&field.node, value.clone());
                Ok(value)
            }

            Expr::Call { callee, args } => self.eval_call(expr, callee, args, env),

            Expr::Binary { left, op, right } => {
                let left = self.eval(left, env)?;
                let right = self.eval(right, env)?;
                eval_binary(*op, left, right)
            }

            Expr::Logical { left, op, right } => {
                let left = self.eval(left, env)?;
                match (op, left.is_truthy()) {
                    (LogicOp::Or, true) | (LogicOp::And, false) => Ok(left),
                    _ => self.eval(right, env),
                }
            }

            Expr::Unary { op, expr } => {
                let value = self.eval(expr, env)?;
                match op {
                    UnOp::Not => Ok(Value::Bool(!value.is_truthy())),
                    UnOp::Neg => match value {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(RuntimeError::type_error("Operand must be a number.")),
                    },
                }
            }

            Expr::Lambda(decl) => Ok(self.make_function(decl, env)),

            Expr::VecLit(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval(item, env))
                    .collect::<InterpResult<Vec<_>>>()?;
                Ok(Value::vec(values))
            }

            Expr::Range { begin, end } => {
                let begin = self.eval(begin, env)?;
                let end = self.eval(end, env)?;
                match (begin.as_int(), end.as_int()) {
                    (Some(begin), Some(end)) => Ok(Value::Range(begin, end)),
                    _ => Err(RuntimeError::type_error("Range bounds must be integers.")),
                }
            }
        }
    }

    fn get_property(&mut self, object: Value, name: &str) -> InterpResult<Value> {
        if let Value::Instance(instance) = &object {
            if let Some(value) = instance.field(name) {
                return Ok(value);
            }
        }
        let class = self
            .class_of(&object)
            .ok_or_else(|| RuntimeError::type_error("Only instances have properties."))?;
        let method = class
            .resolve(name)
            .ok_or_else(|| RuntimeError::undefined_property(name))?;
        Ok(Value::BoundMethod(Rc::new(BoundMethod {
            receiver: object,
            method,
        })))
    }

    /// Evaluate a call. Receiver and arguments are evaluated first, then the
    /// frame line is pinned to the call before dispatching.
    fn eval_call(
        &mut self,
        call: &Spanned<Expr>,
        callee: &Spanned<Expr>,
        args: &[Spanned<Expr>],
        env: &EnvRef,
    ) -> InterpResult<Value> {
        let line = call.span.line;
        let result = match &callee.node {
            Expr::Get { object, field } => {
                let receiver = self.eval(object, env)?;
                let args = self.eval_args(args, env)?;
                self.frames.set_line(line);
                self.invoke(receiver, &field.node, args)
            }
            Expr::Super { method } => {
                let args = self.eval_args(args, env)?;
                self.frames.set_line(line);
                self.invoke_super(&method.node, args, env)
            }
            _ => {
                let function = self.eval(callee, env)?;
                let args = self.eval_args(args, env)?;
                self.frames.set_line(line);
                self.call_value(function, args)
            }
        };

        // An error raised by the dispatch itself (no frames collected yet)
        // is reported against the call as written.
        result.map_err(|mut err| {
            if err.trace.is_empty() && err.expression.is_some() {
                err.expression = Some(callee.node.call_label());
            }
            err
        })
    }

    fn eval_args(&mut self, args: &[Spanned<Expr>], env: &EnvRef) -> InterpResult<Vec<Value>> {
        args.iter().map(|arg| self.eval(arg, env)).collect()
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn eval_binary(op: BinOp, left: Value, right: Value) -> InterpResult<Value> {
    match (op, &left, &right) {
        (BinOp::Eq, ..) => return Ok(Value::Bool(left == right)),
        (BinOp::Ne, ..) => return Ok(Value::Bool(left != right)),
        (BinOp::Add, Value::Str(a), Value::Str(b)) => return Ok(Value::str(&format!("{a}{b}"))),
        _ => {}
    }

    let (Value::Number(a), Value::Number(b)) = (&left, &right) else {
        return Err(RuntimeError::type_error(if op == BinOp::Add {
            "Operands must be two numbers or two strings."
        } else {
            "Operands must be numbers."
        }));
    };
    let (a, b) = (*a, *b);
    Ok(match op {
        BinOp::Add => Value::Number(a + b),
        BinOp::Sub => Value::Number(a - b),
        BinOp::Mul => Value::Number(a * b),
        BinOp::Div => Value::Number(a / b),
        BinOp::Mod => Value::Number(a % b),
        BinOp::Lt => Value::Bool(a < b),
        BinOp::Le => Value::Bool(a <= b),
        BinOp::Gt => Value::Bool(a > b),
        BinOp::Ge => Value::Bool(a >= b),
        BinOp::Eq => Value::Bool(a == b),
        BinOp::Ne => Value::Bool(a != b),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::{CaptureOutput, ErrorKind};
    use crate::{lexer, parser};

    fn parse(source: &str) -> Program {
        let tokens = lexer::tokenize(source).unwrap();
        parser::parse("test.tn", source, tokens).unwrap()
    }

    fn run(source: &str) -> (InterpResult<Value>, String) {
        let out = CaptureOutput::new();
        let mut interp = Interpreter::new().with_output(out.clone());
        let result = interp.run(&parse(source));
        (result, out.contents())
    }

    fn eval(source: &str) -> Value {
        run(source).0.unwrap()
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("1 + 2 * 3;"), Value::Number(7.0));
        assert_eq!(eval("(1 + 2) * 3;"), Value::Number(9.0));
        assert_eq!(eval("7 % 4;"), Value::Number(3.0));
        assert_eq!(eval("-(2 - 5);"), Value::Number(3.0));
    }

    #[test]
    fn test_string_concat() {
        assert_eq!(eval("\"a\" + \"b\";"), Value::str("ab"));
    }

    #[test]
    fn test_mixed_add_is_type_error() {
        let err = run("\"a\" + 1;").0.unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeError);
        assert_eq!(err.message, "Operands must be two numbers or two strings.");
    }

    #[test]
    fn test_comparison_requires_numbers() {
        let err = run("1 < \"2\";").0.unwrap_err();
        assert_eq!(err.message, "Operands must be numbers.");
    }

    #[test]
    fn test_logical_short_circuit() {
        assert_eq!(eval("nil or 3;"), Value::Number(3.0));
        assert_eq!(eval("false and undefined_name;"), Value::Bool(false));
        assert_eq!(eval("1 and 2;"), Value::Number(2.0));
    }

    #[test]
    fn test_equality() {
        assert_eq!(eval("1 == 1;"), Value::Bool(true));
        assert_eq!(eval("\"a\" != \"a\";"), Value::Bool(false));
        assert_eq!(eval("nil == false;"), Value::Bool(false));
    }

    #[test]
    fn test_variables_and_assignment() {
        assert_eq!(eval("var x = 1; x = x + 41; x;"), Value::Number(42.0));
    }

    #[test]
    fn test_assign_undefined() {
        let err = run("y = 1;").0.unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndefinedVariable);
        assert_eq!(err.message, "Undefined variable 'y'.");
    }

    #[test]
    fn test_block_scoping() {
        assert_eq!(eval("var x = 1; { var x = 2; } x;"), Value::Number(1.0));
    }

    #[test]
    fn test_if_else_chain() {
        let src = "var r; var n = 5; if (n < 3) { r = 1; } else if (n < 10) { r = 2; } else { r = 3; } r;";
        assert_eq!(eval(src), Value::Number(2.0));
    }

    #[test]
    fn test_while_loop() {
        assert_eq!(
            eval("var i = 0; var s = 0; while (i < 5) { s = s + i; i = i + 1; } s;"),
            Value::Number(10.0)
        );
    }

    #[test]
    fn test_function_return() {
        assert_eq!(
            eval("fn add(a, b) { return a + b; } add(2, 3);"),
            Value::Number(5.0)
        );
        assert_eq!(eval("fn f() { } f();"), Value::Nil);
    }

    #[test]
    fn test_closure_captures_environment() {
        let src = "
            fn counter() {
                var n = 0;
                return fn () { n = n + 1; return n; };
            }
            var c = counter();
            c();
            c();
            c();
        ";
        assert_eq!(eval(src), Value::Number(3.0));
    }

    #[test]
    fn test_recursion() {
        let src = "fn fib(n) { if (n < 2) { return n; } return fib(n - 1) + fib(n - 2); } fib(15);";
        assert_eq!(eval(src), Value::Number(610.0));
    }

    #[test]
    fn test_print_writes_to_sink() {
        let (_, out) = run("print(1); print(\"two\"); print(nil);");
        assert_eq!(out, "1\ntwo\nnil\n");
    }

    #[test]
    fn test_fields_and_methods() {
        let src = "
            class Point {
                fn __init__(self, x, y) { self.x = x; self.y = y; }
                fn sum(self) { return self.x + self.y; }
            }
            var p = Point(3, 4);
            p.x = 10;
            p.sum();
        ";
        assert_eq!(eval(src), Value::Number(14.0));
    }

    #[test]
    fn test_bound_method_keeps_receiver() {
        let src = "
            class A { fn __init__(self) { self.v = 7; } fn get(self) { return self.v; } }
            var g = A().get;
            g();
        ";
        assert_eq!(eval(src), Value::Number(7.0));
    }

    #[test]
    fn test_field_shadows_method() {
        let src = "
            class A { fn f(self) { return 1; } }
            var a = A();
            a.f = fn () { return 2; };
            a.f();
        ";
        assert_eq!(eval(src), Value::Number(2.0));
    }

    #[test]
    fn test_undefined_property() {
        let err = run("class A {} A().missing;").0.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoSuchMethod);
        assert_eq!(err.message, "Undefined property 'missing'.");
    }

    #[test]
    fn test_set_on_non_instance() {
        let err = run("var x = 1; x.y = 2;").0.unwrap_err();
        assert_eq!(err.message, "Only instances have fields.");
    }

    #[test]
    fn test_superclass_must_be_class() {
        let err = run("var NotAClass = 1; class B < NotAClass {}").0.unwrap_err();
        assert_eq!(err.message, "Superclass must be a class.");
    }

    #[test]
    fn test_super_outside_method() {
        let err = run("super.foo();").0.unwrap_err();
        assert_eq!(err.message, "Can't use 'super' outside of a method.");
    }

    #[test]
    fn test_super_without_parent() {
        let err = run("class A { fn f(self) { return super.f(); } } A().f();")
            .0
            .unwrap_err();
        assert_eq!(err.message, "Can't use 'super' in a class with no superclass.");
    }

    #[test]
    fn test_super_in_closure_inside_method() {
        let src = "
            class A { fn name(self) { return \"A\"; } }
            class B < A {
                fn name(self) { var f = fn () { return super.name(); }; return f(); }
            }
            B().name();
        ";
        assert_eq!(eval(src), Value::str("A"));
    }

    #[test]
    fn test_call_non_callable() {
        let err = run("var x = 3; x();").0.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotCallable);
        assert_eq!(err.message, "Can only call functions and classes.");
    }

    #[test]
    fn test_range_bounds_must_be_integers() {
        let err = run("1.5..3;").0.unwrap_err();
        assert_eq!(err.message, "Range bounds must be integers.");
    }

    #[test]
    fn test_top_level_return_ends_script() {
        let (result, out) = run("print(1); return 5; print(2);");
        assert_eq!(result.unwrap(), Value::Number(5.0));
        assert_eq!(out, "1\n");
    }

    #[test]
    fn test_stack_overflow_is_reported() {
        let err = run("fn f() { return f(); } f();").0.unwrap_err();
        assert_eq!(err.kind, ErrorKind::StackOverflow);
        assert_eq!(err.message, "Stack overflow.");
        assert_eq!(err.trace.len(), 64);
    }

    #[test]
    fn test_max_frames_config() {
        let out = CaptureOutput::new();
        let mut interp =
            Interpreter::with_config(RunConfig::new().max_frames(3)).with_output(out);
        let err = interp
            .run(&parse("fn f(n) { return f(n + 1); } f(0);"))
            .unwrap_err();
        assert_eq!(err.trace.len(), 3);
    }

    #[test]
    fn test_globals_persist_between_runs() {
        let mut interp = Interpreter::new().with_output(CaptureOutput::new());
        interp.run(&parse("var x = 41;")).unwrap();
        assert_eq!(interp.run(&parse("x + 1;")).unwrap(), Value::Number(42.0));
        assert_eq!(interp.get_global("x"), Some(Value::Number(41.0)));
    }
}
