//! Native globals and built-in classes
//!
//! `Iter` carries the combinators. `Vec` and `Range` inherit from it and
//! override `iter()` to hand out a fresh iterator each time, so
//! `[1, 2].map(f)` and `(0..3).collect()` work the same as on any iterator.

use super::class::{Class, ClassBuilder};
use super::env::Environment;
use super::error::{InterpResult, RuntimeError};
use super::iter::{advance, IterState, NativeIter};
use super::value::{NativeFn, NativeFunction, Value};
use super::Interpreter;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Built-in classes the interpreter needs to reach without a global lookup
#[derive(Debug)]
pub struct CoreClasses {
    pub iter: Rc<Class>,
    pub map_iter: Rc<Class>,
    pub filter_iter: Rc<Class>,
    pub vec: Rc<Class>,
    pub vec_iter: Rc<Class>,
    pub range: Rc<Class>,
    pub range_iter: Rc<Class>,
}

/// Define the native globals in `globals` and return the built-in classes
pub fn install(globals: &mut Environment) -> CoreClasses {
    let iter = ClassBuilder::new("Iter")
        .native_method("iter", 0, iter_self)
        .native_method("map", 1, iter_map)
        .native_method("filter", 1, iter_filter)
        .native_method("reduce", 2, iter_reduce)
        .native_method("collect", 0, iter_collect)
        .build();

    let map_iter = ClassBuilder::new("MapIter")
        .parent(Some(Rc::clone(&iter)))
        .native_method("next", 0, iter_next)
        .native_init(native("MapIter", 2, map_iter_new))
        .build();
    let filter_iter = ClassBuilder::new("FilterIter")
        .parent(Some(Rc::clone(&iter)))
        .native_method("next", 0, iter_next)
        .native_init(native("FilterIter", 2, filter_iter_new))
        .build();
    let vec_iter = ClassBuilder::new("VecIter")
        .parent(Some(Rc::clone(&iter)))
        .native_method("next", 0, iter_next)
        .build();
    let range_iter = ClassBuilder::new("RangeIter")
        .parent(Some(Rc::clone(&iter)))
        .native_method("next", 0, iter_next)
        .build();

    let vec = ClassBuilder::new("Vec")
        .parent(Some(Rc::clone(&iter)))
        .native_method("iter", 0, vec_iter_new)
        .native_method("push", 1, vec_push)
        .native_method("pop", 0, vec_pop)
        .native_method("get", 1, vec_get)
        .native_method("set", 2, vec_set)
        .native_method("len", 0, vec_len)
        .native_init(native("Vec", 0, vec_new))
        .build();
    let range = ClassBuilder::new("Range")
        .parent(Some(Rc::clone(&iter)))
        .native_method("iter", 0, range_iter_new)
        .native_method("len", 0, range_len)
        .native_init(native("Range", 2, range_new))
        .build();

    for (name, arity, func) in [
        ("print", 1, builtin_print as NativeFn),
        ("sentinel", 0, builtin_sentinel as NativeFn),
        ("String", 1, builtin_string as NativeFn),
        ("clock", 0, builtin_clock as NativeFn),
    ] {
        globals.define(name, Value::Native(Rc::new(native(name, arity, func))));
    }

    let core = CoreClasses {
        iter,
        map_iter,
        filter_iter,
        vec,
        vec_iter,
        range,
        range_iter,
    };
    for class in [
        &core.iter,
        &core.map_iter,
        &core.filter_iter,
        &core.vec,
        &core.vec_iter,
        &core.range,
        &core.range_iter,
    ] {
        globals.define(class.name.to_string(), Value::Class(Rc::clone(class)));
    }
    core
}

fn native(name: &'static str, arity: usize, func: NativeFn) -> NativeFunction {
    NativeFunction { name, arity, func }
}

/// Split an argument list whose length the dispatcher already checked
fn take<const N: usize>(args: Vec<Value>) -> [Value; N] {
    let mut args = args.into_iter();
    std::array::from_fn(|_| args.next().unwrap_or(Value::Nil))
}

// ---------------------------------------------------------------------------
// Globals

fn builtin_print(interp: &mut Interpreter, args: Vec<Value>) -> InterpResult<Value> {
    let [value] = take::<1>(args);
    interp.write_line(&value.to_string())?;
    Ok(Value::Nil)
}

fn builtin_sentinel(_: &mut Interpreter, _: Vec<Value>) -> InterpResult<Value> {
    Ok(Value::sentinel())
}

fn builtin_string(_: &mut Interpreter, args: Vec<Value>) -> InterpResult<Value> {
    let [value] = take::<1>(args);
    Ok(Value::str(&value.to_string()))
}

fn builtin_clock(_: &mut Interpreter, _: Vec<Value>) -> InterpResult<Value> {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    Ok(Value::Number(secs))
}

// ---------------------------------------------------------------------------
// Iter

fn iter_self(_: &mut Interpreter, receiver: Value, _: Vec<Value>) -> InterpResult<Value> {
    Ok(receiver)
}

fn iter_next(interp: &mut Interpreter, receiver: Value, _: Vec<Value>) -> InterpResult<Value> {
    match receiver {
        Value::Iter(it) => advance(interp, &it),
        other => Err(RuntimeError::type_error(format!(
            "next() needs a built-in iterator, found {}.",
            other.type_name()
        ))),
    }
}

/// Lazy `map` over whatever `source.iter()` hands out
fn map_over(interp: &mut Interpreter, source: Value, func: Value) -> InterpResult<Value> {
    let inner = interp.invoke(source, "iter", Vec::new())?;
    let class = Rc::clone(&interp.core.map_iter);
    Ok(Value::Iter(NativeIter::new(class, IterState::Map { inner, func })))
}

/// Lazy `filter` over whatever `source.iter()` hands out
fn filter_over(interp: &mut Interpreter, source: Value, pred: Value) -> InterpResult<Value> {
    let inner = interp.invoke(source, "iter", Vec::new())?;
    let class = Rc::clone(&interp.core.filter_iter);
    Ok(Value::Iter(NativeIter::new(class, IterState::Filter { inner, pred })))
}

fn iter_map(interp: &mut Interpreter, receiver: Value, args: Vec<Value>) -> InterpResult<Value> {
    let [func] = take::<1>(args);
    map_over(interp, receiver, func)
}

fn iter_filter(interp: &mut Interpreter, receiver: Value, args: Vec<Value>) -> InterpResult<Value> {
    let [pred] = take::<1>(args);
    filter_over(interp, receiver, pred)
}

fn map_iter_new(interp: &mut Interpreter, args: Vec<Value>) -> InterpResult<Value> {
    let [source, func] = take::<2>(args);
    map_over(interp, source, func)
}

fn filter_iter_new(interp: &mut Interpreter, args: Vec<Value>) -> InterpResult<Value> {
    let [source, pred] = take::<2>(args);
    filter_over(interp, source, pred)
}

/// Run the `for` protocol over `source`, feeding each value to `each`
fn drain(
    interp: &mut Interpreter,
    source: Value,
    mut each: impl FnMut(&mut Interpreter, Value) -> InterpResult<()>,
) -> InterpResult<()> {
    let it = interp.invoke(source, "iter", Vec::new())?;
    loop {
        let value = interp.invoke(it.clone(), "next", Vec::new())?;
        if value.is_sentinel() {
            return Ok(());
        }
        each(interp, value)?;
    }
}

fn iter_reduce(interp: &mut Interpreter, receiver: Value, args: Vec<Value>) -> InterpResult<Value> {
    let [func, init] = take::<2>(args);
    let mut acc = init;
    drain(interp, receiver, |interp, value| {
        let prev = std::mem::replace(&mut acc, Value::Nil);
        acc = interp.call_value(func.clone(), vec![prev, value])?;
        Ok(())
    })?;
    Ok(acc)
}

fn iter_collect(interp: &mut Interpreter, receiver: Value, _: Vec<Value>) -> InterpResult<Value> {
    let mut items = Vec::new();
    drain(interp, receiver, |_, value| {
        items.push(value);
        Ok(())
    })?;
    Ok(Value::vec(items))
}

// ---------------------------------------------------------------------------
// Vec

fn vec_new(_: &mut Interpreter, _: Vec<Value>) -> InterpResult<Value> {
    Ok(Value::vec(Vec::new()))
}

fn as_vec(receiver: &Value) -> InterpResult<Rc<RefCell<Vec<Value>>>> {
    match receiver {
        Value::Vec(items) => Ok(Rc::clone(items)),
        other => Err(RuntimeError::type_error(format!(
            "Expected a Vec, found {}.",
            other.type_name()
        ))),
    }
}

fn index(value: &Value, len: usize) -> InterpResult<usize> {
    let index = value
        .as_int()
        .ok_or_else(|| RuntimeError::type_error("Vec index must be an integer."))?;
    usize::try_from(index)
        .ok()
        .filter(|&i| i < len)
        .ok_or_else(|| RuntimeError::index_out_of_range(index, len))
}

fn vec_iter_new(interp: &mut Interpreter, receiver: Value, _: Vec<Value>) -> InterpResult<Value> {
    let items = as_vec(&receiver)?;
    Ok(Value::Iter(NativeIter::new(
        Rc::clone(&interp.core.vec_iter),
        IterState::Vec { items, pos: 0 },
    )))
}

fn vec_push(_: &mut Interpreter, receiver: Value, args: Vec<Value>) -> InterpResult<Value> {
    let [value] = take::<1>(args);
    as_vec(&receiver)?.borrow_mut().push(value);
    Ok(Value::Nil)
}

fn vec_pop(_: &mut Interpreter, receiver: Value, _: Vec<Value>) -> InterpResult<Value> {
    Ok(as_vec(&receiver)?.borrow_mut().pop().unwrap_or(Value::Nil))
}

fn vec_get(_: &mut Interpreter, receiver: Value, args: Vec<Value>) -> InterpResult<Value> {
    let [i] = take::<1>(args);
    let items = as_vec(&receiver)?;
    let items = items.borrow();
    let i = index(&i, items.len())?;
    Ok(items[i].clone())
}

fn vec_set(_: &mut Interpreter, receiver: Value, args: Vec<Value>) -> InterpResult<Value> {
    let [i, value] = take::<2>(args);
    let items = as_vec(&receiver)?;
    let mut items = items.borrow_mut();
    let i = index(&i, items.len())?;
    items[i] = value.clone();
    Ok(value)
}

fn vec_len(_: &mut Interpreter, receiver: Value, _: Vec<Value>) -> InterpResult<Value> {
    Ok(Value::Number(as_vec(&receiver)?.borrow().len() as f64))
}

// ---------------------------------------------------------------------------
// Range

fn range_new(_: &mut Interpreter, args: Vec<Value>) -> InterpResult<Value> {
    let [begin, end] = take::<2>(args);
    match (begin.as_int(), end.as_int()) {
        (Some(begin), Some(end)) => Ok(Value::Range(begin, end)),
        _ => Err(RuntimeError::type_error("Range bounds must be integers.")),
    }
}

fn range_bounds(receiver: &Value) -> InterpResult<(i64, i64)> {
    match receiver {
        Value::Range(begin, end) => Ok((*begin, *end)),
        other => Err(RuntimeError::type_error(format!(
            "Expected a Range, found {}.",
            other.type_name()
        ))),
    }
}

fn range_iter_new(interp: &mut Interpreter, receiver: Value, _: Vec<Value>) -> InterpResult<Value> {
    let (begin, end) = range_bounds(&receiver)?;
    Ok(Value::Iter(NativeIter::new(
        Rc::clone(&interp.core.range_iter),
        IterState::Range { next: begin, end },
    )))
}

fn range_len(_: &mut Interpreter, receiver: Value, _: Vec<Value>) -> InterpResult<Value> {
    let (begin, end) = range_bounds(&receiver)?;
    Ok(Value::Number(end.saturating_sub(begin).max(0) as f64))
}
