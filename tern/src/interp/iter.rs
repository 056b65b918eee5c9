//! Built-in lazy iterators
//!
//! Every iterator here is fused: once `next()` has produced the sentinel it
//! keeps producing it without touching its source again. Map and filter pull
//! from their source through the ordinary `next` dispatch, so any object
//! with a `next()` method can feed them.

use super::class::Class;
use super::error::InterpResult;
use super::value::Value;
use super::Interpreter;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Where an iterator gets its values from
#[derive(Debug)]
pub enum IterState {
    /// Walks a vec by index; sees pushes made while iterating
    Vec {
        items: Rc<RefCell<Vec<Value>>>,
        pos: usize,
    },
    /// Counts from `next` up to, not including, `end`
    Range { next: i64, end: i64 },
    /// Applies `func` to every value from `inner`
    Map { inner: Value, func: Value },
    /// Passes through values from `inner` that satisfy `pred`
    Filter { inner: Value, pred: Value },
}

/// Iterator object backing VecIter, RangeIter, MapIter and FilterIter
pub struct NativeIter {
    class: Rc<Class>,
    state: RefCell<IterState>,
    exhausted: Cell<bool>,
}

impl NativeIter {
    pub fn new(class: Rc<Class>, state: IterState) -> Rc<Self> {
        Rc::new(NativeIter {
            class,
            state: RefCell::new(state),
            exhausted: Cell::new(false),
        })
    }

    pub fn class(&self) -> &Rc<Class> {
        &self.class
    }

    pub fn class_name(&self) -> &str {
        &self.class.name
    }
}

impl fmt::Debug for NativeIter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeIter")
            .field("class", &self.class.name)
            .field("exhausted", &self.exhausted.get())
            .finish()
    }
}

enum Step {
    Ready(Value),
    Map(Value, Value),
    Filter(Value, Value),
}

/// Produce the next value, or the sentinel once the source is exhausted
pub fn advance(interp: &mut Interpreter, it: &NativeIter) -> InterpResult<Value> {
    if it.exhausted.get() {
        return Ok(Value::sentinel());
    }

    // Take what we need out of the state before calling back into script
    // code, which may touch this iterator again.
    let step = match &mut *it.state.borrow_mut() {
        IterState::Vec { items, pos } => {
            let list = items.borrow();
            match list.get(*pos) {
                Some(value) => {
                    *pos += 1;
                    Step::Ready(value.clone())
                }
                None => Step::Ready(Value::sentinel()),
            }
        }
        IterState::Range { next, end } => {
            if *next < *end {
                let value = *next;
                *next += 1;
                Step::Ready(Value::Number(value as f64))
            } else {
                Step::Ready(Value::sentinel())
            }
        }
        IterState::Map { inner, func } => Step::Map(inner.clone(), func.clone()),
        IterState::Filter { inner, pred } => Step::Filter(inner.clone(), pred.clone()),
    };

    let value = match step {
        Step::Ready(value) => value,
        Step::Map(inner, func) => {
            let value = interp.invoke(inner, "next", Vec::new())?;
            if value.is_sentinel() {
                value
            } else {
                interp.call_value(func, vec![value])?
            }
        }
        Step::Filter(inner, pred) => loop {
            let value = interp.invoke(inner.clone(), "next", Vec::new())?;
            if value.is_sentinel() {
                break value;
            }
            if interp.call_value(pred.clone(), vec![value.clone()])?.is_truthy() {
                break value;
            }
        },
    };

    if value.is_sentinel() {
        it.exhausted.set(true);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::ClassBuilder;

    fn class(name: &str) -> Rc<Class> {
        ClassBuilder::new(name).build()
    }

    #[test]
    fn test_range_iter_is_fused() {
        let mut interp = Interpreter::new();
        let it = NativeIter::new(class("RangeIter"), IterState::Range { next: 0, end: 2 });
        assert_eq!(advance(&mut interp, &it).unwrap(), Value::Number(0.0));
        assert_eq!(advance(&mut interp, &it).unwrap(), Value::Number(1.0));
        assert!(advance(&mut interp, &it).unwrap().is_sentinel());
        assert!(it.exhausted.get());
        assert!(advance(&mut interp, &it).unwrap().is_sentinel());
    }

    #[test]
    fn test_empty_range() {
        let mut interp = Interpreter::new();
        let it = NativeIter::new(class("RangeIter"), IterState::Range { next: 3, end: 1 });
        assert!(advance(&mut interp, &it).unwrap().is_sentinel());
    }

    #[test]
    fn test_vec_iter_sees_pushes() {
        let mut interp = Interpreter::new();
        let items = Rc::new(RefCell::new(vec![Value::Number(1.0)]));
        let it = NativeIter::new(
            class("VecIter"),
            IterState::Vec {
                items: Rc::clone(&items),
                pos: 0,
            },
        );
        assert_eq!(advance(&mut interp, &it).unwrap(), Value::Number(1.0));
        items.borrow_mut().push(Value::Number(2.0));
        assert_eq!(advance(&mut interp, &it).unwrap(), Value::Number(2.0));
        assert!(advance(&mut interp, &it).unwrap().is_sentinel());
    }

    #[test]
    fn test_vec_iter_stays_dead_after_push() {
        let mut interp = Interpreter::new();
        let items = Rc::new(RefCell::new(Vec::new()));
        let it = NativeIter::new(
            class("VecIter"),
            IterState::Vec {
                items: Rc::clone(&items),
                pos: 0,
            },
        );
        assert!(advance(&mut interp, &it).unwrap().is_sentinel());
        items.borrow_mut().push(Value::Nil);
        assert!(advance(&mut interp, &it).unwrap().is_sentinel());
    }

    #[test]
    fn test_class_name() {
        let it = NativeIter::new(class("MapIter"), IterState::Range { next: 0, end: 0 });
        assert_eq!(it.class_name(), "MapIter");
        assert_eq!(Value::Iter(it).type_name(), "MapIter");
    }
}
