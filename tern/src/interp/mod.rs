//! Tree-walking interpreter
//!
//! Classes, single-inheritance method dispatch with defining-class `super`
//! resolution, and lazy iterators that signal exhaustion with a sentinel.

mod builtins;
mod class;
mod dispatch;
mod env;
mod error;
mod eval;
mod frame;
mod iter;
mod sentinel;
mod value;

pub use builtins::CoreClasses;
pub use class::{Class, ClassBuilder, Method, MethodBody, NativeMethod};
pub use env::{child_env, EnvRef, Environment};
pub use error::{ErrorKind, InterpResult, RuntimeError};
pub use eval::{Flow, Interpreter};
pub use frame::{CallStack, Frame, FrameContext, TraceFrame};
pub use iter::{IterState, NativeIter};
pub use sentinel::Sentinel;
pub use value::{BoundMethod, Function, Instance, NativeFn, NativeFunction, Value};

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

/// In-memory `print` sink, cheap to clone; clones share one buffer
#[derive(Debug, Clone, Default)]
pub struct CaptureOutput(Rc<RefCell<Vec<u8>>>);

impl CaptureOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl io::Write for CaptureOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
