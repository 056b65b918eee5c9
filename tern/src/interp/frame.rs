//! Explicit call-frame stack
//!
//! Every dispatch pushes a [`Frame`] and pops it on return, including on
//! error unwind. Frames are kept independently of the Rust stack so traces
//! come out the same regardless of how deep the host recursion went.

use super::class::Class;
use super::error::{InterpResult, RuntimeError};
use std::fmt;
use std::rc::{Rc, Weak};

/// What a frame is executing
#[derive(Debug, Clone, PartialEq)]
pub enum FrameContext {
    /// Top-level statements of a module
    Script,
    /// A function, method or native call
    Call(Rc<str>),
}

impl fmt::Display for FrameContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameContext::Script => f.write_str("script"),
            FrameContext::Call(name) => write!(f, "{name}()"),
        }
    }
}

/// A live frame on the call stack
#[derive(Debug, Clone)]
pub struct Frame {
    pub context: FrameContext,
    /// Class declaring the executing method; `super` resolves above it
    pub home: Option<Weak<Class>>,
    pub module: Rc<str>,
    /// Line currently executing in this frame
    pub line: u32,
}

impl Frame {
    pub fn script(module: Rc<str>) -> Self {
        Frame {
            context: FrameContext::Script,
            home: None,
            module,
            line: 1,
        }
    }

    pub fn call(name: Rc<str>, home: Option<Weak<Class>>, module: Rc<str>, line: u32) -> Self {
        Frame {
            context: FrameContext::Call(name),
            home,
            module,
            line,
        }
    }

    pub fn home_class(&self) -> Option<Rc<Class>> {
        self.home.as_ref().and_then(Weak::upgrade)
    }

    /// Freeze the frame for an error trace
    pub fn snapshot(&self) -> TraceFrame {
        TraceFrame {
            module: self.module.clone(),
            line: self.line,
            context: self.context.clone(),
        }
    }
}

/// A frame as recorded in an error trace
#[derive(Debug, Clone, PartialEq)]
pub struct TraceFrame {
    pub module: Rc<str>,
    pub line: u32,
    pub context: FrameContext,
}

impl fmt::Display for TraceFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[module \"{}\", line {}] in {}",
            self.module, self.line, self.context
        )
    }
}

/// Bounded stack of frames
#[derive(Debug)]
pub struct CallStack {
    frames: Vec<Frame>,
    max_frames: usize,
}

impl CallStack {
    pub fn new(max_frames: usize) -> Self {
        CallStack {
            frames: Vec::new(),
            max_frames,
        }
    }

    /// Push a frame, failing once the configured depth is reached
    pub fn push(&mut self, frame: Frame) -> InterpResult<()> {
        if self.frames.len() >= self.max_frames {
            return Err(RuntimeError::stack_overflow());
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn current(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Record the line now executing in the innermost frame
    pub fn set_line(&mut self, line: u32) {
        if let Some(frame) = self.frames.last_mut() {
            frame.line = line;
        }
    }

    pub fn line(&self) -> u32 {
        self.current().map_or(0, |f| f.line)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module() -> Rc<str> {
        Rc::from("main")
    }

    #[test]
    fn test_trace_frame_display() {
        let frame = Frame::call(Rc::from("foo"), None, module(), 12).snapshot();
        assert_eq!(frame.to_string(), "[module \"main\", line 12] in foo()");
        let script = Frame::script(module()).snapshot();
        assert_eq!(script.to_string(), "[module \"main\", line 1] in script");
    }

    #[test]
    fn test_push_pop() {
        let mut stack = CallStack::new(4);
        stack.push(Frame::script(module())).unwrap();
        stack.push(Frame::call(Rc::from("f"), None, module(), 3)).unwrap();
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.line(), 3);
        let top = stack.pop().unwrap();
        assert_eq!(top.context, FrameContext::Call(Rc::from("f")));
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_set_line_targets_innermost() {
        let mut stack = CallStack::new(4);
        stack.push(Frame::script(module())).unwrap();
        stack.push(Frame::call(Rc::from("f"), None, module(), 3)).unwrap();
        stack.set_line(8);
        assert_eq!(stack.line(), 8);
        stack.pop();
        assert_eq!(stack.line(), 1);
    }

    #[test]
    fn test_overflow() {
        let mut stack = CallStack::new(2);
        stack.push(Frame::script(module())).unwrap();
        stack.push(Frame::call(Rc::from("f"), None, module(), 1)).unwrap();
        let err = stack
            .push(Frame::call(Rc::from("f"), None, module(), 1))
            .unwrap_err();
        assert_eq!(err.message, "Stack overflow.");
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn test_empty_stack_line() {
        let stack = CallStack::new(1);
        assert_eq!(stack.line(), 0);
        assert!(stack.current().is_none());
    }
}
