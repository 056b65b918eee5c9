//! REPL (Read-Eval-Print Loop) for tern

use crate::interp::{Interpreter, Value};
use crate::{TernError, run_source};
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use std::path::PathBuf;

const PROMPT: &str = "> ";
const HISTORY_FILE: &str = ".tern_history";
const REPL_FILENAME: &str = "<repl>";

/// REPL state
pub struct Repl {
    editor: DefaultEditor,
    interpreter: Interpreter,
    history_path: Option<PathBuf>,
}

impl Repl {
    /// Create a new REPL
    pub fn new() -> RlResult<Self> {
        let editor = DefaultEditor::new()?;
        let interpreter = Interpreter::new();

        // Try to find history file in home directory
        let history_path = dirs_home().map(|h| h.join(HISTORY_FILE));

        let mut repl = Repl {
            editor,
            interpreter,
            history_path,
        };

        if let Some(ref path) = repl.history_path {
            let _ = repl.editor.load_history(path);
        }

        Ok(repl)
    }

    /// Run the REPL
    pub fn run(&mut self) -> RlResult<()> {
        println!("tern {}", env!("CARGO_PKG_VERSION"));
        println!("Type :help for help, :quit to exit.\n");

        loop {
            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    let line = line.trim();

                    if line.is_empty() {
                        continue;
                    }

                    let _ = self.editor.add_history_entry(line);

                    if line.starts_with(':') {
                        if self.handle_command(line) {
                            break;
                        }
                        continue;
                    }

                    match self.eval_line(line) {
                        Ok(Some(shown)) => println!("{shown}"),
                        Ok(None) => {}
                        Err(err) => eprintln!("{err}"),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("Goodbye!");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {err}");
                    break;
                }
            }
        }

        if let Some(ref path) = self.history_path {
            let _ = self.editor.save_history(path);
        }

        Ok(())
    }

    /// Handle REPL commands (starting with :). Returns true to exit.
    fn handle_command(&mut self, cmd: &str) -> bool {
        match cmd {
            ":quit" | ":q" | ":exit" => {
                println!("Goodbye!");
                true
            }
            ":help" | ":h" | ":?" => {
                self.print_help();
                false
            }
            ":clear" => {
                print!("\x1B[2J\x1B[1;1H");
                false
            }
            ":globals" => {
                println!("{}", self.global_names().join(" "));
                false
            }
            _ => {
                println!("Unknown command: {cmd}");
                println!("Type :help for help.");
                false
            }
        }
    }

    fn print_help(&self) {
        println!("tern REPL Commands:");
        println!("  :help, :h, :?   Show this help");
        println!("  :quit, :q       Exit the REPL");
        println!("  :clear          Clear the screen");
        println!("  :globals        List global names");
        println!();
        println!("You can enter:");
        println!("  - Expressions: 1 + 2, [1, 2, 3].map(fn (x) {{ return x * 2; }}).collect()");
        println!("  - Declarations: var x = 1; fn add(a, b) {{ return a + b; }}");
        println!("  - Classes: class Point {{ fn __init__(self, x) {{ self.x = x; }} }}");
        println!();
        println!("Built-ins:");
        println!("  print(x)        Print a value");
        println!("  String(x)       Convert to a string");
        println!("  sentinel()      The iterator end marker");
        println!("  clock()         Seconds since the epoch");
        println!("  Vec, Range, Iter, MapIter, FilterIter");
    }

    /// Evaluate one line. A missing trailing `;` is supplied so bare
    /// expressions work. Returns the text to echo, if any.
    fn eval_line(&mut self, input: &str) -> Result<Option<String>, TernError> {
        let source = if input.ends_with(';') || input.ends_with('}') {
            input.to_string()
        } else {
            format!("{input};")
        };

        let value = run_source(&mut self.interpreter, REPL_FILENAME, &source)?;
        Ok(match value {
            Value::Nil => None,
            value => Some(value.to_string()),
        })
    }

    /// Names defined at the top level, built-ins included, sorted
    fn global_names(&self) -> Vec<String> {
        self.interpreter
            .global_env()
            .borrow()
            .local_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

/// Get home directory
fn dirs_home() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE").ok().map(PathBuf::from)
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOME").ok().map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repl() -> Repl {
        Repl::new().unwrap()
    }

    #[test]
    fn test_handle_command_quit() {
        let mut repl = repl();
        assert!(repl.handle_command(":quit"));
        assert!(repl.handle_command(":q"));
    }

    #[test]
    fn test_handle_command_help_and_clear() {
        let mut repl = repl();
        assert!(!repl.handle_command(":help"));
        assert!(!repl.handle_command(":clear"));
    }

    #[test]
    fn test_globals_lists_definitions() {
        let mut repl = repl();
        assert!(!repl.global_names().iter().any(|n| n == "answer"));
        repl.eval_line("var answer = 42;").unwrap();
        let names = repl.global_names();
        assert!(names.iter().any(|n| n == "answer"));
        assert!(names.iter().any(|n| n == "print"));
        assert!(!repl.handle_command(":globals"));
    }

    #[test]
    fn test_handle_command_unknown() {
        let mut repl = repl();
        assert!(!repl.handle_command(":frobnicate"));
    }

    #[test]
    fn test_eval_expression_without_semicolon() {
        let mut repl = repl();
        assert_eq!(repl.eval_line("1 + 2").unwrap().as_deref(), Some("3"));
    }

    #[test]
    fn test_definitions_persist() {
        let mut repl = repl();
        assert_eq!(repl.eval_line("fn double(x) { return x * 2; }").unwrap(), None);
        assert_eq!(repl.eval_line("var n = 21;").unwrap(), None);
        assert_eq!(repl.eval_line("double(n)").unwrap().as_deref(), Some("42"));
    }

    #[test]
    fn test_eval_pipeline() {
        let mut repl = repl();
        let shown = repl
            .eval_line("(0..4).map(fn (x) { return x * x; }).collect()")
            .unwrap();
        assert_eq!(shown.as_deref(), Some("[0, 1, 4, 9]"));
    }

    #[test]
    fn test_parse_error() {
        let mut repl = repl();
        let err = repl.eval_line("var = 3").unwrap_err();
        assert!(matches!(err, TernError::Compile(_)));
    }

    #[test]
    fn test_runtime_error_keeps_session() {
        let mut repl = repl();
        repl.eval_line("var x = 1;").unwrap();
        let err = repl.eval_line("missing()").unwrap_err();
        assert!(matches!(err, TernError::Runtime(_)));
        assert_eq!(repl.eval_line("x").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_dirs_home_returns_some() {
        #[cfg(not(windows))]
        if std::env::var("HOME").is_ok() {
            assert!(dirs_home().is_some());
        }
    }
}
