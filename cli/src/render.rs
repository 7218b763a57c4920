//! Render centralizes the CLI's colored output behind a small interface,
//! so the commands that drive the engine can be tested against a renderer
//! that records calls instead of one that writes ANSI escapes to a real
//! terminal.
use std::sync::Mutex;

/// Renderer is the output surface every command writes through.
pub trait Renderer {
    /// Info reports routine progress.
    fn info(&self, message: &str);
    /// Warn reports a non-fatal irregularity.
    fn warn(&self, message: &str);
    /// Error reports a failure.
    fn error(&self, message: &str);
    /// Diff prints pre-rendered diff text (from `tailor_engine::render`)
    /// verbatim; unified-diff lines are colored by their leading
    /// `+`/`-`/` ` marker when the renderer supports color.
    fn diff(&self, text: &str);
}

/// TerminalRenderer writes to stdout/stderr, coloring diff lines when
/// `color` is enabled.
pub struct TerminalRenderer {
    color: bool,
}

impl TerminalRenderer {
    /// New builds a renderer that colors output iff `color` is true;
    /// callers typically pass `std::io::stdout().is_terminal()`.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }
}

impl Renderer for TerminalRenderer {
    fn info(&self, message: &str) {
        println!("{message}");
    }

    fn warn(&self, message: &str) {
        eprintln!("{}", self.paint("33", &format!("warning: {message}")));
    }

    fn error(&self, message: &str) {
        eprintln!("{}", self.paint("31", &format!("error: {message}")));
    }

    fn diff(&self, text: &str) {
        if !self.color {
            print!("{text}");
            return;
        }
        for line in text.lines() {
            let colored = match line.as_bytes().first() {
                Some(b'+') => self.paint("32", line),
                Some(b'-') => self.paint("31", line),
                _ => line.to_string(),
            };
            println!("{colored}");
        }
    }
}

/// RecordingRenderer captures every call instead of printing, so tests can
/// assert on exactly what a command reported.
#[derive(Default)]
pub struct RecordingRenderer {
    lines: Mutex<Vec<String>>,
}

impl RecordingRenderer {
    /// New builds an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines returns every recorded line, in call order.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("renderer mutex poisoned").clone()
    }
}

impl Renderer for RecordingRenderer {
    fn info(&self, message: &str) {
        self.lines.lock().expect("renderer mutex poisoned").push(message.to_string());
    }

    fn warn(&self, message: &str) {
        self.lines
            .lock()
            .expect("renderer mutex poisoned")
            .push(format!("warning: {message}"));
    }

    fn error(&self, message: &str) {
        self.lines
            .lock()
            .expect("renderer mutex poisoned")
            .push(format!("error: {message}"));
    }

    fn diff(&self, text: &str) {
        self.lines.lock().expect("renderer mutex poisoned").push(text.to_string());
    }
}
