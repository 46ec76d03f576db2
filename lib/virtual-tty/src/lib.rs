//! Terminal input processing for emulated TTYs.
//!
//! The [`LineDiscipline`] turns raw keystroke bytes into an edited line the
//! way a tty driver in canonical mode does: printable characters are echoed,
//! backspace and the arrow/home/end keys edit the line in place, and the line
//! is handed over once a newline arrives.
//!
//! ```
//! use virtual_tty::LineDiscipline;
//!
//! let mut tty = LineDiscipline::new();
//! tty.process(b"helo\x1b[Dl");
//! tty.process(b"\r");
//!
//! assert!(tty.is_ended());
//! assert_eq!(tty.line(), "hello");
//! ```

pub mod control;
mod line_discipline;
mod mode;

pub use line_discipline::LineDiscipline;
pub use mode::TtyMode;
