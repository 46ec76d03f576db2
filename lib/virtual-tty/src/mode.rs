/// How a read against a terminal should behave.
///
/// Both flags are on by default, which gives the usual interactive shell
/// experience: input is edited line by line and echoed as it is typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtyMode {
    /// Write typed characters (and editing sequences) back to the terminal.
    pub echo: bool,
    /// Buffer input until a newline instead of returning every chunk.
    pub line_buffered: bool,
}

impl TtyMode {
    /// Unbuffered, unechoed input; every chunk is returned as it arrives.
    pub const RAW: Self = Self {
        echo: false,
        line_buffered: false,
    };

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn with_line_buffered(mut self, line_buffered: bool) -> Self {
        self.line_buffered = line_buffered;
        self
    }
}

impl Default for TtyMode {
    fn default() -> Self {
        Self {
            echo: true,
            line_buffered: true,
        }
    }
}
