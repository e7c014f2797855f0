//! Progress reporting on stderr

use std::io::{self, Write};

/// Counter-style progress for batch commands
pub struct ProgressReporter {
    total: usize,
    processed: usize,
}

impl ProgressReporter {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            processed: 0,
        }
    }

    pub fn set_message(&self, msg: &str) {
        eprint!("\r{:<50}", msg);
        io::stderr().flush().ok();
    }

    pub fn advance(&mut self, n: usize) {
        self.processed = (self.processed + n).min(self.total);
    }

    pub fn finish(&self) {
        eprintln!("\rDone ({}/{})                    ", self.processed, self.total);
    }
}

/// Single transient status line, shown only for interactive output
pub struct StatusLine {
    enabled: bool,
}

impl StatusLine {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn set_message(&self, msg: &str) {
        if self.enabled {
            eprint!("\r{:<60}", msg);
            io::stderr().flush().ok();
        }
    }

    pub fn clear(&self) {
        if self.enabled {
            eprint!("\r{:<60}\r", "");
            io::stderr().flush().ok();
        }
    }
}
