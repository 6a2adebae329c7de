use indicatif::MultiProgress;
use std::io::{self, Write};

/// Log sink that clears the progress bars while a line is written to stderr
/// and redraws them afterwards.
#[derive(Debug, Clone)]
pub struct ProgressLogWriter {
    multi: MultiProgress,
}

impl ProgressLogWriter {
    pub fn new(multi: MultiProgress) -> Self {
        Self { multi }
    }
}

impl Write for ProgressLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.multi.suspend(|| io::stderr().lock().write_all(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}
