//! Line framing for the byte stream coming from the host.

/// Upper bound for a single command line. Longer input is discarded up to
/// the next terminator.
pub const MAX_LINE_LENGTH: usize = 256;

/// Splits a byte stream into lines terminated by CR, LF or CR LF.
///
/// Blank lines are dropped, so CR LF never yields an extra empty line.
/// Bytes that are not valid UTF-8 are replaced rather than rejected; the
/// parser will then answer with an error.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
    overflow: bool,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds received bytes and returns every line they complete.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in bytes {
            match byte {
                b'\r' | b'\n' => {
                    if self.overflow {
                        log::warn!("Discarded command line longer than {MAX_LINE_LENGTH} bytes");
                        self.overflow = false;
                    } else if !self.buffer.is_empty() {
                        let line = String::from_utf8_lossy(&self.buffer);
                        if !line.trim().is_empty() {
                            lines.push(line.into_owned());
                        }
                    }
                    self.buffer.clear();
                }
                _ if self.overflow => {}
                _ if self.buffer.len() >= MAX_LINE_LENGTH => {
                    self.overflow = true;
                    self.buffer.clear();
                }
                _ => self.buffer.push(byte),
            }
        }
        lines
    }

    /// Bytes received since the last terminator.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}
