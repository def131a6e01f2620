use std::io::{BufReader, Read};

/// Iterator over logical lines of a raw byte stream. Both `\r` and `\n`
/// terminate a line, empty lines are skipped, and a trailing partial line is
/// yielded once at end of stream.
pub struct LineReader<R: Read> {
    reader: BufReader<R>,
    pending: Vec<u8>,
    done: bool,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            pending: Vec::new(),
            done: false,
        }
    }

    fn take_pending(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(line)
    }
}

impl<R: Read> Iterator for LineReader<R> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.done {
            return None;
        }

        let mut byte = [0u8; 1];
        loop {
            match self.reader.read(&mut byte) {
                Ok(0) | Err(_) => {
                    self.done = true;
                    return self.take_pending();
                }
                Ok(_) => match byte[0] {
                    b'\r' | b'\n' => {
                        if let Some(line) = self.take_pending() {
                            return Some(line);
                        }
                    }
                    other => self.pending.push(other),
                },
            }
        }
    }
}
