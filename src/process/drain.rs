//! Stream draining on a dedicated thread

use std::io::{ErrorKind, Read};
use std::thread::{self, JoinHandle};

use log::debug;

const READ_CHUNK: usize = 4096;

/// Observer invoked with every decoded chunk, from the drain thread
pub type ChunkObserver = Box<dyn FnMut(&str) + Send + 'static>;

/// Text captured from one stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub text: String,
    /// Sizing hint only; never affects correctness
    pub approx_expected_len: usize,
}

/// Reads a stream to its end on its own thread
///
/// Each chunk is handed to the observer as soon as it is read, so a live
/// console view keeps up with the child, and is also kept for later
/// inspection. Read errors end the drain quietly: the usual cause is the
/// child going away.
pub struct StreamDrainer {
    handle: JoinHandle<CapturedOutput>,
}

impl StreamDrainer {
    pub fn spawn<R>(
        name: &str,
        stream: R,
        approx_expected_len: usize,
        observer: ChunkObserver,
    ) -> std::io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || drain(stream, approx_expected_len, observer))?;
        Ok(Self { handle })
    }

    /// Block until the stream has been fully drained
    pub fn join(self) -> CapturedOutput {
        // A panicking observer loses the text but must not take the session down
        self.handle.join().unwrap_or_default()
    }
}

fn drain<R: Read>(mut stream: R, approx_expected_len: usize, mut observer: ChunkObserver) -> CapturedOutput {
    let mut captured = CapturedOutput {
        text: String::with_capacity(approx_expected_len),
        approx_expected_len,
    };
    let mut buf = [0u8; READ_CHUNK];
    let mut pending: Vec<u8> = Vec::new();

    loop {
        let n = match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!("Stream closed with error, treating as end of stream: {e}");
                break;
            }
        };
        pending.extend_from_slice(&buf[..n]);
        let chunk = take_decoded(&mut pending);
        if !chunk.is_empty() {
            observer(&chunk);
            captured.text.push_str(&chunk);
        }
    }

    // Whatever is left is a truncated sequence; surface it lossily
    if !pending.is_empty() {
        let tail = String::from_utf8_lossy(&pending).into_owned();
        observer(&tail);
        captured.text.push_str(&tail);
    }

    captured
}

/// Decode the longest complete UTF-8 prefix of `pending`, leaving an
/// incomplete trailing sequence in place for the next read.
fn take_decoded(pending: &mut Vec<u8>) -> String {
    let mut out = String::new();
    let mut start = 0;
    loop {
        match std::str::from_utf8(&pending[start..]) {
            Ok(s) => {
                out.push_str(s);
                start = pending.len();
                break;
            }
            Err(e) => {
                let valid = start + e.valid_up_to();
                out.push_str(&String::from_utf8_lossy(&pending[start..valid]));
                match e.error_len() {
                    Some(len) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        start = valid + len;
                    }
                    None => {
                        start = valid;
                        break;
                    }
                }
            }
        }
    }
    pending.drain(..start);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};
    use std::sync::{Arc, Mutex};

    /// Hands out one byte per read to exercise split sequences
    struct Trickle(Vec<u8>, usize);

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.1 >= self.0.len() {
                return Ok(0);
            }
            buf[0] = self.0[self.1];
            self.1 += 1;
            Ok(1)
        }
    }

    /// Yields some data then fails
    struct Broken(bool);

    impl Read for Broken {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0 {
                return Err(io::Error::new(ErrorKind::BrokenPipe, "gone"));
            }
            self.0 = true;
            buf[..5].copy_from_slice(b"hello");
            Ok(5)
        }
    }

    fn recording() -> (Arc<Mutex<Vec<String>>>, ChunkObserver) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, Box::new(move |s: &str| sink.lock().unwrap().push(s.to_string())))
    }

    #[test]
    fn accumulates_and_forwards_everything() {
        let (seen, observer) = recording();
        let drainer =
            StreamDrainer::spawn("test-drain", Cursor::new(b"line one\nline two\n".to_vec()), 16, observer).unwrap();
        let out = drainer.join();

        assert_eq!(out.text, "line one\nline two\n");
        assert_eq!(out.approx_expected_len, 16);
        assert_eq!(seen.lock().unwrap().concat(), out.text);
    }

    #[test]
    fn multibyte_characters_survive_split_reads() {
        let text = "Ünïcødé ✓ done";
        let (seen, observer) = recording();
        let drainer =
            StreamDrainer::spawn("test-drain", Trickle(text.as_bytes().to_vec(), 0), 0, observer).unwrap();
        let out = drainer.join();

        assert_eq!(out.text, text);
        assert!(seen.lock().unwrap().iter().all(|chunk| !chunk.contains('\u{FFFD}')));
    }

    #[test]
    fn invalid_bytes_are_replaced() {
        let (_seen, observer) = recording();
        let drainer =
            StreamDrainer::spawn("test-drain", Cursor::new(vec![b'a', 0xff, b'b']), 0, observer).unwrap();
        assert_eq!(drainer.join().text, "a\u{FFFD}b");
    }

    #[test]
    fn read_error_ends_drain_without_failure() {
        let (_seen, observer) = recording();
        let drainer = StreamDrainer::spawn("test-drain", Broken(false), 0, observer).unwrap();
        assert_eq!(drainer.join().text, "hello");
    }

    #[test]
    fn truncated_tail_is_flushed_lossily() {
        let mut bytes = b"ok ".to_vec();
        bytes.extend_from_slice(&"✓".as_bytes()[..2]);
        let (_seen, observer) = recording();
        let drainer = StreamDrainer::spawn("test-drain", Cursor::new(bytes), 0, observer).unwrap();
        assert_eq!(drainer.join().text, "ok \u{FFFD}");
    }
}
