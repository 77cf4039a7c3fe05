use bytes::Bytes;
use tracing::warn;

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];

/// Largest partial frame kept before the buffer is considered garbage
const MAX_PENDING: usize = 8 * 1024 * 1024;

/// Splits a concatenated MJPEG byte stream into whole JPEG images
#[derive(Debug, Default)]
pub struct JpegSplitter {
    pending: Vec<u8>,
}

impl JpegSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes read from the encoder, returning every frame they complete
    pub fn push(&mut self, data: &[u8]) -> Vec<Bytes> {
        self.pending.extend_from_slice(data);
        let mut frames = Vec::new();

        loop {
            let Some(start) = find(&self.pending, &SOI, 0) else {
                // Keep a trailing 0xFF in case it begins the next marker
                let keep = usize::from(self.pending.last() == Some(&0xFF));
                let drop_to = self.pending.len() - keep;
                self.pending.drain(..drop_to);
                break;
            };

            if start > 0 {
                self.pending.drain(..start);
            }

            let Some(end) = find(&self.pending, &EOI, SOI.len()) else {
                break;
            };

            let frame: Vec<u8> = self.pending.drain(..end + EOI.len()).collect();
            frames.push(Bytes::from(frame));
        }

        if self.pending.len() > MAX_PENDING {
            warn!(
                "Discarding {} bytes of MJPEG data without a frame end",
                self.pending.len()
            );
            self.pending.clear();
        }

        frames
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if haystack.len() < from + needle.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|pos| pos + from)
}
