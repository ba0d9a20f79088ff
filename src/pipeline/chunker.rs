use super::ValidationError;

/// Splits text into fixed-size segments with a fixed overlap so that no
/// entity straddling a boundary is truncated in both halves. Segments
/// feed the extraction model one at a time, keeping each call inside the
/// model's context limit.
#[derive(Debug, Clone, Copy)]
pub struct TextSplitter {
    chunk_size: usize,
    overlap: usize,
}

impl TextSplitter {
    /// Misconfiguration (zero-size chunks, overlap not smaller than the
    /// chunk size) is rejected here, never mid-pipeline.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ValidationError> {
        if chunk_size == 0 || overlap >= chunk_size {
            return Err(ValidationError::SplitterConfig {
                chunk_size,
                overlap,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Lazy, restartable chunk sequence over `text`. Calling `split`
    /// again yields an identical sequence.
    pub fn split<'a>(&self, text: &'a str) -> Chunks<'a> {
        Chunks {
            rest: text,
            chunk_size: self.chunk_size,
            overlap: self.overlap,
            done: text.is_empty(),
        }
    }
}

/// Iterator over overlapping chunks. Offsets are counted in characters,
/// sliced on UTF-8 boundaries.
///
/// Contract: every chunk is at most `chunk_size` characters; consecutive
/// chunks share exactly `overlap` characters; dropping the leading
/// `overlap` characters of every chunk after the first reconstructs the
/// input exactly.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    rest: &'a str,
    chunk_size: usize,
    overlap: usize,
    done: bool,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.done {
            return None;
        }

        match byte_offset_of_char(self.rest, self.chunk_size) {
            // Remaining text fits in one chunk: emit as-is, no padding.
            None => {
                self.done = true;
                Some(self.rest)
            }
            Some(end) => {
                let chunk = &self.rest[..end];
                // Next chunk starts `overlap` characters before this
                // one ended; step is always > 0 since overlap < size.
                let step = byte_offset_of_char(self.rest, self.chunk_size - self.overlap)
                    .expect("step is within a full-size chunk");
                self.rest = &self.rest[step..];
                Some(chunk)
            }
        }
    }
}

/// Byte offset of the `n`-th character, or `None` when the string has
/// at most `n` characters.
fn byte_offset_of_char(s: &str, n: usize) -> Option<usize> {
    s.char_indices().nth(n).map(|(i, _)| i)
}
