/// A contiguous byte range of the source, sent in one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Byte offset of `data` within the source.
    pub offset: u64,
    /// Raw chunk data. Never empty.
    pub data: Vec<u8>,
}

impl Chunk {
    /// Number of bytes in this chunk.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Offset of the first byte after this chunk.
    pub fn end(&self) -> u64 {
        self.offset + self.data.len() as u64
    }
}
