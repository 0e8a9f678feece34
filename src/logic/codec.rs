//! Byte representations at the crate's two boundaries: lower-case hex for
//! people, and a growable buffer for the delegated-signing bridge.

/// Lower-case hex without separators. Total.
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decodes hex text, ignoring any whitespace or line breaks.
///
/// Returns `None` when the remaining text has odd length or a non-hex
/// character. Upper-case digits are accepted.
pub fn from_hex(text: &str) -> Option<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(compact).ok()
}

/// Byte buffer exchanged with an external protocol engine.
///
/// Each call hands ownership across: the producer fills it and the consumer
/// takes it. The empty buffer is reserved as the failure signal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrossBoundaryBuffer(Vec<u8>);

impl CrossBoundaryBuffer {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub fn push(&mut self, byte: u8) {
        self.0.push(byte);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for CrossBoundaryBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<CrossBoundaryBuffer> for Vec<u8> {
    fn from(buffer: CrossBoundaryBuffer) -> Self {
        buffer.0
    }
}

impl Extend<u8> for CrossBoundaryBuffer {
    fn extend<I: IntoIterator<Item = u8>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl FromIterator<u8> for CrossBoundaryBuffer {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Copies native bytes into a new boundary buffer, preserving order and length.
pub fn to_boundary(bytes: &[u8]) -> CrossBoundaryBuffer {
    let mut buffer = CrossBoundaryBuffer::with_capacity(bytes.len());
    buffer.extend(bytes.iter().copied());
    buffer
}

/// Takes the bytes out of a buffer received from the boundary.
pub fn from_boundary(buffer: CrossBoundaryBuffer) -> Vec<u8> {
    buffer.into_vec()
}
