/// Maps byte offsets produced by rustpython-parser to 1-based line numbers
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, byte)| *byte == b'\n')
                .map(|(pos, _)| pos + 1),
        );
        Self {
            line_starts,
            len: source.len(),
        }
    }

    /// Line containing `offset`; offsets past the end map to the last line
    pub fn line_of(&self, offset: usize) -> usize {
        let offset = offset.min(self.len);
        match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx + 1,
            Err(idx) => idx.max(1),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}
