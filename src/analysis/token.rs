/// Token produced by an analyzer: a span of the analyzer's output buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenSpan {
    pub offset: u32,
    pub length: u32,
}

impl TokenSpan {
    pub fn slice<'a>(&self, output: &'a [u8]) -> &'a [u8] {
        &output[self.offset as usize..(self.offset + self.length) as usize]
    }
}

/// Token flowing through a tokenizer/filter pipeline before it is written out.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text: String,
    pub position: u32,
}

impl Token {
    pub fn new(text: impl Into<String>, position: u32) -> Self {
        Token { text: text.into(), position }
    }
}
