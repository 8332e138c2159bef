/// Read position in a document text
///
/// Cheap to copy: alternatives are tried on a copy and committed by assigning it back.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cursor<'t> {
    text: &'t str,
    offset: usize,
}

impl<'t> Cursor<'t> {
    pub fn new(text: &'t str) -> Self {
        Self { text, offset: 0 }
    }

    /// Byte offset into the text
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn rest(&self) -> &'t str {
        &self.text[self.offset..]
    }

    pub fn is_at_end(&self) -> bool {
        self.offset >= self.text.len()
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Skip whitespace, `#` and `//` comments
    pub fn skip_whitespace(&mut self) {
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start_matches(|c: char| c.is_ascii_whitespace());
            self.offset += rest.len() - trimmed.len();

            if trimmed.starts_with('#') || trimmed.starts_with("//") {
                let comment = trimmed.find('\n').map_or(trimmed.len(), |end| end + 1);
                self.offset += comment;
            } else {
                return;
            }
        }
    }

    /// Consume `literal` if the text continues with it
    pub fn eat(&mut self, literal: &str) -> bool {
        if self.rest().starts_with(literal) {
            self.offset += literal.len();
            true
        } else {
            false
        }
    }

    /// Like [Cursor::eat], but `keyword` must not be followed by a name character
    pub fn eat_keyword(&mut self, keyword: &str) -> bool {
        let rest = self.rest();
        let followed_by_name = rest
            .get(keyword.len()..)
            .and_then(|after| after.chars().next())
            .is_some_and(is_name_char);
        if rest.starts_with(keyword) && !followed_by_name {
            self.offset += keyword.len();
            true
        } else {
            false
        }
    }

    /// Consume the longest prefix whose characters satisfy `accept`
    pub fn take_while(&mut self, accept: impl Fn(char) -> bool) -> &'t str {
        let rest = self.rest();
        let end = rest.find(|c: char| !accept(c)).unwrap_or(rest.len());
        self.offset += end;
        &rest[..end]
    }

    /// `[A-Za-z_][A-Za-z0-9_]*`
    pub fn name(&mut self) -> Option<&'t str> {
        if !self.peek().is_some_and(|c| c.is_ascii_alphabetic() || c == '_') {
            return None;
        }
        Some(self.take_while(is_name_char))
    }
}

pub(crate) fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
