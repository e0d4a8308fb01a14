use lr_grammar_model::Location;
use std::rc::Rc;

/// Follows the position in an input file as text is consumed.
#[derive(Debug, Clone)]
pub struct LocationTracker {
    file: Rc<str>,
    line: usize,
    col: usize,
}

impl LocationTracker {
    pub fn new(file: &str) -> Self {
        Self {
            file: Rc::from(file),
            line: 1,
            col: 1,
        }
    }

    /// Position of the next character to be consumed.
    pub fn location(&self) -> Location {
        Location::new(&*self.file, self.line, self.col)
    }

    pub fn advance(&mut self, text: &str) {
        for c in text.chars() {
            if c == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
    }

    pub fn reset(&mut self) {
        self.line = 1;
        self.col = 1;
    }
}
