//! Stack traces extracted from error messages.

use crate::source::Location;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackTraceEntry {
    pub symbol_name: String,
    pub location: Location,
}

/// Frames in the order they appear in the message. The last added frame is the top.
#[derive(Debug, Clone, Default)]
pub struct TraceStack(Vec<StackTraceEntry>);

impl TraceStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, symbol_name: impl Into<String>, location: Location) {
        self.0.push(StackTraceEntry {
            symbol_name: symbol_name.into(),
            location,
        });
    }

    pub fn top(&self) -> Option<&StackTraceEntry> {
        self.0.last()
    }

    /// The topmost frame whose path starts with `prefix`, else the top frame.
    pub fn nearest_to(&self, prefix: &str) -> Option<&StackTraceEntry> {
        self.0
            .iter()
            .rev()
            .find(|e| e.location.document_path.starts_with(prefix))
            .or_else(|| self.top())
    }

    pub fn entries(&self) -> &[StackTraceEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Position;

    #[test]
    fn test_nearest_to() {
        let mut stack = TraceStack::new();
        assert!(stack.top().is_none());
        assert!(stack.nearest_to("/home").is_none());

        stack.add("main", Location::at("/home/user/main.py", Position::new(1, 0)));
        stack.add("helper", Location::at("/home/user/util.py", Position::new(5, 0)));
        stack.add("int", Location::at("/usr/lib/python/int.py", Position::new(9, 0)));

        assert_eq!(stack.top().unwrap().symbol_name, "int");
        assert_eq!(stack.nearest_to("/home/user").unwrap().symbol_name, "helper");
        assert_eq!(stack.nearest_to("/opt").unwrap().symbol_name, "int");
    }
}
