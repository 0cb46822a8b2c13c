//! Symbols and symbol trees.
//!
//! A [`Symbol`] is a tagged variant shared through [`SymbolRef`]. Two
//! capabilities cut across the variants: *returnable* symbols expose a
//! return-type symbol, and symbols *with children* own a nested
//! [`SymbolTree`] scope.

mod tree;

pub use tree::SymbolTree;

use std::rc::Rc;
use std::str::FromStr;

use crate::source::Location;

/// Shared handle to a symbol.
pub type SymbolRef = Rc<Symbol>;

/// The kind of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Unknown,
    Unresolved,
    Builtin,
    Class,
    Function,
    Method,
    Variable,
    Assignment,
    Type,
    Import,
    Array,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Unknown => "unknown",
            SymbolKind::Unresolved => "unresolved",
            SymbolKind::Builtin => "builtin",
            SymbolKind::Class => "class",
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Variable => "variable",
            SymbolKind::Assignment => "assignment",
            SymbolKind::Type => "type",
            SymbolKind::Import => "import",
            SymbolKind::Array => "array",
        }
    }
}

impl FromStr for SymbolKind {
    type Err = std::convert::Infallible;

    /// Unrecognized names parse as [`SymbolKind::Unknown`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "unresolved" => SymbolKind::Unresolved,
            "builtin" => SymbolKind::Builtin,
            "class" => SymbolKind::Class,
            "function" => SymbolKind::Function,
            "method" => SymbolKind::Method,
            "variable" => SymbolKind::Variable,
            "assignment" => SymbolKind::Assignment,
            "type" => SymbolKind::Type,
            "import" => SymbolKind::Import,
            "array" => SymbolKind::Array,
            _ => SymbolKind::Unknown,
        })
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum Symbol {
    /// A type or value provided by the language itself.
    Builtin { name: String },
    /// A declared variable or parameter.
    Variable {
        name: String,
        location: Location,
        return_type: SymbolRef,
        is_param: bool,
    },
    /// An assignment to an existing variable, or to an unknown name.
    Assignment {
        variable: Option<SymbolRef>,
        fallback_name: String,
        location: Location,
        content_return_type: SymbolRef,
    },
    /// A class, function or method.
    TopLevel {
        name: String,
        kind: SymbolKind,
        location: Location,
        children: Option<SymbolTree>,
        return_type: Option<SymbolRef>,
    },
    Import {
        alias: String,
        path: String,
        location: Location,
        symbols: Vec<String>,
    },
    Array { value: SymbolRef, length: usize },
    /// A parameterized collection such as `list[int]`.
    Collection {
        name: String,
        key: Option<SymbolRef>,
        value: SymbolRef,
    },
    Unresolved { name: String },
}

impl Symbol {
    pub fn builtin(name: impl Into<String>) -> SymbolRef {
        Rc::new(Symbol::Builtin { name: name.into() })
    }

    pub fn unresolved() -> SymbolRef {
        Rc::new(Symbol::Unresolved {
            name: "unresolved".to_string(),
        })
    }

    pub fn name(&self) -> String {
        match self {
            Symbol::Builtin { name }
            | Symbol::Variable { name, .. }
            | Symbol::TopLevel { name, .. }
            | Symbol::Unresolved { name } => name.clone(),
            Symbol::Assignment {
                variable,
                fallback_name,
                ..
            } => variable
                .as_ref()
                .map(|v| v.name())
                .unwrap_or_else(|| fallback_name.clone()),
            Symbol::Import { alias, .. } => alias.clone(),
            Symbol::Array { value, length } => format!("[{}]{}", length, value.name()),
            Symbol::Collection { name, key, value } => match key {
                Some(key) => format!("{}[{}, {}]", name, key.name(), value.name()),
                None => format!("{}[{}]", name, value.name()),
            },
        }
    }

    pub fn kind(&self) -> SymbolKind {
        match self {
            Symbol::Builtin { .. } => SymbolKind::Builtin,
            Symbol::Variable { .. } => SymbolKind::Variable,
            Symbol::Assignment { .. } => SymbolKind::Assignment,
            Symbol::TopLevel { kind, .. } => *kind,
            Symbol::Import { .. } => SymbolKind::Import,
            Symbol::Array { .. } => SymbolKind::Array,
            Symbol::Collection { .. } => SymbolKind::Type,
            Symbol::Unresolved { .. } => SymbolKind::Unresolved,
        }
    }

    pub fn location(&self) -> Option<&Location> {
        match self {
            Symbol::Variable { location, .. }
            | Symbol::Assignment { location, .. }
            | Symbol::TopLevel { location, .. }
            | Symbol::Import { location, .. } => Some(location),
            _ => None,
        }
    }

    pub fn return_type(&self) -> Option<SymbolRef> {
        match self {
            Symbol::Variable { return_type, .. } => Some(Rc::clone(return_type)),
            Symbol::Assignment {
                content_return_type,
                ..
            } => Some(Rc::clone(content_return_type)),
            Symbol::TopLevel { return_type, .. } => return_type.clone(),
            _ => None,
        }
    }

    pub fn children(&self) -> Option<&SymbolTree> {
        match self {
            Symbol::TopLevel { children, .. } => children.as_ref(),
            _ => None,
        }
    }

    pub fn is_returnable(&self) -> bool {
        self.return_type().is_some()
    }

    pub fn has_children(&self) -> bool {
        self.children().is_some()
    }

    pub fn is_param(&self) -> bool {
        matches!(self, Symbol::Variable { is_param: true, .. })
    }
}

/// Whether two handles denote the same symbol.
pub fn same(a: &SymbolRef, b: &SymbolRef) -> bool {
    Rc::ptr_eq(a, b) || (a.kind() == b.kind() && a.name() == b.name() && a.location() == b.location())
}

/// Follows return types down to the value symbol (a builtin, class or array).
pub fn unwrap_return_type(sym: &SymbolRef) -> SymbolRef {
    let mut current = Rc::clone(sym);
    for _ in 0..16 {
        match current.return_type() {
            Some(next) if !Rc::ptr_eq(&next, &current) => current = next,
            _ => break,
        }
    }
    current
}

/// Resolves a member of a class-like symbol.
pub fn get_from_symbol(sym: &SymbolRef, name: &str) -> Option<SymbolRef> {
    unwrap_return_type(sym).children()?.get(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Position;

    fn variable(name: &str, return_type: SymbolRef) -> SymbolRef {
        Rc::new(Symbol::Variable {
            name: name.to_string(),
            location: Location::new("a.py", Position::with_index(0, 0, 0), Position::with_index(0, 1, 1)),
            return_type,
            is_param: false,
        })
    }

    #[test]
    fn test_kind_strings() {
        for kind in [SymbolKind::Class, SymbolKind::Variable, SymbolKind::Array] {
            assert_eq!(kind.as_str().parse::<SymbolKind>().unwrap(), kind);
        }
        assert_eq!("nonsense".parse::<SymbolKind>().unwrap(), SymbolKind::Unknown);
    }

    #[test]
    fn test_names() {
        let int = Symbol::builtin("int");
        let arr = Rc::new(Symbol::Array {
            value: Rc::clone(&int),
            length: 3,
        });
        assert_eq!(arr.name(), "[3]int");

        let assignment = Symbol::Assignment {
            variable: None,
            fallback_name: "x".to_string(),
            location: Location::default(),
            content_return_type: Rc::clone(&int),
        };
        assert_eq!(assignment.name(), "x");
        assert!(assignment.is_returnable());
    }

    #[test]
    fn test_unwrap_return_type() {
        let int = Symbol::builtin("int");
        let a = variable("a", Rc::clone(&int));
        let b = variable("b", Rc::clone(&a));
        assert!(Rc::ptr_eq(&unwrap_return_type(&b), &int));
        assert!(same(&a, &variable("a", Symbol::builtin("str"))));
        assert!(!same(&a, &b));
    }
}
