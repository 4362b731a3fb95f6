//! Attribute paths such as `service_accounts[0].email`

use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of a field path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathComponent {
    Key(String),
    Index(usize),
}

/// Parsed attribute path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPath {
    pub components: Vec<PathComponent>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldPathError {
    #[error("Field path is empty")]
    Empty,

    #[error("Invalid field path '{path}' at position {position}: {reason}")]
    Malformed {
        path: String,
        position: usize,
        reason: String,
    },
}

impl FieldPath {
    /// Parse dotted keys with bracketed indices
    ///
    /// Keys may contain anything except `.`, `[` and `]`; indices are
    /// non-negative integers.
    pub fn parse(path: &str) -> Result<Self, FieldPathError> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(FieldPathError::Empty);
        }

        let malformed = |position: usize, reason: &str| FieldPathError::Malformed {
            path: trimmed.to_string(),
            position,
            reason: reason.to_string(),
        };

        let mut components = Vec::new();
        let mut key = String::new();
        let mut chars = trimmed.char_indices().peekable();
        // Set after `]` so that `a[0]b` is rejected but `a[0].b` and `a[0][1]` are not
        let mut after_index = false;

        while let Some((pos, c)) = chars.next() {
            match c {
                '.' => {
                    if key.is_empty() && !after_index {
                        return Err(malformed(pos, "empty key"));
                    }
                    if !key.is_empty() {
                        components.push(PathComponent::Key(std::mem::take(&mut key)));
                    }
                    after_index = false;
                    if chars.peek().is_none() {
                        return Err(malformed(pos, "trailing '.'"));
                    }
                }
                '[' => {
                    if !key.is_empty() {
                        components.push(PathComponent::Key(std::mem::take(&mut key)));
                    } else if components.is_empty() {
                        return Err(malformed(pos, "index without a key"));
                    }
                    let mut digits = String::new();
                    let mut closed = false;
                    for (_, d) in chars.by_ref() {
                        if d == ']' {
                            closed = true;
                            break;
                        }
                        digits.push(d);
                    }
                    if !closed {
                        return Err(malformed(pos, "unterminated '['"));
                    }
                    let index = digits
                        .trim()
                        .parse::<usize>()
                        .map_err(|_| malformed(pos, "index must be a non-negative integer"))?;
                    components.push(PathComponent::Index(index));
                    after_index = true;
                }
                ']' => return Err(malformed(pos, "unexpected ']'")),
                _ => {
                    if after_index {
                        return Err(malformed(pos, "expected '.' or '[' after index"));
                    }
                    key.push(c);
                }
            }
        }

        if !key.is_empty() {
            components.push(PathComponent::Key(key));
        }

        Ok(Self { components })
    }

    /// Single-key path
    pub fn key(name: impl Into<String>) -> Self {
        Self {
            components: vec![PathComponent::Key(name.into())],
        }
    }

    /// First key of the path, i.e. the top-level attribute name
    pub fn root(&self) -> Option<&str> {
        match self.components.first() {
            Some(PathComponent::Key(k)) => Some(k),
            _ => None,
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.components.iter().enumerate() {
            match component {
                PathComponent::Key(k) if i == 0 => write!(f, "{}", k)?,
                PathComponent::Key(k) => write!(f, ".{}", k)?,
                PathComponent::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for FieldPath {
    type Err = FieldPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
