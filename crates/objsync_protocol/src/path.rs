//! Paths into nested values.

use crate::intern::InternString;

/// One step of a [`Path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathElement {
    /// A named field of an embedded object, or a dictionary key.
    Field(InternString),
    /// A position in a list.
    Index(u32),
}

impl From<InternString> for PathElement {
    fn from(name: InternString) -> Self {
        PathElement::Field(name)
    }
}

impl From<u32> for PathElement {
    fn from(index: u32) -> Self {
        PathElement::Index(index)
    }
}

/// Location below the top-level field addressed by a path instruction.
///
/// An empty path addresses the field itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path(Vec<PathElement>);

impl Path {
    /// Creates an empty path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an element.
    pub fn push(&mut self, element: impl Into<PathElement>) {
        self.0.push(element.into());
    }

    /// Removes the last element.
    pub fn pop(&mut self) -> Option<PathElement> {
        self.0.pop()
    }

    /// Returns the last element.
    pub fn back(&self) -> Option<&PathElement> {
        self.0.last()
    }

    /// Mutable access to the last element.
    pub fn back_mut(&mut self) -> Option<&mut PathElement> {
        self.0.last_mut()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true for the empty path.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the elements.
    pub fn iter(&self) -> std::slice::Iter<'_, PathElement> {
        self.0.iter()
    }

    /// Returns true if the path ends in a list index.
    pub fn is_array_index(&self) -> bool {
        matches!(self.back(), Some(PathElement::Index(_)))
    }

    /// The trailing list index, if any.
    pub fn index(&self) -> Option<u32> {
        match self.back() {
            Some(PathElement::Index(i)) => Some(*i),
            _ => None,
        }
    }

    /// Mutable access to the trailing list index.
    pub fn index_mut(&mut self) -> Option<&mut u32> {
        match self.back_mut() {
            Some(PathElement::Index(i)) => Some(i),
            _ => None,
        }
    }
}

impl From<Vec<PathElement>> for Path {
    fn from(elements: Vec<PathElement>) -> Self {
        Self(elements)
    }
}

impl FromIterator<PathElement> for Path {
    fn from_iter<I: IntoIterator<Item = PathElement>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a PathElement;
    type IntoIter = std::slice::Iter<'a, PathElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_index() {
        let mut path = Path::new();
        assert!(!path.is_array_index());
        assert_eq!(path.index(), None);

        path.push(InternString(0));
        assert!(!path.is_array_index());

        path.push(7u32);
        assert!(path.is_array_index());
        assert_eq!(path.index(), Some(7));

        *path.index_mut().unwrap() = 9;
        assert_eq!(path.index(), Some(9));
    }

    #[test]
    fn index_in_the_middle_does_not_count() {
        let path: Path = vec![PathElement::Index(1), PathElement::Field(InternString(2))].into();
        assert!(!path.is_array_index());
        assert_eq!(path.len(), 2);
    }
}
