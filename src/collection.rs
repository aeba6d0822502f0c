//! Fixed-capacity named collection of board components.
//!
//! Items are stored in insertion order and can be reached by index, by
//! their name (`"one"`, `"red"`) or by an alias that points at the same
//! slot (`"amber"` → `"yellow"`). The name table is a `heapless` map of
//! short inline strings; the board has at most a dozen entries per group.

use heapless::String as HString;

use crate::error::{Error, Result};

/// Longest name or alias accepted.
pub const NAME_LEN: usize = 16;
/// Names plus aliases per collection.
pub const MAX_NAMES: usize = 16;

type Name = HString<NAME_LEN>;

pub struct Collection<T> {
    items: Vec<T>,
    names: heapless::Vec<(Name, usize), MAX_NAMES>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Collection<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            names: heapless::Vec::new(),
        }
    }

    /// Append `item` under `name`. Returns its index.
    pub fn add(&mut self, name: &str, item: T) -> Result<usize> {
        let index = self.items.len();
        self.bind(name, index)?;
        self.items.push(item);
        Ok(index)
    }

    /// Make `alias` resolve to the item already registered as `target`.
    pub fn alias(&mut self, alias: &str, target: &str) -> Result<()> {
        let index = self
            .index_of(target)
            .ok_or(Error::Config("alias target not found"))?;
        self.bind(alias, index)
    }

    fn bind(&mut self, name: &str, index: usize) -> Result<()> {
        if self.index_of(name).is_some() {
            return Err(Error::Config("name already in use"));
        }
        let name = Name::try_from(name).map_err(|()| Error::Config("name too long"))?;
        self.names
            .push((name, index))
            .map_err(|_| Error::Config("name table full"))
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names
            .iter()
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, i)| *i)
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.index_of(name).and_then(|i| self.items.get(i))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.index_of(name).and_then(|i| self.items.get_mut(i))
    }

    pub fn at(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn at_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }

    /// Every name and alias, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
