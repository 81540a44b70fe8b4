// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Field keys (C4): the heap abstraction's "slot" identity within an
//! abstract object. See spec.md §4.2.

use std::fmt;

/// A field key addressing one slot of an abstract object's heap
/// representation. Attribute names, sequence elements, the wrapped scalar
/// of a constant/list-like container, tuple positions, dict/set keys, and a
/// catch-all `unknown` slot used when a subscript/attribute name cannot be
/// resolved statically.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Field {
    /// A named attribute, e.g. `obj.attr`.
    Attr(String),
    /// The single merged element slot of a list/set-like container.
    Elem,
    /// The wrapped value of a container that holds exactly one logical
    /// value (e.g. a cell, a single-valued box).
    Value,
    /// A fixed numeric position within a tuple.
    Position(usize),
    /// A dict key slot, merged per key name when the key is a string
    /// constant, else folded into `Unknown`.
    Key(String),
    /// Slot used when a field cannot be resolved to any of the above at
    /// translation time (dynamic attribute name, non-constant subscript).
    Unknown,
}

impl Field {
    pub fn attr(name: impl Into<String>) -> Self {
        Field::Attr(name.into())
    }

    pub fn elem() -> Self {
        Field::Elem
    }

    pub fn value() -> Self {
        Field::Value
    }

    pub fn position(i: usize) -> Self {
        Field::Position(i)
    }

    pub fn key(name: impl Into<String>) -> Self {
        Field::Key(name.into())
    }

    pub fn unknown() -> Self {
        Field::Unknown
    }

    /// A field is well-formed if it does not carry an empty attribute or
    /// key name (those must be routed to `Unknown` by the caller instead).
    pub fn is_well_formed(&self) -> bool {
        match self {
            Field::Attr(name) | Field::Key(name) => !name.is_empty(),
            _ => true,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Attr(name) => write!(f, ".{name}"),
            Field::Elem => write!(f, "[*]"),
            Field::Value => write!(f, "*"),
            Field::Position(i) => write!(f, "#{i}"),
            Field::Key(name) => write!(f, "[{name:?}]"),
            Field::Unknown => write!(f, "[?]"),
        }
    }
}
