//! Transform programs and their execution.
//!
//! A program is an ordered list of [`Op`]s applied left to right to the
//! characters of a signature token. Programs have a compact textual notation
//! used for logging and the CLI: `r` reverses, `wN` swaps the head with
//! position `N mod len`, and `sN` drops the first `N` characters. For example
//! `"w3 r s2"`.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A single deciphering operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// Reverse the sequence.
    Reverse,
    /// Exchange the first element with the element at `n mod len`.
    SwapHead(usize),
    /// Remove the first `n` elements.
    DropPrefix(usize),
}

impl Op {
    /// Apply this operation to a character sequence in place.
    pub fn apply(&self, chars: &mut Vec<char>) {
        match *self {
            Op::Reverse => chars.reverse(),
            Op::SwapHead(n) => {
                if !chars.is_empty() {
                    let pos = n % chars.len();
                    chars.swap(0, pos);
                }
            }
            Op::DropPrefix(n) => {
                let n = n.min(chars.len());
                chars.drain(..n);
            }
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Reverse => write!(f, "r"),
            Op::SwapHead(n) => write!(f, "w{n}"),
            Op::DropPrefix(n) => write!(f, "s{n}"),
        }
    }
}

impl FromStr for Op {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let mut chars = s.chars();
        let tag = chars
            .next()
            .ok_or_else(|| Error::invalid_notation("empty operation"))?;
        let arg = chars.as_str();

        let number = || {
            arg.parse::<usize>()
                .map_err(|_| Error::invalid_notation(format!("bad argument in `{s}`")))
        };

        match tag {
            'r' if arg.is_empty() => Ok(Op::Reverse),
            'w' => Ok(Op::SwapHead(number()?)),
            // `p` is the older spelling of the prefix drop.
            's' | 'p' => Ok(Op::DropPrefix(number()?)),
            _ => Err(Error::invalid_notation(format!("unknown operation `{s}`"))),
        }
    }
}

/// An ordered sequence of operations recovered from a code blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TransformProgram {
    ops: Vec<Op>,
}

impl TransformProgram {
    /// Create a program from a list of operations.
    pub fn new(ops: Vec<Op>) -> Self {
        Self { ops }
    }

    /// The operations in execution order.
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Run the program over a token.
    pub fn apply(&self, token: &str) -> String {
        let mut chars: Vec<char> = token.chars().collect();
        for op in &self.ops {
            op.apply(&mut chars);
        }
        chars.into_iter().collect()
    }
}

impl fmt::Display for TransformProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{op}")?;
        }
        Ok(())
    }
}

impl FromStr for TransformProgram {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let ops = s
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<Op>>>()?;
        Ok(Self::new(ops))
    }
}

impl From<Vec<Op>> for TransformProgram {
    fn from(ops: Vec<Op>) -> Self {
        Self::new(ops)
    }
}

/// Decipher a signed token with a program.
pub fn decipher(program: &TransformProgram, token: &str) -> String {
    program.apply(token)
}
