//! Bounded cursor over an EBML byte buffer.

use super::ids;
use super::vint::{is_unknown_size, read_element_id, read_uint, read_vint};
use crate::error::{Error, Result};

/// Parsed element header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element {
    /// Element ID, marker bit included.
    pub id: u32,
    /// Buffer position of the first header byte.
    pub offset: usize,
    /// Buffer position where the payload begins.
    pub data_start: usize,
    /// Declared payload size, `None` when unknown.
    pub size: Option<u64>,
    /// Buffer position one past the payload, clamped to the enclosing view.
    pub data_end: usize,
}

impl Element {
    /// Whether the declared payload extends past the enclosing view.
    pub fn is_truncated(&self) -> bool {
        match self.size {
            Some(size) => (self.data_start as u64).saturating_add(size) > self.data_end as u64,
            None => false,
        }
    }

    pub fn name(&self) -> &'static str {
        ids::name(self.id)
    }
}

/// A read position within a bounded view of a buffer.
///
/// Positions are indices into the underlying buffer. `origin` is the stream
/// offset of the buffer's first byte, so [`EbmlCursor::absolute`] yields
/// offsets in the original stream.
#[derive(Debug, Clone, Copy)]
pub struct EbmlCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    end: usize,
    origin: u64,
}

impl<'a> EbmlCursor<'a> {
    /// Cursor over the whole buffer.
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            end: buf.len(),
            origin: 0,
        }
    }

    /// Cursor over a buffer that starts at `origin` in the stream.
    pub fn with_origin(buf: &'a [u8], origin: u64) -> Self {
        Self {
            origin,
            ..Self::new(buf)
        }
    }

    /// Cursor over `start..end` of the same buffer.
    pub fn view(&self, start: usize, end: usize) -> Result<Self> {
        if start > end || end > self.buf.len() {
            return Err(Error::BufferUnderflow {
                need: end.max(start),
                have: self.buf.len(),
            });
        }
        Ok(Self {
            buf: self.buf,
            pos: start,
            end,
            origin: self.origin,
        })
    }

    /// Cursor over an element's payload.
    pub fn enter(&self, element: &Element) -> Self {
        Self {
            buf: self.buf,
            pos: element.data_start,
            end: element.data_end,
            origin: self.origin,
        }
    }

    /// Like [`enter`](Self::enter), but the declared payload must lie wholly
    /// within the view.
    pub fn enter_complete(&self, element: &Element) -> Result<Self> {
        if element.is_truncated() {
            return Err(self.underflow(element));
        }
        Ok(self.enter(element))
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn remaining(&self) -> usize {
        self.end.saturating_sub(self.pos)
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.end
    }

    /// Stream offset of a buffer position.
    pub fn absolute(&self, pos: usize) -> u64 {
        self.origin + pos as u64
    }

    /// Read the element header at the current position and step into its
    /// payload.
    pub fn read_header(&mut self) -> Result<Element> {
        let view = &self.buf[..self.end];
        let offset = self.pos;
        let (id, id_width) = read_element_id(view, offset)?;
        let (size, size_width) = read_vint(view, offset + id_width)?;
        let data_start = offset + id_width + size_width;

        let (size, data_end) = if is_unknown_size(size, size_width) {
            (None, self.end)
        } else {
            let end = (data_start as u64)
                .saturating_add(size)
                .min(self.end as u64) as usize;
            (Some(size), end)
        };

        self.pos = data_start;
        Ok(Element {
            id,
            offset,
            data_start,
            size,
            data_end,
        })
    }

    /// Read the next sibling element and move past it.
    ///
    /// Returns `None` at the end of the view.
    pub fn next_element(&mut self) -> Result<Option<Element>> {
        if self.is_at_end() {
            return Ok(None);
        }
        let element = self.read_header()?;
        self.pos = element.data_end;
        Ok(Some(element))
    }

    /// Walk siblings until an element with `id` is found.
    ///
    /// On success the cursor is positioned after that element.
    pub fn find(&mut self, id: u32) -> Result<Option<Element>> {
        while let Some(element) = self.next_element()? {
            if element.id == id {
                return Ok(Some(element));
            }
        }
        Ok(None)
    }

    /// Like [`find`](Self::find) but a missing element is an error.
    pub fn expect(&mut self, id: u32) -> Result<Element> {
        self.find(id)?
            .ok_or(Error::MissingElement(ids::name(id)))
    }

    /// Scan byte by byte for an element ID and position the cursor on it.
    ///
    /// Used to find the stream magic when garbage may precede it.
    pub fn seek_id(&mut self, id: u32) -> Option<usize> {
        let needle = super::vint::encode_element_id(id);
        let haystack = &self.buf[self.pos..self.end];
        let found = haystack
            .windows(needle.len())
            .position(|window| window == needle.as_slice())?;
        self.pos += found;
        Some(self.pos)
    }

    /// Payload bytes of an element, which must lie wholly within the view.
    pub fn payload(&self, element: &Element) -> Result<&'a [u8]> {
        if element.is_truncated() || element.size.is_none() {
            return Err(self.underflow(element));
        }
        Ok(&self.buf[element.data_start..element.data_end])
    }

    fn underflow(&self, element: &Element) -> Error {
        let need = match element.size {
            Some(size) => {
                let size = usize::try_from(size).unwrap_or(usize::MAX);
                element.data_start.saturating_add(size)
            }
            None => element.data_end,
        };
        Error::BufferUnderflow {
            need,
            have: self.end,
        }
    }

    /// Payload of an element decoded as an unsigned integer.
    pub fn read_uint(&self, element: &Element) -> Result<u64> {
        read_uint(self.payload(element)?)
    }
}
