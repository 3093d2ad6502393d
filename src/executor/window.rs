//! Offset/limit windows over cursors
//!
//! A [`RangeWindow`] skips `offset` items by advancing its source, yields at
//! most `limit` more, and closes the source as soon as the limit is reached.
//! Skipped items are dropped as they are pulled; nothing is materialized.
//!
//! Windows do not sort. A sorted page is only correct over a fully
//! materialized and sorted result.

use crate::translate::{AccessResult, DataAccessError};

use super::cursor::Cursor;

/// Bounded view over a cursor. Owns the source's lifecycle.
pub struct RangeWindow<C: Cursor> {
    source: C,
    to_skip: usize,
    remaining: usize,
    closed: bool,
}

impl<C: Cursor> RangeWindow<C> {
    /// Wraps `source`. A zero limit releases the source immediately.
    pub fn new(mut source: C, offset: usize, limit: usize) -> Self {
        if limit == 0 {
            source.close();
        }
        Self {
            source,
            to_skip: offset,
            remaining: limit,
            closed: false,
        }
    }

    /// Items still allowed through
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    fn skip_prefix(&mut self) -> AccessResult<()> {
        while self.to_skip > 0 {
            match self.source.try_next()? {
                Some(_) => self.to_skip -= 1,
                None => self.to_skip = 0,
            }
        }
        Ok(())
    }
}

impl<C: Cursor> Cursor for RangeWindow<C> {
    type Item = C::Item;

    fn has_next(&mut self) -> AccessResult<bool> {
        if self.closed || self.remaining == 0 {
            return Ok(false);
        }
        self.skip_prefix()?;
        self.source.has_next()
    }

    fn try_next(&mut self) -> AccessResult<Option<C::Item>> {
        if self.closed {
            return Err(DataAccessError::illegal_state("window is closed"));
        }
        if self.remaining == 0 {
            return Ok(None);
        }
        self.skip_prefix()?;

        let item = self.source.try_next()?;
        if item.is_some() {
            self.remaining -= 1;
            if self.remaining == 0 {
                self.source.close();
            }
        }
        Ok(item)
    }

    fn close(&mut self) {
        self.closed = true;
        self.source.close();
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<C: Cursor> Iterator for RangeWindow<C> {
    type Item = AccessResult<C::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }
        self.try_next().transpose()
    }
}
