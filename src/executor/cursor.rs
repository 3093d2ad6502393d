//! Lazy entity cursors
//!
//! A [`LazyCursor`] streams decoded entities out of one store scan.
//!
//! # Lifecycle
//!
//! ```text
//! Open ──(scan drained)──> Exhausted ──close──> Closed
//!   └──────────────────close────────────────────┘
//! ```
//!
//! - The scan is opened when the cursor is constructed
//! - Residual qualifiers are evaluated before decoding; rejected records are
//!   skipped without bound until a match or the end of the scan
//! - Draining the scan releases it immediately
//! - `close` is idempotent and also runs on drop
//! - After `close`, `has_next` is false without fetching and `try_next`
//!   fails with `IllegalState`

use std::marker::PhantomData;
use std::sync::Arc;

use uuid::Uuid;

use crate::mapping::{Entity, RecordCodec};
use crate::observability::{Event, LogSink};
use crate::store::{NativeFilter, ScanStream, Store};
use crate::translate::{translate_or_wrap, AccessResult, DataAccessError, ErrorTranslator};

use super::filters::ResidualFilter;

/// Forward-only, single-pass, closable sequence
pub trait Cursor: Send {
    type Item;

    /// Whether another item is available. Fetches ahead if needed.
    fn has_next(&mut self) -> AccessResult<bool>;

    /// Next item, `None` once exhausted
    fn try_next(&mut self) -> AccessResult<Option<Self::Item>>;

    /// Releases underlying resources. Idempotent.
    fn close(&mut self);

    fn is_closed(&self) -> bool;

    /// Drains the cursor into a vector and closes it, on success and on
    /// error alike
    fn collect_all(mut self) -> AccessResult<Vec<Self::Item>>
    where
        Self: Sized,
    {
        let mut items = Vec::new();
        let outcome = loop {
            match self.try_next() {
                Ok(Some(item)) => items.push(item),
                Ok(None) => break Ok(()),
                Err(err) => break Err(err),
            }
        };
        self.close();
        outcome.map(|()| items)
    }
}

/// Cursor state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    Open,
    Exhausted,
    Closed,
}

impl CursorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CursorState::Open => "open",
            CursorState::Exhausted => "exhausted",
            CursorState::Closed => "closed",
        }
    }
}

/// Services a cursor reports through
#[derive(Clone)]
pub struct CursorContext {
    pub sink: Arc<dyn LogSink>,
    pub translator: Arc<dyn ErrorTranslator>,
}

/// Streams entities of type `E` from one scan
pub struct LazyCursor<E: Entity> {
    scan: Option<Box<dyn ScanStream>>,
    codec: RecordCodec,
    filter: ResidualFilter,
    peeked: Option<E>,
    state: CursorState,
    scan_id: Uuid,
    scanned: u64,
    matched: u64,
    context: CursorContext,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> LazyCursor<E> {
    /// Opens a scan over `E`'s collection.
    ///
    /// A failed open leaves nothing open.
    pub fn open<S: Store + ?Sized>(
        store: &S,
        codec: RecordCodec,
        native_filter: Option<&NativeFilter>,
        filter: ResidualFilter,
        context: CursorContext,
    ) -> AccessResult<Self> {
        let collection = E::descriptor().collection();
        let scan = store
            .scan(codec.namespace(), collection, native_filter)
            .map_err(|err| translate_or_wrap(context.translator.as_ref(), context.sink.as_ref(), err))?;

        let scan_id = Uuid::new_v4();
        let scan_id_str = scan_id.to_string();
        let native = native_filter.map_or_else(|| "none".to_string(), ToString::to_string);
        let residual = filter.qualifiers().len().to_string();
        context.sink.event(
            Event::CursorOpen,
            &[
                ("scan_id", scan_id_str.as_str()),
                ("collection", collection),
                ("native_filter", native.as_str()),
                ("residual", residual.as_str()),
            ],
        );

        Ok(Self {
            scan: Some(scan),
            codec,
            filter,
            peeked: None,
            state: CursorState::Open,
            scan_id,
            scanned: 0,
            matched: 0,
            context,
            _entity: PhantomData,
        })
    }

    /// Identifier correlating this cursor's log events
    pub fn scan_id(&self) -> Uuid {
        self.scan_id
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Raw records pulled from the scan so far
    pub fn scanned(&self) -> u64 {
        self.scanned
    }

    /// Pulls raw records until one passes the residual filter
    fn fetch(&mut self) -> AccessResult<Option<E>> {
        loop {
            let scan = match self.scan.as_mut() {
                Some(scan) => scan,
                None => return Ok(None),
            };

            match scan.next_record() {
                None => {
                    self.state = CursorState::Exhausted;
                    self.release("exhausted");
                    return Ok(None);
                }
                Some(Err(err)) => {
                    return Err(translate_or_wrap(
                        self.context.translator.as_ref(),
                        self.context.sink.as_ref(),
                        err,
                    ))
                }
                Some(Ok(raw)) => {
                    self.scanned += 1;
                    if !self.filter.matches(&raw.key, &raw.record.data) {
                        continue;
                    }
                    self.matched += 1;
                    return Ok(self.codec.decode(&raw.key, Some(raw.record.data))?);
                }
            }
        }
    }

    /// Closes the scan once and logs it
    fn release(&mut self, reason: &str) {
        if let Some(mut scan) = self.scan.take() {
            scan.close();
            let scan_id = self.scan_id.to_string();
            let scanned = self.scanned.to_string();
            let matched = self.matched.to_string();
            self.context.sink.event(
                Event::CursorClose,
                &[
                    ("scan_id", scan_id.as_str()),
                    ("reason", reason),
                    ("scanned", scanned.as_str()),
                    ("matched", matched.as_str()),
                ],
            );
        }
    }
}

impl<E: Entity> Cursor for LazyCursor<E> {
    type Item = E;

    fn has_next(&mut self) -> AccessResult<bool> {
        match self.state {
            CursorState::Closed => Ok(false),
            _ if self.peeked.is_some() => Ok(true),
            CursorState::Exhausted => Ok(false),
            CursorState::Open => {
                self.peeked = self.fetch()?;
                Ok(self.peeked.is_some())
            }
        }
    }

    fn try_next(&mut self) -> AccessResult<Option<E>> {
        if self.state == CursorState::Closed {
            return Err(DataAccessError::illegal_state("cursor is closed"));
        }
        if let Some(entity) = self.peeked.take() {
            return Ok(Some(entity));
        }
        match self.state {
            CursorState::Open => self.fetch(),
            _ => Ok(None),
        }
    }

    fn close(&mut self) {
        if self.state == CursorState::Closed {
            return;
        }
        self.peeked = None;
        self.state = CursorState::Closed;
        self.release("closed");
    }

    fn is_closed(&self) -> bool {
        self.state == CursorState::Closed
    }
}

/// Yields `Err` at most once per failure; yields nothing after close
impl<E: Entity> Iterator for LazyCursor<E> {
    type Item = AccessResult<E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_closed() {
            return None;
        }
        self.try_next().transpose()
    }
}

impl<E: Entity> Drop for LazyCursor<E> {
    fn drop(&mut self) {
        self.close();
    }
}
