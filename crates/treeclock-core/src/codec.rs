//! Compact binary codec for stamps.
//!
//! # Wire format (v1)
//!
//! All multi-byte integers are big-endian. A serialized stamp is:
//!
//! ```text
//! byte 0         version        (WIRE_VERSION)
//! byte 1         (id_len_len << 4) | event_len_len, nibbles in 1..=4
//! id_len_len     identity section length
//! ...            identity section
//! event_len_len  event section length
//! ...            event section
//! ```
//!
//! Identity nodes emit one header byte each, preorder:
//! `0x00` non-owning leaf, `0x01` owning leaf, `0x02` interior node
//! followed by the left then right child.
//!
//! Event nodes emit a header byte — bit 7 set for an interior node,
//! bits 6..4 reserved (zero), bits 3..0 the counter byte count — then
//! that many big-endian counter bytes (none when the counter is 0),
//! then for an interior node the left and right children.
//!
//! The section lengths let a reader reject truncated input before
//! parsing either payload. There is no checksum; callers crossing an
//! untrusted channel wrap the bytes themselves.
//!
//! Decoding is strict: reserved bits must be zero, both sections must
//! be consumed exactly, nothing may trail the event section, and the
//! decoded trees must be in normal form.

use std::mem;

use crate::error::Error;
use crate::tree::{Counter, Event, Id, Stamp};

/// Version tag leading every serialized stamp. Payloads tagged with a
/// newer version are rejected as [`Error::IncompatibleVersion`].
pub const WIRE_VERSION: u8 = 1;

/// Serialized counter width ceiling for this build.
pub const COUNTER_WIDTH: usize = mem::size_of::<Counter>();

/// Decoder bound on tree depth. Cooperating replicas produce depths
/// bounded by their fork history; a payload deeper than this is
/// hostile or corrupt, and is rejected before the stack is at risk.
const MAX_TREE_DEPTH: usize = 512;

const ID_LEAF_FREE: u8 = 0x00;
const ID_LEAF_OWNED: u8 = 0x01;
const ID_INTERIOR: u8 = 0x02;

const EVENT_INTERIOR_BIT: u8 = 0x80;
const EVENT_RESERVED_MASK: u8 = 0x70;
const EVENT_COUNT_MASK: u8 = 0x0f;

// ---------------------------------------------------------------------------
// Identity section
// ---------------------------------------------------------------------------

/// Serialize an identity tree to its section payload.
#[must_use]
pub fn encode_id(id: &Id) -> Vec<u8> {
    let mut out = Vec::with_capacity(id.node_count());
    write_id(id, &mut out);
    out
}

/// Deserialize an identity section.
///
/// # Errors
///
/// [`Error::InvalidParameter`] on empty input, [`Error::CorruptId`]
/// on an unknown header byte, truncation, trailing bytes, excessive
/// depth, or a tree not in normal form.
pub fn decode_id(bytes: &[u8]) -> Result<Id, Error> {
    if bytes.is_empty() {
        return Err(Error::InvalidParameter);
    }
    let mut cursor = 0;
    let id = read_id(bytes, &mut cursor, 0)?;
    if cursor != bytes.len() {
        return Err(Error::CorruptId);
    }
    id.validate()?;
    Ok(id)
}

fn write_id(id: &Id, out: &mut Vec<u8>) {
    match id {
        Id::Zero => out.push(ID_LEAF_FREE),
        Id::One => out.push(ID_LEAF_OWNED),
        Id::Branch(l, r) => {
            out.push(ID_INTERIOR);
            write_id(l, out);
            write_id(r, out);
        }
    }
}

fn read_id(bytes: &[u8], cursor: &mut usize, depth: usize) -> Result<Id, Error> {
    if depth > MAX_TREE_DEPTH {
        return Err(Error::CorruptId);
    }
    let header = *bytes.get(*cursor).ok_or(Error::CorruptId)?;
    *cursor += 1;
    match header {
        ID_LEAF_FREE => Ok(Id::Zero),
        ID_LEAF_OWNED => Ok(Id::One),
        ID_INTERIOR => {
            let left = read_id(bytes, cursor, depth + 1)?;
            let right = read_id(bytes, cursor, depth + 1)?;
            Ok(Id::Branch(Box::new(left), Box::new(right)))
        }
        _ => Err(Error::CorruptId),
    }
}

// ---------------------------------------------------------------------------
// Event section
// ---------------------------------------------------------------------------

/// Serialize an event tree to its section payload.
#[must_use]
pub fn encode_event(event: &Event) -> Vec<u8> {
    let mut out = Vec::with_capacity(event.node_count() * 2);
    write_event(event, &mut out);
    out
}

/// Deserialize an event section.
///
/// # Errors
///
/// [`Error::InvalidParameter`] on empty input,
/// [`Error::UnsupportedCounterSize`] when a counter is declared wider
/// than this build's width, [`Error::CorruptEvent`] on reserved
/// header bits, truncation, trailing bytes, excessive depth, or a
/// tree not in normal form.
pub fn decode_event(bytes: &[u8]) -> Result<Event, Error> {
    if bytes.is_empty() {
        return Err(Error::InvalidParameter);
    }
    let mut cursor = 0;
    let event = read_event(bytes, &mut cursor, 0)?;
    if cursor != bytes.len() {
        return Err(Error::CorruptEvent);
    }
    event.validate()?;
    Ok(event)
}

fn write_event(event: &Event, out: &mut Vec<u8>) {
    let n = event.value();
    let count = counter_bytes(n);
    let interior = if event.is_leaf() { 0 } else { EVENT_INTERIOR_BIT };
    #[allow(clippy::cast_possible_truncation)]
    out.push(interior | count as u8);
    out.extend_from_slice(&n.to_be_bytes()[COUNTER_WIDTH - count..]);
    if let Event::Branch(_, l, r) = event {
        write_event(l, out);
        write_event(r, out);
    }
}

fn read_event(bytes: &[u8], cursor: &mut usize, depth: usize) -> Result<Event, Error> {
    if depth > MAX_TREE_DEPTH {
        return Err(Error::CorruptEvent);
    }
    let header = *bytes.get(*cursor).ok_or(Error::CorruptEvent)?;
    *cursor += 1;
    if header & EVENT_RESERVED_MASK != 0 {
        return Err(Error::CorruptEvent);
    }
    let count = usize::from(header & EVENT_COUNT_MASK);
    if count > COUNTER_WIDTH {
        #[allow(clippy::cast_possible_truncation)]
        return Err(Error::UnsupportedCounterSize(count as u8));
    }
    let counter_bytes = cursor
        .checked_add(count)
        .and_then(|end| bytes.get(*cursor..end))
        .ok_or(Error::CorruptEvent)?;
    let mut value: Counter = 0;
    for byte in counter_bytes {
        value = value << 8 | Counter::from(*byte);
    }
    *cursor += count;

    if header & EVENT_INTERIOR_BIT == 0 {
        return Ok(Event::Leaf(value));
    }
    let left = read_event(bytes, cursor, depth + 1)?;
    let right = read_event(bytes, cursor, depth + 1)?;
    Ok(Event::Branch(value, Box::new(left), Box::new(right)))
}

/// Fewest bytes that hold `n`; 0 means the counter is elided.
fn counter_bytes(n: Counter) -> usize {
    let significant = Counter::BITS - n.leading_zeros();
    significant.div_ceil(8) as usize
}

// ---------------------------------------------------------------------------
// Stamp framing
// ---------------------------------------------------------------------------

impl Stamp {
    /// Serialize this stamp to the versioned wire format.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let id_payload = encode_id(&self.id);
        let event_payload = encode_event(&self.event);
        let id_len_len = length_width(id_payload.len());
        let event_len_len = length_width(event_payload.len());

        let mut out =
            Vec::with_capacity(2 + id_len_len + id_payload.len() + event_len_len + event_payload.len());
        out.push(WIRE_VERSION);
        #[allow(clippy::cast_possible_truncation)]
        out.push((id_len_len as u8) << 4 | event_len_len as u8);
        write_be_length(id_payload.len(), id_len_len, &mut out);
        out.extend_from_slice(&id_payload);
        write_be_length(event_payload.len(), event_len_len, &mut out);
        out.extend_from_slice(&event_payload);
        out
    }

    /// Serialize into a caller-provided buffer, returning the number
    /// of bytes written.
    ///
    /// # Errors
    ///
    /// [`Error::InsufficientResources`] when `buf` cannot hold the
    /// payload; nothing is written in that case.
    pub fn write_bytes(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let bytes = self.to_bytes();
        if buf.len() < bytes.len() {
            return Err(Error::InsufficientResources);
        }
        buf[..bytes.len()].copy_from_slice(&bytes);
        Ok(bytes.len())
    }

    /// Deserialize a stamp from the versioned wire format.
    ///
    /// # Errors
    ///
    /// The most specific kind available: [`Error::InvalidParameter`]
    /// for truncation, bad framing, or trailing bytes;
    /// [`Error::IncompatibleVersion`] for a newer version tag;
    /// [`Error::CorruptStamp`] for a zero-length section;
    /// [`Error::CorruptId`] / [`Error::CorruptEvent`] /
    /// [`Error::UnsupportedCounterSize`] from the section decoders.
    pub fn from_bytes(input: &[u8]) -> Result<Self, Error> {
        decode_stamp(input).inspect_err(|error| {
            tracing::debug!(%error, len = input.len(), "stamp decode rejected");
        })
    }
}

fn decode_stamp(input: &[u8]) -> Result<Stamp, Error> {
    let version = *input.first().ok_or(Error::InvalidParameter)?;
    if version > WIRE_VERSION {
        return Err(Error::IncompatibleVersion(version));
    }
    if version == 0 {
        return Err(Error::InvalidParameter);
    }
    let header = *input.get(1).ok_or(Error::InvalidParameter)?;
    let id_len_len = usize::from(header >> 4);
    let event_len_len = usize::from(header & 0x0f);
    if !(1..=4).contains(&id_len_len) || !(1..=4).contains(&event_len_len) {
        return Err(Error::InvalidParameter);
    }

    let mut cursor = 2;
    let id_len = read_be_length(input, cursor, id_len_len)?;
    cursor += id_len_len;
    if id_len == 0 {
        return Err(Error::CorruptStamp);
    }
    let id = decode_id(section(input, cursor, id_len)?)?;
    cursor += id_len;

    let event_len = read_be_length(input, cursor, event_len_len)?;
    cursor += event_len_len;
    if event_len == 0 {
        return Err(Error::CorruptStamp);
    }
    let event = decode_event(section(input, cursor, event_len)?)?;
    cursor += event_len;

    if cursor != input.len() {
        return Err(Error::InvalidParameter);
    }
    Ok(Stamp::new(id, event))
}

/// Fewest bytes (1..=4) that hold a section length.
fn length_width(len: usize) -> usize {
    match len {
        0..=0xff => 1,
        0x100..=0xffff => 2,
        0x1_0000..=0xff_ffff => 3,
        _ => 4,
    }
}

fn write_be_length(len: usize, width: usize, out: &mut Vec<u8>) {
    for shift in (0..width).rev() {
        #[allow(clippy::cast_possible_truncation)]
        out.push((len >> (shift * 8)) as u8);
    }
}

fn read_be_length(input: &[u8], start: usize, width: usize) -> Result<usize, Error> {
    let mut len = 0usize;
    for byte in section(input, start, width)? {
        len = len << 8 | usize::from(*byte);
    }
    Ok(len)
}

/// Borrow `len` bytes of `input` starting at `start`; the caller
/// advances its own cursor on success.
fn section(input: &[u8], start: usize, len: usize) -> Result<&[u8], Error> {
    start
        .checked_add(len)
        .and_then(|end| input.get(start..end))
        .ok_or(Error::InvalidParameter)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
