// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Fixed-capacity bit arrays backing Bloom-filter style sketches.
//!
//! A bit array is a sequence of `array_length` 64-bit words. Bit `i` lives in word `i / 64` at
//! position `i % 64`, and words are always laid out little-endian when serialized, so byte `b`
//! of the data region holds bits `8b..8b + 7`.
//!
//! # Variants
//!
//! Four implementations share the [`BitArray`] contract:
//!
//! | Type | Storage | Writable |
//! |---|---|---|
//! | [`HeapBitArray`] | owned `Vec<u64>` | yes |
//! | [`ReadOnlyHeapBitArray`] | owned, frozen | no |
//! | [`DirectBitArray`] | caller's `&mut [u8]` | yes |
//! | [`ReadOnlyDirectBitArray`] | caller's `&[u8]` | no |
//!
//! Read-only variants answer every mutating call with an [`ErrorKind::ReadOnly`] error.
//!
//! [`ErrorKind::ReadOnly`]: crate::error::ErrorKind::ReadOnly
//!
//! # Serialization Layout
//!
//! | Offset | Size | Field |
//! |---|---|---|
//! | 0 | 4 | `array_length` (int32, number of words) |
//! | 4 | 4 | unused, zero |
//! | 8 | 8 | `num_bits_set` (int64, `-1` when unknown) |
//! | 16 | `array_length * 8` | words |
//!
//! An empty array may be serialized as the first 8 bytes only. Such bytes can be opened
//! read-only and never as writable.
//!
//! # Usage
//!
//! ```rust
//! use datasketches_bitarray::bitarray::BitArray;
//! use datasketches_bitarray::bitarray::HeapBitArray;
//! use datasketches_bitarray::bitarray::ReadOnlyDirectBitArray;
//!
//! let mut bits = HeapBitArray::new(128).unwrap();
//! for i in [0, 63, 64, 127] {
//!     bits.set_bit(i).unwrap();
//! }
//! assert_eq!(bits.num_bits_set(), 4);
//!
//! let bytes = bits.serialize();
//! let mut view = ReadOnlyDirectBitArray::wrap(&bytes, false).unwrap();
//! assert_eq!(view.num_bits_set(), 4);
//! assert!(view.get_bit(63));
//! assert!(!view.get_bit(65));
//! ```

mod direct;
mod direct_read_only;
mod heap;

use byteorder::ByteOrder;
use byteorder::LE;
use tracing::warn;

pub use self::direct::DirectBitArray;
pub use self::direct_read_only::ReadOnlyDirectBitArray;
pub use self::heap::HeapBitArray;
pub use self::heap::ReadOnlyHeapBitArray;
use crate::error::Error;

/// The largest number of bits a single bit array may hold.
pub const MAX_BITS: u64 = i32::MAX as u64 * 64;

/// Byte offset of the `array_length` header field.
pub const ARRAY_LENGTH_OFFSET: usize = 0;
/// Byte offset of the `num_bits_set` header field.
pub const NUM_BITS_OFFSET: usize = 8;
/// Byte offset of the first data word.
pub const DATA_OFFSET: usize = 16;
/// Size of the full header in bytes.
pub const HEADER_BYTES: usize = DATA_OFFSET;
/// Size of the header of an empty serialized bit array, which omits `num_bits_set`.
pub const EMPTY_HEADER_BYTES: usize = NUM_BITS_OFFSET;

// Header encoding of an unknown bit count.
const DIRTY_BITS_VALUE: i64 = -1;

/// Cached population count of a bit array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumBitsSet {
    /// The count is up to date.
    Known(u64),
    /// The count is stale and must be recomputed from the words.
    Unknown,
}

impl NumBitsSet {
    /// Returns the count if it is known.
    pub fn known(self) -> Option<u64> {
        match self {
            NumBitsSet::Known(n) => Some(n),
            NumBitsSet::Unknown => None,
        }
    }

    /// Decodes the header representation. Any negative value means unknown.
    pub(crate) fn from_header(raw: i64) -> Self {
        if raw < 0 {
            NumBitsSet::Unknown
        } else {
            NumBitsSet::Known(raw as u64)
        }
    }

    pub(crate) fn to_header(self) -> i64 {
        match self {
            NumBitsSet::Known(n) => n as i64,
            NumBitsSet::Unknown => DIRTY_BITS_VALUE,
        }
    }
}

/// Who owns the memory behind a bit array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Storage {
    /// The array allocated its words and frees them on drop.
    Owned,
    /// The array borrows a caller-supplied byte region and never frees it.
    External,
}

/// The capability set shared by every bit array variant.
///
/// Mutating methods return an error on read-only variants instead of being absent, so the same
/// contract can be driven through `&mut dyn BitArray`.
pub trait BitArray {
    /// Returns the number of 64-bit words.
    fn array_length(&self) -> usize;

    /// Returns the number of bits the array holds, always a multiple of 64.
    fn capacity(&self) -> u64 {
        self.array_length() as u64 * 64
    }

    /// Returns the value of bit `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` lies outside the backing storage.
    fn get_bit(&self, index: u64) -> bool;

    /// Returns the word at `word_index`.
    ///
    /// # Panics
    ///
    /// Panics if `word_index` lies outside the backing storage.
    fn get_long(&self, word_index: usize) -> u64;

    /// Returns the number of bits set, recomputing and persisting the count if it is stale.
    fn num_bits_set(&mut self) -> u64;

    /// Returns the cached count without recomputing it.
    fn known_num_bits_set(&self) -> Option<u64>;

    /// Returns whether the cached count is stale.
    fn is_dirty(&self) -> bool {
        self.known_num_bits_set().is_none()
    }

    /// Returns whether no bit is set.
    fn is_empty(&mut self) -> bool {
        self.num_bits_set() == 0
    }

    /// Returns whether mutating methods are rejected.
    fn is_read_only(&self) -> bool;

    /// Returns who owns the backing memory.
    fn storage(&self) -> Storage;

    /// Returns whether the array is backed by an external memory region.
    fn has_memory(&self) -> bool {
        self.storage() == Storage::External
    }

    /// Returns the number of bytes the serialized form of this array occupies.
    fn serialized_size_bytes(&self) -> usize {
        required_bytes(self.array_length())
    }

    /// Clears every bit.
    fn reset(&mut self) -> Result<(), Error>;

    /// Sets bit `index`. The cached count becomes stale.
    fn set_bit(&mut self, index: u64) -> Result<(), Error>;

    /// Sets bit `index` and returns whether it was already set.
    ///
    /// A known count stays known: it is incremented when the bit was newly set.
    fn get_and_set_bit(&mut self, index: u64) -> Result<bool, Error>;

    /// Overwrites the word at `word_index`. The cached count becomes stale.
    fn set_long(&mut self, word_index: usize, value: u64) -> Result<(), Error>;

    /// Replaces this array with the bitwise AND of itself and `other`.
    ///
    /// Fails without mutating if the capacities differ.
    fn intersect(&mut self, other: &dyn BitArray) -> Result<(), Error>;

    /// Replaces this array with the bitwise OR of itself and `other`.
    ///
    /// Fails without mutating if the capacities differ.
    fn union(&mut self, other: &dyn BitArray) -> Result<(), Error>;

    /// Complements every bit.
    fn invert(&mut self) -> Result<(), Error>;
}

/// Returns the number of words needed to hold `num_bits` bits.
///
/// # Errors
///
/// Returns an error unless `0 < num_bits <= MAX_BITS`.
pub fn array_length_for_bits(num_bits: u64) -> Result<usize, Error> {
    if num_bits == 0 || num_bits > MAX_BITS {
        return Err(Error::invalid_argument(format!(
            "number of bits must be in (0, {MAX_BITS}], got {num_bits}"
        ))
        .with_context("num_bits", num_bits));
    }
    Ok(num_bits.div_ceil(64) as usize)
}

/// Returns the number of bytes needed to serialize a bit array holding `num_bits` bits.
///
/// # Errors
///
/// Returns an error unless `0 < num_bits <= MAX_BITS`.
pub fn serialized_size_bytes(num_bits: u64) -> Result<usize, Error> {
    array_length_for_bits(num_bits).map(required_bytes)
}

pub(crate) fn required_bytes(array_length: usize) -> usize {
    (array_length + 2) * 8
}

pub(crate) fn check_region(required: usize, actual: usize) -> Result<(), Error> {
    if actual < required {
        return Err(Error::region_too_small(required, actual));
    }
    Ok(())
}

pub(crate) fn check_same_capacity(
    this: &dyn BitArray,
    other: &dyn BitArray,
) -> Result<(), Error> {
    if this.capacity() != other.capacity() {
        return Err(Error::capacity_mismatch(this.capacity(), other.capacity()));
    }
    Ok(())
}

/// Validates a stored array length against the capacity ceiling.
pub(crate) fn decode_array_length(raw: i32) -> Result<usize, Error> {
    if raw < 0 || raw as u64 * 64 > MAX_BITS {
        warn!(array_length = raw, "rejecting bit array header");
        return Err(Error::possible_corruption(raw as i64));
    }
    Ok(raw as usize)
}

/// Rejects a stored count that cannot fit in `array_length` words.
pub(crate) fn check_stored_count(
    stored: NumBitsSet,
    array_length: usize,
) -> Result<NumBitsSet, Error> {
    if let NumBitsSet::Known(n) = stored {
        let capacity = array_length as u64 * 64;
        if n > capacity {
            warn!(num_bits_set = n, capacity, "rejecting bit array header");
            return Err(Error::invalid_num_bits_set(n, capacity));
        }
    }
    Ok(stored)
}

pub(crate) fn read_array_length(region: &[u8]) -> Result<usize, Error> {
    check_region(EMPTY_HEADER_BYTES, region.len())?;
    decode_array_length(LE::read_i32(&region[ARRAY_LENGTH_OFFSET..]))
}

pub(crate) fn read_num_bits_set(region: &[u8]) -> Result<NumBitsSet, Error> {
    check_region(HEADER_BYTES, region.len())?;
    Ok(NumBitsSet::from_header(LE::read_i64(&region[NUM_BITS_OFFSET..])))
}

pub(crate) fn write_header(region: &mut [u8], array_length: usize, num_bits_set: NumBitsSet) {
    LE::write_i32(&mut region[ARRAY_LENGTH_OFFSET..], array_length as i32);
    LE::write_u32(&mut region[ARRAY_LENGTH_OFFSET + 4..], 0);
    write_num_bits_set(region, num_bits_set);
}

pub(crate) fn write_num_bits_set(region: &mut [u8], num_bits_set: NumBitsSet) {
    LE::write_i64(&mut region[NUM_BITS_OFFSET..], num_bits_set.to_header());
}

pub(crate) fn word_offset(word_index: usize) -> usize {
    DATA_OFFSET + word_index * 8
}

pub(crate) fn read_word(region: &[u8], word_index: usize) -> u64 {
    LE::read_u64(&region[word_offset(word_index)..])
}

pub(crate) fn write_word(region: &mut [u8], word_index: usize, value: u64) {
    LE::write_u64(&mut region[word_offset(word_index)..], value);
}

/// Returns the data byte holding bit `index` and the mask selecting it within that byte.
pub(crate) fn byte_position(index: u64) -> (usize, u8) {
    (DATA_OFFSET + (index >> 3) as usize, 1u8 << (index & 7))
}

/// Returns the word holding bit `index` and the mask selecting it within that word.
pub(crate) fn word_position(index: u64) -> (usize, u64) {
    ((index >> 6) as usize, 1u64 << (index & 63))
}

pub(crate) fn count_bits_set(words: impl IntoIterator<Item = u64>) -> u64 {
    words.into_iter().map(|w| w.count_ones() as u64).sum()
}
