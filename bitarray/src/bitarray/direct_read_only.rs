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

use tracing::debug;

use super::byte_position;
use super::check_region;
use super::check_stored_count;
use super::count_bits_set;
use super::read_array_length;
use super::read_num_bits_set;
use super::read_word;
use super::required_bytes;
use super::BitArray;
use super::NumBitsSet;
use super::Storage;
use super::EMPTY_HEADER_BYTES;
use crate::error::Error;

/// A read-only view of a serialized bit array inside a caller-supplied byte region.
///
/// The view never writes to the region, so any number of views over the same bytes may be
/// shared across threads. A view opened as empty, or over a zero-count header with no data
/// region behind it, reads every bit as zero. Otherwise only the first
/// [`BitArray::serialized_size_bytes`] bytes are held and indexing past the capacity panics.
#[derive(Debug, Clone, Copy)]
pub struct ReadOnlyDirectBitArray<'a> {
    array_length: usize,
    num_bits_set: u64,
    is_empty: bool,
    has_data: bool,
    region: &'a [u8],
}

impl<'a> ReadOnlyDirectBitArray<'a> {
    /// Wraps a serialized bit array.
    ///
    /// With `is_empty` only the 8-byte `array_length` header word is required. Otherwise a
    /// stored `-1` count is resolved here by counting the words.
    ///
    /// # Errors
    ///
    /// Returns an error if the declared length exceeds `MAX_BITS`, if the stored count exceeds
    /// the capacity, or if the region cannot hold the header, or the data when a non-zero count
    /// is stored.
    ///
    /// # Examples
    ///
    /// ```
    /// # use datasketches_bitarray::bitarray::BitArray;
    /// # use datasketches_bitarray::bitarray::ReadOnlyDirectBitArray;
    /// // array_length = 4 words, and nothing else
    /// let header = [4, 0, 0, 0, 0, 0, 0, 0];
    /// let mut bits = ReadOnlyDirectBitArray::wrap(&header, true).unwrap();
    /// assert_eq!(bits.capacity(), 256);
    /// assert!(bits.is_empty());
    /// assert!(!bits.get_bit(255));
    /// ```
    pub fn wrap(region: &'a [u8], is_empty: bool) -> Result<Self, Error> {
        let array_length = read_array_length(region)?;

        if is_empty {
            debug!(array_length, "wrapped empty read-only direct bit array");
            return Ok(ReadOnlyDirectBitArray {
                array_length,
                num_bits_set: 0,
                is_empty,
                has_data: false,
                region: &region[..EMPTY_HEADER_BYTES],
            });
        }

        let stored = check_stored_count(read_num_bits_set(region)?, array_length)?;
        let required = required_bytes(array_length);
        if stored != NumBitsSet::Known(0) {
            check_region(required, region.len())?;
        }
        let has_data = region.len() >= required;
        let region = &region[..required.min(region.len())];
        let num_bits_set = match stored {
            NumBitsSet::Known(n) => n,
            NumBitsSet::Unknown => {
                count_bits_set((0..array_length).map(|i| read_word(region, i)))
            }
        };
        debug!(array_length, num_bits_set, "wrapped read-only direct bit array");

        Ok(ReadOnlyDirectBitArray {
            array_length,
            num_bits_set,
            is_empty,
            has_data,
            region,
        })
    }

    /// Returns whether this view was opened over an empty serialized array.
    pub fn is_empty_region(&self) -> bool {
        self.is_empty
    }

    /// Returns the serialized bytes this view reads, a prefix of the wrapped region.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.region
    }
}

impl BitArray for ReadOnlyDirectBitArray<'_> {
    fn array_length(&self) -> usize {
        self.array_length
    }

    fn get_bit(&self, index: u64) -> bool {
        if !self.has_data {
            return false;
        }
        let (offset, mask) = byte_position(index);
        (self.region[offset] & mask) != 0
    }

    fn get_long(&self, word_index: usize) -> u64 {
        if !self.has_data {
            return 0;
        }
        read_word(self.region, word_index)
    }

    fn num_bits_set(&mut self) -> u64 {
        self.num_bits_set
    }

    fn known_num_bits_set(&self) -> Option<u64> {
        Some(self.num_bits_set)
    }

    fn is_empty(&mut self) -> bool {
        self.is_empty || self.num_bits_set == 0
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn storage(&self) -> Storage {
        Storage::External
    }

    fn reset(&mut self) -> Result<(), Error> {
        Err(Error::read_only("reset"))
    }

    fn set_bit(&mut self, _index: u64) -> Result<(), Error> {
        Err(Error::read_only("set_bit"))
    }

    fn get_and_set_bit(&mut self, _index: u64) -> Result<bool, Error> {
        Err(Error::read_only("get_and_set_bit"))
    }

    fn set_long(&mut self, _word_index: usize, _value: u64) -> Result<(), Error> {
        Err(Error::read_only("set_long"))
    }

    fn intersect(&mut self, _other: &dyn BitArray) -> Result<(), Error> {
        Err(Error::read_only("intersect"))
    }

    fn union(&mut self, _other: &dyn BitArray) -> Result<(), Error> {
        Err(Error::read_only("union"))
    }

    fn invert(&mut self) -> Result<(), Error> {
        Err(Error::read_only("invert"))
    }
}
