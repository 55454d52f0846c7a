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

use byteorder::ByteOrder;
use byteorder::LE;
use tracing::debug;

use super::array_length_for_bits;
use super::check_region;
use super::check_same_capacity;
use super::check_stored_count;
use super::count_bits_set;
use super::decode_array_length;
use super::required_bytes;
use super::word_offset;
use super::word_position;
use super::write_header;
use super::BitArray;
use super::NumBitsSet;
use super::Storage;
use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::error::Error;

/// A bit array that owns its words.
///
/// # Examples
///
/// ```
/// # use datasketches_bitarray::bitarray::BitArray;
/// # use datasketches_bitarray::bitarray::HeapBitArray;
/// let mut bits = HeapBitArray::new(100).unwrap();
/// assert_eq!(bits.capacity(), 128);
///
/// assert!(!bits.get_and_set_bit(5).unwrap());
/// assert!(bits.get_and_set_bit(5).unwrap());
/// assert_eq!(bits.num_bits_set(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapBitArray {
    num_bits_set: NumBitsSet,
    data: Vec<u64>,
}

impl HeapBitArray {
    /// Creates a zeroed bit array holding at least `num_bits` bits.
    ///
    /// # Errors
    ///
    /// Returns an error unless `0 < num_bits <= MAX_BITS`.
    pub fn new(num_bits: u64) -> Result<Self, Error> {
        let array_length = array_length_for_bits(num_bits)?;
        Ok(HeapBitArray {
            num_bits_set: NumBitsSet::Known(0),
            data: vec![0; array_length],
        })
    }

    /// Copies the words and cached count of any bit array into a new owned array.
    pub fn copy_from(other: &dyn BitArray) -> Self {
        let data = (0..other.array_length())
            .map(|i| other.get_long(i))
            .collect();
        let num_bits_set = match other.known_num_bits_set() {
            Some(n) => NumBitsSet::Known(n),
            None => NumBitsSet::Unknown,
        };
        HeapBitArray { num_bits_set, data }
    }

    /// Reads a bit array from its serialized form.
    ///
    /// When `is_empty` is set only the leading `array_length` word is read and every bit is
    /// zero. A stored count of `-1` is resolved by counting the words.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are truncated, declare an out-of-range length, or store a
    /// count larger than the capacity.
    pub fn heapify(bytes: &[u8], is_empty: bool) -> Result<Self, Error> {
        let mut cursor = SketchSlice::new(bytes);

        let raw_array_length = cursor
            .read_i32_le()
            .map_err(|_| Error::insufficient_data("array_length"))?;
        let array_length = decode_array_length(raw_array_length)?;
        let _unused = cursor
            .read_u32_le()
            .map_err(|_| Error::insufficient_data("unused"))?;

        if is_empty {
            debug!(array_length, "heapified empty bit array");
            return Ok(HeapBitArray {
                num_bits_set: NumBitsSet::Known(0),
                data: vec![0u64; array_length],
            });
        }

        let raw_num_bits_set = cursor
            .read_i64_le()
            .map_err(|_| Error::insufficient_data("num_bits_set"))?;
        // the declared words must be present before they are allocated
        let required = required_bytes(array_length);
        if bytes.len() < required {
            return Err(Error::insufficient_data(format!(
                "bit_array: requires {required} bytes, got {}",
                bytes.len()
            )));
        }
        let stored = check_stored_count(NumBitsSet::from_header(raw_num_bits_set), array_length)?;

        let mut data = vec![0u64; array_length];
        for word in &mut data {
            *word = cursor
                .read_u64_le()
                .map_err(|_| Error::insufficient_data("bit_array"))?;
        }

        let num_bits_set = match stored {
            NumBitsSet::Known(n) => n,
            NumBitsSet::Unknown => count_bits_set(data.iter().copied()),
        };
        debug!(array_length, num_bits_set, "heapified bit array");
        Ok(HeapBitArray {
            num_bits_set: NumBitsSet::Known(num_bits_set),
            data,
        })
    }

    /// Serializes the array. A stale count is written as `-1`.
    pub fn serialize(&self) -> Vec<u8> {
        serialize_words(&self.data, self.num_bits_set)
    }

    /// Writes the serialized form into the front of `dst`.
    ///
    /// # Errors
    ///
    /// Returns an error if `dst` is shorter than [`BitArray::serialized_size_bytes`].
    pub fn write_to(&self, dst: &mut [u8]) -> Result<(), Error> {
        check_region(required_bytes(self.data.len()), dst.len())?;
        write_header(dst, self.data.len(), self.num_bits_set);
        for (i, word) in self.data.iter().enumerate() {
            LE::write_u64(&mut dst[word_offset(i)..], *word);
        }
        Ok(())
    }

    /// Returns the words.
    pub fn words(&self) -> &[u64] {
        &self.data
    }

    /// Freezes this array, resolving its count.
    pub fn into_read_only(mut self) -> ReadOnlyHeapBitArray {
        let num_bits_set = self.num_bits_set();
        ReadOnlyHeapBitArray {
            num_bits_set,
            data: self.data.into_boxed_slice(),
        }
    }
}

impl BitArray for HeapBitArray {
    fn array_length(&self) -> usize {
        self.data.len()
    }

    fn get_bit(&self, index: u64) -> bool {
        let (word_index, mask) = word_position(index);
        (self.data[word_index] & mask) != 0
    }

    fn get_long(&self, word_index: usize) -> u64 {
        self.data[word_index]
    }

    fn num_bits_set(&mut self) -> u64 {
        match self.num_bits_set {
            NumBitsSet::Known(n) => n,
            NumBitsSet::Unknown => {
                let n = count_bits_set(self.data.iter().copied());
                self.num_bits_set = NumBitsSet::Known(n);
                n
            }
        }
    }

    fn known_num_bits_set(&self) -> Option<u64> {
        self.num_bits_set.known()
    }

    fn is_read_only(&self) -> bool {
        false
    }

    fn storage(&self) -> Storage {
        Storage::Owned
    }

    fn reset(&mut self) -> Result<(), Error> {
        self.data.fill(0);
        self.num_bits_set = NumBitsSet::Known(0);
        Ok(())
    }

    fn set_bit(&mut self, index: u64) -> Result<(), Error> {
        let (word_index, mask) = word_position(index);
        self.data[word_index] |= mask;
        self.num_bits_set = NumBitsSet::Unknown;
        Ok(())
    }

    fn get_and_set_bit(&mut self, index: u64) -> Result<bool, Error> {
        let (word_index, mask) = word_position(index);
        if (self.data[word_index] & mask) != 0 {
            return Ok(true);
        }
        self.data[word_index] |= mask;
        if let NumBitsSet::Known(n) = self.num_bits_set {
            self.num_bits_set = NumBitsSet::Known(n + 1);
        }
        Ok(false)
    }

    fn set_long(&mut self, word_index: usize, value: u64) -> Result<(), Error> {
        self.data[word_index] = value;
        self.num_bits_set = NumBitsSet::Unknown;
        Ok(())
    }

    fn intersect(&mut self, other: &dyn BitArray) -> Result<(), Error> {
        check_same_capacity(&*self, other)?;

        // Count bits during intersect operation (single pass)
        let mut num_bits_set = 0;
        for (i, word) in self.data.iter_mut().enumerate() {
            *word &= other.get_long(i);
            num_bits_set += word.count_ones() as u64;
        }
        self.num_bits_set = NumBitsSet::Known(num_bits_set);
        Ok(())
    }

    fn union(&mut self, other: &dyn BitArray) -> Result<(), Error> {
        check_same_capacity(&*self, other)?;

        // Count bits during union operation (single pass)
        let mut num_bits_set = 0;
        for (i, word) in self.data.iter_mut().enumerate() {
            *word |= other.get_long(i);
            num_bits_set += word.count_ones() as u64;
        }
        self.num_bits_set = NumBitsSet::Known(num_bits_set);
        Ok(())
    }

    fn invert(&mut self) -> Result<(), Error> {
        match self.num_bits_set {
            NumBitsSet::Known(n) => {
                for word in &mut self.data {
                    *word = !*word;
                }
                self.num_bits_set = NumBitsSet::Known(self.capacity() - n);
            }
            NumBitsSet::Unknown => {
                let mut num_bits_set = 0;
                for word in &mut self.data {
                    *word = !*word;
                    num_bits_set += word.count_ones() as u64;
                }
                self.num_bits_set = NumBitsSet::Known(num_bits_set);
            }
        }
        Ok(())
    }
}

/// An owned bit array that rejects every mutation.
///
/// The count is resolved at construction and never goes stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOnlyHeapBitArray {
    num_bits_set: u64,
    data: Box<[u64]>,
}

impl ReadOnlyHeapBitArray {
    /// Takes a frozen snapshot of any bit array.
    pub fn from_bit_array(other: &dyn BitArray) -> Self {
        HeapBitArray::copy_from(other).into_read_only()
    }

    /// Reads a read-only bit array from its serialized form.
    ///
    /// # Errors
    ///
    /// See [`HeapBitArray::heapify`].
    pub fn heapify(bytes: &[u8], is_empty: bool) -> Result<Self, Error> {
        HeapBitArray::heapify(bytes, is_empty).map(HeapBitArray::into_read_only)
    }

    /// Serializes the array.
    pub fn serialize(&self) -> Vec<u8> {
        serialize_words(&self.data, NumBitsSet::Known(self.num_bits_set))
    }

    /// Returns the words.
    pub fn words(&self) -> &[u64] {
        &self.data
    }
}

impl From<HeapBitArray> for ReadOnlyHeapBitArray {
    fn from(bits: HeapBitArray) -> Self {
        bits.into_read_only()
    }
}

impl BitArray for ReadOnlyHeapBitArray {
    fn array_length(&self) -> usize {
        self.data.len()
    }

    fn get_bit(&self, index: u64) -> bool {
        let (word_index, mask) = word_position(index);
        (self.data[word_index] & mask) != 0
    }

    fn get_long(&self, word_index: usize) -> u64 {
        self.data[word_index]
    }

    fn num_bits_set(&mut self) -> u64 {
        self.num_bits_set
    }

    fn known_num_bits_set(&self) -> Option<u64> {
        Some(self.num_bits_set)
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn storage(&self) -> Storage {
        Storage::Owned
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

fn serialize_words(data: &[u64], num_bits_set: NumBitsSet) -> Vec<u8> {
    let mut bytes = SketchBytes::with_capacity(required_bytes(data.len()));

    bytes.write_i32_le(data.len() as i32);
    bytes.write_u32_le(0); // unused
    bytes.write_i64_le(num_bits_set.to_header());
    for &word in data {
        bytes.write_u64_le(word);
    }

    bytes.into_bytes()
}
