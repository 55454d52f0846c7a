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

use super::array_length_for_bits;
use super::byte_position;
use super::check_region;
use super::check_same_capacity;
use super::check_stored_count;
use super::count_bits_set;
use super::read_array_length;
use super::read_num_bits_set;
use super::read_word;
use super::required_bytes;
use super::write_header;
use super::write_num_bits_set;
use super::write_word;
use super::BitArray;
use super::NumBitsSet;
use super::Storage;
use super::DATA_OFFSET;
use crate::error::Error;

/// A writable bit array living inside a caller-supplied byte region.
///
/// Header and words are read and written in place, and every count change is written back to
/// the header, so the region is a valid serialized bit array whenever a call returns. Only the
/// first [`BitArray::serialized_size_bytes`] bytes of the region are held; bytes past them are
/// never read or written, and indexing past the capacity panics as it does for owned arrays.
///
/// # Examples
///
/// ```
/// # use datasketches_bitarray::bitarray::BitArray;
/// # use datasketches_bitarray::bitarray::DirectBitArray;
/// let mut region = vec![0u8; 32];
/// let mut bits = DirectBitArray::initialize(128, &mut region).unwrap();
/// bits.get_and_set_bit(64).unwrap();
/// drop(bits);
///
/// let mut bits = DirectBitArray::writable_wrap(&mut region, false).unwrap();
/// assert!(bits.get_bit(64));
/// assert_eq!(bits.num_bits_set(), 1);
/// ```
#[derive(Debug)]
pub struct DirectBitArray<'a> {
    array_length: usize,
    num_bits_set: NumBitsSet,
    region: &'a mut [u8],
}

impl<'a> DirectBitArray<'a> {
    /// Formats `region` as an empty bit array holding at least `num_bits` bits.
    ///
    /// The header is written and the data words are zeroed; bytes past the data are untouched.
    ///
    /// # Errors
    ///
    /// Returns an error unless `0 < num_bits <= MAX_BITS`, or if `region` is too small.
    pub fn initialize(num_bits: u64, region: &'a mut [u8]) -> Result<Self, Error> {
        let array_length = array_length_for_bits(num_bits)?;
        let required = required_bytes(array_length);
        check_region(required, region.len())?;
        let (region, _) = region.split_at_mut(required);

        write_header(region, array_length, NumBitsSet::Known(0));
        region[DATA_OFFSET..required].fill(0);
        debug!(array_length, "initialized direct bit array");

        Ok(DirectBitArray {
            array_length,
            num_bits_set: NumBitsSet::Known(0),
            region,
        })
    }

    /// Wraps a serialized bit array for in-place modification.
    ///
    /// The stored count is taken as is; a stored `-1` is recomputed on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if `is_empty` is set, since an empty serialized array has no data
    /// region to write into, if the header is corrupt, or if `region` is too small.
    pub fn writable_wrap(region: &'a mut [u8], is_empty: bool) -> Result<Self, Error> {
        if is_empty {
            return Err(Error::invalid_argument(
                "cannot wrap an empty bit array as writable",
            ));
        }

        let array_length = read_array_length(region)?;
        let num_bits_set = check_stored_count(read_num_bits_set(region)?, array_length)?;
        let required = required_bytes(array_length);
        check_region(required, region.len())?;
        let (region, _) = region.split_at_mut(required);
        debug!(array_length, ?num_bits_set, "wrapped writable direct bit array");

        Ok(DirectBitArray {
            array_length,
            num_bits_set,
            region,
        })
    }

    /// Returns the serialized bytes of this array, a prefix of the wrapped region.
    pub fn as_bytes(&self) -> &[u8] {
        self.region
    }

    fn set_num_bits_set(&mut self, num_bits_set: NumBitsSet) {
        self.num_bits_set = num_bits_set;
        write_num_bits_set(self.region, num_bits_set);
    }
}

impl BitArray for DirectBitArray<'_> {
    fn array_length(&self) -> usize {
        self.array_length
    }

    fn get_bit(&self, index: u64) -> bool {
        let (offset, mask) = byte_position(index);
        (self.region[offset] & mask) != 0
    }

    fn get_long(&self, word_index: usize) -> u64 {
        read_word(self.region, word_index)
    }

    fn num_bits_set(&mut self) -> u64 {
        match self.num_bits_set {
            NumBitsSet::Known(n) => n,
            NumBitsSet::Unknown => {
                let region = &*self.region;
                let n = count_bits_set((0..self.array_length).map(|i| read_word(region, i)));
                self.set_num_bits_set(NumBitsSet::Known(n));
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
        Storage::External
    }

    fn reset(&mut self) -> Result<(), Error> {
        let end = required_bytes(self.array_length);
        self.region[DATA_OFFSET..end].fill(0);
        self.set_num_bits_set(NumBitsSet::Known(0));
        Ok(())
    }

    fn set_bit(&mut self, index: u64) -> Result<(), Error> {
        let (offset, mask) = byte_position(index);
        self.region[offset] |= mask;
        self.set_num_bits_set(NumBitsSet::Unknown);
        Ok(())
    }

    fn get_and_set_bit(&mut self, index: u64) -> Result<bool, Error> {
        let (offset, mask) = byte_position(index);
        if (self.region[offset] & mask) != 0 {
            return Ok(true);
        }
        self.region[offset] |= mask;
        if let NumBitsSet::Known(n) = self.num_bits_set {
            self.set_num_bits_set(NumBitsSet::Known(n + 1));
        }
        Ok(false)
    }

    fn set_long(&mut self, word_index: usize, value: u64) -> Result<(), Error> {
        write_word(self.region, word_index, value);
        self.set_num_bits_set(NumBitsSet::Unknown);
        Ok(())
    }

    fn intersect(&mut self, other: &dyn BitArray) -> Result<(), Error> {
        check_same_capacity(&*self, other)?;

        let mut num_bits_set = 0;
        for i in 0..self.array_length {
            let word = read_word(self.region, i) & other.get_long(i);
            write_word(self.region, i, word);
            num_bits_set += word.count_ones() as u64;
        }
        self.set_num_bits_set(NumBitsSet::Known(num_bits_set));
        Ok(())
    }

    fn union(&mut self, other: &dyn BitArray) -> Result<(), Error> {
        check_same_capacity(&*self, other)?;

        let mut num_bits_set = 0;
        for i in 0..self.array_length {
            let word = read_word(self.region, i) | other.get_long(i);
            write_word(self.region, i, word);
            num_bits_set += word.count_ones() as u64;
        }
        self.set_num_bits_set(NumBitsSet::Known(num_bits_set));
        Ok(())
    }

    fn invert(&mut self) -> Result<(), Error> {
        let num_bits_set = match self.num_bits_set {
            NumBitsSet::Known(n) => {
                for i in 0..self.array_length {
                    let word = !read_word(self.region, i);
                    write_word(self.region, i, word);
                }
                self.capacity() - n
            }
            NumBitsSet::Unknown => {
                let mut num_bits_set = 0;
                for i in 0..self.array_length {
                    let word = !read_word(self.region, i);
                    write_word(self.region, i, word);
                    num_bits_set += word.count_ones() as u64;
                }
                num_bits_set
            }
        };
        self.set_num_bits_set(NumBitsSet::Known(num_bits_set));
        Ok(())
    }
}
