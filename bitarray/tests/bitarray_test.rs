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

//! Bit Array Contract Integration Tests
//!
//! Every variant is driven through `&mut dyn BitArray` so the same expectations hold for
//! owned and external storage alike.

use datasketches_bitarray::bitarray::BitArray;
use datasketches_bitarray::bitarray::DirectBitArray;
use datasketches_bitarray::bitarray::HeapBitArray;
use datasketches_bitarray::bitarray::ReadOnlyDirectBitArray;
use datasketches_bitarray::bitarray::ReadOnlyHeapBitArray;
use datasketches_bitarray::bitarray::Storage;
use datasketches_bitarray::bitarray::MAX_BITS;
use datasketches_bitarray::error::ErrorKind;
use googletest::assert_that;
use googletest::prelude::eq;

fn words_of(bits: &dyn BitArray) -> Vec<u64> {
    (0..bits.array_length()).map(|i| bits.get_long(i)).collect()
}

fn check_writable(bits: &mut dyn BitArray) {
    assert!(!bits.is_read_only());
    assert_eq!(bits.capacity(), 128);
    assert_eq!(bits.array_length(), 2);
    assert!(bits.is_empty());

    for i in [0, 63, 64, 127] {
        bits.set_bit(i).unwrap();
    }
    assert!(bits.is_dirty());
    assert_that!(bits.num_bits_set(), eq(4_u64));
    assert!(bits.get_bit(63));
    assert!(!bits.get_bit(65));
    assert_eq!(words_of(&*bits), vec![1u64 | (1 << 63), 1 | (1 << 63)]);

    assert!(bits.get_and_set_bit(63).unwrap());
    assert!(!bits.get_and_set_bit(65).unwrap());
    assert_eq!(bits.known_num_bits_set(), Some(5));

    bits.reset().unwrap();
    assert!(bits.is_empty());
    assert!(!bits.get_bit(0));
    assert_eq!(words_of(&*bits), vec![0, 0]);
}

#[test]
fn test_heap_contract() {
    let mut bits = HeapBitArray::new(128).unwrap();
    assert_eq!(bits.storage(), Storage::Owned);
    assert!(!bits.has_memory());
    check_writable(&mut bits);
}

#[test]
fn test_direct_contract() {
    let mut region = vec![0u8; 32];
    let mut bits = DirectBitArray::initialize(128, &mut region).unwrap();
    assert_eq!(bits.storage(), Storage::External);
    assert!(bits.has_memory());
    check_writable(&mut bits);
}

#[test]
fn test_initialize_rounds_up_to_words() {
    for (num_bits, capacity) in [(1, 64), (64, 64), (65, 128), (1000, 1024)] {
        let mut heap = HeapBitArray::new(num_bits).unwrap();
        assert_eq!(heap.capacity(), capacity);
        assert!(heap.is_empty());
        assert_eq!(heap.num_bits_set(), 0);

        let mut region = vec![0u8; heap.serialized_size_bytes()];
        let mut direct = DirectBitArray::initialize(num_bits, &mut region).unwrap();
        assert_eq!(direct.capacity(), capacity);
        assert!(direct.is_empty());
    }
}

#[test]
fn test_initialize_rejects_out_of_range() {
    for num_bits in [0, MAX_BITS + 1, u64::MAX] {
        let err = HeapBitArray::new(num_bits).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let mut region = vec![0u8; 64];
        let err = DirectBitArray::initialize(num_bits, &mut region).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_read_only_variants_reject_mutation() {
    let mut source = HeapBitArray::new(128).unwrap();
    source.get_and_set_bit(10).unwrap();
    let bytes = source.serialize();
    let other = HeapBitArray::new(128).unwrap();

    let mut frozen = ReadOnlyHeapBitArray::from_bit_array(&source);
    let mut view = ReadOnlyDirectBitArray::wrap(&bytes, false).unwrap();
    let mut empty_view = ReadOnlyDirectBitArray::wrap(&bytes, true).unwrap();

    let variants: [&mut dyn BitArray; 3] = [&mut frozen, &mut view, &mut empty_view];
    for bits in variants {
        assert!(bits.is_read_only());
        let attempts = [
            ("reset", bits.reset().unwrap_err()),
            ("set_bit", bits.set_bit(0).unwrap_err()),
            ("get_and_set_bit", bits.get_and_set_bit(0).unwrap_err()),
            ("set_long", bits.set_long(0, 1).unwrap_err()),
            ("intersect", bits.intersect(&other).unwrap_err()),
            ("union", bits.union(&other).unwrap_err()),
            ("invert", bits.invert().unwrap_err()),
        ];
        for (operation, err) in attempts {
            assert_eq!(err.kind(), ErrorKind::ReadOnly);
            assert_eq!(err.context("operation"), Some(operation));
        }
        assert!(!bits.is_dirty());
    }

    assert_eq!(bytes, source.serialize());
    assert!(frozen.get_bit(10));
    assert!(!frozen.get_bit(0));
}

#[test]
fn test_capacity_mismatch_mutates_neither() {
    let mut small = HeapBitArray::new(64).unwrap();
    small.get_and_set_bit(1).unwrap();
    let mut region = vec![0u8; 32];
    let mut large = DirectBitArray::initialize(128, &mut region).unwrap();
    large.get_and_set_bit(100).unwrap();

    let small_before = small.clone();
    let large_before = large.as_bytes().to_vec();

    let err = small.union(&large).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(err.context("capacity"), Some("64"));
    assert_eq!(err.context("other_capacity"), Some("128"));
    let err = small.intersect(&large).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    let err = large.union(&small).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    let err = large.intersect(&small).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    assert_eq!(small, small_before);
    assert_eq!(large.as_bytes(), large_before.as_slice());
}

#[test]
fn test_union_and_intersect_across_storage() {
    let mut heap = HeapBitArray::new(128).unwrap();
    for i in [1, 2, 70] {
        heap.get_and_set_bit(i).unwrap();
    }
    let mut region = vec![0u8; 32];
    let mut direct = DirectBitArray::initialize(128, &mut region).unwrap();
    for i in [2, 70, 127] {
        direct.get_and_set_bit(i).unwrap();
    }

    let mut intersection = heap.clone();
    intersection.intersect(&direct).unwrap();
    assert_eq!(intersection.known_num_bits_set(), Some(2));
    assert!(intersection.get_bit(2));
    assert!(intersection.get_bit(70));
    assert!(!intersection.get_bit(1));

    direct.union(&heap).unwrap();
    assert_eq!(direct.known_num_bits_set(), Some(4));
    for i in [1, 2, 70, 127] {
        assert!(direct.get_bit(i));
    }

    // a read-only view works as the other operand
    let frozen = ReadOnlyHeapBitArray::from_bit_array(&direct);
    heap.union(&frozen).unwrap();
    assert_eq!(heap.known_num_bits_set(), Some(4));
}

#[test]
fn test_empty_view_as_operand() {
    let header = 2i32.to_le_bytes().into_iter().chain([0; 4]).collect::<Vec<u8>>();
    let empty = ReadOnlyDirectBitArray::wrap(&header, true).unwrap();

    let mut bits = HeapBitArray::new(128).unwrap();
    bits.get_and_set_bit(5).unwrap();
    bits.union(&empty).unwrap();
    assert_eq!(bits.known_num_bits_set(), Some(1));
    bits.intersect(&empty).unwrap();
    assert_eq!(bits.known_num_bits_set(), Some(0));
}

#[test]
fn test_set_long_marks_dirty() {
    let mut region = vec![0u8; 24];
    let mut direct = DirectBitArray::initialize(64, &mut region).unwrap();
    direct.set_long(0, 0xFF00).unwrap();
    assert!(direct.is_dirty());
    assert!(direct.get_bit(8));
    assert!(!direct.get_bit(7));
    assert_eq!(direct.num_bits_set(), 8);
}

#[test]
fn test_copy_from_keeps_dirty_state() {
    let mut region = vec![0u8; 24];
    let mut direct = DirectBitArray::initialize(64, &mut region).unwrap();
    direct.set_bit(9).unwrap();

    let mut copy = HeapBitArray::copy_from(&direct);
    assert!(copy.is_dirty());
    assert_eq!(copy.num_bits_set(), 1);
    assert_eq!(copy.words(), &[1u64 << 9]);
}
