// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Fuzz-style regression tests for HEEP packet decoding.
// Author: Lukas Bower
#![forbid(unsafe_code)]

use std::panic::{catch_unwind, AssertUnwindSafe};

use heep_wire::{
    decode_request, encode_request, fuzz_decode, DeviceId, IpAddress, PacketWriter, Request,
    Vertex,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn fuzz_decode_mutated_requests() {
    let iterations = std::env::var("HEEP_FUZZ_ITERS")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(512);
    let mut rng = StdRng::seed_from_u64(0x4EE9_C0DE_u64);
    let object = [0x06, 1, 2, 3, 4, 2, b'h', b'i'];

    for _ in 0..iterations {
        let request = random_request(&mut rng, &object);
        let mut frame = Vec::new();
        let mut writer = PacketWriter::new(&mut frame, 512);
        encode_request(&mut writer, rng.random(), &request).expect("encode request");
        mutate_frame(&mut rng, &mut frame);
        let result = catch_unwind(AssertUnwindSafe(|| fuzz_decode(&frame)));
        assert!(result.is_ok(), "decoder panicked on mutated frame");
    }
}

#[test]
fn unmutated_requests_decode_to_themselves() {
    let mut rng = StdRng::seed_from_u64(7);
    let object = [0x06, 1, 2, 3, 4, 2, b'h', b'i'];
    for _ in 0..64 {
        let request = random_request(&mut rng, &object);
        let mut frame = Vec::new();
        let mut writer = PacketWriter::new(&mut frame, 512);
        encode_request(&mut writer, 3, &request).expect("encode request");
        assert_eq!(decode_request(&frame), Ok(request));
    }
}

#[test]
fn random_garbage_never_panics() {
    let mut rng = StdRng::seed_from_u64(0xBAD5EED);
    for _ in 0..1024 {
        let len = rng.random_range(0..48);
        let mut bytes = vec![0u8; len];
        rng.fill(&mut bytes[..]);
        fuzz_decode(&bytes);
    }
}

fn mutate_frame<R: Rng>(rng: &mut R, frame: &mut Vec<u8>) {
    if frame.len() < 2 {
        return;
    }
    match rng.random_range(0..3) {
        0 => {
            let new_len = rng.random_range(0..frame.len());
            frame.truncate(new_len);
        }
        1 => {
            let tail_len = rng.random_range(1..16);
            let mut tail = vec![0u8; tail_len];
            rng.fill(&mut tail[..]);
            frame.extend_from_slice(&tail);
        }
        _ => {
            let index = rng.random_range(0..frame.len());
            frame[index] ^= rng.random_range(1..=0xFF);
        }
    }
}

fn random_request<'a, R: Rng>(rng: &mut R, object: &'a [u8]) -> Request<'a> {
    let vertex = Vertex {
        tx_id: DeviceId::new(rng.random()),
        rx_id: DeviceId::new(rng.random()),
        tx_control: rng.random(),
        rx_control: rng.random(),
        rx_address: IpAddress::from_wire(rng.random()),
    };
    match rng.random_range(0..7) {
        0 => Request::IsHeepDevice,
        1 => Request::SetValue {
            control_id: rng.random(),
            value: rng.random(),
        },
        2 => Request::SetPosition {
            x: rng.random(),
            y: rng.random(),
        },
        3 => Request::SetVertex(vertex),
        4 => Request::DeleteVertex(vertex),
        5 => Request::AddMop {
            declared: object.len() as u8,
            object,
        },
        _ => Request::DeleteMop {
            declared: object.len() as u8,
            object,
        },
    }
}
