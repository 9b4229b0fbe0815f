// CLASSIFICATION: COMMUNITY
// Filename: engine_dispatch.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-19

use heep::clock::ManualClock;
use heep::compact::IdMode;
use heep::config::EngineConfig;
use heep::control::{Control, ControlDirection};
use heep::dispatch::messages;
use heep::wire::{decode_response, DeviceId, IpAddress, OpCode, Vertex};
use heep::{HeepEngine, Inbound};

const PEER: [u8; 4] = [0x1A, 0x2D, 0x40, 0x02];

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn engine_with(config: EngineConfig) -> HeepEngine<ManualClock> {
    init_logger();
    let mut engine = HeepEngine::new(config, ManualClock::new(0)).unwrap();
    engine
        .device_mut()
        .add_control(Control::range(1, "dimmer", ControlDirection::Input, 0, 100))
        .unwrap();
    engine
}

fn engine() -> HeepEngine<ManualClock> {
    engine_with(EngineConfig::default())
}

fn status(engine: &HeepEngine<ManualClock>) -> (OpCode, u8, String) {
    let response = decode_response(engine.output()).unwrap();
    (
        response.opcode,
        response.packet_id,
        response.message().unwrap().to_string(),
    )
}

fn mop(opcode: u8, packet_id: u8) -> Vec<u8> {
    let mut packet = vec![opcode, packet_id, 9, 0x06];
    packet.extend_from_slice(&PEER);
    packet.extend_from_slice(&[3, b'f', b'a', b'n']);
    packet
}

fn vertex_packet(opcode: u8) -> Vec<u8> {
    vec![
        opcode, 0x04, 0x0E, 0x01, 0x02, 0x03, 0x04, 0x1A, 0x2D, 0x40, 0x02, 0x01, 0x02, 0xC0,
        0xA8, 0x01, 0x14,
    ]
}

#[test]
fn set_value_within_range_updates_control() {
    let mut engine = engine();
    engine.dispatch(&[0x0A, 0x31, 0x02, 0x01, 55]).unwrap();
    assert_eq!(
        status(&engine),
        (OpCode::Success, 0x31, messages::VALUE_SET.to_string())
    );
    assert_eq!(engine.device().controls().get(1).unwrap().value, 55);
}

#[test]
fn set_value_out_of_range_is_refused() {
    let mut engine = engine();
    engine.dispatch(&[0x0A, 0x32, 0x03, 0x01, 0x01, 0x2C]).unwrap();
    assert_eq!(
        status(&engine),
        (OpCode::Error, 0x32, messages::FAILED_TO_SET.to_string())
    );
    assert_eq!(engine.device().controls().get(1).unwrap().value, 0);

    engine.dispatch(&[0x0A, 0x33, 0x02, 0x09, 1]).unwrap();
    assert_eq!(status(&engine).2, messages::FAILED_TO_SET);
}

#[test]
fn mop_delete_leaves_tombstone() {
    let mut engine = engine();
    engine.dispatch(&mop(0x13, 1)).unwrap();
    assert_eq!(status(&engine).2, messages::MOP_ADDED);
    let high_water = engine.device().memory().len();
    assert_eq!(high_water, 9);

    engine.dispatch(&mop(0x15, 2)).unwrap();
    assert_eq!(
        status(&engine),
        (OpCode::Success, 2, messages::MOP_DELETED.to_string())
    );
    assert_eq!(engine.device().memory().len(), high_water);
    let record = engine.device().memory().record_at(0).unwrap();
    assert!(record.is_fragment());
    assert_eq!(engine.device().memory().reclaimable_bytes(), 9);

    engine.dispatch(&[0x09, 3]).unwrap();
    let dump = engine.output();
    let tail = &dump[dump.len() - high_water..];
    assert_eq!(tail[0], OpCode::Fragment.as_u8());
    assert_eq!(&tail[1..5], &PEER);

    engine.dispatch(&mop(0x15, 4)).unwrap();
    assert_eq!(
        status(&engine),
        (OpCode::Error, 4, messages::MOP_NOT_FOUND.to_string())
    );
}

#[test]
fn short_mops_are_invalid() {
    let mut engine = engine();
    engine.dispatch(&[0x13, 5, 3, 0x06, 1, 2]).unwrap();
    assert_eq!(status(&engine).2, messages::MOP_ADD_INVALID);
    engine.dispatch(&[0x15, 6, 3, 0x06, 1, 2]).unwrap();
    assert_eq!(status(&engine).2, messages::MOP_DELETE_INVALID);
    assert!(engine.device().memory().is_empty());
}

#[test]
fn full_memory_refuses_mops() {
    let mut engine = engine_with(EngineConfig {
        memory_capacity: 16,
        ..EngineConfig::default()
    });
    engine.dispatch(&mop(0x13, 1)).unwrap();
    engine.dispatch(&mop(0x13, 2)).unwrap();
    assert_eq!(status(&engine).2, messages::MOP_ADD_NO_SPACE);
    assert_eq!(engine.device().memory().len(), 9);
}

#[test]
fn set_vertex_round_trip() {
    let mut engine = engine();
    engine.dispatch(&vertex_packet(0x0C)).unwrap();
    assert_eq!(
        status(&engine),
        (OpCode::Success, 0x04, messages::VERTEX_SET.to_string())
    );
    let expected = Vertex {
        tx_id: DeviceId::new([1, 2, 3, 4]),
        rx_id: DeviceId::new(PEER),
        tx_control: 1,
        rx_control: 2,
        rx_address: IpAddress::new(192, 168, 1, 20),
    };
    assert_eq!(engine.device().vertices().get(0), Some(&expected));
    assert_eq!(engine.device().vertices().len(), 1);
    assert_eq!(engine.device().memory().as_bytes()[0], OpCode::Vertex.as_u8());

    engine.dispatch(&vertex_packet(0x0D)).unwrap();
    assert_eq!(status(&engine).2, messages::VERTEX_DELETED);
    assert!(engine.device().vertices().is_empty());
    assert!(engine.device().memory().record_at(0).unwrap().is_fragment());

    engine.dispatch(&vertex_packet(0x0D)).unwrap();
    assert_eq!(
        status(&engine),
        (OpCode::Error, 0x04, messages::VERTEX_DELETE_FAILED.to_string())
    );
}

#[test]
fn indexed_mode_compacts_ids() {
    let mut engine = engine_with(EngineConfig {
        id_mode: IdMode::Indexed,
        ..EngineConfig::default()
    });
    engine.dispatch(&mop(0x13, 1)).unwrap();
    assert_eq!(status(&engine).2, messages::MOP_ADDED);
    let memory = engine.device().memory().as_bytes().to_vec();
    assert_eq!(
        memory,
        vec![
            0x16, 0, 4, 1, 2, 3, 4, 0x16, 1, 4, 0x1A, 0x2D, 0x40, 0x02, 0x06, 1, 3, b'f', b'a',
            b'n'
        ]
    );

    engine.dispatch(&[0x09, 2]).unwrap();
    let dump = engine.output();
    assert_eq!(&dump[7..11], &[0x01, 0, 1, 1]);

    engine.dispatch(&mop(0x15, 3)).unwrap();
    assert_eq!(status(&engine).2, messages::MOP_DELETED);
}

#[test]
fn responses_are_routed_to_acks() {
    let mut engine = engine();
    engine.dispatch(&[0x0A, 0x40, 0x02, 0x01, 10]).unwrap();
    engine.register_output().unwrap();
    assert!(engine.acks().in_flight(0x40));

    let stale = [0x10, 9, 9, 9, 9, 0x41, 0];
    assert_eq!(engine.handle_inbound(&stale).unwrap(), Inbound::Acknowledged(None));
    assert_eq!(engine.acks().len(), 1);

    let ack = [0x10, 9, 9, 9, 9, 0x40, 0];
    match engine.handle_inbound(&ack).unwrap() {
        Inbound::Acknowledged(Some(settled)) => assert_eq!(settled.opcode, 0x10),
        other => panic!("unexpected {other:?}"),
    }
    assert!(engine.acks().is_empty());

    match engine.handle_inbound(&[0x09, 0x42]).unwrap() {
        Inbound::Dispatched(dispatched) => {
            assert_eq!(dispatched.response, OpCode::MemoryDump);
            assert_eq!(dispatched.packet_id, 0x42);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn full_indexed_memory_stores_no_orphan_mapping() {
    let mut engine = engine_with(EngineConfig {
        id_mode: IdMode::Indexed,
        memory_capacity: 16,
        ..EngineConfig::default()
    });
    let before = engine.device().memory().as_bytes().to_vec();
    engine.dispatch(&mop(0x13, 1)).unwrap();
    assert_eq!(
        status(&engine),
        (OpCode::Error, 1, messages::MOP_ADD_NO_SPACE.to_string())
    );
    assert_eq!(engine.device().memory().as_bytes(), before.as_slice());

    engine.dispatch(&vertex_packet(0x0C)).unwrap();
    assert_eq!(status(&engine).2, messages::VERTEX_SET);
    assert_eq!(engine.device().vertices().len(), 1);
    assert_eq!(engine.device().memory().as_bytes(), before.as_slice());
}

#[test]
fn local_id_mappings_cannot_be_added_or_deleted() {
    let mut engine = engine_with(EngineConfig {
        id_mode: IdMode::Indexed,
        ..EngineConfig::default()
    });
    let before = engine.device().memory().as_bytes().to_vec();

    let mut forged = vec![0x13, 1, 10, 0x16];
    forged.extend_from_slice(&PEER);
    forged.extend_from_slice(&[4, 0xEE, 0xEE, 0xEE, 0xEE]);
    engine.dispatch(&forged).unwrap();
    assert_eq!(status(&engine).2, messages::MOP_ADD_INVALID);

    let own = [0x15, 2, 10, 0x16, 1, 2, 3, 4, 4, 1, 2, 3, 4];
    engine.dispatch(&own).unwrap();
    assert_eq!(status(&engine).2, messages::MOP_DELETE_INVALID);
    assert_eq!(engine.device().memory().as_bytes(), before.as_slice());

    engine.dispatch(&mop(0x13, 3)).unwrap();
    engine.dispatch(&[0x09, 4]).unwrap();
    let dump = engine.output();
    assert_eq!(&dump[7..11], &[0x01, 0, 1, 1]);
    let memory = engine.device().memory().as_bytes();
    assert_eq!(&memory[7..14], &[0x16, 1, 4, 0x1A, 0x2D, 0x40, 0x02]);
}
