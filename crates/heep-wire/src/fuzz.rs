// Author: Lukas Bower
// Purpose: Provide a fuzz corpus harness for HEEP packet decoding.

//! Fuzz corpus harnesses for HEEP packet decoding.

use crate::{decode_request, decode_response, packet_id_of};

/// Exercise decoder paths on arbitrary corpus bytes.
pub fn fuzz_decode(bytes: &[u8]) {
    let _ = decode_request(bytes);
    let _ = decode_response(bytes);
    let _ = packet_id_of(bytes);
}
