#![no_main]

use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use squish_dds::dds::{Dds, Endian, Header};

fuzz_target!(|data: &[u8]| {
    let _result = Header::read(&mut Cursor::new(data), Endian::Little);
    let _result = Header::read(&mut Cursor::new(data), Endian::Big);

    if let Ok(dds) = Dds::read(&mut Cursor::new(data)) {
        if let Ok(surface) = dds.surface() {
            let _result = surface.decode_rgba8();
        }
    }
});
