#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|surface: squish_dds::Surface<Vec<u8>>| {
    let _result = surface.decode_rgba8();
});
