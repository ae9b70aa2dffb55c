#![no_main]

use libfuzzer_sys::fuzz_target;

type Input = (squish_dds::SurfaceRgba8<Vec<u8>>, squish_dds::Format);

fuzz_target!(|input: Input| {
    let (surface, format) = input;
    let _result = surface.encode(format, None);
});
