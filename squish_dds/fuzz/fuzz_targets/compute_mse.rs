#![no_main]

use libfuzzer_sys::fuzz_target;

type Input = (
    squish_dds::SurfaceRgba8<Vec<u8>>,
    squish_dds::Surface<Vec<u8>>,
);

fuzz_target!(|input: Input| {
    let (rgba, surface) = input;
    let _result = rgba.compute_mse(&surface);
});
