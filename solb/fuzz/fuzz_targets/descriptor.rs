#![no_main]
use std::io::Cursor;
use std::path::PathBuf;

use libfuzzer_sys::fuzz_target;
use solb::msbuild::Descriptor;

fuzz_target!(|data: &[u8]| {
    for path in ["/src/App/App.csproj", "/src/Bridge/Bridge.net472.vcxproj"] {
        let _ = Descriptor::from_reader(PathBuf::from(path), Cursor::new(data));
    }
});
