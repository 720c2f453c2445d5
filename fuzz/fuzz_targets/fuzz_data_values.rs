#![no_main]
use geoipdb::data_section::DataDecoder;
use geoipdb::records::{read_record, CityRecord, Isp};
use geoipdb::TextMode;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    // First byte picks the text mode, the rest is a data section
    let mode = if data[0] & 1 == 0 {
        TextMode::PassThrough
    } else {
        TextMode::TransliterateToLatin1
    };
    let decoder = DataDecoder::new(&data[1..], mode);

    let _ = decoder.decode(0);
    let mut cursor = 0;
    let _ = read_record::<CityRecord>(&decoder, &mut cursor);
    let mut cursor = 0;
    let _ = read_record::<Isp>(&decoder, &mut cursor);
});
