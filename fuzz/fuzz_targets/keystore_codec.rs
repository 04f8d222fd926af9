#![no_main]

use bytes::BytesMut;
use keyfault_signing_proxy::KeystoreCodec;
use libfuzzer_sys::fuzz_target;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    let mut codec = KeystoreCodec::new(64 * 1024);
    let mut buf = BytesMut::from(data);

    // 크래시나 패닉 없이 프레임을 끝까지 소비하거나 Err을 반환해야 한다
    while let Ok(Some(frame)) = codec.decode(&mut buf) {
        assert!(frame.raw.len() >= 16);
        let _ = frame.error_reason(0xfe);
    }
});
