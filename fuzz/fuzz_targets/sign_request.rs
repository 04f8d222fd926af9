#![no_main]

use arbitrary::Arbitrary;
use bytes::BytesMut;
use keyfault_signing_proxy::{KeystoreCodec, KeystoreFrame, SigningRequest};
use libfuzzer_sys::fuzz_target;
use tokio_util::codec::Decoder;

#[derive(Debug, Arbitrary)]
struct FuzzFrame {
    msg_type: u32,
    msg_id: u64,
    payload: Vec<u8>,
}

fuzz_target!(|input: FuzzFrame| {
    let frame = KeystoreFrame::new(input.msg_type, input.msg_id, &input.payload);

    // 인코딩한 프레임은 같은 헤더로 다시 디코딩되어야 한다
    let mut codec = KeystoreCodec::new(usize::MAX);
    let mut buf = BytesMut::from(&frame.raw[..]);
    let decoded = codec
        .decode(&mut buf)
        .expect("well-formed frame")
        .expect("complete frame");
    assert_eq!(decoded.msg_id, input.msg_id);
    assert_eq!(decoded.payload(), &input.payload[..]);

    // 키 추출은 페이로드 길이만으로 결정된다
    let request = SigningRequest::from_frame(&decoded, input.msg_type);
    assert_eq!(request.is_some(), input.payload.len() >= 32);
});
