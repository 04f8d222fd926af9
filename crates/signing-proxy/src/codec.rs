//! 키스토어 프레임 코덱
//!
//! 키스토어 채널은 길이 접두 프레임을 사용합니다.
//!
//! ```text
//! offset 0   u32 LE  프레임 전체 길이 (헤더 16바이트 포함)
//! offset 4   u32 LE  메시지 타입
//! offset 8   u64 LE  메시지 ID
//! offset 16  ...     페이로드
//! ```
//!
//! 프록시는 프레임을 해석하지 않고 원본 바이트([`KeystoreFrame::raw`])를 그대로 중계합니다.
//! 헤더는 정책 결정과 에러 응답 작성에만 사용됩니다.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use keyfault_core::config::FRAME_HEADER_LEN;

use crate::error::ProxyError;

/// 디코딩된 키스토어 프레임
///
/// `raw`는 헤더를 포함한 와이어 바이트 전체입니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeystoreFrame {
    /// 메시지 타입
    pub msg_type: u32,
    /// 메시지 ID (요청-응답 짝맞춤)
    pub msg_id: u64,
    /// 와이어 바이트 전체
    pub raw: Bytes,
}

impl KeystoreFrame {
    /// 헤더를 붙여 새 프레임을 만듭니다.
    pub fn new(msg_type: u32, msg_id: u64, payload: &[u8]) -> Self {
        let total = FRAME_HEADER_LEN + payload.len();
        let mut buf = BytesMut::with_capacity(total);
        // u32 범위를 넘는 프레임은 max_frame_len 검증에서 먼저 걸러집니다.
        buf.put_u32_le(total as u32);
        buf.put_u32_le(msg_type);
        buf.put_u64_le(msg_id);
        buf.put_slice(payload);
        Self {
            msg_type,
            msg_id,
            raw: buf.freeze(),
        }
    }

    /// 헤더 이후의 페이로드
    pub fn payload(&self) -> &[u8] {
        self.raw.get(FRAME_HEADER_LEN..).unwrap_or_default()
    }

    /// 키스토어 형식의 에러 응답
    ///
    /// 페이로드는 u64 LE 길이 + UTF-8 사유입니다.
    pub fn error_response(msg_id: u64, reason: &str, error_type: u32) -> Self {
        let mut payload = BytesMut::with_capacity(8 + reason.len());
        payload.put_u64_le(reason.len() as u64);
        payload.put_slice(reason.as_bytes());
        Self::new(error_type, msg_id, &payload)
    }

    /// 에러 응답 페이로드에서 사유를 읽습니다.
    ///
    /// 타입이 다르거나 페이로드가 손상되었으면 `None`을 반환합니다.
    pub fn error_reason(&self, error_type: u32) -> Option<String> {
        if self.msg_type != error_type {
            return None;
        }
        let mut payload = self.payload();
        if payload.len() < 8 {
            return None;
        }
        let len = usize::try_from(payload.get_u64_le()).ok()?;
        let reason = payload.get(..len)?;
        String::from_utf8(reason.to_vec()).ok()
    }
}

/// 길이 접두 키스토어 프레임 코덱
#[derive(Debug, Clone)]
pub struct KeystoreCodec {
    max_frame_len: usize,
}

impl KeystoreCodec {
    /// 최대 프레임 크기를 지정해 코덱을 생성합니다.
    pub fn new(max_frame_len: usize) -> Self {
        Self { max_frame_len }
    }

    /// 최대 프레임 크기
    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }
}

impl Decoder for KeystoreCodec {
    type Item = KeystoreFrame;
    type Error = ProxyError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < 4 {
            return Ok(None);
        }

        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&src[..4]);
        let len = u32::from_le_bytes(len_bytes) as usize;

        if len < FRAME_HEADER_LEN {
            return Err(ProxyError::FrameTooShort {
                len,
                min: FRAME_HEADER_LEN,
            });
        }
        if len > self.max_frame_len {
            return Err(ProxyError::FrameTooLarge {
                len,
                max: self.max_frame_len,
            });
        }

        if src.len() < len {
            src.reserve(len - src.len());
            return Ok(None);
        }

        let raw = src.split_to(len).freeze();
        let mut header = &raw[4..FRAME_HEADER_LEN];
        let msg_type = header.get_u32_le();
        let msg_id = header.get_u64_le();

        Ok(Some(KeystoreFrame {
            msg_type,
            msg_id,
            raw,
        }))
    }
}

impl Encoder<KeystoreFrame> for KeystoreCodec {
    type Error = ProxyError;

    fn encode(&mut self, item: KeystoreFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&item.raw);
        Ok(())
    }
}
