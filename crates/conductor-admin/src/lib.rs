//! 컨덕터 관리 RPC 클라이언트
//!
//! 시나리오 드라이버는 [`ConductorAdmin`] trait에 맞춰 작성되며,
//! [`AdminWebsocket`]이 컨덕터의 msgpack 웹소켓 위에서 이를 구현합니다.
//!
//! # 와이어 계층
//!
//! ```text
//! websocket binary message
//!   └─ WireMessage { type: request|response|signal, id, data: bin }
//!        └─ AdminRequest / AdminResponse { type: <op>, data: <payload> }
//! ```

pub mod client;
pub mod error;
pub mod types;
pub mod websocket;
pub mod wire;

pub use client::ConductorAdmin;
pub use error::AdminError;
pub use types::{AppInfo, AppStatus, InstallAppBundle};
pub use websocket::AdminWebsocket;
pub use wire::{AdminRequest, AdminResponse, ExternalApiWireError, WireMessage};
