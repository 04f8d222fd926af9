//! 서명 프록시 — 수락 루프와 연결별 중계
//!
//! [`SigningProxy::start`]는 Unix 소켓에 바인드하고 수락 루프를 띄웁니다.
//! 연결마다 별도 태스크가 클라이언트 프레임을 읽어 [`SigningPolicy`]에 묻고,
//! 전달이면 업스트림으로, 거부면 에러 프레임으로 응답합니다.
//!
//! 업스트림 연결은 전달할 첫 프레임에서 지연 생성되며 클라이언트 연결당 하나입니다.
//! [`ProxyHandle::stop`]은 모든 태스크가 끝날 때까지 기다린 뒤 소켓 파일을 지웁니다.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use keyfault_core::error::KeyfaultError;
use keyfault_core::lifecycle::Component;

use crate::codec::{KeystoreCodec, KeystoreFrame};
use crate::config::{ProxyConfig, WireConfig};
use crate::error::ProxyError;
use crate::policy::{Decision, SigningPolicy, SigningRequest};
use crate::stats::{ProxyStats, ProxyStatsSnapshot};

/// accept 실패 후 재시도 전 대기
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// 프레임 하나의 처리 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningOutcome {
    /// 업스트림으로 중계함 (업스트림의 에러 응답도 그대로 중계됨)
    Forwarded,
    /// 업스트림에 닿지 못해 에러 프레임으로 응답함
    ForwardFailed(String),
    /// 정책 거부로 에러 프레임을 돌려줌 (업스트림 미접촉)
    Synthetic(String),
}

/// 서명 프록시 진입점
pub struct SigningProxy;

impl SigningProxy {
    /// 프록시를 시작합니다.
    ///
    /// `listen` 경로의 오래된 소켓 파일을 지우고 새로 바인드합니다.
    pub async fn start<P>(config: ProxyConfig, policy: P) -> Result<ProxyHandle, ProxyError>
    where
        P: SigningPolicy + 'static,
    {
        let listener = bind_listener(&config.listen).await?;
        info!(
            listen = %config.listen.display(),
            upstream = %config.upstream.display(),
            "signing proxy listening"
        );

        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();
        let stats = Arc::new(ProxyStats::default());
        let ctx = Arc::new(ConnectionContext {
            upstream: config.upstream.clone(),
            wire: config.wire,
            policy: Arc::new(policy),
            stats: Arc::clone(&stats),
        });

        tracker.spawn(accept_loop(listener, ctx, cancel.clone(), tracker.clone()));

        Ok(ProxyHandle {
            local_path: config.listen,
            cancel,
            tracker,
            stats,
            socket_removed: AtomicBool::new(false),
        })
    }
}

/// 실행 중인 프록시 핸들
pub struct ProxyHandle {
    local_path: PathBuf,
    cancel: CancellationToken,
    tracker: TaskTracker,
    stats: Arc<ProxyStats>,
    socket_removed: AtomicBool,
}

impl ProxyHandle {
    /// 프록시가 바인드한 소켓 경로
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// 현재 카운터 값
    pub fn stats(&self) -> ProxyStatsSnapshot {
        self.stats.snapshot()
    }

    /// stop()이 호출되었는지 확인합니다.
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// 프록시를 정지합니다.
    ///
    /// 수락 루프와 모든 연결 태스크가 끝난 뒤 소켓 파일을 지웁니다.
    /// 여러 번 호출해도 안전합니다.
    pub async fn stop(&self) -> Result<(), ProxyError> {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;

        if self.socket_removed.load(Ordering::SeqCst) {
            return Ok(());
        }

        // 제거에 성공했거나 이미 없을 때만 완료로 표시
        match tokio::fs::remove_file(&self.local_path).await {
            Ok(()) => self.socket_removed.store(true, Ordering::SeqCst),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.socket_removed.store(true, Ordering::SeqCst);
            }
            Err(e) => {
                return Err(ProxyError::Cleanup {
                    path: self.local_path.display().to_string(),
                    reason: e.to_string(),
                });
            }
        }

        let stats = self.stats.snapshot();
        info!(
            listen = %self.local_path.display(),
            connections = stats.connections_accepted,
            forwarded = stats.frames_forwarded,
            synthetic = stats.synthetic_failures,
            forward_failures = stats.forward_failures,
            "signing proxy stopped"
        );
        Ok(())
    }
}

impl Drop for ProxyHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Component for ProxyHandle {
    fn name(&self) -> &str {
        "signing-proxy"
    }

    async fn shutdown(&self) -> Result<(), KeyfaultError> {
        self.stop().await.map_err(KeyfaultError::from)
    }
}

async fn bind_listener(listen: &Path) -> Result<UnixListener, ProxyError> {
    let bind_err = |reason: String| ProxyError::Bind {
        path: listen.display().to_string(),
        reason,
    };

    if let Some(parent) = listen.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| bind_err(format!("cannot create parent directory: {e}")))?;
    }

    match tokio::fs::remove_file(listen).await {
        Ok(()) => debug!(listen = %listen.display(), "removed stale proxy socket"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(bind_err(format!("cannot remove stale socket: {e}"))),
    }

    UnixListener::bind(listen).map_err(|e| bind_err(e.to_string()))
}

/// 연결 태스크가 공유하는 상태
struct ConnectionContext {
    upstream: PathBuf,
    wire: WireConfig,
    policy: Arc<dyn SigningPolicy>,
    stats: Arc<ProxyStats>,
}

type ClientSink = FramedWrite<OwnedWriteHalf, KeystoreCodec>;

/// 업스트림 키스토어 연결
struct Upstream {
    rx: FramedRead<OwnedReadHalf, KeystoreCodec>,
    tx: FramedWrite<OwnedWriteHalf, KeystoreCodec>,
}

impl Upstream {
    async fn connect(path: &Path, codec: &KeystoreCodec) -> Result<Self, ProxyError> {
        let stream = UnixStream::connect(path).await?;
        let (rd, wr) = stream.into_split();
        Ok(Self {
            rx: FramedRead::new(rd, codec.clone()),
            tx: FramedWrite::new(wr, codec.clone()),
        })
    }
}

async fn accept_loop(
    listener: UnixListener,
    ctx: Arc<ConnectionContext>,
    cancel: CancellationToken,
    tracker: TaskTracker,
) {
    let mut next_conn_id: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("signing proxy accept loop received shutdown signal");
                break;
            }
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        next_conn_id += 1;
                        let conn_id = next_conn_id;
                        ctx.stats.record_connection();
                        debug!(conn_id, "accepted keystore client connection");

                        let ctx = Arc::clone(&ctx);
                        let cancel = cancel.clone();
                        tracker.spawn(async move {
                            if let Err(e) = handle_connection(conn_id, stream, ctx, cancel).await {
                                warn!(conn_id, error = %e, "keystore client connection closed with error");
                            }
                        });
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to accept keystore client connection");
                        tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                    }
                }
            }
        }
    }
}

async fn handle_connection(
    conn_id: u64,
    client: UnixStream,
    ctx: Arc<ConnectionContext>,
    cancel: CancellationToken,
) -> Result<(), ProxyError> {
    let codec = KeystoreCodec::new(ctx.wire.max_frame_len);
    let (client_rd, client_wr) = client.into_split();
    let mut client_rx = FramedRead::new(client_rd, codec.clone());
    let mut client_tx = FramedWrite::new(client_wr, codec.clone());
    let mut upstream: Option<Upstream> = None;
    // 업스트림 응답을 아직 받지 못한 전달 프레임 수
    let mut outstanding: usize = 0;
    let mut client_open = true;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(conn_id, "connection handler received shutdown signal");
                break;
            }
            reply = next_upstream_frame(&mut upstream) => {
                match reply {
                    Some(Ok(frame)) => {
                        client_tx.send(frame).await?;
                        outstanding = outstanding.saturating_sub(1);
                        if !client_open && outstanding == 0 {
                            debug!(conn_id, "all pending upstream replies relayed");
                            break;
                        }
                    }
                    Some(Err(e)) => return Err(e),
                    None => {
                        debug!(conn_id, "upstream keystore closed the connection");
                        break;
                    }
                }
            }
            frame = client_rx.next(), if client_open => {
                match frame {
                    Some(Ok(frame)) => {
                        let msg_id = frame.msg_id;
                        let Some(outcome) = ctx
                            .relay(conn_id, frame, &codec, &mut upstream, &mut client_tx, &cancel)
                            .await?
                        else {
                            break;
                        };
                        match outcome {
                            SigningOutcome::Forwarded => outstanding += 1,
                            // 업스트림 연결이 버려졌으므로 대기 중인 응답도 없음
                            SigningOutcome::ForwardFailed(_) => outstanding = 0,
                            SigningOutcome::Synthetic(_) => {}
                        }
                        ctx.record(conn_id, msg_id, &outcome);
                    }
                    Some(Err(e)) => return Err(e),
                    None => {
                        debug!(conn_id, outstanding, "keystore client closed its write side");
                        if upstream.is_none() || outstanding == 0 {
                            break;
                        }
                        client_open = false;
                    }
                }
            }
        }
    }

    // 클라이언트 쪽 쓰기 절반을 닫아 EOF를 알림
    if let Err(e) = client_tx.close().await {
        debug!(conn_id, error = %e, "failed to close keystore client write half");
    }
    Ok(())
}

async fn next_upstream_frame(
    upstream: &mut Option<Upstream>,
) -> Option<Result<KeystoreFrame, ProxyError>> {
    match upstream {
        Some(link) => link.rx.next().await,
        None => std::future::pending().await,
    }
}

impl ConnectionContext {
    /// 프레임 하나를 처리합니다.
    ///
    /// 취소된 뒤에는 전달하지 않고 `None`을 반환합니다.
    async fn relay(
        &self,
        conn_id: u64,
        frame: KeystoreFrame,
        codec: &KeystoreCodec,
        upstream: &mut Option<Upstream>,
        client_tx: &mut ClientSink,
        cancel: &CancellationToken,
    ) -> Result<Option<SigningOutcome>, ProxyError> {
        let decision = match SigningRequest::from_frame(&frame, self.wire.sign_request_type) {
            Some(request) => {
                let decision = self.policy.decide(&request);
                debug!(
                    conn_id,
                    msg_id = request.msg_id,
                    agent = %request.agent.short_hex(),
                    ?decision,
                    "sign request evaluated"
                );
                decision
            }
            None => Decision::Forward,
        };

        match decision {
            Decision::Reject(reason) => {
                let reply = KeystoreFrame::error_response(
                    frame.msg_id,
                    &reason,
                    self.wire.error_response_type,
                );
                client_tx.send(reply).await?;
                Ok(Some(SigningOutcome::Synthetic(reason)))
            }
            Decision::Forward => {
                if cancel.is_cancelled() {
                    return Ok(None);
                }
                let msg_id = frame.msg_id;
                match self.forward(conn_id, frame, codec, upstream).await {
                    Ok(()) => Ok(Some(SigningOutcome::Forwarded)),
                    Err(e) => {
                        *upstream = None;
                        let reason = format!("upstream keystore unavailable: {e}");
                        let reply = KeystoreFrame::error_response(
                            msg_id,
                            &reason,
                            self.wire.error_response_type,
                        );
                        client_tx.send(reply).await?;
                        Ok(Some(SigningOutcome::ForwardFailed(reason)))
                    }
                }
            }
        }
    }

    async fn forward(
        &self,
        conn_id: u64,
        frame: KeystoreFrame,
        codec: &KeystoreCodec,
        upstream: &mut Option<Upstream>,
    ) -> Result<(), ProxyError> {
        let link = match upstream.take() {
            Some(link) => link,
            None => {
                let link = Upstream::connect(&self.upstream, codec).await?;
                debug!(conn_id, upstream = %self.upstream.display(), "opened upstream keystore connection");
                link
            }
        };
        let link = upstream.insert(link);
        link.tx.send(frame).await
    }

    fn record(&self, conn_id: u64, msg_id: u64, outcome: &SigningOutcome) {
        match outcome {
            SigningOutcome::Forwarded => {
                self.stats.record_forwarded();
            }
            SigningOutcome::Synthetic(reason) => {
                self.stats.record_synthetic();
                info!(conn_id, msg_id, reason = reason.as_str(), "sign request rejected by policy");
            }
            SigningOutcome::ForwardFailed(reason) => {
                self.stats.record_forward_failure();
                warn!(conn_id, msg_id, reason = reason.as_str(), "frame could not be forwarded");
            }
        }
    }
}
