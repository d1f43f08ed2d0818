//! WebSocket upgrade and per-session pump.

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ApiError, AppState};
use crate::domain::UserId;
use crate::notifications::{ChannelConnection, ConnectionId, NotificationHub};

#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub user_id: Option<String>,
}

/// Accepts a plain unsigned 32-bit id, taken as-is with no trimming.
pub fn parse_user_id(q: &ConnectQuery) -> Result<UserId, ApiError> {
    match q.user_id.as_deref() {
        None | Some("") => Err(ApiError::BadRequest("user_id is required")),
        Some(raw) => raw.parse().map_err(|_| ApiError::BadRequest("invalid user_id")),
    }
}

/// The user id is checked before the upgrade headers, so a bad id gets a
/// 400 whether or not the request is a real WebSocket handshake.
pub async fn upgrade(
    State(s): State<AppState>,
    Query(q): Query<ConnectQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let user_id = match parse_user_id(&q) {
        Ok(user_id) => user_id,
        Err(e) => return e.into_response(),
    };
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };
    let capacity = s.connection_queue_capacity;
    ws.on_failed_upgrade(move |e| warn!(user_id = %user_id, error = %e, "Failed to upgrade to WS"))
        .on_upgrade(move |socket| session(socket, s.hub, user_id, capacity))
}

/// Registers the socket with the hub and pumps queued notifications out to it.
/// Inbound frames only keep the session alive. The session ends on a read
/// error, a Close frame, a failed write, or when the hub closes its queue.
async fn session(socket: WebSocket, hub: NotificationHub, user_id: UserId, capacity: usize) {
    let id = ConnectionId::new();
    let (connection, mut outbound) = ChannelConnection::new(capacity);
    hub.register(id, user_id, connection).await;

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            queued = outbound.recv() => match queued {
                Some(message) => {
                    let text = match message.to_json() {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(connection_id = %id, error = %e, "Dropping unserialisable notification");
                            continue;
                        }
                    };
                    if let Err(e) = sink.send(Message::Text(text)).await {
                        debug!(connection_id = %id, error = %e, "WS write failed");
                        break;
                    }
                }
                None => {
                    // Hub closed this connection.
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!(connection_id = %id, error = %e, "WS read failed");
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }
    hub.unregister(id).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{router, tests::state};
    use crate::notifications::{HubTask, Notification};
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::net::{TcpListener, TcpStream};
    use tokio::time::timeout;
    use tokio_tungstenite::{connect_async, tungstenite, MaybeTlsStream, WebSocketStream};

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    fn query(v: Option<&str>) -> ConnectQuery { ConnectQuery { user_id: v.map(str::to_string) } }

    #[test]
    fn missing_user_id_is_rejected() {
        assert_eq!(parse_user_id(&query(None)).unwrap_err().to_string(), "user_id is required");
        assert_eq!(parse_user_id(&query(Some(""))).unwrap_err().to_string(), "user_id is required");
    }

    #[test]
    fn malformed_user_id_is_rejected() {
        for raw in ["seven", " 7", "7 ", "-1", "4294967296"] {
            assert_eq!(parse_user_id(&query(Some(raw))).unwrap_err().to_string(), "invalid user_id", "{raw:?}");
        }
    }

    #[test]
    fn numeric_user_id_is_accepted() {
        assert_eq!(parse_user_id(&query(Some("7"))).unwrap(), UserId::new(7));
        assert_eq!(parse_user_id(&query(Some("4294967295"))).unwrap(), UserId::new(u32::MAX));
    }

    async fn serve() -> (SocketAddr, NotificationHub, HubTask) {
        let (state, hub, task) = state();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router(state)).await });
        (addr, hub, task)
    }

    async fn connect(addr: SocketAddr, user_id: u32) -> Client {
        let (client, _) = connect_async(format!("ws://{addr}/ws?user_id={user_id}")).await.unwrap();
        client
    }

    async fn wait_for_connections(hub: &NotificationHub, n: usize) {
        let mut stats = hub.watch_stats();
        timeout(Duration::from_secs(2), stats.wait_for(|s| s.connections == n))
            .await
            .expect("connection count not reached")
            .expect("hub stopped");
    }

    async fn next_frame(client: &mut Client) -> tungstenite::Message {
        timeout(Duration::from_secs(2), client.next())
            .await
            .expect("no frame from server")
            .expect("stream ended")
            .expect("read failed")
    }

    #[tokio::test]
    async fn session_pushes_notifications_and_unregisters_on_close() {
        let (addr, hub, task) = serve().await;
        let mut client = connect(addr, 7).await;
        wait_for_connections(&hub, 1).await;

        hub.publish(UserId::new(7), Notification::AdminNotice(serde_json::json!({"discount": 20})), "Flash sale").await;
        let text = match next_frame(&mut client).await {
            tungstenite::Message::Text(text) => text,
            other => panic!("expected text frame, got {other:?}"),
        };
        let body: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(body["user_id"], 7);
        assert_eq!(body["type"], "ADMIN_NOTICE");
        assert_eq!(body["data"]["discount"], 20);
        assert_eq!(body["message"], "Flash sale");

        client.close(None).await.unwrap();
        wait_for_connections(&hub, 0).await;
        task.shutdown().await;
    }

    #[tokio::test]
    async fn hub_shutdown_closes_the_socket() {
        let (addr, hub, task) = serve().await;
        let mut client = connect(addr, 7).await;
        wait_for_connections(&hub, 1).await;

        task.shutdown().await;
        assert!(matches!(next_frame(&mut client).await, tungstenite::Message::Close(_)));
    }
}
