//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener on an OS-assigned port and talk to it
//! with a `tokio-tungstenite` client.

#[cfg(feature = "websocket")]
mod websocket {
    use futures_util::{SinkExt, StreamExt};
    use std::time::Duration;

    use multiroom_transport::{Connection, Transport, TransportError, WebSocketTransport};
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds a transport on port 0 and returns it with its address.
    async fn bind_any() -> (WebSocketTransport, String) {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("should have addr").to_string();
        (transport, addr)
    }

    async fn connect_client(addr: &str) -> ClientWs {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        ws
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let (mut transport, addr) = bind_any().await;
        let server_handle =
            tokio::spawn(async move { transport.accept().await.expect("should accept") });

        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.expect("task should complete");

        assert!(server_conn.id().into_inner() > 0);
        assert!(server_conn.is_open());

        server_conn
            .send(b"space ready")
            .await
            .expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"space ready");

        client_ws
            .send(Message::Binary(b"join Arena".to_vec().into()))
            .await
            .unwrap();
        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, b"join Arena");

        server_conn.close().await.expect("close should succeed");
        assert!(!server_conn.is_open());
    }

    #[tokio::test]
    async fn test_websocket_connection_ids_are_unique_per_transport() {
        let (mut transport, addr) = bind_any().await;
        let server_handle = tokio::spawn(async move {
            let a = transport.accept().await.expect("first accept");
            let b = transport.accept().await.expect("second accept");
            (a, b)
        });

        let _c1 = connect_client(&addr).await;
        let _c2 = connect_client(&addr).await;
        let (a, b) = server_handle.await.unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (mut transport, addr) = bind_any().await;
        let server_handle =
            tokio::spawn(async move { transport.accept().await.expect("should accept") });

        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.unwrap();

        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
        assert!(!server_conn.is_open(), "closed connection must not report live");
    }

    #[tokio::test]
    async fn test_websocket_send_after_close_fails() {
        let (mut transport, addr) = bind_any().await;
        let server_handle =
            tokio::spawn(async move { transport.accept().await.expect("should accept") });

        let _client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.unwrap();

        server_conn.close().await.expect("close should succeed");
        assert!(server_conn.send(b"late").await.is_err());
    }

    #[tokio::test]
    async fn test_websocket_recv_within_fails_when_peer_is_silent() {
        let (mut transport, addr) = bind_any().await;
        let server_handle =
            tokio::spawn(async move { transport.accept().await.expect("should accept") });

        let _client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.unwrap();

        let result = server_conn
            .recv_within(Some(Duration::from_millis(100)))
            .await;
        assert!(matches!(result, Err(TransportError::Idle { .. })));
    }

    #[tokio::test]
    async fn test_websocket_pings_keep_connection_from_idling() {
        let (mut transport, addr) = bind_any().await;
        let server_handle =
            tokio::spawn(async move { transport.accept().await.expect("should accept") });

        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.unwrap();

        // Pings for well past the idle limit, then one real frame.
        let client = tokio::spawn(async move {
            for _ in 0..8 {
                tokio::time::sleep(Duration::from_millis(50)).await;
                client_ws
                    .send(Message::Ping(Vec::new().into()))
                    .await
                    .expect("ping should send");
            }
            client_ws
                .send(Message::Binary(b"join Arena".to_vec().into()))
                .await
                .unwrap();
            client_ws
        });

        let received = server_conn
            .recv_within(Some(Duration::from_millis(150)))
            .await
            .expect("pings should reset the idle clock")
            .expect("should have data");
        assert_eq!(received, b"join Arena");
        let _client_ws = client.await.unwrap();
    }
}
