use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};

use tui_2048::adapter::protocol::{create_hello, PROTOCOL_VERSION};
use tui_2048::adapter::server::{run_server, ServerConfig};
use tui_2048::adapter::{InboundCommand, InboundPayload, OutboundMessage};

async fn read_line(
    lines: &mut tokio::io::Lines<BufReader<tokio::net::tcp::OwnedReadHalf>>,
) -> String {
    tokio::time::timeout(Duration::from_secs(2), lines.next_line())
        .await
        .expect("timeout waiting for line")
        .expect("io error")
        .expect("expected line")
}

fn hello_line(seq: u64) -> String {
    let mut hello = create_hello(seq, "disconnect-test", PROTOCOL_VERSION);
    hello.requested.stream_observations = false;
    let mut line = serde_json::to_string(&hello).unwrap();
    line.push('\n');
    line
}

#[tokio::test]
async fn controller_disconnect_promotes_next_client() {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        ..ServerConfig::default()
    };

    let (cmd_tx, mut cmd_rx) = mpsc::channel::<InboundCommand>(64);
    let (_out_tx, out_rx) = mpsc::unbounded_channel::<OutboundMessage>();
    let (ready_tx, ready_rx) = oneshot::channel();

    let server_handle = tokio::spawn(async move {
        let _ = run_server(config, cmd_tx, out_rx, Some(ready_tx)).await;
    });

    let addr = tokio::time::timeout(Duration::from_secs(2), ready_rx)
        .await
        .unwrap()
        .unwrap();

    // Controller.
    let s1 = TcpStream::connect(addr).await.unwrap();
    let (r1, mut w1) = s1.into_split();
    let mut l1 = BufReader::new(r1).lines();
    w1.write_all(hello_line(1).as_bytes()).await.unwrap();
    let welcome1: serde_json::Value = serde_json::from_str(&read_line(&mut l1).await).unwrap();
    assert_eq!(welcome1["role"], "controller");

    // Observer.
    let s2 = TcpStream::connect(addr).await.unwrap();
    let (r2, mut w2) = s2.into_split();
    let mut l2 = BufReader::new(r2).lines();
    w2.write_all(hello_line(1).as_bytes()).await.unwrap();
    let welcome2: serde_json::Value = serde_json::from_str(&read_line(&mut l2).await).unwrap();
    assert_eq!(welcome2["role"], "observer");

    // Drop the controller connection.
    drop(w1);
    drop(l1);

    // The observer is promoted once the server has noticed the disconnect.
    let mut seq = 2u64;
    let mut promoted = false;
    for _ in 0..40 {
        let cmd = format!(
            "{{\"type\":\"command\",\"seq\":{},\"ts\":1,\"actions\":[\"left\"]}}\n",
            seq
        );
        w2.write_all(cmd.as_bytes()).await.unwrap();

        match tokio::time::timeout(Duration::from_millis(100), cmd_rx.recv()).await {
            Ok(Some(inbound)) => {
                assert_eq!(inbound.seq, seq);
                assert!(matches!(inbound.payload, InboundPayload::Command(_)));
                promoted = true;
                break;
            }
            _ => {
                let err: serde_json::Value =
                    serde_json::from_str(&read_line(&mut l2).await).unwrap();
                assert_eq!(err["code"], "not_controller");
            }
        }
        seq += 1;
    }
    assert!(promoted, "observer was never promoted to controller");

    server_handle.abort();
}
