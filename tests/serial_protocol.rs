use serpent_rs::config::Config;
use serpent_rs::control::handle_request;
use serpent_rs::snake::Snake;
use serpent_rs::transport::serial::respond_to_line;
use serpent_rs::transport::tcp::serve_tcp;
use serpent_rs::transport::{RequestSender, control_channel};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::Instant;

/// Service requests the way the control loop does, without the tick cadence.
fn spawn_core() -> RequestSender {
    let (tx, mut rx) = control_channel(8);
    tokio::spawn(async move {
        let mut snake = Snake::new(&Config::default());
        while let Some(request) = rx.recv().await {
            handle_request(&mut snake, request, Instant::now());
        }
    });
    tx
}

#[tokio::test]
async fn test_hello_handshake() {
    let tx = spawn_core();
    assert_eq!(respond_to_line("HELLO", &tx).await.unwrap(), vec!["HELLO:OK"]);
}

#[tokio::test]
async fn test_update_echoes_smoothed_values() {
    let tx = spawn_core();
    let replies = respond_to_line("AMP:30,FREQ:1.2", &tx).await.unwrap();
    assert_eq!(replies, vec!["AMP:26.00", "FREQ:0.88"]);
}

#[tokio::test]
async fn test_status_reports_activity() {
    let tx = spawn_core();
    let replies = respond_to_line("STATUS", &tx).await.unwrap();
    assert_eq!(replies[0], "STATUS:OK");
    let details: serde_json::Value =
        serde_json::from_str(replies[1].strip_prefix("STATUS_DETAILS:").unwrap()).unwrap();
    assert_eq!(details["state"], "IDLE");
    assert_eq!(details["msg_count"], 0);

    respond_to_line("STEER:10", &tx).await.unwrap();
    let replies = respond_to_line("STATUS", &tx).await.unwrap();
    let details: serde_json::Value =
        serde_json::from_str(replies[1].strip_prefix("STATUS_DETAILS:").unwrap()).unwrap();
    assert_eq!(details["state"], "ACTIVE");
    assert_eq!(details["msg_count"], 1);
}

#[tokio::test]
async fn test_bad_lines_answer_error() {
    let tx = spawn_core();
    for line in ["AMP:fast", "WIGGLE:2", "AMP:inf", "X:0.5"] {
        let replies = respond_to_line(line, &tx).await.unwrap();
        assert_eq!(replies.len(), 1, "{}", line);
        assert!(replies[0].starts_with("ERROR:"), "{} -> {}", line, replies[0]);
    }
    // nothing above counted as a message
    let replies = respond_to_line("STATUS", &tx).await.unwrap();
    assert!(replies[1].contains("\"msg_count\":0"));
}

#[tokio::test]
async fn test_tcp_json_lines() {
    let tx = spawn_core();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve_tcp(listener, tx));

    let stream = TcpStream::connect(addr).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    writer.write_all(b"{\"amplitude\": 35, \"phaseShift\": 60}\n").await.unwrap();
    let ack: serde_json::Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(ack["status"], "ok");
    assert_eq!(ack["msg_count"], 1);
    assert!((ack["amplitude"].as_f64().unwrap() - 27.0).abs() < 1e-9);
    assert!((ack["phaseShift"].as_f64().unwrap() - 60.0).abs() < 1e-9);

    writer.write_all(b"not json\n{}\n").await.unwrap();
    for _ in 0..2 {
        let reply: serde_json::Value =
            serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(reply["status"], "error");
    }
}

#[tokio::test]
async fn test_tcp_overlong_line_is_dropped() {
    let tx = spawn_core();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve_tcp(listener, tx));

    let stream = TcpStream::connect(addr).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    // a peer that streams far past the line cap before its newline
    let flood = vec![b'A'; 64 * 1024];
    writer.write_all(&flood).await.unwrap();
    writer.write_all(b"\n{\"steering\": 5}\n").await.unwrap();

    let ack: serde_json::Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(ack["status"], "ok");
    assert_eq!(ack["msg_count"], 1);
}
