//! End-to-end tests over real WebSocket connections.


use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use job_server::admission::admits;
use job_server::scheduler::Job;
use test_harness::{
    assert_eventually, recv_job, send_text, submission, Client, TestServer, TEST_ADMISSION,
};
use tokio_tungstenite::tungstenite::Message;

/// A payload that fails the proof-of-work check
fn unworked(body: &str) -> String {
    (0u64..)
        .map(|n| format!("{body}&pad={n}"))
        .find(|p| !admits(p.as_bytes(), TEST_ADMISSION.window_bits, TEST_ADMISSION.difficulty))
        .unwrap()
}

async fn close(mut client: Client) {
    let _ = client.close(None).await;
}

#[tokio::test]
async fn test_worker_receives_first_job() {
    let server = TestServer::start(&["A", "B"]).await;
    let mut client = server.connect().await;

    assert_eq!(recv_job(&mut client).await.as_deref(), Some("A"));
    assert_eq!(server.coordinator.pending(), 1);
}

#[tokio::test]
async fn test_accepted_response_is_recorded_and_worker_advances() {
    let server = TestServer::start(&["A", "B"]).await;
    let mut client = server.connect().await;
    assert_eq!(recv_job(&mut client).await.as_deref(), Some("A"));

    send_text(&mut client, submission("foo")).await;
    assert_eq!(recv_job(&mut client).await.as_deref(), Some("B"));

    assert_eq!(
        server.sink.records(),
        vec![(Job::from("A"), "foo".to_string())]
    );
    let snap = server.coordinator.snapshot();
    assert_eq!(snap.unique_contributors, 1);
    assert_eq!(snap.top_contributors[0].contributions, 1);
}

#[tokio::test]
async fn test_skip_advances_without_recording() {
    let server = TestServer::start(&["A", "B"]).await;
    let mut client = server.connect().await;
    recv_job(&mut client).await;

    send_text(&mut client, submission("")).await;
    assert_eq!(recv_job(&mut client).await.as_deref(), Some("B"));
    assert!(server.sink.records().is_empty());
}

#[tokio::test]
async fn test_unclean_disconnect_requeues_held_job() {
    let server = TestServer::start(&["A", "B"]).await;
    let mut client = server.connect().await;
    recv_job(&mut client).await;
    send_text(&mut client, submission("foo")).await;
    assert_eq!(recv_job(&mut client).await.as_deref(), Some("B"));

    // Drop without a close handshake
    drop(client);

    let coordinator = server.coordinator.clone();
    assert_eventually(
        || async { coordinator.pending_jobs() == vec![Job::from("B")] },
        Duration::from_secs(5),
        "Held job should return to the pool",
    )
    .await;
}

#[tokio::test]
async fn test_abandoned_job_goes_to_next_worker() {
    let server = TestServer::start(&["A"]).await;

    let mut first = server.connect().await;
    assert_eq!(recv_job(&mut first).await.as_deref(), Some("A"));
    close(first).await;

    let coordinator = server.coordinator.clone();
    assert_eventually(
        || async { coordinator.pending() == 1 },
        Duration::from_secs(5),
        "Job should be requeued after disconnect",
    )
    .await;

    let mut second = server.connect().await;
    assert_eq!(recv_job(&mut second).await.as_deref(), Some("A"));
}

#[tokio::test]
async fn test_failed_proof_of_work_closes_and_requeues() {
    let server = TestServer::start(&["A", "B"]).await;
    let mut client = server.connect().await;
    recv_job(&mut client).await;

    let now = chrono::Utc::now().timestamp();
    send_text(&mut client, unworked(&format!("time={now}&response=x"))).await;
    assert_eq!(recv_job(&mut client).await, None);

    let coordinator = server.coordinator.clone();
    assert_eventually(
        || async { coordinator.pending_jobs() == vec![Job::from("B"), Job::from("A")] },
        Duration::from_secs(5),
        "Rejected worker's job should be requeued",
    )
    .await;
    assert_eq!(server.coordinator.snapshot().unique_contributors, 0);
    assert!(server.sink.records().is_empty());
}

#[tokio::test]
async fn test_stale_submission_is_rejected() {
    let server = TestServer::start(&["A"]).await;
    let mut client = server.connect().await;
    recv_job(&mut client).await;

    let stale = job_server::admission::solve("time=0&response=old", TEST_ADMISSION);
    send_text(&mut client, stale).await;
    assert_eq!(recv_job(&mut client).await, None);

    let coordinator = server.coordinator.clone();
    assert_eventually(
        || async { coordinator.pending() == 1 },
        Duration::from_secs(5),
        "Stale submission should not retire the job",
    )
    .await;
    assert!(server.sink.records().is_empty());
}

#[tokio::test]
async fn test_binary_frame_is_rejected() {
    let server = TestServer::start(&["A"]).await;
    let mut client = server.connect().await;
    recv_job(&mut client).await;

    client
        .send(Message::Binary(submission("x").into_bytes()))
        .await
        .unwrap();
    assert_eq!(recv_job(&mut client).await, None);

    let coordinator = server.coordinator.clone();
    assert_eventually(
        || async { coordinator.pending() == 1 },
        Duration::from_secs(5),
        "Binary frame should not count as a submission",
    )
    .await;
}

#[tokio::test]
async fn test_draining_pool_stops_server() {
    let server = TestServer::start(&["A"]).await;
    let mut client = server.connect().await;
    recv_job(&mut client).await;

    send_text(&mut client, submission("last")).await;
    assert_eq!(recv_job(&mut client).await, None);

    assert!(server.coordinator.is_drained());
    assert_eq!(server.sink.records().len(), 1);
    assert_eventually(
        || async { server.is_stopped() },
        Duration::from_secs(5),
        "Server should stop once the pool drains",
    )
    .await;
}

#[tokio::test]
async fn test_connect_to_empty_pool_stops_server() {
    let server = TestServer::start(&[]).await;
    let mut client = server.connect().await;

    assert_eq!(recv_job(&mut client).await, None);
    assert!(server.shutdown.is_cancelled());
    assert_eventually(
        || async { server.is_stopped() },
        Duration::from_secs(5),
        "Server should stop when nothing is left to hand out",
    )
    .await;
}

#[tokio::test]
async fn test_drain_closes_other_workers() {
    let server = TestServer::start(&["A", "B"]).await;
    let mut first = server.connect().await;
    assert_eq!(recv_job(&mut first).await.as_deref(), Some("A"));
    let mut second = server.connect().await;
    assert_eq!(recv_job(&mut second).await.as_deref(), Some("B"));

    send_text(&mut first, submission("done")).await;
    assert_eq!(recv_job(&mut first).await, None);
    assert_eq!(recv_job(&mut second).await, None);

    // B came back to the pool but is never handed out again
    let coordinator = server.coordinator.clone();
    assert_eventually(
        || async { coordinator.pending() == 1 },
        Duration::from_secs(5),
        "Second worker's job should be requeued",
    )
    .await;
    assert!(server.coordinator.is_drained());
}

#[tokio::test]
async fn test_idle_worker_times_out() {
    let server = TestServer::start_with_timeout(&["A"], Duration::from_secs(1)).await;
    let mut client = server.connect().await;
    assert_eq!(recv_job(&mut client).await.as_deref(), Some("A"));

    // Stop polling so pings go unanswered
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(server.coordinator.pending(), 1);
    drop(client);
}

#[tokio::test]
async fn test_answering_pings_does_not_extend_receive_timeout() {
    let server = TestServer::start_with_timeout(&["A"], Duration::from_secs(2)).await;
    let mut client = server.connect().await;
    assert_eq!(recv_job(&mut client).await.as_deref(), Some("A"));

    // Keep reading so every ping is answered, but never submit
    let reader = tokio::spawn(async move {
        let mut pings = 0;
        while let Some(Ok(frame)) = client.next().await {
            if matches!(frame, Message::Ping(_)) {
                pings += 1;
            }
        }
        pings
    });

    let coordinator = server.coordinator.clone();
    assert_eventually(
        || async { coordinator.pending() == 1 },
        Duration::from_secs(5),
        "Silent worker should lose its job after the receive timeout",
    )
    .await;

    let pings = tokio::time::timeout(Duration::from_secs(5), reader)
        .await
        .expect("connection should be closed by the server")
        .unwrap();
    assert!(pings >= 1, "server should have pinged the idle worker");
}

#[tokio::test]
async fn test_slow_response_write_does_not_stall_other_workers() {
    let server = TestServer::start_with_slow_sink(&["A", "B", "C"], Duration::from_millis(1500)).await;
    let mut first = server.connect().await;
    assert_eq!(recv_job(&mut first).await.as_deref(), Some("A"));

    send_text(&mut first, submission("foo")).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let second = tokio::time::timeout(Duration::from_millis(700), async {
        let mut second = server.connect().await;
        recv_job(&mut second).await
    })
    .await
    .expect("second worker should be served while the first response is written");
    assert_eq!(second.as_deref(), Some("B"));

    assert_eq!(recv_job(&mut first).await.as_deref(), Some("C"));
    assert_eq!(
        server.sink.records(),
        vec![(Job::from("A"), "foo".to_string())]
    );
}

#[tokio::test]
async fn test_stats_page_is_served() {
    let server = TestServer::start(&["A", "B"]).await;
    let mut client = server.connect().await;
    recv_job(&mut client).await;

    let mut stream = tokio::net::TcpStream::connect(server.addr).await.unwrap();
    stream
        .write_all(b"GET /stats HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains("Queue size:</strong> 1/2"));
}
