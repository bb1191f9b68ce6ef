//! Gateway tests over a real WebSocket
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::time::Duration;

use huddle_core::{ConversationId, EventName, UserId};
use huddle_realtime::{EventBroadcaster, PresenceTracker};
use integration_tests::{token_for, TestServer, WsClient, GENERAL, WORKSPACE};
use serde_json::json;

/// Give the server a moment to process frames it has no reply for
async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::test]
async fn test_health_check() -> anyhow::Result<()> {
    let server = TestServer::start().await?;

    let response = server.get("/health").await?;
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await?, "OK");
    Ok(())
}

#[tokio::test]
async fn test_health_check_reports_store_outage() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    server.store.set_unavailable(true);

    let response = server.get("/health").await?;
    assert_eq!(response.status(), 503);
    Ok(())
}

#[tokio::test]
async fn test_hello_announces_heartbeat_interval() -> anyhow::Result<()> {
    let server = TestServer::start().await?;

    let client = WsClient::connect(&server).await?;
    assert_eq!(client.hello["op"], 10);
    assert_eq!(client.hello["d"]["heartbeat_interval"], 30000);
    Ok(())
}

#[tokio::test]
async fn test_identify_returns_ready_and_marks_online() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let mut client = WsClient::connect(&server).await?;

    let ready = client.identify(&token_for(1)?, WORKSPACE).await?;
    assert_eq!(ready["op"], 8);
    assert_eq!(ready["d"]["user_id"], 1);
    assert_eq!(ready["d"]["workspace_id"], WORKSPACE);
    assert!(ready["d"]["session_id"].is_string());

    let presence = PresenceTracker::new(server.state.realtime());
    assert!(presence.is_online(UserId::new(1)).await);
    Ok(())
}

#[tokio::test]
async fn test_identify_with_bad_token_closes() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let mut client = WsClient::connect(&server).await?;

    client
        .send(json!({"op": 2, "d": {"token": "not-a-jwt", "workspace_id": WORKSPACE}}))
        .await?;
    assert_eq!(client.close_code().await?, Some(4004));
    Ok(())
}

#[tokio::test]
async fn test_identify_into_foreign_workspace_closes() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let mut client = WsClient::connect(&server).await?;

    client
        .send(json!({"op": 2, "d": {"token": token_for(1)?, "workspace_id": 99}}))
        .await?;
    assert_eq!(client.close_code().await?, Some(4006));
    Ok(())
}

#[tokio::test]
async fn test_subscribe_before_identify_closes() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let mut client = WsClient::connect(&server).await?;

    client
        .send(json!({"op": 3, "d": {"channel": "private-conversation.42"}}))
        .await?;
    assert_eq!(client.close_code().await?, Some(4003));
    Ok(())
}

#[tokio::test]
async fn test_malformed_frame_closes_with_decode_error() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let mut client = WsClient::connect(&server).await?;

    client.send_text("{not json").await?;
    assert_eq!(client.close_code().await?, Some(4002));
    Ok(())
}

#[tokio::test]
async fn test_heartbeat_is_acknowledged() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let mut client = server.connect_as(1).await?;

    client.send(json!({"op": 1, "d": null})).await?;
    let ack = client.recv().await?;
    assert_eq!(ack["op"], 11);
    Ok(())
}

#[tokio::test]
async fn test_subscription_granted_and_denied() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let mut alice = server.connect_as(1).await?;

    let granted = alice.subscribe("private-conversation.42").await?;
    assert_eq!(granted["op"], 12);
    assert_eq!(granted["c"], "private-conversation.42");

    let denied = alice.subscribe("private-conversation.43").await?;
    assert_eq!(denied["op"], 13);
    assert_eq!(denied["c"], "private-conversation.43");

    let unknown = alice.subscribe("presence-lobby").await?;
    assert_eq!(unknown["op"], 13);

    let personal = alice.subscribe("private-App.Models.User.1").await?;
    assert_eq!(personal["op"], 12);
    Ok(())
}

#[tokio::test]
async fn test_dispatch_reaches_only_channel_subscribers() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let mut bob = server.connect_as(2).await?;
    let mut carol = server.connect_as(3).await?;

    assert_eq!(bob.subscribe("private-conversation.42").await?["op"], 12);
    assert_eq!(carol.subscribe("private-conversation.43").await?["op"], 12);

    let sent = EventBroadcaster::new(server.state.realtime())
        .publish(
            &["private-conversation.42"],
            EventName::MessageCreated,
            &json!({"id": 7, "body": "hi"}),
            None,
        )
        .await?;
    assert_eq!(sent, 1);

    let dispatch = bob.recv().await?;
    assert_eq!(dispatch["op"], 0);
    assert_eq!(dispatch["t"], "message.created");
    assert_eq!(dispatch["c"], "private-conversation.42");
    assert_eq!(dispatch["s"], 1);
    assert_eq!(dispatch["d"]["body"], "hi");

    carol.expect_silence(Duration::from_millis(200)).await?;
    Ok(())
}

#[tokio::test]
async fn test_typing_reaches_peers_but_not_sender() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let mut alice = server.connect_as(1).await?;
    let mut bob = server.connect_as(2).await?;

    assert_eq!(alice.subscribe("private-conversation.42").await?["op"], 12);
    assert_eq!(bob.subscribe("private-conversation.42").await?["op"], 12);

    alice.typing(GENERAL, true).await?;

    let typing = bob.recv().await?;
    assert_eq!(typing["t"], "user.typing");
    assert_eq!(typing["d"]["user_id"], 1);
    assert_eq!(typing["d"]["user_name"], "Alice");
    alice.expect_silence(Duration::from_millis(200)).await?;

    alice.typing(GENERAL, false).await?;
    let stopped = bob.recv().await?;
    assert_eq!(stopped["t"], "user.stopped-typing");
    Ok(())
}

#[tokio::test]
async fn test_typing_in_foreign_conversation_is_dropped() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let mut alice = server.connect_as(1).await?;

    alice.typing(43, true).await?;
    settle().await;

    let typing = huddle_realtime::TypingTracker::new(server.state.realtime());
    assert!(typing.typing_users(ConversationId::new(43)).await.is_empty());

    // The socket stays usable
    alice.send(json!({"op": 1})).await?;
    assert_eq!(alice.recv().await?["op"], 11);
    Ok(())
}

#[tokio::test]
async fn test_disconnect_marks_user_offline() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let mut observer = server.connect_as(2).await?;
    assert_eq!(observer.subscribe("private-workspace.1").await?["op"], 12);

    let alice = server.connect_as(1).await?;
    let online = observer.recv().await?;
    assert_eq!(online["t"], "presence.user.online");
    assert_eq!(online["d"]["user_id"], 1);

    alice.close().await?;

    let offline = observer.recv().await?;
    assert_eq!(offline["t"], "presence.user.offline");
    assert_eq!(offline["d"]["user_id"], 1);

    let presence = PresenceTracker::new(server.state.realtime());
    assert!(!presence.is_online(UserId::new(1)).await);
    assert_eq!(server.state.connection_manager().connection_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_second_session_keeps_user_online() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let first = server.connect_as(1).await?;
    let _second = server.connect_as(1).await?;

    first.close().await?;
    settle().await;

    let presence = PresenceTracker::new(server.state.realtime());
    assert!(presence.is_online(UserId::new(1)).await);
    Ok(())
}
