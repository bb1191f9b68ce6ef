//! End-to-end scenarios over the in-process real-time core
//!
//! Run with: cargo test -p integration-tests --test scenarios

use chrono::TimeZone;
use huddle_core::{
    ActorRef, ChannelName, Clock, ConversationId, EventName, MessageId, MessagePayload, UserId,
    WorkspaceId,
};
use integration_tests::{alice, bob, carol, drain, World, GENERAL, RANDOM, WORKSPACE};
use serde_json::json;

fn workspace() -> WorkspaceId {
    WorkspaceId::new(WORKSPACE)
}

fn general() -> ConversationId {
    ConversationId::new(GENERAL)
}

// ============================================================================
// Presence
// ============================================================================

#[tokio::test]
async fn presence_survives_while_refreshed_and_lapses_after_ttl() -> anyhow::Result<()> {
    let world = World::new()?;
    let presence = world.presence();

    presence.mark_online(&alice(), workspace()).await?;

    world.clock.advance_secs(30);
    assert!(presence.refresh(alice().id).await?);

    world.clock.advance_secs(40);
    assert!(presence.is_online(alice().id).await, "online at t=70");
    assert_eq!(presence.online_users(workspace()).await, vec![alice()]);

    world.clock.advance_secs(60);
    assert!(!presence.is_online(alice().id).await, "offline at t=130");
    assert!(presence.online_users(workspace()).await.is_empty());
    Ok(())
}

#[tokio::test]
async fn marking_online_twice_is_idempotent() -> anyhow::Result<()> {
    let world = World::new()?;
    let presence = world.presence();

    presence.mark_online(&alice(), workspace()).await?;
    world.clock.advance_secs(20);
    presence.mark_online(&alice(), workspace()).await?;

    assert_eq!(presence.online_users(workspace()).await, vec![alice()]);

    // The second call restarted the full TTL
    world.clock.advance_secs(59);
    assert!(presence.is_online(alice().id).await);
    assert_eq!(presence.last_seen(alice().id).await, Some(world.clock.now() - chrono::Duration::seconds(59)));
    Ok(())
}

#[tokio::test]
async fn presence_events_reach_workspace_listeners() -> anyhow::Result<()> {
    let world = World::new()?;
    let mut rx = world.listen("observer", ChannelName::workspace(workspace()));

    world.presence().mark_online(&bob(), workspace()).await?;
    world.presence().mark_offline(&bob()).await?;

    let events: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter_map(|message| message.t)
        .collect();
    assert_eq!(
        events,
        vec![
            EventName::PresenceOnline.to_string(),
            EventName::PresenceOffline.to_string()
        ]
    );
    Ok(())
}

#[tokio::test]
async fn offline_without_live_entry_is_silent() -> anyhow::Result<()> {
    let world = World::new()?;
    let mut rx = world.listen("observer", ChannelName::workspace(workspace()));

    world.presence().mark_offline(&carol()).await?;

    assert!(drain(&mut rx).is_empty());
    Ok(())
}

#[tokio::test]
async fn online_users_excludes_other_workspaces() -> anyhow::Result<()> {
    let world = World::new()?;
    let other = WorkspaceId::new(2);
    world.directory.join_workspace(other, carol().id);

    world.presence().mark_online(&alice(), workspace()).await?;
    world.presence().mark_online(&carol(), other).await?;

    assert_eq!(world.presence().online_users(workspace()).await, vec![alice()]);
    assert_eq!(world.presence().online_users(other).await, vec![carol()]);
    Ok(())
}

// ============================================================================
// Typing
// ============================================================================

#[tokio::test]
async fn typing_expires_after_its_window() -> anyhow::Result<()> {
    let world = World::new()?;
    let typing = world.typing();

    typing.start(&alice(), general(), None).await?;

    world.clock.advance_secs(3);
    assert_eq!(typing.typing_users(general()).await, vec![alice()]);

    world.clock.advance_secs(3);
    assert!(typing.typing_users(general()).await.is_empty());
    assert!(!typing.is_typing(alice().id, general()).await);
    Ok(())
}

#[tokio::test]
async fn stop_typing_takes_effect_immediately() -> anyhow::Result<()> {
    let world = World::new()?;
    let typing = world.typing();

    typing.start(&alice(), general(), None).await?;
    typing.start(&bob(), general(), None).await?;
    typing.stop(alice().id, general(), None).await?;

    assert_eq!(typing.typing_users(general()).await, vec![bob()]);
    assert!(typing.typing_users_except(general(), bob().id).await.is_empty());
    Ok(())
}

#[tokio::test]
async fn typing_echo_skips_the_sending_session() -> anyhow::Result<()> {
    let world = World::new()?;
    let channel = ChannelName::conversation(general());
    let mut sender = world.listen("alice-session", channel);
    let mut peer = world.listen("bob-session", channel);

    world
        .typing()
        .start(&alice(), general(), Some("alice-session"))
        .await?;

    assert!(drain(&mut sender).is_empty());
    let frames = drain(&mut peer);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].t.as_deref(), Some("user.typing"));
    assert_eq!(frames[0].c.as_deref(), Some("private-conversation.42"));
    Ok(())
}

// ============================================================================
// Gate
// ============================================================================

#[tokio::test]
async fn gate_follows_membership_changes() -> anyhow::Result<()> {
    let world = World::new()?;
    let gate = world.gate();

    assert_eq!(
        gate.authorize(alice().id, "private-conversation.42").await.ok(),
        Some(ChannelName::conversation(general()))
    );

    world.directory.leave_conversation(general(), alice().id);
    assert!(gate.authorize(alice().id, "private-conversation.42").await.is_err());
    Ok(())
}

#[tokio::test]
async fn gate_rejects_foreign_personal_channels_and_accepts_the_alias() -> anyhow::Result<()> {
    let world = World::new()?;
    let gate = world.gate();

    assert!(gate.authorize(alice().id, "private-user.2").await.is_err());
    assert_eq!(
        gate.authorize(alice().id, "private-App.Models.User.1").await.ok(),
        Some(ChannelName::user(UserId::new(1)))
    );
    assert!(gate.authorize(alice().id, "presence-lobby").await.is_err());
    Ok(())
}

// ============================================================================
// Fan-out
// ============================================================================

#[tokio::test]
async fn messages_reach_only_their_conversation() -> anyhow::Result<()> {
    let world = World::new()?;
    let mut in_general = world.listen("bob-session", ChannelName::conversation(general()));
    let mut in_random = world.listen(
        "carol-session",
        ChannelName::conversation(ConversationId::new(RANDOM)),
    );

    let message = MessagePayload {
        id: MessageId::new(900),
        conversation_id: general(),
        user: ActorRef::from(&alice()),
        body: "hello".to_string(),
        parent_message_id: None,
        created_at: chrono::Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        edited_at: None,
    };
    let sent = world.broadcaster().message_created(&message, None).await?;
    assert_eq!(sent, 1);

    let frames = drain(&mut in_general);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].t.as_deref(), Some("message.created"));
    assert_eq!(frames[0].s, Some(1));
    let data = frames[0].d.clone().unwrap_or_default();
    assert_eq!(data["body"], json!("hello"));
    assert_eq!(data["user"]["name"], json!("Alice"));

    assert!(drain(&mut in_random).is_empty());
    Ok(())
}

#[tokio::test]
async fn raw_publish_drops_unknown_channels_outside_strict_mode() -> anyhow::Result<()> {
    let world = World::new()?;
    let mut rx = world.listen("bob-session", ChannelName::conversation(general()));

    // Development config enables strict channels
    let result = world
        .broadcaster()
        .publish(
            &["private-conversation.42", "public-lobby"],
            EventName::MessageCreated,
            &json!({"id": 1}),
            None,
        )
        .await;
    assert!(result.is_err());
    assert!(drain(&mut rx).is_empty());

    let sent = world
        .broadcaster()
        .publish(
            &["private-conversation.42"],
            EventName::MessageCreated,
            &json!({"id": 1}),
            None,
        )
        .await?;
    assert_eq!(sent, 1);
    assert_eq!(drain(&mut rx).len(), 1);
    Ok(())
}
