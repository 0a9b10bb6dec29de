mod common;

use common::*;
use estate_agent::models::chat::Role;
use estate_agent::models::stream::StreamFrame;
use estate_agent::predictor::InMemoryModelStore;
use std::sync::Arc;

fn empty_store() -> Arc<InMemoryModelStore> {
    Arc::new(InMemoryModelStore::new())
}

#[tokio::test]
async fn direct_answer_finishes_the_turn() {
    let (agent, client) = agent_with(vec![answer("hello there")], empty_store());

    let outcome = agent.chat(None, "hi").await.unwrap();
    assert_eq!(outcome.response, "hello there");
    assert!(outcome.tool_calls.is_none());

    let session = agent.sessions().get(&outcome.session_id).await.unwrap();
    let conversation = session.conversation.lock().await;
    let roles: Vec<Role> = conversation
        .messages()
        .iter()
        .map(|m| m.role)
        .collect();
    assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);

    let calls = client.recorded_calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].offered_tools);
}

#[tokio::test]
async fn tool_round_appends_results_and_final_answer() {
    let (agent, client) = agent_with(
        vec![
            tool_calls_requested(vec![tool_call("call_1", "get_current_time", "{}")]),
            answer("it is around noon")
        ],
        empty_store()
    );

    let outcome = agent.chat(None, "what time is it?").await.unwrap();
    assert_eq!(outcome.response, "it is around noon");

    let records = outcome.tool_calls.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].tool_name, "get_current_time");
    assert!(records[0].result.starts_with("Current local time"));

    let session = agent.sessions().get(&outcome.session_id).await.unwrap();
    let conversation = session.conversation.lock().await;
    let roles: Vec<Role> = conversation
        .messages()
        .iter()
        .map(|m| m.role)
        .collect();
    assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::Assistant]);

    let tool_message = &conversation.messages()[3];
    assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(tool_message.name.as_deref(), Some("get_current_time"));

    // Exactly one round of tool calls per turn: the second upstream call
    // must not offer the tool catalog.
    let calls = client.recorded_calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].offered_tools);
    assert!(!calls[1].offered_tools);
    assert_eq!(*calls[1].roles.last().unwrap(), Role::Tool);
}

#[tokio::test]
async fn first_call_failure_leaves_only_the_user_message() {
    let (agent, _client) = agent_with(
        vec![answer("hello"), upstream_failure()],
        empty_store()
    );

    let outcome = agent.chat(None, "hi").await.unwrap();
    let session = agent.sessions().get(&outcome.session_id).await.unwrap();
    let len_before = session.conversation.lock().await.len();

    let err = agent.chat(Some(&outcome.session_id), "second turn").await;
    assert!(err.is_err());

    let conversation = session.conversation.lock().await;
    assert_eq!(conversation.len(), len_before + 1);
    assert_eq!(conversation.messages().last().unwrap().role, Role::User);
}

#[tokio::test]
async fn second_call_failure_keeps_tool_results() {
    let (agent, _client) = agent_with(
        vec![
            tool_calls_requested(vec![tool_call("call_1", "get_current_time", "{}")]),
            upstream_failure()
        ],
        empty_store()
    );

    let err = agent.chat(None, "what time is it?").await;
    assert!(err.is_err());

    let sessions = agent.sessions().summaries().await;
    assert_eq!(sessions.len(), 1);
    let session = agent.sessions().get(&sessions[0].session_id).await.unwrap();
    let conversation = session.conversation.lock().await;

    // The failed final call appended nothing, but everything before it
    // survives: system, user, assistant tool request, tool result.
    let roles: Vec<Role> = conversation
        .messages()
        .iter()
        .map(|m| m.role)
        .collect();
    assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::Tool]);
}

#[tokio::test]
async fn unknown_tool_result_is_conversation_visible() {
    let (agent, _client) = agent_with(
        vec![
            tool_calls_requested(vec![tool_call("call_1", "nonexistent_tool", "{}")]),
            answer("that tool does not exist")
        ],
        empty_store()
    );

    let outcome = agent.chat(None, "use your secret tool").await.unwrap();
    let records = outcome.tool_calls.unwrap();
    assert_eq!(records[0].result, "unknown tool: nonexistent_tool");

    let session = agent.sessions().get(&outcome.session_id).await.unwrap();
    let conversation = session.conversation.lock().await;
    assert_eq!(conversation.messages()[3].content, "unknown tool: nonexistent_tool");
}

#[tokio::test]
async fn predict_tool_turn_reports_fused_estimate() {
    let store = seeded_model_store().await;
    let arguments = r#"{"house_info": {"area": 1}, "model_ids": [1, 2]}"#;
    let (agent, _client) = agent_with(
        vec![
            tool_calls_requested(vec![tool_call("call_1", "predict_house_price", arguments)]),
            answer("the fused unit price is 175")
        ],
        store
    );

    let outcome = agent.chat(None, "estimate this house with models 1 and 2").await.unwrap();
    let records = outcome.tool_calls.unwrap();
    let report: serde_json::Value = serde_json::from_str(&records[0].result).unwrap();
    assert_eq!(report["status"], "success");
    assert!((report["aggregate"]["fused_unit_price"].as_f64().unwrap() - 175.0).abs() < 1e-9);
}

#[tokio::test]
async fn conversation_grows_monotonically_across_turns() {
    let (agent, _client) = agent_with(
        vec![answer("one"), answer("two"), answer("three")],
        empty_store()
    );

    let first = agent.chat(None, "turn 1").await.unwrap();
    let session = agent.sessions().get(&first.session_id).await.unwrap();

    let (mut previous_len, mut snapshots): (usize, Vec<Vec<String>>) = {
        let conversation = session.conversation.lock().await;
        (
            conversation.len(),
            vec![
                conversation
                    .messages()
                    .iter()
                    .map(|m| m.content.clone())
                    .collect()
            ],
        )
    };

    for message in ["turn 2", "turn 3"] {
        agent.chat(Some(&first.session_id), message).await.unwrap();
        let conversation = session.conversation.lock().await;
        assert!(conversation.len() > previous_len);

        // Existing messages are untouched; history only extends.
        let previous = snapshots.last().unwrap();
        for (i, content) in previous.iter().enumerate() {
            assert_eq!(&conversation.messages()[i].content, content);
        }

        previous_len = conversation.len();
        snapshots.push(
            conversation
                .messages()
                .iter()
                .map(|m| m.content.clone())
                .collect()
        );
    }
}

#[tokio::test]
async fn turns_on_one_session_never_touch_another() {
    let (agent, _client) = agent_with(
        vec![answer("for a"), answer("for b")],
        empty_store()
    );

    let a = agent.chat(None, "message for a").await.unwrap();
    let b = agent.chat(None, "message for b").await.unwrap();
    assert_ne!(a.session_id, b.session_id);

    let session_b = agent.sessions().get(&b.session_id).await.unwrap();
    let conversation = session_b.conversation.lock().await;
    assert!(
        conversation
            .messages()
            .iter()
            .all(|m| !m.content.contains("for a"))
    );
    assert_eq!(conversation.len(), 3);
}

#[tokio::test]
async fn stream_frames_arrive_in_protocol_order() {
    let final_answer = "The current time has been checked and it is exactly noon today.";
    let (agent, _client) = agent_with(
        vec![
            tool_calls_requested(vec![tool_call("call_1", "get_current_time", "{}")]),
            answer(final_answer)
        ],
        empty_store()
    );

    let mut rx = agent.chat_stream(None, "what time is it?".to_string());
    let mut frames = Vec::new();
    while let Some(frame) = rx.recv().await {
        frames.push(frame);
    }

    assert!(matches!(frames.first(), Some(StreamFrame::Session { .. })));
    assert!(matches!(frames.get(1), Some(StreamFrame::ToolCall { .. })));
    assert!(
        matches!(
            frames.get(2),
            Some(StreamFrame::ToolExecuting { tool_name }) if tool_name == "get_current_time"
        )
    );
    assert_eq!(frames.last(), Some(&StreamFrame::Done));

    let content: String = frames
        .iter()
        .filter_map(|f| {
            match f {
                StreamFrame::Content { content } => Some(content.as_str()),
                _ => None,
            }
        })
        .collect();
    assert_eq!(content, final_answer);

    // Fixed chunk size: every content frame but the last is full-sized.
    let chunks: Vec<&StreamFrame> = frames
        .iter()
        .filter(|f| matches!(f, StreamFrame::Content { .. }))
        .collect();
    for frame in &chunks[..chunks.len() - 1] {
        if let StreamFrame::Content { content } = frame {
            assert_eq!(content.chars().count(), agent.stream_chunk_size());
        }
    }
}

#[tokio::test]
async fn stream_failure_emits_error_and_no_done() {
    let (agent, _client) = agent_with(vec![upstream_failure()], empty_store());

    let mut rx = agent.chat_stream(None, "hi".to_string());
    let mut frames = Vec::new();
    while let Some(frame) = rx.recv().await {
        frames.push(frame);
    }

    assert!(matches!(frames.first(), Some(StreamFrame::Session { .. })));
    assert!(matches!(frames.last(), Some(StreamFrame::Error { .. })));
    assert!(!frames.iter().any(|f| matches!(f, StreamFrame::Done)));
}
