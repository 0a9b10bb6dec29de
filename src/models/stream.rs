use serde::{ Serialize, Deserialize };

/// One frame of the server-to-client streaming protocol. Serialized as
/// `{"type": "...", ...}` and delivered as a `data:` line of the SSE
/// response. Frames are strictly ordered; `Done` is always last on
/// success, `Error` is terminal on failure.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamFrame {
    Session {
        session_id: String,
    },
    ToolCall {
        message: String,
    },
    ToolExecuting {
        tool_name: String,
    },
    Content {
        content: String,
    },
    Done,
    Error {
        error: String,
    },
}

/// Splits an answer into fixed-size chunks for `Content` frames.
/// Chunks are measured in characters, not bytes, so multi-byte text is
/// never split mid-codepoint.
pub fn chunk_content(text: &str, chunk_size: usize) -> Vec<String> {
    let size = chunk_size.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_serialize_with_type_tag() {
        let frame = StreamFrame::Session { session_id: "abc".into() };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "session", "session_id": "abc" }));

        let done = serde_json::to_value(&StreamFrame::Done).unwrap();
        assert_eq!(done, serde_json::json!({ "type": "done" }));
    }

    #[test]
    fn chunking_preserves_order_and_content() {
        let chunks = chunk_content("abcdefghij", 4);
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
        assert_eq!(chunks.concat(), "abcdefghij");
    }

    #[test]
    fn chunking_respects_multibyte_boundaries() {
        let text = "总价约120万元，单价约1.2万/㎡";
        let chunks = chunk_content(text, 5);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 5);
        }
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn empty_answer_yields_no_chunks() {
        assert!(chunk_content("", 20).is_empty());
    }
}
