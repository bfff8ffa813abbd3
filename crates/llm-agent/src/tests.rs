/// Deserialization tests for provider payloads, using bodies shaped like the
/// ones real endpoints return.
#[cfg(test)]
mod unit {
    use crate::types::{ChatMessage, ChatRequest, ChatResponse, MessagesResponse};

    #[test]
    fn parse_chat_completion() {
        let json = r#"{
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "model": "deepseek-chat",
            "choices": [
                {
                    "index": 0,
                    "message": {"role": "assistant", "content": "  {\"feedback\": {}}\n"},
                    "finish_reason": "stop"
                }
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;
        let resp: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.first_text().as_deref(), Some("{\"feedback\": {}}"));
    }

    #[test]
    fn chat_completion_without_choices_has_no_text() {
        let resp: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert_eq!(resp.first_text(), None);
    }

    #[test]
    fn chat_completion_with_null_content_has_no_text() {
        let json = r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#;
        let resp: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.first_text(), None);
    }

    #[test]
    fn chat_request_omits_unset_options() {
        let req = ChatRequest {
            model: "m".into(),
            messages: vec![ChatMessage::user("hi")],
            temperature: None,
            max_tokens: None,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert!(v.get("temperature").is_none());
        assert!(v.get("max_tokens").is_none());
        assert_eq!(v["messages"][0]["role"], "user");
        assert_eq!(v["messages"][0]["content"], "hi");
    }

    #[test]
    fn parse_messages_response_skips_non_text_blocks() {
        let json = r#"{
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "content": [
                {"type": "thinking", "thinking": "..."},
                {"type": "text", "text": "part one "},
                {"type": "text", "text": "part two"}
            ],
            "stop_reason": "end_turn"
        }"#;
        let resp: MessagesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.text(), "part one part two");
    }
}
