use kestrel_protocol::{Attachment, ContentPart, Message, MessageContent};

/// Builds the content of the new user message and the full provider
/// message list for one turn (spec §4.2 step 3).
pub struct ContextBuilder;

impl ContextBuilder {
    /// Splices `attachments` into `enhanced_text` at their `token`
    /// position when present; attachments without a token — or whose
    /// token doesn't actually occur in the text — are appended as images
    /// after every text part (spec §4.2 step 3).
    ///
    /// Returns a plain `MessageContent::Text` when there are no
    /// attachments at all, since most turns carry none and a bare string
    /// is simpler for every downstream consumer to work with.
    pub fn build_user_content(enhanced_text: &str, attachments: &[Attachment]) -> MessageContent {
        if attachments.is_empty() {
            return MessageContent::Text(enhanced_text.to_string());
        }

        let mut anchored: Vec<(usize, &Attachment)> = Vec::new();
        let mut trailing: Vec<&Attachment> = Vec::new();
        for attachment in attachments {
            match attachment.token.as_deref().and_then(|token| enhanced_text.find(token)) {
                Some(position) => anchored.push((position, attachment)),
                None => trailing.push(attachment),
            }
        }
        anchored.sort_by_key(|(position, _)| *position);

        let mut parts = Vec::new();
        let mut cursor = 0usize;
        for (position, attachment) in &anchored {
            let token_len = attachment.token.as_deref().map(str::len).unwrap_or(0);
            if *position > cursor {
                parts.push(ContentPart::Text { text: enhanced_text[cursor..*position].to_string() });
            }
            parts.push(image_part(attachment));
            cursor = position + token_len;
        }
        if cursor < enhanced_text.len() {
            parts.push(ContentPart::Text { text: enhanced_text[cursor..].to_string() });
        }
        for attachment in trailing {
            parts.push(image_part(attachment));
        }

        MessageContent::Parts(parts)
    }

    /// Assembles the full provider message list: system prompt, then
    /// history in order, then the new user message (spec §4.2 step 3).
    pub fn build_provider_messages(system_prompt: &str, history: &[Message], new_user: &Message) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(system_prompt));
        messages.extend(history.iter().cloned());
        messages.push(new_user.clone());
        messages
    }
}

fn image_part(attachment: &Attachment) -> ContentPart {
    ContentPart::Image {
        data: attachment.data.clone(),
        mime_type: attachment.mime_type.clone(),
        alt_text: attachment.alt_text.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(token: Option<&str>) -> Attachment {
        Attachment {
            data: "base64==".into(),
            mime_type: "image/png".into(),
            alt_text: None,
            token: token.map(str::to_string),
            source: None,
            name: None,
        }
    }

    #[test]
    fn no_attachments_stays_plain_text() {
        let content = ContextBuilder::build_user_content("hello", &[]);
        assert_eq!(content, MessageContent::Text("hello".into()));
    }

    #[test]
    fn splices_at_token_position() {
        let content = ContextBuilder::build_user_content("before [IMG1] after", &[attachment(Some("[IMG1]"))]);
        match content {
            MessageContent::Parts(parts) => {
                assert_eq!(parts.len(), 3);
                assert_eq!(parts[0], ContentPart::Text { text: "before ".into() });
                assert!(matches!(parts[1], ContentPart::Image { .. }));
                assert_eq!(parts[2], ContentPart::Text { text: " after".into() });
            }
            other => panic!("expected parts, got {other:?}"),
        }
    }

    #[test]
    fn untokened_attachment_appended_after_text() {
        let content = ContextBuilder::build_user_content("just text", &[attachment(None)]);
        match content {
            MessageContent::Parts(parts) => {
                assert_eq!(parts.len(), 2);
                assert_eq!(parts[0], ContentPart::Text { text: "just text".into() });
                assert!(matches!(parts[1], ContentPart::Image { .. }));
            }
            other => panic!("expected parts, got {other:?}"),
        }
    }

    #[test]
    fn token_not_present_falls_back_to_trailing() {
        let content = ContextBuilder::build_user_content("no token here", &[attachment(Some("[MISSING]"))]);
        match content {
            MessageContent::Parts(parts) => {
                assert_eq!(parts.len(), 2);
                assert!(matches!(parts[1], ContentPart::Image { .. }));
            }
            other => panic!("expected parts, got {other:?}"),
        }
    }

    #[test]
    fn multiple_tokens_ordered_by_position() {
        let content = ContextBuilder::build_user_content(
            "[A] middle [B]",
            &[attachment(Some("[B]")), attachment(Some("[A]"))],
        );
        match content {
            MessageContent::Parts(parts) => {
                // [A] image, " middle " text, [B] image
                assert!(matches!(parts[0], ContentPart::Image { .. }));
                assert_eq!(parts[1], ContentPart::Text { text: " middle ".into() });
                assert!(matches!(parts[2], ContentPart::Image { .. }));
            }
            other => panic!("expected parts, got {other:?}"),
        }
    }

    #[test]
    fn build_provider_messages_orders_system_history_user() {
        let history = vec![Message::user("prior")];
        let new_user = Message::user("new");
        let messages = ContextBuilder::build_provider_messages("be helpful", &history, &new_user);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content.as_text(), "be helpful");
        assert_eq!(messages[1].content.as_text(), "prior");
        assert_eq!(messages[2].content.as_text(), "new");
    }
}
