//! Grounding prompt construction

use crate::generate::ChatMessage;

/// Answer the model is told to give when the context does not cover the question
pub const FALLBACK_ANSWER: &str =
    "Sorry I had trouble answering this question, based on the information I found.";

/// System instruction that restricts the model to the retrieved context
pub fn system_instruction() -> String {
    format!(
        "Read the context below and answer the question. If the question cannot be \
         answered based on the context alone or the context does not explicitly say \
         the answer to the question, respond \"{}\"",
        FALLBACK_ANSWER
    )
}

/// Build the two-message conversation for a question and its context.
///
/// An empty `context` is passed through as-is; the instruction then steers
/// the model to [`FALLBACK_ANSWER`].
pub fn grounded_messages(context: &str, question: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_instruction()),
        ChatMessage::user(format!(
            "Context: \"{}\"\n\nQuestion: \"{}\"",
            context, question
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::Role;

    #[test]
    fn test_grounded_messages_layout() {
        let messages = grounded_messages("The sky is blue.", "What color is the sky?");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains(FALLBACK_ANSWER));
        assert!(messages[0]
            .content
            .starts_with("Read the context below and answer the question."));

        assert_eq!(messages[1].role, Role::User);
        assert_eq!(
            messages[1].content,
            "Context: \"The sky is blue.\"\n\nQuestion: \"What color is the sky?\""
        );
    }

    #[test]
    fn test_empty_context() {
        let messages = grounded_messages("", "Anything?");
        assert_eq!(messages[1].content, "Context: \"\"\n\nQuestion: \"Anything?\"");
    }
}
