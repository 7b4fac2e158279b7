/// Builds the full prompt sent to the model for one symptom message.
///
/// The instruction block is fixed. The user's raw text comes first, followed
/// by whatever prior conversation the caller decided to forward.
pub fn build_prompt(user_text: &str, prior_context: &str) -> String {
    format!(
        "You are an AI medical assistant. You can provide general medical information and suggestions, \
but you should always clarify that you're not a licensed medical professional and your advice \
should not replace professional medical consultation.

Based on the following symptoms, provide:
1. Possible causes
2. Recommended next steps
3. When they should seek immediate medical attention

User's symptoms: {user_text}

Previous conversation for context:
{prior_context}
"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_sections_in_order() {
        let prompt = build_prompt("sore throat and fever", "User: hi\nAI: hello");

        let persona = prompt.find("not a licensed medical professional").unwrap();
        let causes = prompt.find("1. Possible causes").unwrap();
        let steps = prompt.find("2. Recommended next steps").unwrap();
        let urgent = prompt.find("3. When they should seek immediate medical attention").unwrap();
        let symptoms = prompt.find("User's symptoms: sore throat and fever").unwrap();
        let context = prompt.find("Previous conversation for context:\nUser: hi\nAI: hello").unwrap();

        assert!(persona < causes);
        assert!(causes < steps && steps < urgent);
        assert!(urgent < symptoms);
        assert!(symptoms < context);
    }

    #[test]
    fn test_prompt_with_empty_context() {
        let prompt = build_prompt("headache", "");
        assert!(prompt.ends_with("Previous conversation for context:\n\n"));
    }
}
