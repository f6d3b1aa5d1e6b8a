use once_cell::sync::Lazy;

use super::assist::{ChatRole, ChatTurn};

/// Genre tags offered by the story pane.
pub static GENRES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "noir", "fairy tale", "sci-fi", "horror", "comedy", "romance", "western", "mystery",
    ]
});

/// Story prompt, parameterized by a genre tag.
pub fn story_prompt(title: &str, genre: &str) -> String {
    format!(
        "Write a short {genre} story (three to five paragraphs) inspired by the attached \
         image titled \"{title}\". Stay in genre and end on a strong final line."
    )
}

/// Fixed analysis prompt.
pub fn analysis_prompt(title: &str) -> String {
    format!(
        "Describe the attached image titled \"{title}\": the subject, setting, composition \
         and lighting, plus anything notable or unusual. Keep it to one concise paragraph."
    )
}

/// Chat prompt: the running transcript with the newest user message last.
pub fn chat_prompt(title: &str, transcript: &[ChatTurn]) -> String {
    let mut prompt = format!(
        "You are chatting with a user about the attached image titled \"{title}\". \
         Answer the latest user message, taking the conversation so far into account.\n"
    );
    for turn in transcript {
        let role = match turn.role {
            ChatRole::User => "User",
            ChatRole::Assistant => "Assistant",
        };
        prompt.push_str(&format!("{role}: {}\n", turn.text));
    }
    prompt.push_str("Assistant:");
    prompt
}
