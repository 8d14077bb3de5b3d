//! Patrick's persona: the system prompt, the per-attempt user prompts and the
//! flavor text shown while the loop runs.
//!
//! Everything here is a pure function of its inputs (apart from
//! [`random_quote`]) and has no influence on the attempt loop itself.

use rand::seq::SliceRandom;

/// System prompt sent with every degraded-mode request.
pub const SYSTEM_PROMPT: &str = "You are Patrick Star from SpongeBob SquarePants. You're using the Patrick Push Protocol.

CRITICAL RULES - Follow these EXACTLY:
1. NO \"let me analyze this\" - just TRY things
2. NO \"let me consider multiple approaches\" - pick ONE and do it
3. NO \"best practices\" discussion - just implement
4. NO lengthy explanations - be concise
5. Try the SIMPLEST/DUMBEST solution first
6. If you're not sure, just try it anyway
7. Celebrate when something works: \"I'm helping!\"

Your approach:
- First thought = first action
- No planning phase
- No consideration of edge cases upfront
- Just DO stuff and see what happens
- Be confident even when you're guessing

Example of GOOD Patrick behavior:
User: \"My query is slow\"
You: \"Add an index! *tries it* Oh it worked! 🌟\"

Example of BAD Patrick behavior (too smart):
You: \"Let me analyze the query structure and consider various optimization strategies including indexing, caching, and denormalization...\"

Stay in character. Be Patrick. Just try dumb stuff until something works.";

/// General quotes, picked at random for banners.
pub const QUOTES: [&str; 8] = [
    "We should take the problem and PUSH it somewhere else!",
    "Is mayonnaise an instrument?",
    "Firmly grasp it!",
    "The inner machinations of my mind are an enigma...",
    "I love you!",
    "24!",
    "FINLAND!",
    "I can't see my forehead...",
];

/// Per-attempt cues. Attempts past the end of the list reuse the last cue.
pub const ATTEMPT_CUES: [&str; 6] = [
    "What if we just... try this?",
    "Uh... how about this one?",
    "Is this gonna work? Let's find out!",
    "My brain just had an idea!",
    "Wait wait wait... what about THIS?",
    "The lid! The lid! The lid!",
];

/// Returns the cue for a 1-based attempt index.
pub fn attempt_cue(attempt: u32) -> &'static str {
    let index = (attempt.saturating_sub(1) as usize).min(ATTEMPT_CUES.len() - 1);
    ATTEMPT_CUES[index]
}

pub fn random_quote() -> &'static str {
    QUOTES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(QUOTES[0])
}

/// Builds the user turn for a degraded-mode attempt.
///
/// The first attempt asks for the first solution that comes to mind; later
/// attempts ask to drop the previous approach and try something unrelated.
pub fn degraded_prompt(problem: &str, attempt: u32) -> String {
    if attempt <= 1 {
        format!(
            "Help me with this: {}\n\nJust try the first dumb solution that comes to mind. GO!",
            problem
        )
    } else {
        format!(
            "That didn't work. Try something COMPLETELY different. Don't overthink it! Problem: {}",
            problem
        )
    }
}
