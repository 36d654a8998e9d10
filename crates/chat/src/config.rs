use std::time::Duration;

use profai_llm::DEFAULT_MODEL_ID;

use crate::history::SequencePolicy;

pub const DEFAULT_INSTRUCTIONS: &str = "You are an AI Professor. Users ask you to explain or explore AI-related concepts. \
You provide clear, concise, and engaging explanations that help learners grasp complex topics easily. \
Ask clarifying questions if needed, and guide users to think critically. Keep a friendly and approachable tone. \
Give a medium length answer. Try to give a complete answer in a single response when possible. \
Don't mention any religious word. Act like a professor while greeting also.";

pub const DEFAULT_WELCOME_MESSAGE: &str = "## 👨‍🏫 ProfAI: Making Complex AI Concepts Simple\n\
_Ask me anything about AI, machine learning, or data science!_";

pub const DEFAULT_TURN_TIMEOUT: Duration = Duration::from_secs(120);

/// Per-process chat settings, built once at startup and shared by every session.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    pub model_id: String,
    pub instructions: String,
    pub welcome_message: String,
    pub turn_timeout: Option<Duration>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u64>,
    pub sequence_policy: SequencePolicy,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            welcome_message: DEFAULT_WELCOME_MESSAGE.to_string(),
            turn_timeout: Some(DEFAULT_TURN_TIMEOUT),
            temperature: None,
            max_tokens: None,
            sequence_policy: SequencePolicy::default(),
        }
    }
}

impl ChatConfig {
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn with_turn_timeout(mut self, turn_timeout: Option<Duration>) -> Self {
        self.turn_timeout = turn_timeout;
        self
    }
}
