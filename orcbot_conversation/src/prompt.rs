use orcbot_core::GenerationRequest;

const PERSONA_PREAMBLE: &str = "
Hey! You are a bot to help engineers with their query through AI in Slack.
You can also make Jira tickets but that's still in development

";

/// Instruction payload for the second completion pass.
///
/// Wraps the knowledge-base answer with persona, transcript and output
/// conventions so the model's reply can be lifted out between two
/// sentinel markers.
#[derive(Debug, Clone)]
pub struct SmartPrompt<'a> {
    request: &'a GenerationRequest,
    sentinel: &'a str,
}

impl<'a> SmartPrompt<'a> {
    #[must_use]
    pub const fn new(request: &'a GenerationRequest, sentinel: &'a str) -> Self {
        Self { request, sentinel }
    }

    #[must_use]
    pub fn render(&self) -> String {
        let sentinel = self.sentinel;
        format!(
            "{PERSONA_PREAMBLE}\nConversation History:\n```\n{}\n```\n\
             The question from `{}` is: {}\n\
             The answer from knowledge base is: {}\n\
             Please provide your own answer to the question with all of your knowledge \
             (including Kubernetes knowledge and YAML examples and team knowledge) using answer \
             from the knowledge base as fact and do it with a hint of sarcasm. \
             Please put the response between two {sentinel} so it can be sent directly back \
             (not {sentinel}:). Also only use ``` blocks for examples of YAML code.",
            self.request.history, self.request.user, self.request.prompt, self.request.knowledge_answer,
        )
    }
}
