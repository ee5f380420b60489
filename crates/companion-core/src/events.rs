/// User intent reported by a front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// Send the given text as a new question.
    Submit(String),
    /// Ask the model to extend its truncated last reply.
    ContinueRequested,
    /// Expand a question template into the draft.
    TemplateSelected(String),
    ClearRequested,
    /// The draft text changed.
    InputChanged(String),
}
