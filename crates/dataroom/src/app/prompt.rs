//! Collecting names and confirmations from the user.

/// Question asked before deleting a node and its descendants.
pub const DELETE_CONFIRMATION: &str = "Are you sure you want to delete this and its contents?";

/// Source of free-form answers and yes/no confirmations.
pub trait Prompter {
    /// Ask for a line of text, offering `initial` as the default answer.
    /// `None` means the user cancelled.
    fn input(&mut self, label: &str, initial: &str) -> Option<String>;

    fn confirm(&mut self, message: &str) -> bool;
}

/// Accepts every default and confirms everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl Prompter for AssumeYes {
    fn input(&mut self, _label: &str, initial: &str) -> Option<String> {
        Some(initial.to_owned())
    }

    fn confirm(&mut self, _message: &str) -> bool {
        true
    }
}

/// Replays canned answers in order; runs out into cancellations.
#[derive(Debug, Default, Clone)]
pub struct ScriptedPrompter {
    answers: Vec<Option<String>>,
    confirmations: Vec<bool>,
    asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, value: Option<&str>) -> Self {
        self.answers.push(value.map(str::to_owned));
        self
    }

    pub fn confirmation(mut self, value: bool) -> Self {
        self.confirmations.push(value);
        self
    }

    /// Labels and messages shown so far.
    pub fn asked(&self) -> &[String] {
        &self.asked
    }
}

impl Prompter for ScriptedPrompter {
    fn input(&mut self, label: &str, _initial: &str) -> Option<String> {
        self.asked.push(label.to_owned());
        if self.answers.is_empty() {
            None
        } else {
            self.answers.remove(0)
        }
    }

    fn confirm(&mut self, message: &str) -> bool {
        self.asked.push(message.to_owned());
        if self.confirmations.is_empty() {
            false
        } else {
            self.confirmations.remove(0)
        }
    }
}
