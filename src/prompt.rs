//! Interactive input.
//!
//! Every question the installer asks goes through `Prompter`, so the whole
//! flow can be driven from a script in tests.

use std::collections::VecDeque;

use dialoguer::{Confirm, Input, MultiSelect, Password, Select};

use crate::{error::InstallerError, ui};

pub trait Prompter {
    fn confirm(&mut self, question: &str, default: bool) -> Result<bool, InstallerError>;

    fn input(&mut self, question: &str, default: Option<&str>) -> Result<String, InstallerError>;

    fn select(
        &mut self,
        question: &str,
        items: &[String],
        default: usize,
    ) -> Result<usize, InstallerError>;

    fn multi_select(
        &mut self,
        question: &str,
        items: &[String],
        defaults: &[bool],
    ) -> Result<Vec<usize>, InstallerError>;

    /// Reads a secret, asking twice until both entries match.
    fn password(&mut self, question: &str) -> Result<String, InstallerError>;

    /// Tells the user why their last answer was refused.
    fn reject(&mut self, message: &str) {
        ui::print_error(message);
    }
}

/// Asks `question` until `parse` accepts the answer.
///
/// Rejections are reported through `Prompter::reject` and the question is
/// asked again; only prompt I/O errors end the loop early.
pub fn prompt_until_valid<T>(
    prompter: &mut dyn Prompter,
    question: &str,
    default: Option<&str>,
    mut parse: impl FnMut(&str) -> Result<T, String>,
) -> Result<T, InstallerError> {
    loop {
        let answer = prompter.input(question, default)?;
        match parse(&answer) {
            Ok(value) => return Ok(value),
            Err(reason) => prompter.reject(&reason),
        }
    }
}

/// Password prompt with the minimum-length rule applied in the same loop.
pub fn password_until_valid(
    prompter: &mut dyn Prompter,
    question: &str,
    mut accept: impl FnMut(&str) -> Result<(), String>,
) -> Result<(), InstallerError> {
    loop {
        let secret = prompter.password(question)?;
        match accept(&secret) {
            Ok(()) => return Ok(()),
            Err(reason) => prompter.reject(&reason),
        }
    }
}

// ── Terminal implementation ───────────────────────────────────────────────────

/// Arrow-key prompts on the controlling terminal.
#[derive(Debug, Default)]
pub struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn confirm(&mut self, question: &str, default: bool) -> Result<bool, InstallerError> {
        Ok(Confirm::new()
            .with_prompt(question)
            .default(default)
            .interact()?)
    }

    fn input(&mut self, question: &str, default: Option<&str>) -> Result<String, InstallerError> {
        let mut input = Input::<String>::new().with_prompt(question);
        if let Some(d) = default {
            input = input.default(d.to_string());
        }
        Ok(input.interact_text()?)
    }

    fn select(
        &mut self,
        question: &str,
        items: &[String],
        default: usize,
    ) -> Result<usize, InstallerError> {
        Ok(Select::new()
            .with_prompt(question)
            .items(items)
            .default(default)
            .interact()?)
    }

    fn multi_select(
        &mut self,
        question: &str,
        items: &[String],
        defaults: &[bool],
    ) -> Result<Vec<usize>, InstallerError> {
        Ok(MultiSelect::new()
            .with_prompt(question)
            .items(items)
            .defaults(defaults)
            .interact()?)
    }

    fn password(&mut self, question: &str) -> Result<String, InstallerError> {
        Ok(Password::new()
            .with_prompt(question)
            .with_confirmation("Confirm password", "Passwords do not match, try again.")
            .interact()?)
    }
}

// ── Scripted implementation ───────────────────────────────────────────────────

/// One pre-recorded answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    /// Free text. An empty string takes the prompt's default, like Enter.
    Text(String),
    Choice(usize),
    Choices(Vec<usize>),
}

impl Answer {
    pub fn text(s: &str) -> Self {
        Answer::Text(s.to_string())
    }
}

/// Answers prompts from a fixed queue. Used by the test harness.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<Answer>,
    /// Every question asked, in order.
    pub asked: Vec<String>,
    /// Every rejection reported back to the "user".
    pub rejections: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    fn next(&mut self, question: &str) -> Result<Answer, InstallerError> {
        self.asked.push(question.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| InstallerError::InputExhausted(question.to_string()))
    }

    fn mismatch(question: &str, answer: &Answer) -> InstallerError {
        InstallerError::InputExhausted(format!("{question} (got {answer:?})"))
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, question: &str, _default: bool) -> Result<bool, InstallerError> {
        match self.next(question)? {
            Answer::Yes => Ok(true),
            Answer::No => Ok(false),
            other => Err(Self::mismatch(question, &other)),
        }
    }

    fn input(&mut self, question: &str, default: Option<&str>) -> Result<String, InstallerError> {
        match self.next(question)? {
            Answer::Text(s) if s.is_empty() => Ok(default.unwrap_or_default().to_string()),
            Answer::Text(s) => Ok(s),
            other => Err(Self::mismatch(question, &other)),
        }
    }

    fn select(
        &mut self,
        question: &str,
        items: &[String],
        _default: usize,
    ) -> Result<usize, InstallerError> {
        match self.next(question)? {
            Answer::Choice(i) if i < items.len() => Ok(i),
            other => Err(Self::mismatch(question, &other)),
        }
    }

    fn multi_select(
        &mut self,
        question: &str,
        items: &[String],
        _defaults: &[bool],
    ) -> Result<Vec<usize>, InstallerError> {
        match self.next(question)? {
            Answer::Choices(picked) if picked.iter().all(|&i| i < items.len()) => Ok(picked),
            other => Err(Self::mismatch(question, &other)),
        }
    }

    fn password(&mut self, question: &str) -> Result<String, InstallerError> {
        match self.next(question)? {
            Answer::Text(s) => Ok(s),
            other => Err(Self::mismatch(question, &other)),
        }
    }

    fn reject(&mut self, message: &str) {
        self.rejections.push(message.to_string());
    }
}
