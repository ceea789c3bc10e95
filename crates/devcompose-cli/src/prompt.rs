// Copyright (c) Contributors to the devcompose project.
// SPDX-License-Identifier: Apache-2.0

//! Terminal prompts backing the selection and parameter resolvers.

use console::{Term, style};
use devcompose::template::{ServiceGroup, Template};
use devcompose::{Parameter, ParameterResolver, Result, SelectionResolver};

#[cfg(test)]
#[path = "./prompt_test.rs"]
mod prompt_test;

/// Asks for a variant of every open required group.
#[derive(Debug, Clone)]
pub struct PromptSelector {
    term: Term,
}

impl PromptSelector {
    pub fn new(term: Term) -> Self {
        Self { term }
    }
}

impl SelectionResolver for PromptSelector {
    fn choose(&mut self, template: &Template, group: &ServiceGroup) -> Result<Option<String>> {
        let codes = group.codes();
        self.term.write_line(&format!(
            "{} needs a {} service:",
            style(&template.code).bold(),
            style(&group.name).cyan()
        ))?;
        for (index, variant) in group.variants().iter().enumerate() {
            let description = variant.description.as_deref().unwrap_or_default();
            self.term.write_line(&format!(
                "  {}. {}  {}",
                index + 1,
                variant.id.code,
                style(description).dim()
            ))?;
        }
        if codes.is_empty() {
            return Ok(None);
        }
        loop {
            self.term.write_str("Choice [1]: ")?;
            let answer = self.term.read_line()?;
            if let Some(code) = choice_answer(&answer, &codes) {
                return Ok(Some(code));
            }
            self.term.write_line(&format!(
                "{}",
                style(format!("Unknown choice '{}'", answer.trim())).red()
            ))?;
        }
    }
}

/// Code picked by `answer`: empty takes the first, otherwise a 1-based
/// index or a code from `codes`. `None` means ask again.
pub(crate) fn choice_answer(answer: &str, codes: &[String]) -> Option<String> {
    let answer = answer.trim();
    if answer.is_empty() {
        return codes.first().cloned();
    }
    let by_index = answer
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| codes.get(i));
    if let Some(code) = by_index {
        return Some(code.clone());
    }
    codes.iter().find(|c| *c == answer).cloned()
}

/// Secret answer, `None` lets the engine generate a value.
pub(crate) fn secret_answer(answer: &str) -> Option<String> {
    Some(answer.trim().to_string()).filter(|v| !v.is_empty())
}

/// Plain answer, `None` means ask again.
pub(crate) fn value_answer(answer: &str) -> Option<String> {
    Some(answer.trim().to_string()).filter(|v| !v.is_empty())
}

/// Asks for the value of every missing parameter.
///
/// Secrets are read without echo, an empty answer lets the engine
/// generate one.
#[derive(Debug, Clone)]
pub struct PromptResolver {
    term: Term,
}

impl PromptResolver {
    pub fn new(term: Term) -> Self {
        Self { term }
    }
}

impl ParameterResolver for PromptResolver {
    fn resolve(&mut self, parameter: &Parameter) -> Result<Option<String>> {
        self.term.write_line(&format!(
            "{} {}",
            style(&parameter.name).bold(),
            style(format!("(used by {})", parameter.sites())).dim()
        ))?;
        if parameter.is_secret() {
            self.term.write_str("Value (empty to generate): ")?;
            let answer = self.term.read_secure_line()?;
            return Ok(secret_answer(&answer));
        }
        loop {
            self.term.write_str("Value: ")?;
            let answer = self.term.read_line()?;
            if let Some(value) = value_answer(&answer) {
                return Ok(Some(value));
            }
        }
    }
}
