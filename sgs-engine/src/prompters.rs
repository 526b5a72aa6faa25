use std::fmt::{self, Debug, Display};

use dialoguer::{FuzzySelect, MultiSelect};
use iter_tools::Itertools;
use rand::{seq::IteratorRandom, thread_rng, Rng};
use tracing::{info, warn};

use crate::client::DecisionProvider;
use crate::events::{Answer, Question};

#[derive(Debug, Default)]
pub struct DefaultPrompter {}
impl DefaultPrompter {
    pub fn new() -> Self {
        DefaultPrompter {}
    }
}

impl Prompter for DefaultPrompter {
    fn prompt_choice<T: ToString>(&mut self, text: &str, choices: Vec<T>) -> T {
        info!("choosing first choice for: {text}");
        self.print_choices(&choices);

        let c = choices
            .into_iter()
            .next()
            .expect("always at least one choice");
        info!("{}", c.to_string());
        c
    }

    fn prompt_multi_choices<T: ToString>(
        &mut self,
        text: &str,
        choices: Vec<T>,
        min: usize,
        _max: usize,
    ) -> Vec<T> {
        info!("choosing first choices for: {text}");
        self.print_choices(&choices);

        let c: Vec<_> = choices.into_iter().take(min).collect();
        info!("{}", c.iter().map(T::to_string).collect_vec().join(", "));
        c
    }
}

#[derive(Debug, Default)]
pub struct RandomPrompter {}
impl RandomPrompter {
    pub fn new() -> Self {
        RandomPrompter {}
    }
}

impl Prompter for RandomPrompter {
    fn prompt_choice<T: ToString>(&mut self, text: &str, choices: Vec<T>) -> T {
        info!("choosing random choice for: {text}");
        self.print_choices(&choices);

        let c = choices
            .into_iter()
            .choose(&mut thread_rng())
            .expect("always at least one choice");
        info!("{}", c.to_string());
        c
    }

    fn prompt_multi_choices<T: ToString>(
        &mut self,
        text: &str,
        choices: Vec<T>,
        min: usize,
        max: usize,
    ) -> Vec<T> {
        info!("choosing random choices for: {text}");
        self.print_choices(&choices);

        let max = max.min(choices.len());
        let min = min.min(max);

        let c = choices
            .into_iter()
            .choose_multiple(&mut thread_rng(), thread_rng().gen_range(min..=max));
        info!("{}", c.iter().map(T::to_string).collect_vec().join(", "));
        c
    }
}

/// Replays scripted choice indexes, one slice per question.
#[derive(Debug, Default)]
pub struct BufferedPrompter {
    buffer: Vec<Vec<usize>>,
}
impl BufferedPrompter {
    pub fn new(buffer: &[&[usize]]) -> Self {
        BufferedPrompter {
            buffer: buffer
                .iter()
                .map(|b| b.iter().copied().collect_vec())
                .collect_vec(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Prompter for BufferedPrompter {
    fn prompt_choice<T: ToString>(&mut self, text: &str, mut choices: Vec<T>) -> T {
        info!("choosing buffered choice for: {text}");
        self.print_choices(&choices);

        if self.buffer.is_empty() {
            // scripted answers ran out, stay passive
            return choices.remove(0);
        }
        let mut buf = self.buffer.remove(0);
        assert!(buf.len() == 1);
        let c = choices.remove(buf.remove(0));
        info!("{}", c.to_string());
        c
    }

    fn prompt_multi_choices<T: ToString>(
        &mut self,
        text: &str,
        choices: Vec<T>,
        min: usize,
        max: usize,
    ) -> Vec<T> {
        info!("choosing buffered choices for: {text}");
        self.print_choices(&choices);

        let max = max.min(choices.len());

        if self.buffer.is_empty() {
            return choices.into_iter().take(min).collect();
        }
        let buf = self.buffer.remove(0);
        assert!(buf.len() >= min);
        assert!(buf.len() <= max);
        let c = choices
            .into_iter()
            .enumerate()
            .filter(|(i, _)| buf.contains(i))
            .map(|(_, c)| c)
            .collect_vec();
        info!("{}", c.iter().map(T::to_string).collect_vec().join(", "));
        c
    }
}

/// Asks on the terminal.
#[derive(Debug, Default)]
pub struct CliPrompter {}
impl CliPrompter {
    pub fn new() -> Self {
        CliPrompter {}
    }
}

impl Prompter for CliPrompter {
    fn prompt_choice<T: ToString>(&mut self, text: &str, mut choices: Vec<T>) -> T {
        let items = choices.iter().map(T::to_string).collect_vec();
        let selected = FuzzySelect::new()
            .with_prompt(text)
            .items(&items)
            .default(0)
            .interact()
            .unwrap_or_else(|e| {
                warn!("terminal prompt failed: {e}");
                0
            });
        choices.remove(selected)
    }

    fn prompt_multi_choices<T: ToString>(
        &mut self,
        text: &str,
        choices: Vec<T>,
        min: usize,
        max: usize,
    ) -> Vec<T> {
        let items = choices.iter().map(T::to_string).collect_vec();
        let selected = loop {
            let selected = MultiSelect::new()
                .with_prompt(format!("{text} ({min} to {max})"))
                .items(&items)
                .interact()
                .unwrap_or_else(|e| {
                    warn!("terminal prompt failed: {e}");
                    (0..min).collect()
                });
            if (min..=max).contains(&selected.len()) {
                break selected;
            }
        };
        choices
            .into_iter()
            .enumerate()
            .filter(|(i, _)| selected.contains(i))
            .map(|(_, c)| c)
            .collect_vec()
    }
}

pub trait Prompter: Debug {
    fn prompt_choice<T: ToString>(&mut self, text: &str, choices: Vec<T>) -> T;
    fn prompt_multi_choices<T: ToString>(
        &mut self,
        text: &str,
        choices: Vec<T>,
        min: usize,
        max: usize,
    ) -> Vec<T>;

    fn print_choices<T: ToString>(&mut self, choices: &[T]) {
        info!(
            "options:\n{}",
            choices
                .iter()
                .map(|c| format!("  - {}", c.to_string()))
                .collect_vec()
                .join("\n")
        );
    }
}

/// Declining is always the first choice, so the default prompter stays passive.
enum Pick<T> {
    Pass,
    Take(T),
}

impl<T: Display> Display for Pick<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pick::Pass => f.write_str("pass"),
            Pick::Take(t) => write!(f, "{t}"),
        }
    }
}

fn with_pass<T>(choices: impl IntoIterator<Item = T>) -> Vec<Pick<T>> {
    std::iter::once(Pick::Pass)
        .chain(choices.into_iter().map(Pick::Take))
        .collect()
}

impl<P: Prompter> DecisionProvider for P {
    fn decide(&mut self, question: &Question) -> Answer {
        match question {
            Question::PlayCard { player, options } => {
                let text = format!("{player} play a card:");
                match self.prompt_choice(&text, with_pass(options.iter().cloned())) {
                    Pick::Pass => Answer::Play(None),
                    Pick::Take(option) => Answer::Play(Some(option)),
                }
            }
            Question::RespondCard {
                player,
                prompt,
                candidates,
                ..
            } => {
                let text = format!("{player} respond to {prompt}:");
                match self.prompt_choice(&text, with_pass(candidates.iter().cloned())) {
                    Pick::Pass => Answer::Card(None),
                    Pick::Take(card) => Answer::Card(Some(card.card)),
                }
            }
            Question::Discard {
                player,
                reason,
                amount,
                optional,
                candidates,
            } => {
                let text = format!("{player} discard for {reason}:");
                let min = if *optional {
                    0
                } else {
                    (*amount).min(candidates.len())
                };
                let selected = self
                    .prompt_multi_choices(&text, candidates.clone(), min, *amount)
                    .into_iter()
                    .map(|c| c.card)
                    .collect();
                Answer::Cards(selected)
            }
            Question::PindianCard {
                player,
                reason,
                candidates,
            } => {
                let text = format!("{player} pindian card for {reason}:");
                Answer::Card(Some(self.prompt_choice(&text, candidates.clone()).card))
            }
            Question::Choice {
                player,
                reason,
                choices,
            } => {
                let text = format!("{player} choose for {reason}:");
                Answer::Choice(self.prompt_choice(&text, choices.clone()))
            }
            Question::Invoke { player, skill } => {
                let text = format!("{player} invoke {skill}?");
                Answer::YesNo(self.prompt_choice(&text, vec!["No", "Yes"]) == "Yes")
            }
        }
    }
}
