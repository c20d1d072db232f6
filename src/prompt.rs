use std::io::Write;

/// Interactive input used while deleting or tagging.
pub trait Prompter {
    /// Asks a yes/no question. An empty answer yields `default`.
    fn confirm(&mut self, prompt: &str, default: bool) -> bool;

    /// Asks for a line of free text.
    fn ask(&mut self, prompt: &str) -> String;
}

pub struct ConsolePrompter;

impl ConsolePrompter {
    fn read_trimmed(prompt: &str) -> std::io::Result<String> {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        let mut buffer = String::new();

        stdout.write_all(prompt.as_bytes())?;
        stdout.flush()?;

        stdin.read_line(&mut buffer)?;

        Ok(buffer.trim().to_owned())
    }
}

impl Prompter for ConsolePrompter {
    fn confirm(&mut self, prompt: &str, default: bool) -> bool {
        let choices = if default { "(Y/n)" } else { "(y/N)" };

        match Self::read_trimmed(&format!("{} {}: ", prompt, choices)) {
            Ok(answer) => answer_to_bool(&answer, default),
            Err(e) => {
                log::warn!("Could not read answer, using default: {}", e);
                default
            }
        }
    }

    fn ask(&mut self, prompt: &str) -> String {
        Self::read_trimmed(prompt).unwrap_or_else(|e| {
            log::warn!("Could not read input: {}", e);
            String::new()
        })
    }
}

pub fn answer_to_bool(answer: &str, default: bool) -> bool {
    let answer = answer.trim();

    if answer.is_empty() {
        default
    } else {
        answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
    }
}

/// Progress of the delete decision for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Pending,
    Confirmed,
    Declined,
}

#[derive(Debug, Clone, Copy)]
pub struct DeletePolicy {
    pub prompt: bool,
    pub default_confirm: bool,
}

impl Confirmation {
    /// Moves a pending decision to its terminal state. Terminal states are
    /// returned unchanged.
    pub fn decide(self, policy: DeletePolicy, question: &str, prompter: &mut dyn Prompter) -> Confirmation {
        if self != Confirmation::Pending {
            return self;
        }

        let confirmed = if policy.prompt {
            prompter.confirm(question, policy.default_confirm)
        } else {
            policy.default_confirm
        };

        if confirmed {
            Confirmation::Confirmed
        } else {
            Confirmation::Declined
        }
    }
}
