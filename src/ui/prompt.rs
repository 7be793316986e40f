// src/ui/prompt.rs
use crate::cert::error::IssueError;
use crossterm::style::Stylize;
use std::{
    fmt,
    io::{BufRead, Write},
    net::IpAddr,
};

/// Input problems the prompt loop recovers from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    EmptyRequiredInput,
    InvalidNumericInput(String),
    InvalidAddress(String),
    InvalidEmail(String),
    InvalidChoice(String),
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyRequiredInput => write!(f, "a value is required"),
            Self::InvalidNumericInput(s) => write!(f, "'{}' is not a positive whole number", s),
            Self::InvalidAddress(s) => write!(f, "'{}' is not a valid IP address", s),
            Self::InvalidEmail(s) => write!(f, "'{}' is not a valid email address", s),
            Self::InvalidChoice(s) => write!(f, "'{}' is not one of the listed options", s),
        }
    }
}

pub fn parse_required(input: &str) -> Result<String, InputError> {
    let value = input.trim();
    if value.is_empty() {
        return Err(InputError::EmptyRequiredInput);
    }
    Ok(value.to_string())
}

pub fn parse_positive_days(input: &str) -> Result<u32, InputError> {
    let value = input.trim();
    match value.parse::<u32>() {
        Ok(days) if days > 0 => Ok(days),
        _ => Err(InputError::InvalidNumericInput(value.to_string())),
    }
}

/// Comma or whitespace separated values, blanks dropped.
pub fn parse_list(input: &str) -> Vec<String> {
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_ip_list(input: &str) -> Result<Vec<String>, InputError> {
    parse_list(input)
        .into_iter()
        .map(|entry| {
            entry
                .parse::<IpAddr>()
                .map(|ip| ip.to_string())
                .map_err(|_| InputError::InvalidAddress(entry))
        })
        .collect()
}

pub fn parse_email(input: &str) -> Result<Option<String>, InputError> {
    let value = input.trim();
    if value.is_empty() {
        return Ok(None);
    }
    match value.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !value.contains(' ') => {
            Ok(Some(value.to_string()))
        }
        _ => Err(InputError::InvalidEmail(value.to_string())),
    }
}

/// Line-oriented prompts over any reader/writer pair.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub fn say(&mut self, message: &str) -> Result<(), IssueError> {
        writeln!(self.output, "{}", message)?;
        Ok(())
    }

    pub fn heading(&mut self, title: &str) -> Result<(), IssueError> {
        writeln!(self.output, "\n{}", title.cyan().bold())?;
        Ok(())
    }

    pub fn warn(&mut self, message: &str) -> Result<(), IssueError> {
        writeln!(self.output, "{} {}", "Warning:".yellow(), message)?;
        Ok(())
    }

    /// One trimmed line; `default` is returned for blank input.
    pub fn ask(&mut self, label: &str, default: Option<&str>) -> Result<String, IssueError> {
        match default {
            Some(d) if !d.is_empty() => write!(self.output, "{} [{}]: ", label, d)?,
            _ => write!(self.output, "{}: ", label)?,
        }
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(IssueError::InputClosed);
        }

        let value = line.trim();
        if value.is_empty() {
            return Ok(default.unwrap_or_default().to_string());
        }
        Ok(value.to_string())
    }

    /// Repeats the question until `parse` accepts the answer.
    pub fn ask_until<T>(
        &mut self,
        label: &str,
        default: Option<&str>,
        parse: impl Fn(&str) -> Result<T, InputError>,
    ) -> Result<T, IssueError> {
        loop {
            let answer = self.ask(label, default)?;
            match parse(&answer) {
                Ok(value) => return Ok(value),
                Err(e) => self.warn(&e.to_string())?,
            }
        }
    }

    pub fn ask_required(&mut self, label: &str, default: Option<&str>) -> Result<String, IssueError> {
        self.ask_until(label, default, parse_required)
    }

    /// Numbered menu; answers are 1-based and blank picks `default_index`.
    pub fn choose<T: Copy>(
        &mut self,
        label: &str,
        options: &[(T, &str)],
        default_index: usize,
    ) -> Result<T, IssueError> {
        writeln!(self.output, "{}", label)?;
        for (i, (_, text)) in options.iter().enumerate() {
            writeln!(self.output, "  {}) {}", i + 1, text)?;
        }
        let default = (default_index + 1).to_string();
        let index = self.ask_until("Select", Some(default.as_str()), |answer| {
            answer
                .parse::<usize>()
                .ok()
                .filter(|n| (1..=options.len()).contains(n))
                .ok_or_else(|| InputError::InvalidChoice(answer.to_string()))
        })?;
        Ok(options[index - 1].0)
    }

    pub fn confirm(&mut self, label: &str, default: bool) -> Result<bool, IssueError> {
        let hint = if default { "Y/n" } else { "y/N" };
        self.ask_until(&format!("{} ({})", label, hint), None, |answer| {
            match answer.to_ascii_lowercase().as_str() {
                "" => Ok(default),
                "y" | "yes" => Ok(true),
                "n" | "no" => Ok(false),
                other => Err(InputError::InvalidChoice(other.to_string())),
            }
        })
    }

    /// Validity in days. Anything but a positive integer falls back to
    /// `default` with a warning.
    pub fn ask_days(&mut self, label: &str, default: u32) -> Result<u32, IssueError> {
        let default_text = default.to_string();
        let answer = self.ask(label, Some(default_text.as_str()))?;
        match parse_positive_days(&answer) {
            Ok(days) => Ok(days),
            Err(e) => {
                self.warn(&format!("{}; using {} days", e, default))?;
                Ok(default)
            }
        }
    }
}
