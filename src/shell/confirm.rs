//! Yes/no confirmation prompt.

use std::io::Write;

use super::input::LineSource;

/// Answer assumed when the operator just presses enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefaultAnswer {
    /// Empty input means yes.
    Yes,
    /// Empty input means no.
    #[default]
    No,
    /// Empty input is rejected and the question asked again.
    None,
}

impl DefaultAnswer {
    fn hint(&self) -> &'static str {
        match self {
            DefaultAnswer::Yes => "[Y/n]",
            DefaultAnswer::No => "[y/N]",
            DefaultAnswer::None => "[y/n]",
        }
    }

    fn value(&self) -> Option<bool> {
        match self {
            DefaultAnswer::Yes => Some(true),
            DefaultAnswer::No => Some(false),
            DefaultAnswer::None => None,
        }
    }
}

const RETRY_HINT: &str = "Please respond with 'yes' or 'no' (or 'y' or 'n').";

fn parse_answer(answer: &str) -> Option<bool> {
    match answer.to_lowercase().as_str() {
        "yes" | "ye" | "y" => Some(true),
        "no" | "n" => Some(false),
        _ => None,
    }
}

/// Ask `Confirm <message>? [y/N]` until the operator gives a usable answer.
///
/// End of input counts as "no".
pub async fn query_yes_no<R, W>(
    message: &str,
    default: DefaultAnswer,
    input: &mut R,
    output: &mut W,
) -> std::io::Result<bool>
where
    R: LineSource,
    W: Write,
{
    let question = format!("Confirm {}? {} ", message, default.hint());
    loop {
        let Some(line) = input.read_line(&question, &mut *output).await? else {
            writeln!(output)?;
            return Ok(false);
        };

        let answer = line.trim();
        let decided = if answer.is_empty() {
            default.value()
        } else {
            parse_answer(answer)
        };

        match decided {
            Some(yes) => return Ok(yes),
            None => writeln!(output, "{}", RETRY_HINT)?,
        }
    }
}
