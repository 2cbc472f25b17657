use anyhow::{bail, Result};
use boundary_lesson::TickInput;

/// One parsed line of interactive input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Hold the given keys for `repeat` ticks. Advance applies to the first tick only.
    Ticks {
        /// Keys held.
        input: TickInput,
        /// Number of ticks.
        repeat: u32,
    },
    /// End the session.
    Quit,
}

/// Parses a line like `d w 10`, `space`, or `q`.
///
/// `a`/`d` decrease/increase weight, `s`/`w` decrease/increase bias,
/// `space` or `n` advances, a bare number repeats the tick. An empty line is one idle tick.
pub fn parse_line(line: &str) -> Result<Command> {
    let mut input = TickInput::default();
    let mut repeat = 1_u32;
    for token in line.split_whitespace() {
        match token.to_ascii_lowercase().as_str() {
            "q" | "quit" => return Ok(Command::Quit),
            "space" | "n" | "next" => input.advance = true,
            number if number.chars().all(|c| c.is_ascii_digit()) => {
                repeat = number.parse()?;
                if repeat == 0 {
                    bail!("repeat count must be positive");
                }
            }
            keys => {
                for key in keys.chars() {
                    match key {
                        'a' => input.weight_decrease = true,
                        'd' => input.weight_increase = true,
                        's' => input.bias_decrease = true,
                        'w' => input.bias_increase = true,
                        other => bail!("unknown key {other:?}"),
                    }
                }
            }
        }
    }
    Ok(Command::Ticks { input, repeat })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_held_keys_and_repeat() {
        let Command::Ticks { input, repeat } = parse_line("dw 12").unwrap() else {
            panic!("expected ticks");
        };
        assert!(input.weight_increase && input.bias_increase);
        assert!(!input.advance);
        assert_eq!(repeat, 12);
    }

    #[test]
    fn parses_advance_and_quit() {
        assert!(matches!(
            parse_line("space").unwrap(),
            Command::Ticks { input, repeat: 1 } if input.advance
        ));
        assert_eq!(parse_line("  Q ").unwrap(), Command::Quit);
        assert_eq!(
            parse_line("").unwrap(),
            Command::Ticks {
                input: TickInput::default(),
                repeat: 1
            }
        );
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(parse_line("x").is_err());
        assert!(parse_line("d 0").is_err());
    }
}
