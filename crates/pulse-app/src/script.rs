//! Line-oriented input scripts for driving the globe without a window.
//!
//! ```text
//! # comments and blank lines are ignored
//! load 800 600
//! threshold 0.4
//! drag 120 -30
//! zoom 0.8
//! resize 400 300
//! tick
//! wait
//! ```

use std::str::FromStr;

/// One scripted input event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// First viewport layout.
    Load { width: u32, height: u32 },
    Resize { width: u32, height: u32 },
    /// Move the threshold control to a position in `[0, 1]`.
    Threshold(f64),
    /// Pointer drag in pixels.
    Drag { dx: f32, dy: f32 },
    Zoom(f32),
    /// Re-read the clock.
    Tick,
    /// Block until pending textures have loaded.
    Wait,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScriptError {
    #[error("line {line}: unknown command `{command}`")]
    UnknownCommand { line: usize, command: String },

    #[error("line {line}: `{command}` is missing its {argument} argument")]
    MissingArgument {
        line: usize,
        command: &'static str,
        argument: &'static str,
    },

    #[error("line {line}: invalid {argument} `{value}`")]
    InvalidArgument {
        line: usize,
        argument: &'static str,
        value: String,
    },

    #[error("line {line}: unexpected argument `{value}`")]
    UnexpectedArgument { line: usize, value: String },
}

/// Parse one line. Returns `Ok(None)` for blank lines and comments.
pub fn parse_line(line: usize, text: &str) -> Result<Option<Command>, ScriptError> {
    let text = text.split('#').next().unwrap_or_default().trim();
    let mut words = text.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let mut args = Args {
        line,
        command: "",
        words,
    };

    let command = match head.to_ascii_lowercase().as_str() {
        "load" => {
            args.command = "load";
            Command::Load {
                width: args.next("width")?,
                height: args.next("height")?,
            }
        }
        "resize" => {
            args.command = "resize";
            Command::Resize {
                width: args.next("width")?,
                height: args.next("height")?,
            }
        }
        "threshold" => {
            args.command = "threshold";
            Command::Threshold(args.next("value")?)
        }
        "drag" => {
            args.command = "drag";
            Command::Drag {
                dx: args.next("dx")?,
                dy: args.next("dy")?,
            }
        }
        "zoom" => {
            args.command = "zoom";
            Command::Zoom(args.next("factor")?)
        }
        "tick" => Command::Tick,
        "wait" => Command::Wait,
        other => {
            return Err(ScriptError::UnknownCommand {
                line,
                command: other.to_string(),
            });
        }
    };
    args.finish()?;
    Ok(Some(command))
}

/// Parse a whole script. Line numbers in errors are 1-based.
pub fn parse_script(source: &str) -> Result<Vec<Command>, ScriptError> {
    source
        .lines()
        .enumerate()
        .filter_map(|(index, text)| parse_line(index + 1, text).transpose())
        .collect()
}

struct Args<'a> {
    line: usize,
    command: &'static str,
    words: std::str::SplitWhitespace<'a>,
}

impl Args<'_> {
    fn next<T: FromStr>(&mut self, argument: &'static str) -> Result<T, ScriptError> {
        let value = self.words.next().ok_or(ScriptError::MissingArgument {
            line: self.line,
            command: self.command,
            argument,
        })?;
        value.parse().map_err(|_| ScriptError::InvalidArgument {
            line: self.line,
            argument,
            value: value.to_string(),
        })
    }

    fn finish(mut self) -> Result<(), ScriptError> {
        match self.words.next() {
            Some(extra) => Err(ScriptError::UnexpectedArgument {
                line: self.line,
                value: extra.to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        let script = "\
# startup
load 800 600

threshold 0.4   # mid-range
DRAG 12.5 -3
zoom 0.8
resize 400 300
tick
wait
";
        let commands = parse_script(script).unwrap();
        assert_eq!(
            commands,
            vec![
                Command::Load {
                    width: 800,
                    height: 600
                },
                Command::Threshold(0.4),
                Command::Drag { dx: 12.5, dy: -3.0 },
                Command::Zoom(0.8),
                Command::Resize {
                    width: 400,
                    height: 300
                },
                Command::Tick,
                Command::Wait,
            ]
        );
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        assert_eq!(
            parse_script("load 1 1\nspin 3"),
            Err(ScriptError::UnknownCommand {
                line: 2,
                command: "spin".into()
            })
        );
        assert_eq!(
            parse_line(4, "resize 10"),
            Err(ScriptError::MissingArgument {
                line: 4,
                command: "resize",
                argument: "height"
            })
        );
        assert_eq!(
            parse_line(1, "load -5 10"),
            Err(ScriptError::InvalidArgument {
                line: 1,
                argument: "width",
                value: "-5".into()
            })
        );
        assert_eq!(
            parse_line(9, "tick now"),
            Err(ScriptError::UnexpectedArgument {
                line: 9,
                value: "now".into()
            })
        );
    }

    #[test]
    fn test_error_message() {
        let err = parse_line(3, "threshold high").unwrap_err();
        assert_eq!(err.to_string(), "line 3: invalid value `high`");
    }
}
