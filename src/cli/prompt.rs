//! Interactive input for the run command

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use affected::{Depth, Level, Notice, Notifier};

/// Depth and "check previous commit" answers.
pub struct Answers {
    pub depth: Depth,
    pub check_previous: bool,
}

/// Ask for the depth until it parses, then for the toggle.
///
/// Returns `None` if the user cancels with Ctrl+C or Ctrl+D.
pub fn ask(notifier: &dyn Notifier, check_previous: Option<bool>) -> Result<Option<Answers>> {
    let mut editor = DefaultEditor::new()?;

    let depth = loop {
        let Some(line) = read(&mut editor, "Depth level (commits to look back, 1 = uncommitted): ")?
        else {
            return Ok(None);
        };
        match Depth::parse(&line) {
            Ok(d) => break d,
            Err(e) => notifier.notify(&Notice {
                level: Level::Error,
                title: e.title().to_string(),
                body: affected::error::INVALID_DEPTH_MESSAGE.to_string(),
            }),
        }
    };

    let check_previous = match check_previous {
        Some(v) => v,
        None => {
            let Some(line) = read(&mut editor, "Run tests on the previous state first? [y/N]: ")?
            else {
                return Ok(None);
            };
            matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
        }
    };

    Ok(Some(Answers {
        depth,
        check_previous,
    }))
}

fn read(editor: &mut DefaultEditor, prompt: &str) -> Result<Option<String>> {
    match editor.readline(prompt) {
        Ok(line) => Ok(Some(line)),
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
