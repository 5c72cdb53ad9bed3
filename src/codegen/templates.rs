//! Macro substitution over template files.
//!
//! Templates contain `${{MacroName}}` placeholders. Substitution preserves
//! indentation: when a replacement spans several lines, every line after
//! the first is prefixed with the tab indentation that preceded the
//! opening `${{` on its line.

use indexmap::IndexMap;

use crate::errors::GenerationError;

/// Substitute every `${{...}}` in `source` from `macros`, appending the
/// result to `output`.
pub fn macro_write(
    source: &str,
    macros: &IndexMap<String, String>,
    output: &mut String,
) -> Result<(), GenerationError> {
    let mut cursor = 0;
    let mut last_indentation = 0;

    while let Some(relative) = source[cursor..].find("${{") {
        let start = cursor + relative;
        let end = source[start..]
            .find("}}")
            .map(|offset| start + offset)
            .ok_or(GenerationError::UnmatchedMacroDelimiter)?;
        let name = &source[start + 3..end];
        let replacement = macros.get(name).ok_or_else(|| GenerationError::UnknownMacro {
            name: name.to_string(),
        })?;

        let preceding = &source[cursor..start];
        output.push_str(preceding);

        // tabs between the last newline and the macro; text other than
        // tabs voids the indentation for this occurrence
        if !preceding.is_empty() {
            let mut current = 0;
            let mut saw_newline = false;
            for character in preceding.chars().rev() {
                match character {
                    '\t' => current += 1,
                    '\n' => {
                        saw_newline = true;
                        break;
                    }
                    _ => current = 0,
                }
            }
            if saw_newline {
                last_indentation = current;
            }
        }

        if last_indentation > 0 {
            let indentation = "\t".repeat(last_indentation);
            for (index, line) in replacement.split('\n').enumerate() {
                if index > 0 {
                    output.push('\n');
                    output.push_str(&indentation);
                }
                output.push_str(line);
            }
        } else {
            output.push_str(replacement);
        }

        cursor = end + 2;
    }

    output.push_str(&source[cursor..]);
    Ok(())
}
