//! Per-rename confirmation on stdin.

use std::io::{self, BufRead, Write};
use std::path::Path;

use shelfmark_rename::sanitize_filename_base;

/// User decision for one proposed rename.
#[derive(Debug, PartialEq)]
pub enum Decision {
    Yes,
    No,
    Edit(String),
}

/// Ask y/n/e for one rename. `e` prompts for an edited basename; the `.pdf`
/// extension is re-attached. EOF on stdin counts as "no".
pub fn confirm(source: &Path, target_name: &str) -> io::Result<Decision> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{} -> {} [y/n/e]: ", source.display(), target_name);
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            return Ok(Decision::No);
        };
        match line?.trim().to_lowercase().as_str() {
            "y" | "yes" | "" => return Ok(Decision::Yes),
            "n" | "no" => return Ok(Decision::No),
            "e" | "edit" => {
                print!("New basename (without extension): ");
                io::stdout().flush()?;
                let Some(edited) = lines.next() else {
                    return Ok(Decision::No);
                };
                let edited = edited?;
                let base = edited.trim();
                if !base.is_empty() {
                    return Ok(Decision::Edit(format!(
                        "{}.pdf",
                        sanitize_filename_base(base)
                    )));
                }
            }
            other => println!("Unrecognized answer {other:?}; expected y, n, or e"),
        }
    }
}
