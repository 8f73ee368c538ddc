use std::io::{self, BufRead, StdinLock, Stdout, Write};

use crate::error::{ImportError, Result};

/// Blocking questions to the operator. With `auto_yes` nothing is read.
pub struct Prompter<R, W> {
    input: R,
    output: W,
    auto_yes: bool,
}

impl Prompter<StdinLock<'static>, Stdout> {
    pub fn stdio(auto_yes: bool) -> Self {
        Self::new(io::stdin().lock(), io::stdout(), auto_yes)
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W, auto_yes: bool) -> Self {
        Self {
            input,
            output,
            auto_yes,
        }
    }

    pub fn auto_yes(&self) -> bool {
        self.auto_yes
    }

    fn read_line(&mut self) -> Result<String> {
        self.output
            .flush()
            .map_err(|e| ImportError::io("<stdout>", e))?;
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|e| ImportError::io("<stdin>", e))?;
        if read == 0 {
            return Err(ImportError::Aborted);
        }
        Ok(line.trim().to_string())
    }

    fn say(&mut self, text: &str) -> Result<()> {
        write!(self.output, "{}", text).map_err(|e| ImportError::io("<stdout>", e))
    }

    pub fn confirm(&mut self, question: &str, default: Option<bool>) -> Result<bool> {
        if self.auto_yes {
            return Ok(true);
        }
        loop {
            match default {
                Some(true) => self.say(&format!("{} (Y/n): ", question))?,
                Some(false) | None => self.say(&format!("{} (y/N): ", question))?,
            }
            match self.read_line()?.to_uppercase().as_str() {
                "Y" | "YES" => return Ok(true),
                "N" | "NO" => return Ok(false),
                "" => match default {
                    Some(default) => return Ok(default),
                    None => continue,
                },
                _ => continue,
            }
        }
    }

    /// Free-form answer; an empty reply takes `default`.
    pub fn ask(&mut self, question: &str, default: Option<&str>) -> Result<String> {
        if self.auto_yes {
            return default.map(str::to_string).ok_or_else(|| {
                ImportError::Config(format!("{}: no saved value to use", question))
            });
        }
        loop {
            match default {
                Some(default) => self.say(&format!("{} [{}]>", question, default))?,
                None => self.say(&format!("{}>", question))?,
            }
            let answer = self.read_line()?;
            match (answer.is_empty(), default) {
                (false, _) => return Ok(answer),
                (true, Some(default)) => return Ok(default.to_string()),
                (true, None) => continue,
            }
        }
    }

    /// Numbered menu of volumes; re-asks until a valid number is given.
    pub fn choose<'a>(&mut self, volumes: &'a [String]) -> Result<&'a str> {
        if volumes.is_empty() {
            return Err(ImportError::VolumeProbe("no removable volumes found".to_string()));
        }
        if self.auto_yes {
            return match volumes {
                [only] => Ok(only.as_str()),
                _ => Err(ImportError::Config(
                    "several volumes mounted; pick one with --source".to_string(),
                )),
            };
        }
        self.say("select which disk to import from (or ctrl+c to exit)\n")?;
        for (i, volume) in volumes.iter().enumerate() {
            self.say(&format!("{}) {}\n", i, volume))?;
        }
        loop {
            self.say("enter selection>")?;
            match self.read_line()?.parse::<usize>() {
                Ok(choice) if choice < volumes.len() => return Ok(volumes[choice].as_str()),
                _ => self.say("that was not a valid choice -- press ctrl+c if you want to exit\n")?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new(), false)
    }

    #[test]
    fn confirm_uses_default_and_retries() {
        assert!(prompter("\n").confirm("Copy?", Some(true)).unwrap());
        assert!(!prompter("maybe\nn\n").confirm("Copy?", Some(true)).unwrap());
        assert!(prompter("y\n").confirm("Copy?", None).unwrap());
    }

    #[test]
    fn eof_aborts() {
        assert!(matches!(
            prompter("").confirm("Copy?", None),
            Err(ImportError::Aborted)
        ));
    }

    #[test]
    fn auto_yes_never_reads() {
        let mut p = Prompter::new(Cursor::new(Vec::<u8>::new()), Vec::<u8>::new(), true);
        assert!(p.confirm("Copy?", Some(false)).unwrap());
        assert_eq!(p.ask("Dest", Some("/photos")).unwrap(), "/photos");
        assert!(p.ask("Dest", None).is_err());
        let one = vec!["/Volumes/CARD".to_string()];
        assert_eq!(p.choose(&one).unwrap(), "/Volumes/CARD");
    }

    #[test]
    fn ask_prefers_answer_over_default() {
        assert_eq!(prompter("/other\n").ask("Dest", Some("/photos")).unwrap(), "/other");
        assert_eq!(prompter("\n").ask("Dest", Some("/photos")).unwrap(), "/photos");
    }

    #[test]
    fn choose_reprompts_on_invalid_input() {
        let volumes = vec!["/Volumes/A".to_string(), "/Volumes/B".to_string()];
        let mut p = prompter("x\n7\n1\n");
        assert_eq!(p.choose(&volumes).unwrap(), "/Volumes/B");
        let shown = String::from_utf8(p.output.clone()).unwrap();
        assert!(shown.contains("0) /Volumes/A"));
        assert_eq!(shown.matches("not a valid choice").count(), 2);
    }
}
