//! The interactive tutorial shell.
//!
//! Reads commands line by line. `submit` switches to block input: every
//! following line is part of the attempt until a line holding only `.`.

use std::io::{self, BufRead, Lines, Write};

use pyshot_engine::session::NO_FURTHER_LESSON;
use pyshot_engine::SessionController;

use crate::render;

const PROMPT: &str = "pyshot> ";
const BLOCK_PROMPT: &str = "...     ";
const END_OF_BLOCK: &str = ".";
const NO_LESSON_OPEN: &str = "Ninguna lección abierta. Usa `open <id>`.";

const HELP: &str = "\
Comandos:
  list         lista de lecciones
  open <id>    abre una lección desbloqueada
  show         vuelve a mostrar la lección abierta
  submit       envía código (termina con una línea que solo contenga `.`)
  next         pasa a la siguiente lección
  vars         variables definidas hasta ahora
  reset        borra todo el progreso
  help         esta ayuda
  quit         salir";

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Open(String),
    Show,
    Submit,
    Next,
    Vars,
    Reset,
    Help,
    Quit,
    Empty,
}

impl Command {
    /// Parses one input line.
    ///
    /// # Errors
    ///
    /// Returns the learner-facing message for unknown commands or a missing
    /// `open` argument.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, arg) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(word, arg)| (word, arg.trim()));

        match word {
            "" => Ok(Self::Empty),
            "list" | "ls" => Ok(Self::List),
            "open" if arg.is_empty() => Err("Uso: open <id>".to_string()),
            "open" => Ok(Self::Open(arg.to_string())),
            "show" => Ok(Self::Show),
            "submit" => Ok(Self::Submit),
            "next" => Ok(Self::Next),
            "vars" => Ok(Self::Vars),
            "reset" => Ok(Self::Reset),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(format!("Comando desconocido: `{other}`. Escribe `help`.")),
        }
    }
}

/// Runs the shell until `quit` or end of input.
///
/// With `json`, every state-changing command prints the session view as
/// JSON instead of text, and the output is a stream of JSON values: prompts
/// are not written and messages become `{"error": ...}` or `{"help": ...}`.
///
/// # Errors
///
/// Returns an error only when reading `input` or writing `out` fails.
pub fn run<R: BufRead, W: Write>(
    session: &mut SessionController,
    input: R,
    out: &mut W,
    json: bool,
) -> io::Result<()> {
    let mut lines = input.lines();

    if !json {
        writeln!(out, "Py-SHOT · escribe `help` para ver los comandos.\n")?;
    }
    resume(session, out, json)?;

    loop {
        if !json {
            write!(out, "{PROMPT}")?;
            out.flush()?;
        }

        let Some(line) = lines.next().transpose()? else {
            break;
        };

        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                render::notice(out, json, "error", &message)?;
                continue;
            }
        };
        tracing::debug!(?command, "Shell command");

        match command {
            Command::Empty => {}
            Command::Quit => break,
            Command::Help => render::notice(out, json, "help", HELP)?,
            Command::List if json => render::json(out, &render::lesson_entries(session))?,
            Command::List => render::lesson_list(out, session)?,
            Command::Open(id) => open(session, &id, out, json)?,
            Command::Show => show(session, out, json)?,
            Command::Submit => {
                let text = read_block(&mut lines, out, json)?;
                submit(session, &text, out, json)?;
            }
            Command::Next => next(session, out, json)?,
            Command::Vars if json => render::json(out, &session.variables().snapshot())?,
            Command::Vars => render::variables(out, &session.variables().snapshot())?,
            Command::Reset => {
                let view = session.reset();
                if json {
                    render::json(out, &view)?;
                } else {
                    writeln!(out, "Progreso borrado.")?;
                    resume(session, out, json)?;
                }
            }
        }
    }

    Ok(())
}

/// Opens the furthest unlocked lesson.
fn resume<W: Write>(session: &mut SessionController, out: &mut W, json: bool) -> io::Result<()> {
    let furthest = session
        .registry()
        .all()
        .iter()
        .rev()
        .find(|lesson| session.progress().is_unlocked(&lesson.id))
        .map(|lesson| lesson.id.clone());

    match furthest {
        Some(id) => open(session, &id, out, json),
        None => Ok(()),
    }
}

fn open<W: Write>(
    session: &mut SessionController,
    id: &str,
    out: &mut W,
    json: bool,
) -> io::Result<()> {
    match session.select_lesson(id) {
        Ok(view) if json => render::json(out, &view),
        Ok(_) => show(session, out, json),
        Err(e) => render::notice(out, json, "error", &render::learner_message(&e)),
    }
}

fn show<W: Write>(session: &SessionController, out: &mut W, json: bool) -> io::Result<()> {
    match session.current_lesson() {
        Some(lesson) if json => render::json(out, &render::LessonDetail::from(lesson)),
        Some(lesson) => render::lesson(out, lesson),
        None => render::notice(out, json, "error", NO_LESSON_OPEN),
    }
}

fn submit<W: Write>(
    session: &mut SessionController,
    text: &str,
    out: &mut W,
    json: bool,
) -> io::Result<()> {
    let view = session.submit(text);
    if json {
        return render::json(out, &view);
    }

    let Some(verdict) = &view.verdict else {
        return writeln!(out, "{NO_LESSON_OPEN}");
    };
    render::verdict(out, verdict)?;

    if let Some(error) = &view.persistence_error {
        writeln!(out, "Aviso: no se pudo guardar el progreso ({error}).")?;
    }

    let has_next = view
        .current_lesson_id
        .as_deref()
        .and_then(|id| session.registry().next(id).ok().flatten())
        .is_some();
    if verdict.passed && has_next {
        writeln!(out, "Escribe `next` para continuar.")?;
    }
    Ok(())
}

fn next<W: Write>(session: &mut SessionController, out: &mut W, json: bool) -> io::Result<()> {
    let outcome = session.advance();
    if json {
        return render::json(out, outcome.view());
    }
    if outcome.moved() {
        show(session, out, json)
    } else {
        writeln!(out, "{NO_FURTHER_LESSON}")
    }
}

/// Reads lines up to a lone `.` (or end of input) and joins them.
fn read_block<R: BufRead, W: Write>(
    lines: &mut Lines<R>,
    out: &mut W,
    json: bool,
) -> io::Result<String> {
    let mut block = Vec::new();
    loop {
        if !json {
            write!(out, "{BLOCK_PROMPT}")?;
            out.flush()?;
        }

        match lines.next().transpose()? {
            Some(line) if line.trim_end() == END_OF_BLOCK => break,
            Some(line) => block.push(line),
            None => break,
        }
    }
    Ok(block.join("\n"))
}
