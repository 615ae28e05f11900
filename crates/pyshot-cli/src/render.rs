//! Terminal rendering of lessons, verdicts and variables.
//!
//! Learner-facing text is Spanish, like the lessons themselves.

use std::collections::BTreeMap;
use std::io::{self, Write};

use pyshot_engine::{LessonDefinition, PyshotError, SessionController, SimValue, Verdict};
use serde::Serialize;

/// One row of the lesson list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonEntry<'a> {
    id: &'a str,
    order: usize,
    title: &'a str,
    summary: &'a str,
    unlocked: bool,
    completed: bool,
    current: bool,
}

/// Everything shown for a single lesson.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonDetail<'a> {
    id: &'a str,
    order: usize,
    title: &'a str,
    summary: &'a str,
    theory: &'a str,
    task: &'a str,
    example: &'a str,
    starter_text: &'a str,
}

impl<'a> From<&'a LessonDefinition> for LessonDetail<'a> {
    fn from(lesson: &'a LessonDefinition) -> Self {
        Self {
            id: &lesson.id,
            order: lesson.order,
            title: &lesson.title,
            summary: &lesson.summary,
            theory: &lesson.theory,
            task: &lesson.task,
            example: &lesson.example,
            starter_text: &lesson.starter_text,
        }
    }
}

/// Lesson list rows for `session`, in progression order.
#[must_use]
pub fn lesson_entries(session: &SessionController) -> Vec<LessonEntry<'_>> {
    let progress = session.progress();
    let current = session.status().lesson_id();

    session
        .registry()
        .all()
        .iter()
        .map(|lesson| LessonEntry {
            id: &lesson.id,
            order: lesson.order,
            title: &lesson.title,
            summary: &lesson.summary,
            unlocked: progress.is_unlocked(&lesson.id),
            completed: progress.is_completed(&lesson.id),
            current: current == Some(lesson.id.as_str()),
        })
        .collect()
}

/// Writes `value` as pretty JSON followed by a newline.
pub fn json(out: &mut impl Write, value: &impl Serialize) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)
}

/// Writes a one-line message, or `{"<key>": message}` when `json` is set.
pub fn notice(out: &mut impl Write, json_mode: bool, key: &str, message: &str) -> io::Result<()> {
    if json_mode {
        json(out, &BTreeMap::from([(key, message)]))
    } else {
        writeln!(out, "{message}")
    }
}

/// Writes the lesson list with completion and lock markers.
pub fn lesson_list(out: &mut impl Write, session: &SessionController) -> io::Result<()> {
    let entries = lesson_entries(session);
    let width = entries.iter().map(|e| e.id.len()).max().unwrap_or(0);

    for entry in &entries {
        let pointer = if entry.current { '>' } else { ' ' };
        let mark = match (entry.completed, entry.unlocked) {
            (true, _) => 'x',
            (false, true) => ' ',
            (false, false) => '-',
        };
        writeln!(
            out,
            "{pointer} [{mark}] {:<width$}  {}",
            entry.id, entry.title
        )?;
    }
    writeln!(out, "\n[x] completada  [ ] disponible  [-] bloqueada")
}

/// Writes the theory, example and task of `lesson`.
pub fn lesson(out: &mut impl Write, lesson: &LessonDefinition) -> io::Result<()> {
    writeln!(out, "== {} · {} ==", lesson.id, lesson.title)?;
    if !lesson.summary.is_empty() {
        writeln!(out, "{}", lesson.summary)?;
    }
    if !lesson.theory.is_empty() {
        writeln!(out, "\n{}", lesson.theory)?;
    }
    if !lesson.example.is_empty() {
        writeln!(out, "\nEjemplo:")?;
        for line in lesson.example.lines() {
            writeln!(out, "    {line}")?;
        }
    }
    if !lesson.task.is_empty() {
        writeln!(out, "\nTarea: {}", lesson.task)?;
    }
    Ok(())
}

/// Writes the outcome of an attempt and what it captured.
pub fn verdict(out: &mut impl Write, verdict: &Verdict) -> io::Result<()> {
    let mark = if verdict.passed { "✔" } else { "✘" };
    writeln!(out, "{mark} {}", verdict.feedback)?;
    for (name, value) in &verdict.captured_state {
        writeln!(out, "    {name} = {value}")?;
    }
    Ok(())
}

/// Writes the simulated variable panel.
pub fn variables(out: &mut impl Write, values: &BTreeMap<String, SimValue>) -> io::Result<()> {
    if values.is_empty() {
        return writeln!(out, "(sin variables todavía)");
    }
    let width = values.keys().map(String::len).max().unwrap_or(0);
    for (name, value) in values {
        writeln!(out, "{name:<width$} = {value}")?;
    }
    Ok(())
}

/// Message for an error caused by the learner's choice of lesson.
#[must_use]
pub fn learner_message(error: &PyshotError) -> String {
    match error {
        PyshotError::LessonLocked { .. } => {
            "Nivel bloqueado. Completa la lección anterior para abrirlo.".to_string()
        }
        PyshotError::UnknownLessonId { id } => {
            format!("No existe la lección '{id}'. Escribe `list` para ver las lecciones.")
        }
        other => other.to_string(),
    }
}
