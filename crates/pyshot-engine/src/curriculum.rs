//! Curriculum loading: the lesson table the registry is built from.
//!
//! A curriculum is either the built-in Python course or a JSON file:
//!
//! ```json
//! {
//!   "lessons": [
//!     { "id": "intro", "title": "Introducción" },
//!     {
//!       "id": "1-1",
//!       "title": "Variables",
//!       "check": { "rules": [{ "kind": "assign", "name": "edad", "value": "25" }] }
//!     }
//!   ]
//! }
//! ```
//!
//! The position in `lessons` is the lesson order. A lesson without `check`
//! is reading-only and passes on any submission.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PyshotError, Result};
use crate::lesson::{LessonDefinition, LessonRegistry};
use crate::rules::Rule;
use crate::validator::RuleSet;

/// Maximum allowed curriculum file size in bytes (256KB).
pub const MAX_CURRICULUM_SIZE: u64 = 256 * 1024;

/// Starter buffer of exercise lessons.
const STARTER: &str = "# Escribe tu código aquí\n";

/// A curriculum as written in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurriculumFile {
    /// Lessons in progression order.
    pub lessons: Vec<LessonConfig>,
}

/// One lesson as written in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonConfig {
    /// Unique lesson id.
    pub id: String,

    /// Title shown in the lesson list.
    pub title: String,

    /// One-line description.
    #[serde(default)]
    pub summary: String,

    /// Explanation of the concept.
    #[serde(default)]
    pub theory: String,

    /// What the learner has to write.
    #[serde(default)]
    pub task: String,

    /// Worked example.
    #[serde(default)]
    pub example: String,

    /// Initial editor content.
    #[serde(default)]
    pub starter_text: String,

    /// How submissions are judged.
    #[serde(default = "RuleSet::acknowledge")]
    pub check: RuleSet,
}

impl LessonConfig {
    fn into_definition(self, order: usize) -> LessonDefinition {
        LessonDefinition::new(self.id, order, self.title, self.check)
            .summary(self.summary)
            .theory(self.theory)
            .task(self.task)
            .example(self.example)
            .starter_text(self.starter_text)
    }

    fn starter(mut self, text: &str) -> Self {
        self.starter_text = text.to_string();
        self
    }
}

impl CurriculumFile {
    /// Builds the registry, numbering lessons by position.
    ///
    /// # Errors
    ///
    /// Returns `PyshotError::InvalidRegistry` for an empty list or bad ids.
    pub fn into_registry(self) -> Result<LessonRegistry> {
        LessonRegistry::new(
            self.lessons
                .into_iter()
                .enumerate()
                .map(|(order, lesson)| lesson.into_definition(order))
                .collect(),
        )
    }

    /// The built-in Python course.
    #[must_use]
    #[allow(clippy::too_many_lines)]
    pub fn builtin() -> Self {
        let lessons = vec![
            lesson(
                "intro",
                "Introducción a Python",
                "¿Qué es Python y para qué sirve?",
                "Python es un lenguaje sencillo y muy usado: automatización, web, datos y \
                 mucho más. En estas lecciones escribirás pequeños fragmentos de código y \
                 Py-SHOT los revisará por ti.",
                "Lee la introducción y envía cualquier respuesta para continuar.",
                "print(\"Hola, bienvenido a Py-SHOT\")",
                RuleSet::acknowledge().success("¡Bienvenido! Ya puedes empezar con las variables."),
            )
            .starter(""),
            lesson(
                "1-1",
                "Variables",
                "Qué es una variable",
                "Una variable es un nombre que guarda un valor. Se crea con `nombre = valor`.",
                "Crea una variable y asígnale un número o un texto.",
                "edad = 20\nnombre = \"Ana\"",
                RuleSet::new(vec![Rule::any_assignment()]).capture_assignments(),
            ),
            lesson(
                "1-2",
                "Tipos de datos",
                "int, float, str y bool",
                "Los tipos más comunes son los enteros (int), los decimales (float), el \
                 texto (str) y los booleanos (bool: True o False).",
                "Escribe un valor de cualquiera de estos tipos, por ejemplo en una variable.",
                "entero = 5\nflotante = 3.14\ntexto = \"hola\"\nactivo = True",
                RuleSet::new(vec![Rule::pattern(
                    r#"["'].*["']|\d+\.\d+|\bTrue\b|\bFalse\b|\b\d+\b"#,
                )
                .on_missing("No se encontró ningún valor: prueba con un número, un texto o True/False.")])
                .capture_assignments(),
            ),
            lesson(
                "1-3",
                "Entrada (input)",
                "Leer datos del usuario",
                "input() muestra un mensaje y devuelve el texto que escribe el usuario.",
                "Usa input() para pedir un dato.",
                "nombre = input(\"Tu nombre: \")\nprint(\"Hola \" + nombre)",
                RuleSet::new(vec![Rule::call("input")]).capture_assignments(),
            ),
            lesson(
                "1-4",
                "Operadores",
                "+, -, *, /",
                "Los operadores aritméticos básicos son +, -, *, / y % (resto).",
                "Escribe una operación aritmética.",
                "a = 4\nb = 2\ntotal = a + b",
                RuleSet::new(vec![
                    Rule::pattern(r"[+\-*/%]").on_missing("Usa al menos un operador: +, -, *, / o %.")
                ])
                .capture_assignments(),
            ),
            lesson(
                "1-5",
                "Comentarios",
                "Documentar código",
                "Los comentarios empiezan con # y Python los ignora.",
                "Escribe un comentario.",
                "# Esto es un comentario",
                RuleSet::new(vec![
                    Rule::pattern("#").on_missing("Los comentarios empiezan con #.")
                ])
                .keep_comments(),
            )
            .starter(""),
            lesson(
                "2-1",
                "Condicionales",
                "if",
                "if ejecuta un bloque de código solo cuando su condición es verdadera.",
                "Escribe un if que, si se cumple, imprima algo con print().",
                "if 5 > 2:\n    print(\"Sí\")",
                RuleSet::new(vec![Rule::within(r"\bif\b[^\n]*:", r"\bprint\s*\(")
                    .on_missing("Falta la línea `if condición:`.")
                    .on_mismatch("El if está, pero falta un print() dentro de su bloque.")])
                .capture_assignments(),
            ),
            lesson(
                "2-2",
                "Bucles for",
                "Repetición con for",
                "for recorre una secuencia elemento a elemento.",
                "Escribe un bucle for.",
                "for i in range(3):\n    print(i)",
                RuleSet::new(vec![Rule::pattern(r"\bfor\b.*\bin\b")
                    .on_missing("Falta un bucle `for elemento in secuencia:`.")])
                .capture_assignments(),
            ),
            lesson(
                "2-3",
                "Break / Continue",
                "Control de bucles",
                "break sale del bucle y continue salta a la siguiente vuelta.",
                "Usa break o continue dentro de un bucle.",
                "for i in range(5):\n    if i==2:\n        break",
                RuleSet::new(vec![Rule::within(
                    r"\b(for|while)\b[^\n]*:",
                    r"\b(break|continue)\b",
                )
                .on_missing("Primero necesitas un bucle for o while.")
                .on_mismatch("El bucle está, pero falta break o continue dentro de él.")])
                .capture_assignments(),
            ),
            lesson(
                "3-1",
                "Listas",
                "Colecciones ordenadas",
                "Las listas se escriben entre corchetes: [1, 2, 3].",
                "Crea una lista.",
                "frutas = [\"manzana\", \"pera\"]",
                RuleSet::new(vec![Rule::pattern(r"\[.*\]")]).capture_assignments(),
            ),
            lesson(
                "3-2",
                "Tuplas",
                "Inmutables",
                "Las tuplas se escriben entre paréntesis y no se pueden modificar.",
                "Crea una tupla con al menos dos elementos.",
                "t = (1, 2, 3)",
                RuleSet::new(vec![Rule::pattern(r"\(.*,.+\)")]).capture_assignments(),
            ),
            lesson(
                "3-3",
                "Diccionarios",
                "Clave → valor",
                "Los diccionarios asocian claves con valores: {\"a\": 1}.",
                "Crea un diccionario.",
                "d = {\"a\": 1, \"b\": 2}",
                RuleSet::new(vec![Rule::pattern(r"\{.*:.*\}")]).capture_assignments(),
            ),
            lesson(
                "3-4",
                "Sets",
                "Sin orden",
                "Un set guarda elementos sin orden y sin duplicados.",
                "Crea un set con llaves o con set().",
                "s = {1, 2, 3}",
                RuleSet::new(vec![Rule::pattern(r"\bset\s*\(|\{[^:]+\}")]).capture_assignments(),
            ),
            lesson(
                "4-1",
                "Funciones",
                "Definir función",
                "Una función se define con `def nombre():` seguido de un bloque.",
                "Define una función.",
                "def saludar():\n    print(\"Hola\")",
                RuleSet::new(vec![Rule::pattern(r"\bdef\b\s+[a-zA-Z_]\w*\s*\(.*\)\s*:")
                    .on_missing("Falta `def nombre():`.")]),
            ),
            lesson(
                "4-2",
                "Parámetros",
                "Argumentos",
                "Los parámetros van entre los paréntesis: def f(x):",
                "Define una función con al menos un parámetro.",
                "def doble(n): return n*2",
                RuleSet::new(vec![Rule::pattern(r"\bdef\b.*\(.*\w.*\)")
                    .on_missing("La función necesita al menos un parámetro entre paréntesis.")]),
            ),
            lesson(
                "4-3",
                "Return",
                "Devolver valor",
                "return termina la función y devuelve un valor a quien la llamó.",
                "Define una función que use return.",
                "def suma(a, b): return a + b",
                RuleSet::new(vec![Rule::within(r"\bdef\b[^\n]*:", r"\breturn\b")
                    .on_missing("Primero define una función con def.")
                    .on_mismatch("La función está, pero falta return en su cuerpo.")]),
            ),
        ];

        Self { lessons }
    }
}

fn lesson(
    id: &str,
    title: &str,
    summary: &str,
    theory: &str,
    task: &str,
    example: &str,
    check: RuleSet,
) -> LessonConfig {
    LessonConfig {
        id: id.to_string(),
        title: title.to_string(),
        summary: summary.to_string(),
        theory: theory.to_string(),
        task: task.to_string(),
        example: example.to_string(),
        starter_text: STARTER.to_string(),
        check,
    }
}

/// The built-in Python course as a registry.
///
/// # Errors
///
/// Never fails in practice; the built-in table is checked like any other.
pub fn builtin() -> Result<LessonRegistry> {
    CurriculumFile::builtin().into_registry()
}

/// Parses a curriculum from JSON text. `origin` is only used in error messages.
///
/// # Errors
///
/// Returns `PyshotError::CurriculumParseError` for malformed JSON and
/// `PyshotError::InvalidRegistry` for a bad lesson table.
pub fn from_json(json: &str, origin: &Path) -> Result<LessonRegistry> {
    let file: CurriculumFile =
        serde_json::from_str(json).map_err(|e| PyshotError::curriculum_parse(origin, e.to_string()))?;
    file.into_registry()
}

/// Loads a curriculum JSON file.
///
/// # Errors
///
/// Returns `PyshotError::CurriculumNotFound` if the file doesn't exist,
/// `PyshotError::CurriculumTooLarge` above 256KB,
/// `PyshotError::CurriculumEncodingError` if it is not UTF-8, and the
/// errors of [`from_json`] for its content.
pub fn load(path: impl AsRef<Path>) -> Result<LessonRegistry> {
    let path = path.as_ref();

    let metadata = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PyshotError::curriculum_not_found(path)
        } else {
            PyshotError::Io(e)
        }
    })?;

    let file_size = metadata.len();
    if file_size > MAX_CURRICULUM_SIZE {
        return Err(PyshotError::curriculum_too_large(path, file_size / 1024));
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::InvalidData {
            PyshotError::curriculum_encoding(path)
        } else {
            PyshotError::Io(e)
        }
    })?;

    let registry = from_json(&content, path)?;
    debug!(path = %path.display(), lessons = registry.len(), "Loaded curriculum");
    Ok(registry)
}

/// Loads `path` if given, otherwise the built-in course.
///
/// # Errors
///
/// See [`load`].
pub fn load_or_builtin(path: Option<&Path>) -> Result<LessonRegistry> {
    path.map_or_else(builtin, load)
}
