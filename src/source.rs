//! Rastreo de posiciones en código fuente.
//!
//! Todo el análisis sintáctico opera sobre un cursor inmutable,
//! [`Source`], que asocia el texto original con un desplazamiento en
//! bytes. Cada coincidencia exitosa produce un nuevo cursor; ninguno se
//! modifica en sitio. Los errores que deben reportarse al usuario se
//! acompañan de una [`Location`], la cual traduce ese desplazamiento a
//! línea y columna y conserva la línea afectada para mostrarla.

use std::{
    fmt::{self, Debug, Display, Formatter},
    rc::Rc,
};

/// Ancho de los divisores de tabulador.
const TAB_STOP: u32 = 4;

/// Cursor sobre un texto fuente.
///
/// Invariante: `0 <= offset <= text.len()`, y `offset` siempre cae en
/// una frontera de carácter.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Source<'s> {
    text: &'s str,
    offset: usize,
}

impl<'s> Source<'s> {
    /// Construye un cursor al inicio del texto.
    pub fn new(text: &'s str) -> Self {
        Source { text, offset: 0 }
    }

    /// Texto completo, sin importar la posición del cursor.
    pub fn text(&self) -> &'s str {
        self.text
    }

    /// Desplazamiento en bytes desde el inicio del texto.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Porción del texto que aún no se ha consumido.
    pub fn rest(&self) -> &'s str {
        &self.text[self.offset..]
    }

    /// Cantidad de caracteres sin consumir.
    pub fn remaining(&self) -> usize {
        self.rest().chars().count()
    }

    /// Determina si ya no queda entrada.
    pub fn is_empty(&self) -> bool {
        self.offset == self.text.len()
    }

    /// Produce un nuevo cursor `length` bytes más adelante.
    pub fn advance(self, length: usize) -> Self {
        debug_assert!(self.offset + length <= self.text.len());
        Source {
            text: self.text,
            offset: self.offset + length,
        }
    }

    /// Ubicación legible de este cursor.
    pub fn location(&self) -> Location {
        Location::of(self.text, self.offset)
    }
}

impl Debug for Source<'_> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "Source({}, {:?})", self.offset, self.rest())
    }
}

/// Un objeto cualquiera con una posición original asociada.
#[derive(Debug, Clone)]
pub struct Located<T> {
    location: Location,
    value: T,
}

impl<T> Located<T> {
    /// Obtiene la ubicación.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Descarta la ubicación y toma ownership del valor.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Construye a partir de un valor y una ubicación.
    pub fn at(value: T, location: Location) -> Self {
        Located { value, location }
    }
}

impl<T> AsRef<T> for Located<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

/// Punto exacto de un texto fuente, junto a la línea que lo contiene.
#[derive(Clone, PartialEq, Eq)]
pub struct Location {
    offset: usize,
    position: Position,
    line: Rc<str>,
    prefix: usize,
}

impl Location {
    /// Traduce un desplazamiento en bytes a línea y columna.
    pub fn of(text: &str, offset: usize) -> Self {
        let position = text[..offset]
            .chars()
            .fold(Position::default(), |position, c| match c {
                '\n' => position.newline(),
                '\t' => position.tab(),
                _ => position.advance(),
            });

        let line = text
            .lines()
            .nth(position.line as usize - 1)
            .unwrap_or_default();

        let line_start = text[..offset].rfind('\n').map_or(0, |newline| newline + 1);

        Location {
            offset,
            position,
            line: Rc::from(line),
            prefix: offset - line_start,
        }
    }

    /// Desplazamiento en bytes.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Posición línea-columna.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Contenido de la línea donde se encuentra esta ubicación.
    pub fn line(&self) -> &str {
        &self.line
    }

    /// Porción de la línea que precede a esta ubicación.
    pub fn prefix(&self) -> &str {
        self.line.get(..self.prefix).unwrap_or(&self.line)
    }
}

impl Display for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.position, formatter)
    }
}

impl Debug for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, formatter)
    }
}

/// Una posición línea-columna en un archivo.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Position {
    line: u32,
    column: u32,
}

impl Position {
    /// Obtiene el número de línea.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Obtiene el número de columna.
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Incrementa el número de columna.
    fn advance(self) -> Position {
        Position {
            line: self.line,
            column: self.column + 1,
        }
    }

    /// Incrementa el número de línea y retorna a la columna 1.
    fn newline(self) -> Position {
        Position {
            line: self.line + 1,
            column: 1,
        }
    }

    /// Ajusta la posición a la siguiente columna de tabulador.
    fn tab(self) -> Position {
        let column = 1 + ((self.column - 1) / TAB_STOP + 1) * TAB_STOP;
        Position {
            line: self.line,
            column,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position { line: 1, column: 1 }
    }
}

impl Display for Position {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.line, self.column)
    }
}
