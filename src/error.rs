//! Reporte de errores al usuario.
//!
//! Los errores de análisis sintáctico conocen su ubicación en el
//! código fuente, mientras que los de generación de código no. Ambos
//! se presentan de manera uniforme por medio de [`Diagnostics`].

use crate::{
    codegen::GenerationError,
    source::{Located, Location},
};

use std::{
    error::Error,
    fmt::{self, Display},
};

mod sealed {
    pub trait Sealed {}
}

/// Error que puede reportarse como diagnóstico.
pub trait Diagnostic: sealed::Sealed {
    fn error(&self) -> &dyn Error;
    fn location(&self) -> Option<&Location>;
}

/// Conjunto de errores listo para mostrarse.
pub struct Diagnostics {
    kind: &'static str,
    origin: Option<String>,
    errors: Vec<Box<dyn 'static + Diagnostic>>,
}

impl Diagnostics {
    pub fn kind(self, kind: &'static str) -> Self {
        Diagnostics { kind, ..self }
    }

    /// Nombre del archivo de entrada, se antepone a cada ubicación.
    pub fn origin(self, origin: impl Into<String>) -> Self {
        Diagnostics {
            origin: Some(origin.into()),
            ..self
        }
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Diagnostics {
            kind: "error",
            origin: None,
            errors: Default::default(),
        }
    }
}

impl<E: 'static + Diagnostic> From<E> for Diagnostics {
    fn from(error: E) -> Self {
        Diagnostics {
            errors: vec![Box::new(error)],
            ..Default::default()
        }
    }
}

impl<E: 'static + Diagnostic> From<Vec<E>> for Diagnostics {
    fn from(errors: Vec<E>) -> Self {
        let errors = errors
            .into_iter()
            .map(|error| {
                let error: Box<dyn Diagnostic> = Box::new(error);
                error
            })
            .collect();

        Diagnostics {
            errors,
            ..Default::default()
        }
    }
}

impl Display for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Diagnostics {
            kind,
            origin,
            errors,
        } = self;

        if errors.is_empty() {
            return writeln!(fmt, "No errors were reported");
        }

        for error in errors {
            writeln!(fmt, "{}: {}", kind, error.error())?;

            let location = match (error.location(), origin) {
                (Some(location), _) => location,
                (None, Some(origin)) => {
                    writeln!(fmt, " --> {}", origin)?;
                    writeln!(fmt)?;
                    continue;
                }

                (None, None) => {
                    writeln!(fmt)?;
                    continue;
                }
            };

            match origin {
                Some(origin) => writeln!(fmt, " --> {}:{}", origin, location)?,
                None => writeln!(fmt, " --> {}", location)?,
            }

            let position = location.position();
            let digits = position.line().to_string().len();

            writeln!(fmt, "{:digits$} |", "", digits = digits)?;
            writeln!(
                fmt,
                "{:>digits$} | {}",
                position.line(),
                location.line(),
                digits = digits
            )?;

            // El marcador se alinea con los caracteres reales de la
            // línea, de modo que las tabulaciones se preservan
            let marker: String = location
                .prefix()
                .chars()
                .map(|c| if c == '\t' { '\t' } else { ' ' })
                .collect();

            writeln!(fmt, "{:digits$} | {}^", "", marker, digits = digits)?;
            writeln!(fmt)?;
        }

        let error_or_errors = if errors.len() == 1 { "error" } else { "errors" };
        writeln!(
            fmt,
            "Build failed with {} {}",
            errors.len(),
            error_or_errors
        )
    }
}

impl<E: Error> sealed::Sealed for Located<E> {}

impl<E: Error> Diagnostic for Located<E> {
    fn error(&self) -> &dyn Error {
        self.as_ref()
    }

    fn location(&self) -> Option<&Location> {
        Some(Located::location(self))
    }
}

impl sealed::Sealed for GenerationError {}

impl Diagnostic for GenerationError {
    fn error(&self) -> &dyn Error {
        self
    }

    fn location(&self) -> Option<&Location> {
        None
    }
}
