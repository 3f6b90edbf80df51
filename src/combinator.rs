//! Combinadores de parsers.
//!
//! # Modelo
//! Un [`Parser`] es una función pura de un cursor ([`Source`]) a un
//! [`Outcome`]: éxito con un valor y un nuevo cursor, o un [`Failure`]
//! que registra en qué desplazamiento ocurrió el fallo. Los fallos son
//! valores ordinarios mientras se componen parsers; solo
//! [`Parser::run_to_completion()`] los convierte en un error reportable.
//!
//! # Retroceso
//! [`alternative()`] siempre intenta ambas ramas desde el mismo cursor.
//! Si ambas fallan, se conserva el fallo que avanzó más en la entrada,
//! de manera que una alternación de muchas ramas reporta el error más
//! específico en vez del de la primera rama intentada.
//!
//! # Reglas recursivas
//! Una gramática autorreferente se construye con [`Forward`]: se obtiene
//! primero un parser de indirección, se usa dentro de otras reglas y
//! luego se instala la definición real.

use std::{
    fmt::{self, Debug},
    rc::Rc,
};

use once_cell::unsync::OnceCell;
use regex::Regex;
use thiserror::Error;

use crate::source::{Located, Location, Source};

/// Resultado de aplicar un parser sobre un cursor.
pub type Outcome<'s, T> = Result<(T, Source<'s>), Failure>;

/// Fallo recuperable durante composición de parsers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    message: String,
    offset: usize,
}

impl Failure {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Failure {
            message: message.into(),
            offset,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Desplazamiento donde ocurrió el fallo, no necesariamente el
    /// cursor de entrada del parser que lo propagó.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Elige el fallo más avanzado. En empate gana `self`.
    fn furthest(self, other: Failure) -> Failure {
        if other.offset > self.offset {
            other
        } else {
            self
        }
    }
}

/// Error de análisis sintáctico sobre una entrada completa.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Ninguna alternativa logró reconocer la entrada.
    #[error("{0}")]
    Failed(String),

    /// El parser tuvo éxito, pero sobró texto.
    #[error("{0} characters left unconsumed")]
    Unconsumed(usize),
}

type ParseFn<T> = dyn for<'s> Fn(Source<'s>) -> Outcome<'s, T>;

/// Un parser opaco y clonable.
pub struct Parser<T>(Rc<ParseFn<T>>);

impl<T> Clone for Parser<T> {
    fn clone(&self) -> Self {
        Parser(Rc::clone(&self.0))
    }
}

impl<T> Debug for Parser<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("Parser")
    }
}

impl<T: 'static> Parser<T> {
    /// Construye un parser a partir de una función de análisis.
    pub fn new<F>(parse: F) -> Self
    where
        F: 'static + for<'s> Fn(Source<'s>) -> Outcome<'s, T>,
    {
        Parser(Rc::new(parse))
    }

    /// Aplica el parser sobre un cursor.
    pub fn parse<'s>(&self, source: Source<'s>) -> Outcome<'s, T> {
        (self.0)(source)
    }

    /// Equivalente a [`alternative()`].
    pub fn or(self, other: Parser<T>) -> Parser<T> {
        alternative(self, other)
    }

    /// Aplica el parser repetidamente y acumula sus valores.
    ///
    /// La repetición se detiene en el primer fallo, al alcanzar
    /// `maximum` o cuando un éxito no consume entrada. En este último
    /// caso el valor de ese éxito se conserva una única vez. Si se
    /// acumulan menos de `minimum` valores, se reporta el fallo que
    /// detuvo la repetición.
    pub fn repeat(self, minimum: usize, maximum: Option<usize>) -> Parser<Vec<T>> {
        debug_assert!(maximum.map_or(true, |maximum| minimum <= maximum));

        Parser::new(move |mut source| {
            let mut values = Vec::new();
            let stop = loop {
                if maximum.map_or(false, |maximum| values.len() >= maximum) {
                    break None;
                }

                match self.parse(source) {
                    Ok((value, next)) => {
                        let stalled = next.offset() == source.offset();

                        values.push(value);
                        source = next;

                        if stalled {
                            break Some(Failure::new(
                                "repetition stopped consuming input",
                                source.offset(),
                            ));
                        }
                    }

                    Err(failure) => break Some(failure),
                }
            };

            if values.len() >= minimum {
                return Ok((values, source));
            }

            Err(stop.unwrap_or_else(|| {
                Failure::new("repetition bounds are empty", source.offset())
            }))
        })
    }

    /// Cero o más repeticiones.
    pub fn many(self) -> Parser<Vec<T>> {
        self.repeat(0, None)
    }

    /// Cero o una ocurrencia.
    pub fn maybe(self) -> Parser<Option<T>> {
        self.repeat(0, Some(1)).map(|mut values| values.pop())
    }

    /// Continúa con un parser que depende del valor ya reconocido.
    pub fn bind<U, F>(self, f: F) -> Parser<U>
    where
        U: 'static,
        F: 'static + Fn(T) -> Parser<U>,
    {
        Parser::new(move |source| {
            let (value, source) = self.parse(source)?;
            f(value).parse(source)
        })
    }

    /// Transforma el valor reconocido.
    ///
    /// Semánticamente es `bind(|x| constant(f(x)))`, pero no requiere
    /// que el resultado sea clonable.
    pub fn map<U, F>(self, f: F) -> Parser<U>
    where
        U: 'static,
        F: 'static + Fn(T) -> U,
    {
        Parser::new(move |source| {
            let (value, source) = self.parse(source)?;
            Ok((f(value), source))
        })
    }

    /// Secuencia que descarta el valor de la izquierda.
    pub fn then<U: 'static>(self, next: Parser<U>) -> Parser<U> {
        sequence(self, next).map(|(_, right)| right)
    }

    /// Secuencia que descarta el valor de la derecha.
    pub fn skip<U: 'static>(self, next: Parser<U>) -> Parser<T> {
        sequence(self, next).map(|(left, _)| left)
    }

    /// Extiende una secuencia ya construida con un parser más.
    ///
    /// `sequence(a, b).and(c)` produce `(a, b, c)`, no `((a, b), c)`.
    pub fn and<U>(self, next: Parser<U>) -> Parser<T::Output>
    where
        T: Append<U>,
        T::Output: 'static,
        U: 'static,
    {
        sequence(self, next).map(|(init, last)| init.append(last))
    }

    /// Reemplaza el mensaje de un fallo ocurrido en el cursor inicial.
    ///
    /// Fallos más profundos se propagan intactos, ya que describen
    /// mejor el problema que el nombre de la regla.
    pub fn label(self, expected: &str) -> Parser<T> {
        let message = format!("expected {}", expected);
        Parser::new(move |source| {
            self.parse(source).map_err(|failure| {
                if failure.offset() == source.offset() {
                    Failure::new(message.clone(), failure.offset())
                } else {
                    failure
                }
            })
        })
    }

    /// Analiza un texto completo desde el desplazamiento cero.
    pub fn run_to_completion(&self, text: &str) -> Result<T, Located<ParseError>> {
        match self.parse(Source::new(text)) {
            Ok((value, rest)) if rest.is_empty() => Ok(value),
            Ok((_, rest)) => Err(Located::at(
                ParseError::Unconsumed(rest.remaining()),
                rest.location(),
            )),

            Err(Failure { message, offset }) => Err(Located::at(
                ParseError::Failed(message),
                Location::of(text, offset),
            )),
        }
    }
}

/// Reconoce un texto exacto.
pub fn literal(text: impl Into<String>) -> Parser<String> {
    let text = text.into();
    Parser::new(move |source| {
        if source.rest().starts_with(text.as_str()) {
            Ok((text.clone(), source.advance(text.len())))
        } else {
            Err(Failure::new(format!("expected `{}`", text), source.offset()))
        }
    })
}

/// Reconoce una expresión regular anclada al cursor.
pub fn pattern(regex: &str) -> Parser<String> {
    let anchored = Regex::new(&format!(r"\A(?:{})", regex)).expect("invalid grammar pattern");
    let message = format!("expected /{}/", regex);

    Parser::new(move |source| match anchored.find(source.rest()) {
        Some(found) => Ok((found.as_str().to_owned(), source.advance(found.end()))),
        None => Err(Failure::new(message.clone(), source.offset())),
    })
}

/// Siempre tiene éxito sin consumir entrada.
pub fn constant<T: Clone + 'static>(value: T) -> Parser<T> {
    Parser::new(move |source| Ok((value.clone(), source)))
}

/// Siempre falla en el cursor actual.
pub fn fail<T: 'static>(message: impl Into<String>) -> Parser<T> {
    let message = message.into();
    Parser::new(move |source| Err(Failure::new(message.clone(), source.offset())))
}

/// Aplica dos parsers en orden.
///
/// Si alguno falla, su fallo se propaga sin envolverse.
pub fn sequence<A: 'static, B: 'static>(first: Parser<A>, second: Parser<B>) -> Parser<(A, B)> {
    Parser::new(move |source| {
        let (a, source) = first.parse(source)?;
        let (b, source) = second.parse(source)?;
        Ok(((a, b), source))
    })
}

/// Intenta `first` y, si falla, `second` desde el mismo cursor.
pub fn alternative<T: 'static>(first: Parser<T>, second: Parser<T>) -> Parser<T> {
    Parser::new(move |source| match first.parse(source) {
        Ok(success) => Ok(success),
        Err(left) => second
            .parse(source)
            .map_err(|right| left.furthest(right)),
    })
}

/// Referencia adelantada a una regla que aún no se ha definido.
pub struct Forward<T> {
    cell: Rc<OnceCell<Parser<T>>>,
}

impl<T: 'static> Forward<T> {
    pub fn new() -> Self {
        Forward {
            cell: Rc::new(OnceCell::new()),
        }
    }

    /// Parser de indirección que delega en la definición final.
    pub fn parser(&self) -> Parser<T> {
        let cell = Rc::clone(&self.cell);
        Parser::new(move |source| match cell.get() {
            Some(parser) => parser.parse(source),
            None => Err(Failure::new("reference to an undefined rule", source.offset())),
        })
    }

    /// Instala la definición real y retorna el parser de indirección.
    pub fn define(self, parser: Parser<T>) -> Parser<T> {
        let forward = self.parser();
        let _ = self.cell.set(parser);

        forward
    }
}

impl<T: 'static> Default for Forward<T> {
    fn default() -> Self {
        Forward::new()
    }
}

/// Tuplas que pueden extenderse por la derecha.
pub trait Append<U> {
    type Output;

    fn append(self, last: U) -> Self::Output;
}

macro_rules! impl_append {
    ($($element:ident),+) => {
        impl<$($element,)+ U> Append<U> for ($($element,)+) {
            type Output = ($($element,)+ U);

            #[allow(non_snake_case)]
            fn append(self, last: U) -> Self::Output {
                let ($($element,)+) = self;
                ($($element,)+ last)
            }
        }
    };
}

impl_append!(A, B);
impl_append!(A, B, C);
impl_append!(A, B, C, D);
impl_append!(A, B, C, D, E);
impl_append!(A, B, C, D, E, F);
