//! Compilador de un subconjunto de JavaScript a ensamblador ARM.
//!
//! # Front end
//! Cada programa deriva de un único texto fuente. No existe una fase
//! de análisis léxico separada: la gramática en [`parse`] se construye
//! a partir de los combinadores genéricos de [`combinator`], los
//! cuales consumen directamente el texto y descartan espacios y
//! comentarios tras cada token. El resultado es un árbol descrito en
//! [`ast`]. Las ubicaciones en el texto para reportar errores se
//! definen en [`source`].
//!
//! # Back end
//! [`codegen`] recorre el árbol y emite ensamblador ARM de 32 bits en
//! sintaxis GNU, apegado a la convención de llamada de la plataforma
//! en lo que respecta a registros de argumentos y alineamiento de pila.
//! El ensamblado y enlazado se delegan a una toolchain externa.
//!
//! Los errores de ambas fases se presentan al usuario por medio de
//! [`error::Diagnostics`].

#[macro_use]
mod macros;

pub mod ast;
pub mod codegen;
pub mod combinator;
pub mod error;
pub mod parse;
pub mod source;
