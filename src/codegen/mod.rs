//! Generación de código ensamblador ARM.
//!
//! # Convenciones
//! Toda expresión deja su resultado en `r0`. Los valores intermedios
//! se guardan en la pila como pares `{r0, ip}` para preservar el
//! alineamiento de 8 bytes. Los primeros cuatro argumentos de una
//! llamada viajan en `r0`-`r3`; no se soportan más.
//!
//! # Recorrido
//! [`Generator::generate()`] despacha de manera exhaustiva sobre el
//! tipo de nodo, de modo que toda variante de [`Ast`] debe tener una
//! regla de traducción. Cada [`Ast::Function`] obtiene su propio
//! [`Environment`], mientras que el contador de etiquetas se comparte
//! durante toda la generación.

use std::{
    fmt::{self, Display},
    io::{self, Write},
};

use thiserror::Error;

use crate::ast::{Ast, BinaryOp};

mod frame;
mod labels;
mod regs;

pub use frame::Environment;
pub use labels::{Label, Labels};

use regs::{Reg, RegList};

// Esta es una arquitectura de 32 bits
const VALUE_SIZE: i32 = 4;

/// Rutina externa que imprime un carácter, usada por `assert`.
const ASSERT_OUTPUT: &str = "putchar";

const ASSERT_PASS: char = '.';
const ASSERT_FAIL: char = 'F';

/// Error de generación de código.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Function `{function}` declares {count} parameters, at most 4 are supported")]
    UnsupportedParameters { function: String, count: usize },

    #[error("Call to `{callee}` passes {count} arguments, at most 4 are supported")]
    UnsupportedArguments { callee: String, count: usize },

    #[error("Function `{function}` declares parameter `{name}` more than once")]
    DuplicateParameter { function: String, name: String },

    #[error("Undefined variable `{0}`")]
    UndefinedVariable(String),

    #[error("I/O error")]
    Io(#[from] io::Error),
}

/// Genera el listado completo de un programa.
pub fn generate(program: &Ast) -> Result<Vec<String>, GenerationError> {
    let mut generator = Generator::default();
    generator.generate(program, &mut Environment::default())?;

    Ok(generator.finish())
}

/// Genera un programa y lo escribe línea por línea.
///
/// Si la generación falla no se escribe nada.
pub fn emit<W: Write>(program: &Ast, output: &mut W) -> Result<(), GenerationError> {
    for line in generate(program)? {
        writeln!(output, "{}", line)?;
    }

    Ok(())
}

/// Líneas de ensamblador emitidas hasta el momento.
#[derive(Debug, Default)]
pub struct Listing {
    lines: Vec<String>,
}

impl Listing {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    fn instruction(&mut self, instruction: fmt::Arguments<'_>) {
        self.lines.push(format!("  {}", instruction));
    }

    fn label(&mut self, label: impl Display) {
        self.lines.push(format!("{}:", label));
    }

    fn directive(&mut self, directive: fmt::Arguments<'_>) {
        self.lines.push(directive.to_string());
    }
}

/// Traductor de árboles a ensamblador.
#[derive(Debug, Default)]
pub struct Generator {
    labels: Labels,
    listing: Listing,
}

impl Generator {
    /// Emite el código de un nodo en el entorno dado.
    pub fn generate(&mut self, node: &Ast, env: &mut Environment) -> Result<(), GenerationError> {
        use Ast::*;

        match node {
            Number(value) => emit!(self.listing, "ldr", "r0, ={}", value),

            Id(name) => env.load(name, &mut self.listing)?,

            Not(term) => {
                self.generate(term, env)?;
                emit!(self.listing, "cmp", "r0, #0");
                emit!(self.listing, "moveq", "r0, #1");
                emit!(self.listing, "movne", "r0, #0");
            }

            BinaryOperation {
                left,
                operation,
                right,
            } => self.binary(left, *operation, right, env)?,

            Call { callee, args } => self.call(callee, args, env)?,

            // Salida temprana completa, no depende del epílogo de la función
            Return(term) => {
                self.generate(term, env)?;
                emit!(self.listing, "mov", "sp, fp");
                emit!(self.listing, "pop", "{}", RegList::new([Reg::Fp, Reg::Pc]));
            }

            Block(statements) => {
                for statement in statements {
                    self.generate(statement, env)?;
                }
            }

            If {
                conditional,
                consequence,
                alternative,
            } => self.if_else(conditional, consequence, alternative, env)?,

            While { conditional, body } => {
                let start = self.labels.allocate();
                let end = self.labels.allocate();

                self.listing.label(start);
                self.generate(conditional, env)?;
                emit!(self.listing, "cmp", "r0, #0");
                emit!(self.listing, "beq", "{}", end);
                self.generate(body, env)?;
                emit!(self.listing, "b", "{}", start);
                self.listing.label(end);
            }

            Var { name, value } => {
                self.generate(value, env)?;
                env.push_var(name, &mut self.listing);
            }

            Assign { name, value } => {
                // Se falla antes de emitir cualquier cosa
                env.lookup(name)?;

                self.generate(value, env)?;
                env.store(name, &mut self.listing)?;
            }

            Function {
                name,
                parameters,
                body,
            } => self.function(name, parameters, body)?,

            Assert(condition) => {
                self.generate(condition, env)?;
                emit!(self.listing, "cmp", "r0, #1");
                emit!(self.listing, "moveq", "r0, #'{}'", ASSERT_PASS);
                emit!(self.listing, "movne", "r0, #'{}'", ASSERT_FAIL);
                emit!(self.listing, "bl", "{}", ASSERT_OUTPUT);
            }
        }

        Ok(())
    }

    /// Termina la generación y entrega el listado.
    pub fn finish(self) -> Vec<String> {
        self.listing.lines
    }

    fn function(
        &mut self,
        name: &str,
        parameters: &[String],
        body: &Ast,
    ) -> Result<(), GenerationError> {
        tracing::debug!(function = name, parameters = parameters.len(), "generating function");

        if name == "main" {
            self.listing.directive(format_args!(".global {}", name));
        }

        self.listing.label(name);

        let mut env = Environment::default();
        env.push(name, parameters, &mut self.listing)?;
        self.generate(body, &mut env)?;
        env.free(&mut self.listing);

        // Retorno implícito si el cuerpo no terminó con `return`
        emit!(self.listing, "mov", "r0, #0");
        emit!(self.listing, "pop", "{}", RegList::new([Reg::Fp, Reg::Pc]));

        Ok(())
    }

    fn binary(
        &mut self,
        left: &Ast,
        operation: BinaryOp,
        right: &Ast,
        env: &mut Environment,
    ) -> Result<(), GenerationError> {
        use BinaryOp::*;

        let saved = RegList::new([Reg::R0]).aligned();
        let restored = RegList::new([Reg::R1]).aligned();

        // El orden de evaluación izquierda-derecha es observable
        self.generate(left, env)?;
        emit!(self.listing, "push", "{}", saved);
        self.generate(right, env)?;
        emit!(self.listing, "pop", "{}", restored);

        match operation {
            Add => emit!(self.listing, "add", "r0, r1, r0"),
            Subtract => emit!(self.listing, "sub", "r0, r1, r0"),
            Multiply => emit!(self.listing, "mul", "r0, r1, r0"),
            Divide => emit!(self.listing, "udiv", "r0, r1, r0"),

            Equal | NotEqual => {
                let (if_equal, if_not_equal) = match operation {
                    Equal => (1, 0),
                    _ => (0, 1),
                };

                emit!(self.listing, "cmp", "r1, r0");
                emit!(self.listing, "moveq", "r0, #{}", if_equal);
                emit!(self.listing, "movne", "r0, #{}", if_not_equal);
            }
        }

        Ok(())
    }

    fn call(
        &mut self,
        callee: &str,
        args: &[Ast],
        env: &mut Environment,
    ) -> Result<(), GenerationError> {
        if args.len() > Reg::MAX_ARGS {
            return Err(GenerationError::UnsupportedArguments {
                callee: callee.to_owned(),
                count: args.len(),
            });
        }

        match args {
            [] => (),
            [only] => self.generate(only, env)?,

            // Los argumentos del segundo en adelante se evalúan primero y
            // se guardan en la pila; el primero se evalúa al final
            // directamente en r0 y luego se recuperan los demás
            [first, rest @ ..] => {
                let spilled =
                    RegList::new(Reg::argument_sequence().skip(1).take(rest.len())).aligned();

                emit!(self.listing, "sub", "sp, sp, #{}", spilled.size());
                for (i, arg) in rest.iter().enumerate() {
                    self.generate(arg, env)?;
                    emit!(self.listing, "str", "r0, [sp, #{}]", i as i32 * VALUE_SIZE);
                }

                self.generate(first, env)?;
                emit!(self.listing, "pop", "{}", spilled);
            }
        }

        emit!(self.listing, "bl", "{}", callee);
        Ok(())
    }

    fn if_else(
        &mut self,
        conditional: &Ast,
        consequence: &Ast,
        alternative: &Ast,
        env: &mut Environment,
    ) -> Result<(), GenerationError> {
        // Sin `else`, el final y la alternativa son la misma etiqueta
        let alternative_label = self.labels.allocate();
        let end_label = if alternative.is_empty_block() {
            alternative_label
        } else {
            self.labels.allocate()
        };

        self.generate(conditional, env)?;
        emit!(self.listing, "cmp", "r0, #0");
        emit!(self.listing, "beq", "{}", alternative_label);
        self.generate(consequence, env)?;

        if end_label != alternative_label {
            emit!(self.listing, "b", "{}", end_label);
            self.listing.label(alternative_label);
            self.generate(alternative, env)?;
        }

        self.listing.label(end_label);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp::*;

    fn lines(program: Ast) -> Vec<String> {
        generate(&program).unwrap()
    }

    fn labels_in(lines: &[String]) -> Vec<&str> {
        lines
            .iter()
            .filter(|line| line.starts_with(".L") && line.ends_with(':'))
            .map(String::as_str)
            .collect()
    }

    #[test]
    fn function_with_parameter_and_return() {
        let program = Ast::function(
            "f",
            vec!["a"],
            Ast::Block(vec![Ast::ret(Ast::binary(Ast::id("a"), Add, Ast::Number(1)))]),
        );

        assert_eq!(
            lines(program),
            [
                "f:",
                "  push {fp, lr}",
                "  mov fp, sp",
                "  push {r0, ip}",
                "  ldr r0, [fp, #-8]",
                "  push {r0, ip}",
                "  ldr r0, =1",
                "  pop {r1, ip}",
                "  add r0, r1, r0",
                "  mov sp, fp",
                "  pop {fp, pc}",
                "  mov sp, fp",
                "  mov r0, #0",
                "  pop {fp, pc}",
            ]
        );
    }

    #[test]
    fn only_main_is_global() {
        let main = lines(Ast::function("main", vec![], Ast::Block(vec![])));
        assert_eq!(main[..2], [".global main", "main:"]);

        let other = lines(Ast::function("other", vec![], Ast::Block(vec![])));
        assert_eq!(other[0], "other:");
    }

    #[test]
    fn comparison_sequences() {
        let equal = lines(Ast::binary(Ast::Number(1), Equal, Ast::Number(2)));
        assert_eq!(equal[4..], ["  cmp r1, r0", "  moveq r0, #1", "  movne r0, #0"]);

        let not_equal = lines(Ast::binary(Ast::Number(1), NotEqual, Ast::Number(2)));
        assert_eq!(not_equal[4..], ["  cmp r1, r0", "  moveq r0, #0", "  movne r0, #1"]);
    }

    #[test]
    fn not_produces_a_boolean() {
        assert_eq!(
            lines(Ast::not(Ast::Number(5))),
            ["  ldr r0, =5", "  cmp r0, #0", "  moveq r0, #1", "  movne r0, #0"]
        );
    }

    #[test]
    fn calls_evaluate_the_first_argument_last() {
        let call = Ast::call("f", vec![Ast::Number(1), Ast::Number(2), Ast::Number(3)]);

        assert_eq!(
            lines(call),
            [
                "  sub sp, sp, #8",
                "  ldr r0, =2",
                "  str r0, [sp, #0]",
                "  ldr r0, =3",
                "  str r0, [sp, #4]",
                "  ldr r0, =1",
                "  pop {r1, r2}",
                "  bl f",
            ]
        );
    }

    #[test]
    fn call_slots_are_padded_to_eight_bytes() {
        let two = lines(Ast::call("f", vec![Ast::Number(1), Ast::Number(2)]));
        assert_eq!(two[0], "  sub sp, sp, #8");
        assert_eq!(two[4], "  pop {r1, ip}");

        let four = lines(Ast::call("f", (1..=4).map(Ast::Number).collect()));
        assert_eq!(four[0], "  sub sp, sp, #16");
        assert_eq!(four[four.len() - 2], "  pop {r1, r2, r3, ip}");
    }

    #[test]
    fn trivial_calls() {
        assert_eq!(lines(Ast::call("f", vec![])), ["  bl f"]);
        assert_eq!(
            lines(Ast::call("f", vec![Ast::Number(7)])),
            ["  ldr r0, =7", "  bl f"]
        );
    }

    #[test]
    fn too_many_arguments() {
        let call = Ast::call("f", (1..=5).map(Ast::Number).collect());
        assert!(matches!(
            generate(&call),
            Err(GenerationError::UnsupportedArguments { count: 5, .. })
        ));
    }

    #[test]
    fn too_many_parameters() {
        let function = Ast::function("f", vec!["a", "b", "c", "d", "e"], Ast::Block(vec![]));
        let error = generate(&function).unwrap_err();

        assert!(matches!(
            error,
            GenerationError::UnsupportedParameters { count: 5, .. }
        ));
        assert!(error.to_string().contains("`f`"));
    }

    #[test]
    fn undefined_variables() {
        let error = generate(&Ast::assign("x", Ast::Number(1))).unwrap_err();
        assert!(matches!(&error, GenerationError::UndefinedVariable(name) if name == "x"));
        assert_eq!(error.to_string(), "Undefined variable `x`");

        let read = Ast::function("f", vec![], Ast::Block(vec![Ast::ret(Ast::id("y"))]));
        assert!(matches!(
            generate(&read),
            Err(GenerationError::UndefinedVariable(name)) if name == "y"
        ));
    }

    #[test]
    fn assignment_reuses_the_declared_slot() {
        let program = Ast::function(
            "f",
            vec![],
            Ast::Block(vec![
                Ast::var("x", Ast::Number(1)),
                Ast::assign("x", Ast::Number(2)),
            ]),
        );

        let listing = lines(program);
        assert_eq!(
            listing[3..7],
            ["  ldr r0, =1", "  push {r0, ip}", "  ldr r0, =2", "  str r0, [fp, #-8]"]
        );
    }

    #[test]
    fn if_without_else_uses_one_label() {
        let program = Ast::if_else(Ast::Number(1), Ast::Number(2), Ast::Block(vec![]));
        let listing = lines(program);

        assert_eq!(labels_in(&listing), [".L1:"]);
        assert!(!listing.iter().any(|line| line.starts_with("  b ")));
        assert_eq!(listing[2], "  beq .L1");
    }

    #[test]
    fn if_with_else_jumps_over_the_alternative() {
        let program = Ast::if_else(
            Ast::Number(1),
            Ast::Number(2),
            Ast::Block(vec![Ast::ret(Ast::Number(0))]),
        );

        let listing = lines(program);
        assert_eq!(labels_in(&listing), [".L1:", ".L2:"]);
        assert_eq!(
            listing,
            [
                "  ldr r0, =1",
                "  cmp r0, #0",
                "  beq .L1",
                "  ldr r0, =2",
                "  b .L2",
                ".L1:",
                "  ldr r0, =0",
                "  mov sp, fp",
                "  pop {fp, pc}",
                ".L2:",
            ]
        );
    }

    #[test]
    fn while_is_a_pre_test_loop() {
        let program = Ast::while_loop(Ast::Number(0), Ast::Block(vec![Ast::Number(1)]));

        assert_eq!(
            lines(program),
            [
                ".L1:",
                "  ldr r0, =0",
                "  cmp r0, #0",
                "  beq .L2",
                "  ldr r0, =1",
                "  b .L1",
                ".L2:",
            ]
        );
    }

    #[test]
    fn assert_calls_the_output_routine() {
        assert_eq!(
            lines(Ast::assert(Ast::Number(1))),
            [
                "  ldr r0, =1",
                "  cmp r0, #1",
                "  moveq r0, #'.'",
                "  movne r0, #'F'",
                "  bl putchar",
            ]
        );
    }

    #[test]
    fn labels_are_unique_across_functions() {
        let body = || {
            Ast::Block(vec![Ast::while_loop(Ast::Number(1), Ast::Block(vec![]))])
        };

        let program = Ast::Block(vec![
            Ast::function("f", vec![], body()),
            Ast::function("g", vec![], body()),
        ]);

        assert_eq!(
            labels_in(&lines(program)),
            [".L1:", ".L2:", ".L3:", ".L4:"]
        );
    }

    #[test]
    fn emit_writes_nothing_on_failure() {
        let mut output = Vec::new();
        assert!(emit(&Ast::id("x"), &mut output).is_err());
        assert!(output.is_empty());

        emit(&Ast::Number(3), &mut output).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "  ldr r0, =3\n");
    }
}
