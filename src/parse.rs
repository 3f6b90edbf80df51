//! Análisis sintáctico.
//!
//! La gramática se construye por completo a partir de los combinadores
//! de [`crate::combinator`]. No existe una fase léxica separada: cada
//! token es un patrón seguido de cualquier cantidad de espacios en
//! blanco o comentarios, los cuales se descartan (ver [`token()`]).
//!
//! # Precedencia
//! De menor a mayor: comparación (`==`, `!=`), suma (`+`, `-`),
//! producto (`*`, `/`), negación (`!`) y átomos. Los operadores binarios
//! asocian por la izquierda sin recursión en la gramática, ver [`infix()`].
//!
//! # Recursión
//! `expression` y `statement` son mutuamente recursivas, por lo cual se
//! declaran como [`Forward`] antes de definirse.

use crate::{
    ast::{Ast, BinaryOp},
    combinator::{constant, fail, pattern, sequence, Forward, ParseError, Parser},
    source::Located,
};

thread_local! {
    static GRAMMAR: Grammar = Grammar::new();
}

/// Analiza un programa completo.
pub fn parse(text: &str) -> Result<Ast, Located<ParseError>> {
    tracing::debug!(bytes = text.len(), "parsing program");
    GRAMMAR.with(|grammar| grammar.program.run_to_completion(text))
}

/// Reglas públicas de la gramática.
pub struct Grammar {
    program: Parser<Ast>,
    statement: Parser<Ast>,
    expression: Parser<Ast>,
}

impl Grammar {
    pub fn new() -> Self {
        let expression_forward = Forward::new();
        let statement_forward = Forward::new();

        let rule = expression_rule(expression_forward.parser());
        let expression = expression_forward.define(rule);

        let rule = statement_rule(statement_forward.parser(), expression.clone());
        let statement = statement_forward.define(rule);

        let program = ignored()
            .then(statement.clone().many())
            .map(Ast::Block);

        Grammar {
            program,
            statement,
            expression,
        }
    }

    /// `program := statement*`, con espacios iniciales.
    pub fn program(&self) -> &Parser<Ast> {
        &self.program
    }

    pub fn statement(&self) -> &Parser<Ast> {
        &self.statement
    }

    pub fn expression(&self) -> &Parser<Ast> {
        &self.expression
    }
}

impl Default for Grammar {
    fn default() -> Self {
        Grammar::new()
    }
}

/// Espacios en blanco y comentarios de línea o de bloque.
fn ignored() -> Parser<Vec<String>> {
    let whitespace = pattern(r"\s+");
    let line_comment = pattern(r"//[^\n]*");
    let block_comment = pattern(r"/\*[\s\S]*?\*/");

    whitespace.or(line_comment).or(block_comment).many()
}

/// Un patrón seguido de contenido ignorable, el cual se descarta.
fn token(regex: &str) -> Parser<String> {
    pattern(regex).skip(ignored())
}

/// Token que además recibe un nombre legible para mensajes de error.
fn named(regex: &str, name: &str) -> Parser<String> {
    token(regex).label(name)
}

fn keyword(word: &str) -> Parser<String> {
    named(&format!(r"{}\b", word), &format!("`{}`", word))
}

fn punctuation(symbol: &str) -> Parser<String> {
    named(&regex::escape(symbol), &format!("`{}`", symbol))
}

fn operator(symbol: &str, operation: BinaryOp) -> Parser<BinaryOp> {
    punctuation(symbol).map(move |_| operation)
}

fn identifier() -> Parser<String> {
    named("[a-zA-Z_][a-zA-Z0-9_]*", "identifier")
}

fn number() -> Parser<Ast> {
    named("[0-9]+", "number").bind(|digits| match digits.parse::<u32>() {
        Ok(value) => constant(Ast::Number(value)),
        Err(_) => fail(format!("integer literal `{}` does not fit in a word", digits)),
    })
}

/// `item ("," item)*`, posiblemente vacío.
fn comma_separated<T: Clone + 'static>(item: Parser<T>) -> Parser<Vec<T>> {
    sequence(item.clone(), punctuation(",").then(item).many())
        .map(|(first, rest)| {
            let mut items = vec![first];
            items.extend(rest);
            items
        })
        .maybe()
        .map(Option::unwrap_or_default)
}

/// Operadores binarios asociativos por la izquierda.
///
/// Reconoce un operando y luego cualquier cantidad de pares
/// `(operador, operando)`, plegándolos en orden sobre el lado izquierdo.
fn infix(operator: Parser<BinaryOp>, operand: Parser<Ast>) -> Parser<Ast> {
    sequence(operand.clone(), sequence(operator, operand).many()).map(|(first, rest)| {
        rest.into_iter()
            .fold(first, |left, (operation, right)| Ast::binary(left, operation, right))
    })
}

fn expression_rule(expression: Parser<Ast>) -> Parser<Ast> {
    let parenthesized = punctuation("(")
        .then(expression.clone())
        .skip(punctuation(")"));

    let arguments = punctuation("(")
        .then(comma_separated(expression))
        .skip(punctuation(")"));

    // La llamada debe intentarse antes que el identificador solo
    let call = sequence(identifier(), arguments).map(|(callee, args)| Ast::Call { callee, args });

    let atom = call
        .or(identifier().map(Ast::Id))
        .or(number())
        .or(parenthesized);

    let unary = sequence(punctuation("!").maybe(), atom).map(|(not, term)| match not {
        Some(_) => Ast::not(term),
        None => term,
    });

    let product = infix(
        operator("*", BinaryOp::Multiply).or(operator("/", BinaryOp::Divide)),
        unary,
    );

    let sum = infix(
        operator("+", BinaryOp::Add).or(operator("-", BinaryOp::Subtract)),
        product,
    );

    infix(
        operator("==", BinaryOp::Equal).or(operator("!=", BinaryOp::NotEqual)),
        sum,
    )
}

fn statement_rule(statement: Parser<Ast>, expression: Parser<Ast>) -> Parser<Ast> {
    let semicolon = || punctuation(";");
    let condition = || {
        punctuation("(")
            .then(expression.clone())
            .skip(punctuation(")"))
    };

    let return_statement = keyword("return")
        .then(expression.clone())
        .skip(semicolon())
        .map(Ast::ret);

    let block = punctuation("{")
        .then(statement.clone().many())
        .skip(punctuation("}"))
        .map(Ast::Block);

    let parameters = comma_separated(identifier()).bind(|parameters| {
        let duplicate = parameters
            .iter()
            .enumerate()
            .find(|(i, name)| parameters[..*i].contains(*name))
            .map(|(_, name)| name.clone());

        match duplicate {
            Some(name) => fail(format!("duplicate parameter `{}`", name)),
            None => constant(parameters),
        }
    });

    let function = sequence(
        keyword("function").then(identifier()),
        punctuation("(").then(parameters).skip(punctuation(")")),
    )
    .and(block.clone())
    .map(|(name, parameters, body)| Ast::Function {
        name,
        parameters,
        body: Box::new(body),
    });

    let if_statement = sequence(keyword("if").then(condition()), statement.clone())
        .and(keyword("else").then(statement.clone()).maybe())
        .map(|(conditional, consequence, alternative)| {
            let alternative = alternative.unwrap_or_else(|| Ast::Block(Vec::new()));
            Ast::if_else(conditional, consequence, alternative)
        });

    let while_statement = sequence(keyword("while").then(condition()), statement)
        .map(|(conditional, body)| Ast::while_loop(conditional, body));

    let var = sequence(
        keyword("var").then(identifier()),
        punctuation("=").then(expression.clone()).skip(semicolon()),
    )
    .map(|(name, value)| Ast::var(name, value));

    let assert = keyword("assert")
        .then(condition())
        .skip(semicolon())
        .map(Ast::assert);

    let assignment = sequence(
        identifier(),
        punctuation("=").then(expression.clone()).skip(semicolon()),
    )
    .map(|(name, value)| Ast::assign(name, value));

    let expression_statement = expression.skip(semicolon());

    return_statement
        .or(function)
        .or(if_statement)
        .or(while_statement)
        .or(var)
        .or(assert)
        .or(assignment)
        .or(block)
        .or(expression_statement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp::*;

    fn expr(text: &str) -> Ast {
        Grammar::new().expression().run_to_completion(text).unwrap()
    }

    #[test]
    fn single_expression_statement() {
        assert_eq!(parse("1;").unwrap(), Ast::Block(vec![Ast::Number(1)]));
        assert_ne!(
            parse("1;").unwrap(),
            Ast::Block(vec![Ast::Block(vec![Ast::Number(1)])])
        );
    }

    #[test]
    fn tokens_discard_trailing_whitespace_and_comments() {
        let text = "  // leading\n x /* inline */ + 1 // trailing\n ;";
        let expected = Ast::Block(vec![Ast::binary(Ast::id("x"), Add, Ast::Number(1))]);

        assert_eq!(parse(text).unwrap(), expected);
    }

    #[test]
    fn block_comments_end_at_the_first_terminator() {
        assert_eq!(
            parse("/* a */ 1; /* b */ 2;").unwrap(),
            Ast::Block(vec![Ast::Number(1), Ast::Number(2)])
        );
    }

    #[test]
    fn binary_operators_associate_left() {
        assert_eq!(
            expr("a - b - c"),
            Ast::binary(
                Ast::binary(Ast::id("a"), Subtract, Ast::id("b")),
                Subtract,
                Ast::id("c")
            )
        );
    }

    #[test]
    fn precedence_levels() {
        assert_eq!(
            expr("a + b * c == !d"),
            Ast::binary(
                Ast::binary(
                    Ast::id("a"),
                    Add,
                    Ast::binary(Ast::id("b"), Multiply, Ast::id("c"))
                ),
                Equal,
                Ast::not(Ast::id("d"))
            )
        );

        assert_eq!(
            expr("(a + b) / 2"),
            Ast::binary(
                Ast::binary(Ast::id("a"), Add, Ast::id("b")),
                Divide,
                Ast::Number(2)
            )
        );
    }

    #[test]
    fn calls_and_identifiers() {
        assert_eq!(expr("f()"), Ast::call("f", vec![]));
        assert_eq!(
            expr("f(1, g(x), y)"),
            Ast::call(
                "f",
                vec![Ast::Number(1), Ast::call("g", vec![Ast::id("x")]), Ast::id("y")]
            )
        );
        assert_eq!(expr("f"), Ast::id("f"));
    }

    #[test]
    fn if_without_else_gets_an_empty_alternative() {
        assert_eq!(
            parse("if (x) return 1;").unwrap(),
            Ast::Block(vec![Ast::if_else(
                Ast::id("x"),
                Ast::ret(Ast::Number(1)),
                Ast::Block(vec![])
            )])
        );
    }

    #[test]
    fn dangling_else_binds_to_the_nearest_if() {
        assert_eq!(
            parse("if (a) if (b) 1; else 2;").unwrap(),
            Ast::Block(vec![Ast::if_else(
                Ast::id("a"),
                Ast::if_else(Ast::id("b"), Ast::Number(1), Ast::Number(2)),
                Ast::Block(vec![])
            )])
        );
    }

    #[test]
    fn assignment_and_comparison_are_told_apart() {
        assert_eq!(
            parse("x = 1; x == 1;").unwrap(),
            Ast::Block(vec![
                Ast::assign("x", Ast::Number(1)),
                Ast::binary(Ast::id("x"), Equal, Ast::Number(1)),
            ])
        );
    }

    #[test]
    fn keywords_need_a_word_boundary() {
        assert_eq!(
            parse("returned;").unwrap(),
            Ast::Block(vec![Ast::id("returned")])
        );
    }

    #[test]
    fn assert_statement() {
        assert_eq!(
            parse("assert(1 == 1);").unwrap(),
            Ast::Block(vec![Ast::assert(Ast::binary(
                Ast::Number(1),
                Equal,
                Ast::Number(1)
            ))])
        );
    }

    #[test]
    fn duplicate_parameters_are_rejected() {
        let error = Grammar::new()
            .statement()
            .run_to_completion("function f(a, b, a) { }")
            .unwrap_err();

        assert_eq!(
            error.as_ref(),
            &ParseError::Failed("duplicate parameter `a`".into())
        );
    }

    #[test]
    fn oversized_literals_are_rejected() {
        assert!(Grammar::new()
            .expression()
            .run_to_completion("4294967296")
            .is_err());
        assert_eq!(expr("4294967295"), Ast::Number(u32::MAX));
    }

    #[test]
    fn furthest_failure_is_reported() {
        let error = Grammar::new()
            .statement()
            .run_to_completion("var x = ;")
            .unwrap_err();

        assert_eq!(error.location().offset(), 8);
        assert_eq!(error.as_ref(), &ParseError::Failed("expected identifier".into()));
    }

    #[test]
    fn leftover_input_is_counted() {
        let error = parse("1; )").unwrap_err();

        assert_eq!(error.as_ref(), &ParseError::Unconsumed(1));
        assert_eq!(error.location().offset(), 3);
    }
}
