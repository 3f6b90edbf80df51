//! Árbol sintáctico abstracto.
//!
//! El árbol es un conjunto cerrado de variantes sin referencias hacia
//! atrás ni estado mutable compartido. La igualdad es estructural y
//! sensible al orden en secuencias.

use std::fmt::{self, Display};

/// Operador binario.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Equal,
    NotEqual,
}

impl Display for BinaryOp {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use BinaryOp::*;

        let string = match self {
            Add => "+",
            Subtract => "-",
            Multiply => "*",
            Divide => "/",
            Equal => "==",
            NotEqual => "!=",
        };

        fmt.write_str(string)
    }
}

/// Nodo del árbol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ast {
    /// Literal entero, una palabra de máquina.
    Number(u32),

    /// Lectura de una variable.
    Id(String),

    /// Negación lógica.
    Not(Box<Ast>),

    BinaryOperation {
        left: Box<Ast>,
        operation: BinaryOp,
        right: Box<Ast>,
    },

    Call {
        callee: String,
        args: Vec<Ast>,
    },

    Return(Box<Ast>),

    Block(Vec<Ast>),

    /// `alternative` es un bloque vacío si no hay `else`.
    If {
        conditional: Box<Ast>,
        consequence: Box<Ast>,
        alternative: Box<Ast>,
    },

    While {
        conditional: Box<Ast>,
        body: Box<Ast>,
    },

    /// Declaración con inicializador.
    Var {
        name: String,
        value: Box<Ast>,
    },

    /// Asignación a una local ya existente.
    Assign {
        name: String,
        value: Box<Ast>,
    },

    Function {
        name: String,
        parameters: Vec<String>,
        body: Box<Ast>,
    },

    /// Primitiva de diagnóstico: imprime `.` o `F` según la condición.
    Assert(Box<Ast>),
}

impl Ast {
    pub fn id(name: impl Into<String>) -> Ast {
        Ast::Id(name.into())
    }

    pub fn not(term: Ast) -> Ast {
        Ast::Not(Box::new(term))
    }

    pub fn binary(left: Ast, operation: BinaryOp, right: Ast) -> Ast {
        Ast::BinaryOperation {
            left: Box::new(left),
            operation,
            right: Box::new(right),
        }
    }

    pub fn call(callee: impl Into<String>, args: Vec<Ast>) -> Ast {
        Ast::Call {
            callee: callee.into(),
            args,
        }
    }

    pub fn ret(term: Ast) -> Ast {
        Ast::Return(Box::new(term))
    }

    pub fn if_else(conditional: Ast, consequence: Ast, alternative: Ast) -> Ast {
        Ast::If {
            conditional: Box::new(conditional),
            consequence: Box::new(consequence),
            alternative: Box::new(alternative),
        }
    }

    pub fn while_loop(conditional: Ast, body: Ast) -> Ast {
        Ast::While {
            conditional: Box::new(conditional),
            body: Box::new(body),
        }
    }

    pub fn var(name: impl Into<String>, value: Ast) -> Ast {
        Ast::Var {
            name: name.into(),
            value: Box::new(value),
        }
    }

    pub fn assign(name: impl Into<String>, value: Ast) -> Ast {
        Ast::Assign {
            name: name.into(),
            value: Box::new(value),
        }
    }

    pub fn function<S: Into<String>>(name: S, parameters: Vec<S>, body: Ast) -> Ast {
        Ast::Function {
            name: name.into(),
            parameters: parameters.into_iter().map(Into::into).collect(),
            body: Box::new(body),
        }
    }

    pub fn assert(condition: Ast) -> Ast {
        Ast::Assert(Box::new(condition))
    }

    /// Determina si este nodo es un bloque sin sentencias.
    pub fn is_empty_block(&self) -> bool {
        matches!(self, Ast::Block(statements) if statements.is_empty())
    }

    fn is_expression(&self) -> bool {
        use Ast::*;
        matches!(
            self,
            Number(_) | Id(_) | Not(_) | BinaryOperation { .. } | Call { .. }
        )
    }
}

/// Imprime un programa como código fuente que vuelve a analizarse
/// al mismo árbol.
///
/// El bloque raíz de un programa no lleva llaves, a diferencia de
/// cualquier otro bloque.
pub fn to_source(program: &Ast) -> String {
    match program {
        Ast::Block(statements) => statements
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n"),

        other => other.to_string(),
    }
}

impl Display for Ast {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Ast::*;

        // Una expresión en posición de sentencia requiere `;`
        if self.is_expression() {
            return write!(fmt, "{};", Expr(self));
        }

        match self {
            Return(term) => write!(fmt, "return {};", Expr(term)),
            Assert(condition) => write!(fmt, "assert({});", Expr(condition)),
            Var { name, value } => write!(fmt, "var {} = {};", name, Expr(value)),
            Assign { name, value } => write!(fmt, "{} = {};", name, Expr(value)),

            Block(statements) => {
                fmt.write_str("{")?;
                for statement in statements {
                    write!(fmt, " {}", statement)?;
                }

                fmt.write_str(" }")
            }

            // El `else` siempre se imprime, incluso vacío, para que un
            // `if` anidado no se apropie del `else` del exterior
            If {
                conditional,
                consequence,
                alternative,
            } => write!(
                fmt,
                "if ({}) {} else {}",
                Expr(conditional),
                consequence,
                alternative
            ),

            While { conditional, body } => write!(fmt, "while ({}) {}", Expr(conditional), body),

            Function {
                name,
                parameters,
                body,
            } => write!(fmt, "function {}({}) {}", name, parameters.join(", "), body),

            Number(_) | Id(_) | Not(_) | BinaryOperation { .. } | Call { .. } => unreachable!(),
        }
    }
}

/// Adaptador para imprimir un nodo en posición de expresión.
struct Expr<'a>(&'a Ast);

impl Display for Expr<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Ast::Number(value) => write!(fmt, "{}", value),
            Ast::Id(name) => fmt.write_str(name),

            Ast::Not(term) => match term.as_ref() {
                Ast::Number(_) | Ast::Id(_) | Ast::Call { .. } => write!(fmt, "!{}", Expr(term)),
                _ => write!(fmt, "!({})", Expr(term)),
            },

            Ast::BinaryOperation {
                left,
                operation,
                right,
            } => write!(fmt, "({} {} {})", Expr(left), operation, Expr(right)),

            Ast::Call { callee, args } => {
                write!(fmt, "{}(", callee)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        fmt.write_str(", ")?;
                    }

                    write!(fmt, "{}", Expr(arg))?;
                }

                fmt.write_str(")")
            }

            statement => write!(fmt, "{}", statement),
        }
    }
}
