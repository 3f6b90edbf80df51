//! Registros ARM visibles para la convención de llamada.

use super::VALUE_SIZE;
use std::fmt;

/// Registro de procesador.
///
/// El orden de las variantes sigue la numeración de la arquitectura,
/// que es también el orden en que `push`/`pop` los disponen en memoria.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Reg {
    R0,
    R1,
    R2,
    R3,
    Fp,
    Ip,
    Lr,
    Pc,
}

impl Reg {
    // Los primeros 4 argumentos se colocan en r0-r3
    pub const MAX_ARGS: usize = 4;

    pub fn argument_sequence() -> impl Iterator<Item = Reg> {
        use Reg::*;
        [R0, R1, R2, R3].into_iter()
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Reg::*;

        let name = match self {
            R0 => "r0",
            R1 => "r1",
            R2 => "r2",
            R3 => "r3",
            Fp => "fp",
            Ip => "ip",
            Lr => "lr",
            Pc => "pc",
        };

        formatter.write_str(name)
    }
}

/// Operando de `push`/`pop`, como `{r0, ip}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegList(Vec<Reg>);

impl RegList {
    pub fn new<I: IntoIterator<Item = Reg>>(regs: I) -> Self {
        let mut regs: Vec<_> = regs.into_iter().collect();
        regs.sort();

        RegList(regs)
    }

    /// Completa con `ip` hasta una cantidad par de registros.
    ///
    /// La pila debe mantener alineamiento de 8 bytes en toda frontera
    /// de llamada, por lo cual nunca se apila una sola palabra.
    pub fn aligned(mut self) -> Self {
        if self.0.len() % 2 != 0 {
            self.0.push(Reg::Ip);
        }

        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Bytes que ocupa la lista en la pila.
    pub fn size(&self) -> i32 {
        self.0.len() as i32 * VALUE_SIZE
    }
}

impl fmt::Display for RegList {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("{")?;
        for (i, reg) in self.0.iter().enumerate() {
            if i > 0 {
                formatter.write_str(", ")?;
            }

            write!(formatter, "{}", reg)?;
        }

        formatter.write_str("}")
    }
}
