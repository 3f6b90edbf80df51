//! Asignación de etiquetas para destinos de saltos.

use std::fmt;

/// Etiqueta local, única dentro de una misma compilación.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Label(u32);

impl fmt::Display for Label {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Label(number) = self;
        write!(formatter, ".L{:x}", number)
    }
}

/// Contador monótono de etiquetas.
///
/// Cada generación de código debe utilizar su propio contador, el cual
/// nunca se reinicia ni reutiliza etiquetas.
#[derive(Debug)]
pub struct Labels {
    next: u32,
}

impl Labels {
    pub fn allocate(&mut self) -> Label {
        let label = Label(self.next);
        self.next += 1;

        label
    }
}

impl Default for Labels {
    fn default() -> Self {
        Labels { next: 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_hexadecimal_and_start_at_one() {
        let mut labels = Labels::default();
        let names: Vec<_> = (0..11).map(|_| labels.allocate().to_string()).collect();

        assert_eq!(names[0], ".L1");
        assert_eq!(names[9], ".La");
        assert_eq!(names[10], ".Lb");
    }

    #[test]
    fn allocators_are_independent() {
        let mut first = Labels::default();
        first.allocate();

        let mut second = Labels::default();
        assert_eq!(second.allocate(), Label(1));
        assert_eq!(first.allocate(), Label(2));
    }
}
