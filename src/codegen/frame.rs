//! Stack frames y tabla de símbolos por función.
//!
//! # Disposición
//! ```text
//!  fp + 4   lr
//!  fp + 0   fp anterior
//!  fp - 4   relleno o parámetro
//!  ...      parámetros, en orden de argumento
//!  ...      locales, dos palabras cada una (valor y relleno)
//! ```
//! Tras el prólogo, `fp` apunta al `fp` guardado del invocador. Los
//! parámetros se encuentran justo debajo, y cada declaración nueva
//! apila el par `{r0, ip}`, por lo cual el valor queda en la palabra
//! inferior del par. Se desperdicia una palabra por local a cambio de
//! asignar desplazamientos en O(1) sin conocer el marco completo.

use std::collections::HashMap;

use super::{
    regs::{Reg, RegList},
    GenerationError, Listing, VALUE_SIZE,
};

/// Locales vivas de una función y su desplazamiento respecto a `fp`.
#[derive(Debug)]
pub struct Environment {
    locals: HashMap<String, i32>,
    next_local_offset: i32,
}

impl Default for Environment {
    fn default() -> Self {
        Environment {
            locals: HashMap::new(),
            next_local_offset: -VALUE_SIZE,
        }
    }
}

impl Environment {
    /// Prólogo: crea el stack frame y registra los parámetros.
    pub fn push(
        &mut self,
        function: &str,
        parameters: &[String],
        listing: &mut Listing,
    ) -> Result<(), GenerationError> {
        if parameters.len() > Reg::MAX_ARGS {
            return Err(GenerationError::UnsupportedParameters {
                function: function.to_owned(),
                count: parameters.len(),
            });
        }

        let duplicate = parameters
            .iter()
            .enumerate()
            .find(|(i, name)| parameters[..*i].contains(*name));

        if let Some((_, name)) = duplicate {
            return Err(GenerationError::DuplicateParameter {
                function: function.to_owned(),
                name: name.clone(),
            });
        }

        emit!(listing, "push", "{}", RegList::new([Reg::Fp, Reg::Lr]));
        emit!(listing, "mov", "fp, sp");

        let registers = RegList::new(Reg::argument_sequence().take(parameters.len())).aligned();
        for (i, name) in parameters.iter().enumerate() {
            let offset = (i as i32 - registers.len() as i32) * VALUE_SIZE;
            self.locals.insert(name.clone(), offset);
        }

        if !registers.is_empty() {
            emit!(listing, "push", "{}", registers);
        }

        self.next_local_offset = -registers.size() - VALUE_SIZE;
        Ok(())
    }

    /// Declara una local con el valor actual de `r0`.
    ///
    /// Si el nombre ya existe, se sobrescribe su espacio en vez de
    /// reservar uno nuevo.
    pub fn push_var(&mut self, name: &str, listing: &mut Listing) {
        if let Some(offset) = self.locals.get(name) {
            emit!(listing, "str", "r0, [fp, #{}]", offset);
            return;
        }

        emit!(listing, "push", "{}", RegList::new([Reg::R0]).aligned());

        self.locals
            .insert(name.to_owned(), self.next_local_offset - VALUE_SIZE);
        self.next_local_offset -= 2 * VALUE_SIZE;
    }

    /// Copia `r0` a una local existente.
    pub fn store(&self, name: &str, listing: &mut Listing) -> Result<(), GenerationError> {
        let offset = self.lookup(name)?;
        emit!(listing, "str", "r0, [fp, #{}]", offset);

        Ok(())
    }

    /// Copia una local existente a `r0`.
    pub fn load(&self, name: &str, listing: &mut Listing) -> Result<(), GenerationError> {
        let offset = self.lookup(name)?;
        emit!(listing, "ldr", "r0, [fp, #{}]", offset);

        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<i32, GenerationError> {
        self.locals
            .get(name)
            .copied()
            .ok_or_else(|| GenerationError::UndefinedVariable(name.to_owned()))
    }

    /// Epílogo: descarta el frame y olvida todas las locales.
    pub fn free(&mut self, listing: &mut Listing) {
        emit!(listing, "mov", "sp, fp");

        self.locals.clear();
        self.next_local_offset = -VALUE_SIZE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn parameters_sit_below_the_saved_registers() {
        let mut listing = Listing::default();
        let mut env = Environment::default();

        env.push("f", &names(&["a", "b", "c"]), &mut listing).unwrap();

        assert_eq!(env.lookup("a").unwrap(), -16);
        assert_eq!(env.lookup("b").unwrap(), -12);
        assert_eq!(env.lookup("c").unwrap(), -8);
        assert_eq!(
            listing.lines(),
            ["  push {fp, lr}", "  mov fp, sp", "  push {r0, r1, r2, ip}"]
        );
    }

    #[test]
    fn no_parameters_still_sets_the_frame_pointer() {
        let mut listing = Listing::default();
        let mut env = Environment::default();

        env.push("f", &[], &mut listing).unwrap();
        assert_eq!(listing.lines(), ["  push {fp, lr}", "  mov fp, sp"]);
    }

    #[test]
    fn locals_take_two_words_each() {
        let mut listing = Listing::default();
        let mut env = Environment::default();

        env.push("f", &names(&["n"]), &mut listing).unwrap();
        env.push_var("x", &mut listing);
        env.push_var("y", &mut listing);

        assert_eq!(env.lookup("n").unwrap(), -8);
        assert_eq!(env.lookup("x").unwrap(), -16);
        assert_eq!(env.lookup("y").unwrap(), -24);
    }

    #[test]
    fn redeclaration_reuses_the_slot() {
        let mut listing = Listing::default();
        let mut env = Environment::default();

        env.push("f", &[], &mut listing).unwrap();
        env.push_var("x", &mut listing);
        env.push_var("x", &mut listing);

        assert_eq!(env.lookup("x").unwrap(), -8);
        assert_eq!(
            &listing.lines()[2..],
            ["  push {r0, ip}", "  str r0, [fp, #-8]"]
        );
    }

    #[test]
    fn too_many_parameters() {
        let mut listing = Listing::default();
        let error = Environment::default()
            .push("f", &names(&["a", "b", "c", "d", "e"]), &mut listing)
            .unwrap_err();

        assert!(matches!(
            error,
            GenerationError::UnsupportedParameters { count: 5, .. }
        ));
        assert!(listing.lines().is_empty());
    }

    #[test]
    fn duplicate_parameters() {
        let mut listing = Listing::default();
        let error = Environment::default()
            .push("f", &names(&["a", "a"]), &mut listing)
            .unwrap_err();

        assert!(matches!(error, GenerationError::DuplicateParameter { .. }));
    }

    #[test]
    fn free_forgets_locals() {
        let mut listing = Listing::default();
        let mut env = Environment::default();

        env.push("f", &names(&["a"]), &mut listing).unwrap();
        env.free(&mut listing);

        assert!(env.lookup("a").is_err());
        assert_eq!(listing.lines().last().unwrap(), "  mov sp, fp");
    }
}
