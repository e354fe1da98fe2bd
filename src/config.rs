/// Options that change how permissive the pipeline is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Config {
    /// Accept names that describe a radical or substituent on its own ("methyl").
    pub allow_radicals: bool,
    /// Accept "acetic" for "acetic acid".
    pub allow_interpretation_of_acids_without_the_word_acid: bool,
    /// Replace unused attachment points with `R` pseudo-atoms in the output.
    pub output_radicals_as_wildcard_atoms: bool,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_radicals(mut self, yes: bool) -> Self {
        self.allow_radicals = yes;
        self
    }

    pub fn allow_acids_without_acid(mut self, yes: bool) -> Self {
        self.allow_interpretation_of_acids_without_the_word_acid = yes;
        self
    }

    /// Wildcard output implies radicals are allowed.
    pub fn output_radicals_as_wildcard_atoms(mut self, yes: bool) -> Self {
        self.output_radicals_as_wildcard_atoms = yes;
        if yes {
            self.allow_radicals = true;
        }
        self
    }
}
